//! Route resolution chain.
//!
//! Tries routing strategies strictly in order and returns the first route
//! obtained. Every failure short of the last strategy is logged and falls
//! through, so a route is always produced for valid coordinates: the
//! straight-line fallback cannot fail on them.
//!
//! # Design
//!
//! Strategies are held as an enum ([`RoutingStrategy`]) rather than trait
//! objects, since [`RouteStrategy::route`] returns `impl Future`. Each
//! network attempt runs under its own timeout.

use std::time::Duration;

use super::ors::{OrsRouter, DEFAULT_ORS_TIMEOUT, DEFAULT_ORS_URL};
use super::osrm::{OsrmRouter, DEFAULT_OSRM_TIMEOUT, DEFAULT_OSRM_URL};
use super::straight_line::{StraightLineRouter, DEFAULT_WALKING_SPEED_MPS};
use super::types::{Route, RouteProvider, RouteStrategy, RoutingError};
use crate::geo::Coordinate;
use crate::http::AsyncHttpClient;

/// Configuration of the default chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResolverConfig {
    pub osrm_url: String,
    pub osrm_timeout: Duration,
    pub ors_url: String,
    /// OpenRouteService key; the secondary tier is skipped without it.
    pub ors_api_key: Option<String>,
    pub ors_timeout: Duration,
    pub walking_speed_mps: f64,
}

impl Default for RouteResolverConfig {
    fn default() -> Self {
        Self {
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            osrm_timeout: DEFAULT_OSRM_TIMEOUT,
            ors_url: DEFAULT_ORS_URL.to_string(),
            ors_api_key: None,
            ors_timeout: DEFAULT_ORS_TIMEOUT,
            walking_speed_mps: DEFAULT_WALKING_SPEED_MPS,
        }
    }
}

/// A routing strategy of any supported kind.
pub enum RoutingStrategy<C: AsyncHttpClient> {
    Osrm(OsrmRouter<C>),
    OpenRouteService(OrsRouter<C>),
    StraightLine(StraightLineRouter),
}

impl<C: AsyncHttpClient> RouteStrategy for RoutingStrategy<C> {
    fn name(&self) -> &str {
        match self {
            Self::Osrm(s) => s.name(),
            Self::OpenRouteService(s) => s.name(),
            Self::StraightLine(s) => s.name(),
        }
    }

    fn tier(&self) -> RouteProvider {
        match self {
            Self::Osrm(s) => s.tier(),
            Self::OpenRouteService(s) => s.tier(),
            Self::StraightLine(s) => s.tier(),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Osrm(s) => s.timeout(),
            Self::OpenRouteService(s) => s.timeout(),
            Self::StraightLine(s) => s.timeout(),
        }
    }

    fn check_ready(&self) -> Result<(), RoutingError> {
        match self {
            Self::Osrm(s) => s.check_ready(),
            Self::OpenRouteService(s) => s.check_ready(),
            Self::StraightLine(s) => s.check_ready(),
        }
    }

    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, RoutingError> {
        match self {
            Self::Osrm(s) => s.route(start, end).await,
            Self::OpenRouteService(s) => s.route(start, end).await,
            Self::StraightLine(s) => s.route(start, end).await,
        }
    }
}

/// Ordered routing chain.
pub struct RouteResolver<C: AsyncHttpClient> {
    strategies: Vec<RoutingStrategy<C>>,
}

impl<C: AsyncHttpClient + Clone> RouteResolver<C> {
    /// Build the standard chain: OSRM, OpenRouteService, straight line.
    pub fn from_config(http_client: C, config: &RouteResolverConfig) -> Self {
        Self::new(vec![
            RoutingStrategy::Osrm(OsrmRouter::new(
                http_client.clone(),
                config.osrm_url.clone(),
                config.osrm_timeout,
            )),
            RoutingStrategy::OpenRouteService(OrsRouter::new(
                http_client,
                config.ors_url.clone(),
                config.ors_api_key.clone(),
                config.ors_timeout,
            )),
            RoutingStrategy::StraightLine(StraightLineRouter::new(config.walking_speed_mps)),
        ])
    }
}

impl<C: AsyncHttpClient> RouteResolver<C> {
    /// Build a chain from explicit strategies, tried in the given order.
    pub fn new(strategies: Vec<RoutingStrategy<C>>) -> Self {
        Self { strategies }
    }

    /// Names of the strategies in evaluation order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve a walking route from `start` to `end`.
    ///
    /// Fails with [`RoutingError::InvalidCoordinates`] when either end is
    /// invalid; otherwise returns the first route any strategy produces, or
    /// the last strategy's error when all fail.
    pub async fn resolve_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<Route, RoutingError> {
        if !start.is_valid() || !end.is_valid() {
            return Err(RoutingError::InvalidCoordinates { start, end });
        }

        let mut last_error = RoutingError::NoProvider;

        for strategy in &self.strategies {
            if let Err(e) = strategy.check_ready() {
                tracing::debug!(
                    provider = strategy.name(),
                    reason = %e,
                    "Skipping routing provider"
                );
                last_error = e;
                continue;
            }

            let attempt = match strategy.timeout() {
                Some(limit) => match tokio::time::timeout(limit, strategy.route(start, end)).await {
                    Ok(result) => result,
                    Err(_) => Err(RoutingError::Timeout(limit)),
                },
                None => strategy.route(start, end).await,
            };

            match attempt {
                Ok(route) => {
                    tracing::info!(
                        provider = strategy.name(),
                        tier = %route.provider,
                        distance_m = format!("{:.0}", route.distance_meters),
                        duration_s = format!("{:.0}", route.duration_seconds),
                        points = route.coordinates.len(),
                        "Route resolved"
                    );
                    return Ok(route);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = strategy.name(),
                        error = %e,
                        "Routing provider failed, trying next"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
