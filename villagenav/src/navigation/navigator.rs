//! Navigation session coordinator.
//!
//! The [`Navigator`] holds the selected destination, the current route and
//! the arrival latch. It does not track position itself: callers pass the
//! current estimate in, which keeps it usable with a live
//! [`TrackingSession`](crate::position::TrackingSession) or with recorded
//! data.
//!
//! # Route lifecycle
//!
//! The route is computed once when navigation starts and only recomputed on
//! an explicit [`reroute`](Navigator::reroute). A new request supersedes the
//! pending one: the older request returns [`RoutingError::Superseded`] and
//! its result is never stored. Selecting a new destination or stopping also
//! supersedes anything pending.

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::arrival::{ArrivalDetector, ArrivalStatus, NavigationSession};
use super::destination::{Destination, DestinationId, DestinationLookup, LookupError};
use crate::geo::Coordinate;
use crate::http::AsyncHttpClient;
use crate::position::SmoothedEstimate;
use crate::routing::{Route, RouteResolver, RoutingError};

/// Errors from navigation operations.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("No destination selected")]
    NoDestination,
}

/// Plain-data view of navigation state for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    pub position: Option<SmoothedEstimate>,
    pub destination: Option<Destination>,
    pub route: Option<Route>,
    pub session: NavigationSession,
    pub route_pending: bool,
}

struct NavigatorState {
    destination: Option<Destination>,
    route: Option<Route>,
    arrival: ArrivalDetector,
    /// Bumped whenever a pending route request becomes obsolete.
    generation: u64,
    pending: Option<CancellationToken>,
}

impl NavigatorState {
    fn supersede_pending(&mut self) {
        self.generation += 1;
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

/// Marks a route request as pending for as long as it lives.
///
/// Dropping it clears the marker unless a newer request took over, so a
/// caller that abandons `start`/`reroute` mid-flight does not leave the
/// navigator looking busy.
struct PendingRequest<'a> {
    state: &'a Mutex<NavigatorState>,
    generation: u64,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.pending = None;
        }
    }
}

/// Destination selection, routing and arrival for one user.
pub struct Navigator<L: DestinationLookup, C: AsyncHttpClient> {
    lookup: L,
    resolver: RouteResolver<C>,
    state: Mutex<NavigatorState>,
}

impl<L: DestinationLookup, C: AsyncHttpClient> Navigator<L, C> {
    pub fn new(lookup: L, resolver: RouteResolver<C>, arrival_threshold_meters: f64) -> Self {
        Self {
            lookup,
            resolver,
            state: Mutex::new(NavigatorState {
                destination: None,
                route: None,
                arrival: ArrivalDetector::new(arrival_threshold_meters),
                generation: 0,
                pending: None,
            }),
        }
    }

    /// Look up and select a destination.
    ///
    /// On success the previous route is discarded, any pending route request
    /// is superseded and the arrival latch is cleared. On failure the current
    /// selection is left untouched.
    pub async fn set_destination(
        &self,
        id: &DestinationId,
    ) -> Result<Destination, NavigationError> {
        let destination = match self.lookup.lookup(id).await {
            Ok(destination) => destination,
            Err(e) => {
                tracing::warn!(
                    block = %id.block,
                    lot = %id.lot,
                    error = %e,
                    "Destination lookup failed"
                );
                return Err(e.into());
            }
        };

        self.select(destination.clone());
        Ok(destination)
    }

    /// Select a destination that is already known, without a lookup.
    ///
    /// Same effect on state as a successful
    /// [`set_destination`](Self::set_destination).
    pub fn select(&self, destination: Destination) {
        tracing::info!(
            block = %destination.id.block,
            lot = %destination.id.lot,
            coordinates = %destination.coordinates,
            "Destination selected"
        );

        let mut state = self.state.lock();
        state.supersede_pending();
        state.route = None;
        state.destination = Some(destination);
        state.arrival.begin();
    }

    /// Start navigating from `from`: resolve the route to the destination.
    pub async fn start(&self, from: Coordinate) -> Result<Route, NavigationError> {
        self.compute_route(from).await
    }

    /// Recompute the route from a new start point.
    pub async fn reroute(&self, from: Coordinate) -> Result<Route, NavigationError> {
        tracing::debug!(from = %from, "Rerouting");
        self.compute_route(from).await
    }

    async fn compute_route(&self, from: Coordinate) -> Result<Route, NavigationError> {
        let (token, generation, to) = {
            let mut state = self.state.lock();
            let to = state
                .destination
                .as_ref()
                .map(|d| d.coordinates)
                .ok_or(NavigationError::NoDestination)?;
            state.supersede_pending();
            let token = CancellationToken::new();
            state.pending = Some(token.clone());
            (token, state.generation, to)
        };

        let pending = PendingRequest {
            state: &self.state,
            generation,
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(RoutingError::Superseded),
            route = self.resolver.resolve_route(from, to) => route,
        };
        // Released before relocking below
        drop(pending);

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Discarding superseded route result");
            return Err(RoutingError::Superseded.into());
        }

        let route = result?;
        state.route = Some(route.clone());
        Ok(route)
    }

    /// Check arrival against the selected destination.
    pub fn check_arrival(
        &self,
        estimate: &SmoothedEstimate,
    ) -> Result<ArrivalStatus, NavigationError> {
        let mut state = self.state.lock();
        let NavigatorState {
            destination,
            arrival,
            ..
        } = &mut *state;
        let destination = destination.as_ref().ok_or(NavigationError::NoDestination)?;
        Ok(arrival.check(estimate, destination))
    }

    /// Stop navigating: supersede pending work, discard the route and the
    /// destination.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.supersede_pending();
        state.route = None;
        state.destination = None;
        state.arrival.end();
        tracing::info!("Navigation stopped");
    }

    pub fn destination(&self) -> Option<Destination> {
        self.state.lock().destination.clone()
    }

    pub fn route(&self) -> Option<Route> {
        self.state.lock().route.clone()
    }

    /// Plain-data view combining navigation state with a position estimate.
    pub fn snapshot(&self, position: Option<SmoothedEstimate>) -> NavigationSnapshot {
        let state = self.state.lock();
        NavigationSnapshot {
            position,
            destination: state.destination.clone(),
            route: state.route.clone(),
            session: state.arrival.session(),
            route_pending: state.pending.is_some(),
        }
    }
}
