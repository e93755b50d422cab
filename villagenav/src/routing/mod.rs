//! Walking route resolution.
//!
//! Routes come from a fixed chain of strategies, tried in order:
//!
//! | Tier | Strategy | Needs |
//! |------|----------|-------|
//! | Primary | OSRM `foot` profile | nothing |
//! | Secondary | OpenRouteService `foot-walking` | API key |
//! | Fallback | Straight line | nothing, works offline |
//!
//! # Usage
//!
//! ```ignore
//! use villagenav::http::AsyncReqwestClient;
//! use villagenav::routing::{RouteResolver, RouteResolverConfig};
//!
//! let client = AsyncReqwestClient::new()?;
//! let resolver = RouteResolver::from_config(client, &RouteResolverConfig::default());
//! let route = resolver.resolve_route(start, end).await?;
//! println!("{} m via {}", route.distance_meters, route.provider);
//! ```

mod chain;
mod ors;
mod osrm;
mod straight_line;
mod types;

pub use chain::{RouteResolver, RouteResolverConfig, RoutingStrategy};
pub use ors::{OrsRouter, DEFAULT_ORS_TIMEOUT, DEFAULT_ORS_URL};
pub use osrm::{OsrmRouter, DEFAULT_OSRM_TIMEOUT, DEFAULT_OSRM_URL};
pub use straight_line::{StraightLineRouter, DEFAULT_WALKING_SPEED_MPS};
pub use types::{Route, RouteProvider, RouteStrategy, RoutingError};
