//! Destination selection, routing and arrival.
//!
//! # Usage
//!
//! ```ignore
//! use villagenav::navigation::{DestinationId, Navigator};
//!
//! let navigator = Navigator::new(lookup, resolver, 10.0);
//! navigator.set_destination(&DestinationId::new("3", "12")).await?;
//! let route = navigator.start(session.current_estimate().unwrap().coordinate()).await?;
//!
//! while let Ok(estimate) = updates.recv().await {
//!     if navigator.check_arrival(&estimate)? == ArrivalStatus::JustArrived {
//!         println!("You have arrived");
//!     }
//! }
//! ```

mod arrival;
mod destination;
mod navigator;

pub use arrival::{
    ArrivalDetector, ArrivalStatus, NavigationSession, DEFAULT_ARRIVAL_THRESHOLD_METERS,
};
pub use destination::{
    Destination, DestinationId, DestinationLookup, DestinationSource, LookupError,
    RestDestinationLookup, StaticDestinationTable,
};
pub use navigator::{NavigationError, NavigationSnapshot, Navigator};
