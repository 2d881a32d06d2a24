//! Ride requests priced from the active fare table.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{FareCalculation, GeoPoint, Ride, RideBooking, RideStatus, VehicleType};
pub use router::ride_router;
pub use service::{fares_key, rides_key, RideError, RideService, FARES_TABLE, RIDES_TABLE};
