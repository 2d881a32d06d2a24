use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Taxi,
    Motorbike,
}

impl VehicleType {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleType::Taxi => "taxi",
            VehicleType::Motorbike => "motorbike",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

/// Latitude/longitude pair as entered by the rider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Well-known-text form stored in the geography columns; longitude comes first.
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.lng, self.lat)
    }
}

/// Rider input for a new booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideBooking {
    pub pickup_address: String,
    pub destination_address: String,
    pub vehicle_type: VehicleType,
    pub pickup_location: GeoPoint,
    pub destination_location: GeoPoint,
}

/// Active pricing for one vehicle type (`fare_calculations`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareCalculation {
    pub vehicle_type: VehicleType,
    pub base_fare: f64,
    pub per_km_rate: f64,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl FareCalculation {
    pub fn estimate(&self, distance_km: f64) -> f64 {
        self.base_fare + distance_km * self.per_km_rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: String,
    pub user_id: String,
    pub pickup_address: String,
    pub destination_address: String,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub destination_location: Option<String>,
    pub estimated_fare: f64,
    #[serde(default)]
    pub actual_fare: Option<f64>,
    pub status: RideStatus,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row written when a ride is requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct NewRide<'a> {
    pub user_id: &'a str,
    pub pickup_address: &'a str,
    pub destination_address: &'a str,
    pub vehicle_type: VehicleType,
    pub pickup_location: String,
    pub destination_location: String,
    pub estimated_fare: f64,
    pub status: RideStatus,
}

impl<'a> NewRide<'a> {
    pub(crate) fn requested(user_id: &'a str, booking: &'a RideBooking, estimated_fare: f64) -> Self {
        Self {
            user_id,
            pickup_address: &booking.pickup_address,
            destination_address: &booking.destination_address,
            vehicle_type: booking.vehicle_type,
            pickup_location: booking.pickup_location.to_wkt(),
            destination_location: booking.destination_location.to_wkt(),
            estimated_fare,
            status: RideStatus::Requested,
        }
    }
}
