use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheError, QueryCache, QueryKey};
use crate::config::RideConfig;
use crate::gateway::{
    expect_single, from_record, from_rows, to_record, DataGateway, Direction, GatewayError,
    Query,
};

use super::domain::{FareCalculation, NewRide, Ride, RideBooking, VehicleType};

pub const RIDES_TABLE: &str = "rides";
pub const FARES_TABLE: &str = "fare_calculations";

pub const RIDES_KEY: &str = "rides";
pub const FARES_KEY: &str = "fare-calculations";
pub const BOOK_RIDE: &str = "book-ride";

pub fn rides_key(user_id: &str) -> QueryKey {
    QueryKey::new([RIDES_KEY, user_id])
}

pub fn fares_key() -> QueryKey {
    QueryKey::new([FARES_KEY])
}

/// Fare lookup, ride requests, and per-rider history.
pub struct RideService<G> {
    gateway: Arc<G>,
    cache: Arc<QueryCache>,
    estimated_distance_km: f64,
}

impl<G> RideService<G>
where
    G: DataGateway + 'static,
{
    pub fn new(gateway: Arc<G>, cache: Arc<QueryCache>, config: RideConfig) -> Self {
        Self {
            gateway,
            cache,
            estimated_distance_km: config.estimated_distance_km,
        }
    }

    pub fn estimated_distance_km(&self) -> f64 {
        self.estimated_distance_km
    }

    /// Active fare rows for every vehicle type.
    pub async fn fare_calculations(&self) -> Result<Arc<Vec<FareCalculation>>, RideError> {
        self.cache
            .fetch(fares_key(), move || async move {
                let rows = self
                    .gateway
                    .select(FARES_TABLE, &Query::all().eq("is_active", true))
                    .await?;
                Ok::<_, RideError>(from_rows(rows)?)
            })
            .await
    }

    pub fn estimate_fare(&self, fare: &FareCalculation) -> f64 {
        fare.estimate(self.estimated_distance_km)
    }

    /// The single active fare row for `vehicle_type`.
    pub async fn active_fare(&self, vehicle_type: VehicleType) -> Result<FareCalculation, RideError> {
        let query = Query::all()
            .eq("vehicle_type", vehicle_type.label())
            .eq("is_active", true);
        let rows = self.gateway.select(FARES_TABLE, &query).await?;
        match expect_single(rows) {
            Ok(row) => Ok(from_record(row)?),
            Err(GatewayError::NotSingular { rows }) => {
                Err(RideError::FareUnavailable { vehicle_type, rows })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Price the trip from the active fare and store it as a `requested` ride.
    pub async fn book_ride(&self, user_id: &str, booking: &RideBooking) -> Result<Ride, RideError> {
        let _pending = self.cache.begin_mutation(BOOK_RIDE);

        let fare = self.active_fare(booking.vehicle_type).await.inspect_err(|err| {
            warn!(%user_id, vehicle_type = %booking.vehicle_type, error = %err, "fare lookup failed");
        })?;
        let estimated_fare = self.estimate_fare(&fare);

        let row = to_record(&NewRide::requested(user_id, booking, estimated_fare))?;
        let stored = self.gateway.insert(RIDES_TABLE, row).await.inspect_err(|err| {
            warn!(%user_id, error = %err, "ride insert failed");
        })?;
        let ride: Ride = from_record(stored)?;

        self.cache.invalidate(&QueryKey::new([RIDES_KEY]));
        info!(
            ride_id = %ride.id,
            %user_id,
            vehicle_type = %ride.vehicle_type,
            estimated_fare,
            "ride requested"
        );
        Ok(ride)
    }

    /// Rides requested by `user_id`, newest first.
    pub async fn user_rides(&self, user_id: &str) -> Result<Arc<Vec<Ride>>, RideError> {
        self.cache
            .fetch(rides_key(user_id), move || async move {
                let query = Query::all()
                    .eq("user_id", user_id)
                    .order_by("created_at", Direction::Descending);
                let rows = self.gateway.select(RIDES_TABLE, &query).await?;
                Ok::<_, RideError>(from_rows(rows)?)
            })
            .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RideError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("expected one active fare for {vehicle_type}, found {rows}")]
    FareUnavailable { vehicle_type: VehicleType, rows: usize },
}
