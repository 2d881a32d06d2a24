use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::gateway::DataGateway;

use super::domain::{FareCalculation, RideBooking};
use super::service::{RideError, RideService};

#[derive(Debug, Serialize)]
struct FareQuote<'a> {
    #[serde(flatten)]
    fare: &'a FareCalculation,
    estimated_fare: f64,
}

pub fn ride_router<G>(service: Arc<RideService<G>>) -> Router
where
    G: DataGateway + 'static,
{
    Router::new()
        .route("/api/v1/rides/fares", get(fares_handler::<G>))
        .route(
            "/api/v1/users/:user_id/rides",
            get(user_rides_handler::<G>).post(book_ride_handler::<G>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: RideError) -> Response {
    let status = match &error {
        RideError::FareUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RideError::Gateway(_) => StatusCode::BAD_GATEWAY,
        RideError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

async fn fares_handler<G>(State(service): State<Arc<RideService<G>>>) -> Response
where
    G: DataGateway + 'static,
{
    match service.fare_calculations().await {
        Ok(fares) => {
            let quotes: Vec<FareQuote<'_>> = fares
                .iter()
                .map(|fare| FareQuote {
                    fare,
                    estimated_fare: service.estimate_fare(fare),
                })
                .collect();
            (StatusCode::OK, Json(quotes)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn user_rides_handler<G>(
    State(service): State<Arc<RideService<G>>>,
    Path(user_id): Path<String>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.user_rides(&user_id).await {
        Ok(rides) => (StatusCode::OK, Json(rides.as_slice())).into_response(),
        Err(error) => error_response(error),
    }
}

async fn book_ride_handler<G>(
    State(service): State<Arc<RideService<G>>>,
    Path(user_id): Path<String>,
    Json(booking): Json<RideBooking>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.book_ride(&user_id, &booking).await {
        Ok(ride) => (StatusCode::CREATED, Json(ride)).into_response(),
        Err(error) => error_response(error),
    }
}
