use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::domain::{GeoPoint, RideBooking, RideStatus, VehicleType};
use super::router::ride_router;
use super::service::{rides_key, RideError, RideService, BOOK_RIDE, FARES_TABLE, RIDES_TABLE};
use crate::cache::QueryCache;
use crate::config::RideConfig;
use crate::gateway::{GatewayError, GatewayOperation, InMemoryGateway, Record};

fn row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("row fixture must be an object"),
    }
}

fn fare_rows() -> Vec<Record> {
    vec![
        row(json!({ "vehicle_type": "taxi", "base_fare": 200.0, "per_km_rate": 50.0, "is_active": true })),
        row(json!({ "vehicle_type": "motorbike", "base_fare": 80.0, "per_km_rate": 20.0, "is_active": true })),
        row(json!({ "vehicle_type": "taxi", "base_fare": 150.0, "per_km_rate": 40.0, "is_active": false })),
    ]
}

fn booking(vehicle_type: VehicleType) -> RideBooking {
    RideBooking {
        pickup_address: "Kenyatta Avenue".to_string(),
        destination_address: "JKIA Terminal 1A".to_string(),
        vehicle_type,
        pickup_location: GeoPoint {
            lat: -1.2864,
            lng: 36.8172,
        },
        destination_location: GeoPoint {
            lat: -1.3192,
            lng: 36.9278,
        },
    }
}

fn build_service() -> (RideService<InMemoryGateway>, Arc<InMemoryGateway>, Arc<QueryCache>) {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed(FARES_TABLE, fare_rows());
    let cache = Arc::new(QueryCache::new());
    let service = RideService::new(gateway.clone(), cache.clone(), RideConfig::default());
    (service, gateway, cache)
}

#[test]
fn wkt_puts_longitude_first() {
    let point = GeoPoint { lat: -1.5, lng: 36.0 };
    assert_eq!(point.to_wkt(), "POINT(36 -1.5)");
}

#[tokio::test]
async fn booking_prices_with_default_distance() {
    let (service, gateway, _) = build_service();

    let ride = service
        .book_ride("rider-1", &booking(VehicleType::Taxi))
        .await
        .expect("booking succeeds");

    assert_eq!(ride.estimated_fare, 450.0);
    assert_eq!(ride.status, RideStatus::Requested);
    assert_eq!(ride.user_id, "rider-1");
    assert_eq!(ride.pickup_location.as_deref(), Some("POINT(36.8172 -1.2864)"));
    assert_eq!(
        ride.destination_location.as_deref(),
        Some("POINT(36.9278 -1.3192)")
    );
    assert_eq!(gateway.rows(RIDES_TABLE).len(), 1);
}

#[tokio::test]
async fn configured_distance_changes_the_estimate() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed(FARES_TABLE, fare_rows());
    let service = RideService::new(
        gateway,
        Arc::new(QueryCache::new()),
        RideConfig {
            estimated_distance_km: 12.0,
        },
    );

    let ride = service
        .book_ride("rider-2", &booking(VehicleType::Motorbike))
        .await
        .expect("booking succeeds");
    assert_eq!(ride.estimated_fare, 80.0 + 12.0 * 20.0);
}

#[tokio::test]
async fn missing_or_duplicate_fares_refuse_the_booking() {
    let gateway = Arc::new(InMemoryGateway::new());
    let service = RideService::new(
        gateway.clone(),
        Arc::new(QueryCache::new()),
        RideConfig::default(),
    );

    match service.book_ride("rider-3", &booking(VehicleType::Taxi)).await {
        Err(RideError::FareUnavailable { rows, .. }) => assert_eq!(rows, 0),
        other => panic!("expected missing fare, got {other:?}"),
    }

    gateway.seed(FARES_TABLE, fare_rows());
    gateway.seed(FARES_TABLE, fare_rows());
    match service.book_ride("rider-3", &booking(VehicleType::Taxi)).await {
        Err(RideError::FareUnavailable { rows, vehicle_type }) => {
            assert_eq!(rows, 2);
            assert_eq!(vehicle_type, VehicleType::Taxi);
        }
        other => panic!("expected ambiguous fare, got {other:?}"),
    }
    assert!(gateway.rows(RIDES_TABLE).is_empty());
}

#[tokio::test]
async fn booking_invalidates_every_rider_history() {
    let (service, _, cache) = build_service();

    assert!(service.user_rides("rider-1").await.expect("history").is_empty());
    assert!(service.user_rides("rider-9").await.expect("history").is_empty());
    assert!(cache.is_cached(&rides_key("rider-9")));

    service
        .book_ride("rider-1", &booking(VehicleType::Taxi))
        .await
        .expect("booking succeeds");

    assert!(!cache.is_cached(&rides_key("rider-1")));
    assert!(!cache.is_cached(&rides_key("rider-9")));
    assert!(!cache.is_mutating(BOOK_RIDE));
    assert_eq!(service.user_rides("rider-1").await.expect("history").len(), 1);
}

#[tokio::test]
async fn insert_failure_is_reported_verbatim() {
    let (service, gateway, _) = build_service();
    gateway.fail_on(
        GatewayOperation::Insert,
        RIDES_TABLE,
        GatewayError::rejected("null value in column \"pickup_location\""),
    );

    let error = service
        .book_ride("rider-1", &booking(VehicleType::Taxi))
        .await
        .expect_err("insert fails");
    assert_eq!(error.to_string(), "null value in column \"pickup_location\"");
}

#[tokio::test]
async fn fares_route_lists_active_rows_with_estimates() {
    let (service, _, _) = build_service();
    let app = ride_router(Arc::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/rides/fares")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let fares: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(fares.as_array().map(Vec::len), Some(2));
    assert_eq!(fares[0]["estimated_fare"], json!(450.0));
}

#[tokio::test]
async fn booking_route_maps_missing_fare_to_unprocessable() {
    let gateway = Arc::new(InMemoryGateway::new());
    let service = RideService::new(gateway, Arc::new(QueryCache::new()), RideConfig::default());
    let app = ride_router(Arc::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/rider-1/rides")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&booking(VehicleType::Motorbike)).expect("payload"),
                ))
                .expect("request"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
