//! Admin overview of service bookings with customer and provider names resolved.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::{CacheError, QueryCache, QueryKey};
use crate::gateway::{from_rows, DataGateway, Direction, GatewayError, Query};
use crate::workflows::profiles::{display_name_or_unknown, find_profile, UserProfile};

pub const BOOKINGS_TABLE: &str = "service_bookings";
pub const BOOKINGS_KEY: &str = "admin-service-bookings";

pub fn bookings_key() -> QueryKey {
    QueryKey::new([BOOKINGS_KEY])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBooking {
    pub id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub service_type: String,
    pub booking_date: String,
    pub status: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingOverview {
    #[serde(flatten)]
    pub booking: ServiceBooking,
    pub customer_name: String,
    pub provider_name: String,
}

pub struct BookingService<G> {
    gateway: Arc<G>,
    cache: Arc<QueryCache>,
}

impl<G> BookingService<G>
where
    G: DataGateway + 'static,
{
    pub fn new(gateway: Arc<G>, cache: Arc<QueryCache>) -> Self {
        Self { gateway, cache }
    }

    /// Every booking, newest first, labelled with both parties' display names.
    pub async fn bookings(&self) -> Result<Arc<Vec<BookingOverview>>, BookingError> {
        self.cache
            .fetch(bookings_key(), move || async move {
                let query = Query::all().order_by("created_at", Direction::Descending);
                let rows = self.gateway.select(BOOKINGS_TABLE, &query).await?;
                let bookings: Vec<ServiceBooking> = from_rows(rows)?;

                let overview = join_all(bookings.into_iter().map(move |booking| async move {
                    let (customer, provider) = tokio::join!(
                        self.lookup(&booking.customer_id),
                        self.lookup(&booking.provider_id)
                    );
                    BookingOverview {
                        customer_name: display_name_or_unknown(customer.as_ref()),
                        provider_name: display_name_or_unknown(provider.as_ref()),
                        booking,
                    }
                }))
                .await;
                debug!(bookings = overview.len(), "bookings loaded");
                Ok::<_, BookingError>(overview)
            })
            .await
    }

    async fn lookup(&self, user_id: &str) -> Option<UserProfile> {
        match find_profile(self.gateway.as_ref(), user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(%user_id, error = %err, "profile lookup failed");
                None
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub fn booking_router<G>(service: Arc<BookingService<G>>) -> Router
where
    G: DataGateway + 'static,
{
    Router::new()
        .route("/api/v1/bookings", get(bookings_handler::<G>))
        .with_state(service)
}

async fn bookings_handler<G>(State(service): State<Arc<BookingService<G>>>) -> Response
where
    G: DataGateway + 'static,
{
    match service.bookings().await {
        Ok(bookings) => (StatusCode::OK, Json(bookings.as_slice())).into_response(),
        Err(error) => {
            let status = match &error {
                BookingError::Gateway(_) => StatusCode::BAD_GATEWAY,
                BookingError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": error.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Filter, GatewayOperation, InMemoryGateway, Record};
    use crate::workflows::profiles::{PROFILES_TABLE, UNKNOWN_NAME};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn row(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("row fixture must be an object"),
        }
    }

    fn seeded_gateway() -> Arc<InMemoryGateway> {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.seed(
            BOOKINGS_TABLE,
            vec![
                row(json!({
                    "id": "b1", "customer_id": "c1", "provider_id": "p1",
                    "service_type": "cleaning", "booking_date": "2025-03-04",
                    "status": "confirmed", "price": 2500.0,
                    "created_at": "2025-03-01T08:00:00Z"
                })),
                row(json!({
                    "id": "b2", "customer_id": "c2", "provider_id": "ghost",
                    "service_type": "plumbing", "booking_date": "2025-03-06",
                    "status": "pending", "price": 1800.0, "location": "Westlands",
                    "created_at": "2025-03-02T08:00:00Z"
                })),
            ],
        );
        gateway.seed(
            PROFILES_TABLE,
            vec![
                row(json!({ "id": "c1", "full_name": "Achieng Odhiambo" })),
                row(json!({ "id": "c2", "email": "kip@example.com" })),
                row(json!({ "id": "p1", "full_name": "Sparkle Cleaners" })),
            ],
        );
        gateway
    }

    #[tokio::test]
    async fn bookings_are_newest_first_with_names() {
        let service = BookingService::new(seeded_gateway(), Arc::new(QueryCache::new()));

        let bookings = service.bookings().await.expect("bookings load");

        let ids: Vec<&str> = bookings.iter().map(|b| b.booking.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
        assert_eq!(bookings[0].customer_name, "kip@example.com");
        assert_eq!(bookings[0].provider_name, UNKNOWN_NAME);
        assert_eq!(bookings[1].customer_name, "Achieng Odhiambo");
        assert_eq!(bookings[1].provider_name, "Sparkle Cleaners");
    }

    /// Records how many profile lookups overlap.
    struct SlowProfiles {
        inner: Arc<InMemoryGateway>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DataGateway for SlowProfiles {
        async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, GatewayError> {
            if table != PROFILES_TABLE {
                return self.inner.select(table, query).await;
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.select(table, query).await
        }

        async fn insert(&self, table: &str, record: Record) -> Result<Record, GatewayError> {
            self.inner.insert(table, record).await
        }

        async fn update(
            &self,
            table: &str,
            patch: Record,
            filters: &[Filter],
        ) -> Result<Vec<Record>, GatewayError> {
            self.inner.update(table, patch, filters).await
        }

        async fn upsert(
            &self,
            table: &str,
            record: Record,
            conflict_keys: &[&str],
        ) -> Result<Record, GatewayError> {
            self.inner.upsert(table, record, conflict_keys).await
        }
    }

    #[tokio::test]
    async fn name_lookups_for_all_bookings_run_together() {
        let gateway = Arc::new(SlowProfiles {
            inner: seeded_gateway(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let service = BookingService::new(gateway.clone(), Arc::new(QueryCache::new()));

        let bookings = service.bookings().await.expect("bookings load");

        assert_eq!(bookings.len(), 2);
        assert_eq!(gateway.peak.load(Ordering::SeqCst), 4);
        assert_eq!(bookings[1].provider_name, "Sparkle Cleaners");
    }

    #[tokio::test]
    async fn failed_name_lookups_resolve_to_unknown() {
        let gateway = seeded_gateway();
        gateway.fail_on(
            GatewayOperation::Select,
            PROFILES_TABLE,
            GatewayError::Unavailable("timeout".to_string()),
        );
        let service = BookingService::new(gateway, Arc::new(QueryCache::new()));

        let bookings = service.bookings().await.expect("bookings load");
        assert!(bookings
            .iter()
            .all(|b| b.customer_name == UNKNOWN_NAME && b.provider_name == UNKNOWN_NAME));
    }

    #[tokio::test]
    async fn booking_table_failure_surfaces_as_bad_gateway() {
        use tower::ServiceExt;

        let gateway = seeded_gateway();
        gateway.fail_on(
            GatewayOperation::Select,
            BOOKINGS_TABLE,
            GatewayError::rejected("relation \"service_bookings\" does not exist"),
        );
        let app = booking_router(Arc::new(BookingService::new(
            gateway,
            Arc::new(QueryCache::new()),
        )));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/v1/bookings")
                    .body(axum::body::Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
