use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::cache::QueryCache;
use crate::gateway::{to_record, InMemoryGateway, Record};
use crate::workflows::providers::documents::DocumentBag;
use crate::workflows::providers::domain::{ApplicationId, ApplicationStatus, VendorApplication};
use crate::workflows::providers::repository::APPLICATIONS_TABLE;
use crate::workflows::providers::service::ProviderApprovalService;

pub(super) fn submitted_at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn application(id: &str, user_id: &str, service_type: &str) -> VendorApplication {
    VendorApplication {
        id: ApplicationId(id.to_string()),
        user_id: user_id.to_string(),
        service_type: service_type.to_string(),
        business_name: "Acme Rides".to_string(),
        business_description: Some("Airport transfers".to_string()),
        business_phone: Some("+254700000001".to_string()),
        business_email: Some("ops@acme.example".to_string()),
        business_address: Some("12 Harbour Road".to_string()),
        license_number: Some("LIC-001".to_string()),
        documents: None,
        status: ApplicationStatus::Pending,
        admin_notes: None,
        reviewed_at: None,
        submitted_at: submitted_at(1),
    }
}

pub(super) fn documents(pairs: &[(&str, &str)]) -> DocumentBag {
    pairs
        .iter()
        .map(|(key, value)| (*key, json!(value)))
        .collect()
}

pub(super) fn row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("row fixture must be an object"),
    }
}

pub(super) fn seed_applications(gateway: &InMemoryGateway, applications: &[VendorApplication]) {
    let rows = applications
        .iter()
        .map(|application| to_record(application).expect("application serializes"))
        .collect();
    gateway.seed(APPLICATIONS_TABLE, rows);
}

pub(super) fn build_service() -> (
    ProviderApprovalService<InMemoryGateway>,
    Arc<InMemoryGateway>,
    Arc<QueryCache>,
) {
    let gateway = Arc::new(InMemoryGateway::new());
    let cache = Arc::new(QueryCache::new());
    let service = ProviderApprovalService::new(gateway.clone(), cache.clone());
    (service, gateway, cache)
}

pub(super) fn stored_application(gateway: &InMemoryGateway, id: &str) -> Record {
    gateway
        .rows(APPLICATIONS_TABLE)
        .into_iter()
        .find(|row| row.get("id") == Some(&json!(id)))
        .expect("application row present")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
