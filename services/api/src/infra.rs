use marketplace::cache::QueryCache;
use marketplace::config::{GatewayConfig, RideConfig};
use marketplace::error::AppError;
use marketplace::gateway::{InMemoryGateway, Record};
use marketplace::workflows::bookings::BookingService;
use marketplace::workflows::providers::ProviderApprovalService;
use marketplace::workflows::rides::RideService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Workflow services sharing one gateway and one query cache.
pub(crate) struct Services {
    pub(crate) gateway: Arc<InMemoryGateway>,
    pub(crate) providers: Arc<ProviderApprovalService<InMemoryGateway>>,
    pub(crate) rides: Arc<RideService<InMemoryGateway>>,
    pub(crate) bookings: Arc<BookingService<InMemoryGateway>>,
}

impl Services {
    pub(crate) fn new(gateway: Arc<InMemoryGateway>, rides: RideConfig) -> Self {
        let cache = Arc::new(QueryCache::new());
        Self {
            providers: Arc::new(ProviderApprovalService::new(
                gateway.clone(),
                cache.clone(),
            )),
            rides: Arc::new(RideService::new(gateway.clone(), cache.clone(), rides)),
            bookings: Arc::new(BookingService::new(gateway.clone(), cache)),
            gateway,
        }
    }
}

/// Seed file layout: `{ "table_name": [ { ...row }, ... ] }`.
pub(crate) fn load_seed(path: &Path) -> Result<HashMap<String, Vec<Record>>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let tables: HashMap<String, Vec<Record>> = serde_json::from_str(&raw)?;
    Ok(tables)
}

pub(crate) fn build_gateway(config: &GatewayConfig) -> Result<InMemoryGateway, AppError> {
    match &config.seed_path {
        Some(path) => {
            let tables = load_seed(path)?;
            let rows: usize = tables.values().map(Vec::len).sum();
            info!(path = %path.display(), tables = tables.len(), rows, "gateway seeded");
            Ok(InMemoryGateway::with_tables(tables))
        }
        None => Ok(InMemoryGateway::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn seed_file_populates_tables() {
        let path = std::env::temp_dir().join(format!("marketplace-seed-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("create seed");
        write!(
            file,
            r#"{{ "profiles": [ {{ "id": "u1", "full_name": "Ada" }} ], "fare_calculations": [] }}"#
        )
        .expect("write seed");

        let gateway = build_gateway(&GatewayConfig {
            seed_path: Some(path.clone()),
        })
        .expect("gateway builds");
        std::fs::remove_file(&path).ok();

        assert_eq!(gateway.rows("profiles").len(), 1);
        assert!(gateway.rows("fare_calculations").is_empty());
    }

    #[test]
    fn malformed_seed_is_reported() {
        let path = std::env::temp_dir().join(format!("marketplace-bad-seed-{}.json", std::process::id()));
        std::fs::write(&path, "[1, 2, 3]").expect("write seed");

        let result = load_seed(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(AppError::Seed(_))));
    }
}
