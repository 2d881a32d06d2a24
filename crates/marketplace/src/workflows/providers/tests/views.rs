use super::common::*;
use crate::gateway::{GatewayError, GatewayOperation};
use crate::workflows::profiles::{UserProfile, PROFILES_TABLE as USER_PROFILES_TABLE, UNKNOWN_NAME};
use crate::workflows::providers::domain::{ApplicationStatus, ProviderType};
use crate::workflows::providers::repository::PROFILES_TABLE;
use crate::workflows::providers::views::{pending_only, OwnerDirectory, ProviderStats};
use serde_json::json;

#[test]
fn pending_view_keeps_queue_order_and_drops_rejected() {
    let mut newest = application("a", "u1", "driver");
    newest.submitted_at = submitted_at(9);
    let mut rejected = application("b", "u2", "vendor");
    rejected.status = ApplicationStatus::Rejected;
    let mut oldest = application("c", "u3", "driver");
    oldest.submitted_at = submitted_at(2);
    let products = application("d", "u4", "products");

    let pending = pending_only(&[newest, rejected, oldest, products]);
    let ids: Vec<&str> = pending.iter().map(|app| app.id.0.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn owner_directory_falls_back_to_unknown() {
    let owners = OwnerDirectory::from_profiles(&[
        UserProfile {
            id: "u1".to_string(),
            full_name: Some("Wanjiku Kamau".to_string()),
            email: None,
        },
        UserProfile {
            id: "u2".to_string(),
            full_name: None,
            email: Some("otieno@example.com".to_string()),
        },
    ]);

    assert_eq!(owners.len(), 2);
    assert_eq!(owners.owner_name("u1"), "Wanjiku Kamau");
    assert_eq!(owners.owner_name("u2"), "otieno@example.com");
    assert_eq!(owners.owner_name("u3"), UNKNOWN_NAME);
}

#[tokio::test]
async fn review_queue_is_newest_first_and_excludes_products() {
    let (service, gateway, _) = build_service();
    let mut early = application("early", "u1", "driver");
    early.submitted_at = submitted_at(3);
    let mut late = application("late", "u2", "vendor");
    late.submitted_at = submitted_at(20);
    late.status = ApplicationStatus::Rejected;
    let mut approved = application("done", "u3", "driver");
    approved.status = ApplicationStatus::Approved;
    let products = application("shop", "u4", "products");
    seed_applications(&gateway, &[early, late, approved, products]);

    let queue = service.review_queue().await.expect("queue loads");
    let ids: Vec<&str> = queue.iter().map(|app| app.id.0.as_str()).collect();
    assert_eq!(ids, vec!["late", "early"]);
}

#[tokio::test]
async fn stats_count_profiles_by_state() {
    let (service, gateway, _) = build_service();
    seed_applications(
        &gateway,
        &[
            application("1", "u1", "driver"),
            application("2", "u2", "vendor"),
        ],
    );
    gateway.seed(
        PROFILES_TABLE,
        vec![
            row(json!({
                "user_id": "u10", "provider_type": "driver", "business_name": "Swift Cabs",
                "verification_status": "approved", "is_active": true
            })),
            row(json!({
                "user_id": "u11", "provider_type": "vendor", "business_name": "Mama Mboga",
                "verification_status": "pending", "is_active": false
            })),
            row(json!({
                "user_id": "u12", "provider_type": "property_owner", "business_name": "Coast Lets",
                "verification_status": "rejected", "is_active": false
            })),
        ],
    );

    let stats = service.provider_stats().await.expect("stats load");
    assert_eq!(
        stats,
        ProviderStats {
            total_applications: 2,
            total_providers: 3,
            active_providers: 1,
            verified_providers: 1,
            pending_providers: 1,
        }
    );
}

#[tokio::test]
async fn listing_labels_owners_and_survives_profile_outage() {
    let (service, gateway, _) = build_service();
    gateway.seed(
        PROFILES_TABLE,
        vec![row(json!({
            "user_id": "u10", "provider_type": "driver", "business_name": "Swift Cabs",
            "verification_status": "approved", "is_active": true
        }))],
    );
    gateway.fail_on(
        GatewayOperation::Select,
        USER_PROFILES_TABLE,
        GatewayError::Unavailable("timeout".to_string()),
    );

    let listing = service.provider_listing().await.expect("listing loads");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].owner_name, UNKNOWN_NAME);
    assert_eq!(listing[0].profile.provider_type, ProviderType::Driver);

    gateway.clear_failures();
    gateway.seed(
        USER_PROFILES_TABLE,
        vec![row(json!({ "id": "u10", "full_name": "Baraka Mwangi" }))],
    );

    let listing = service.provider_listing().await.expect("listing reloads");
    assert_eq!(listing[0].owner_name, "Baraka Mwangi");
}
