use crate::infra::{build_gateway, Services};
use chrono::{Duration, Utc};
use clap::Args;
use marketplace::config::{GatewayConfig, RideConfig};
use marketplace::error::AppError;
use marketplace::gateway::{to_record, InMemoryGateway, Record};
use marketplace::workflows::profiles::PROFILES_TABLE as USER_PROFILES_TABLE;
use marketplace::workflows::providers::{
    ApplicationId, ApplicationStatus, DocumentBag, VendorApplication, APPLICATIONS_TABLE,
};
use marketplace::workflows::rides::{GeoPoint, RideBooking, VehicleType, FARES_TABLE};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON seed file (`{ "table": [rows] }`) replacing the built-in sample data.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Notes recorded on rejected applications.
    #[arg(long, default_value = "Missing license")]
    pub(crate) notes: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { seed, notes } = args;

    let gateway = match seed {
        Some(path) => build_gateway(&GatewayConfig {
            seed_path: Some(path),
        })?,
        None => sample_gateway()?,
    };
    let services = Services::new(Arc::new(gateway), RideConfig::default());

    println!("Marketplace back office demo");
    let queue = services.providers.pending_applications().await?;
    println!("\nPending applications ({})", queue.len());
    for application in &queue {
        println!(
            "  - {} | {} | {} ({})",
            application.id,
            application.business_name,
            application.service_type,
            application.provider_type()
        );
    }

    println!("\nReview decisions");
    for application in &queue {
        if application.documents.is_some() {
            match services.providers.approve(application).await {
                Ok(profile) => println!(
                    "  - approved {} -> {} profile {} (documents: {})",
                    application.id,
                    profile.provider_type,
                    profile.id,
                    profile.documents.keys().collect::<Vec<_>>().join(", ")
                ),
                Err(err) => println!("  - approval of {} failed: {}", application.id, err),
            }
        } else {
            match services.providers.reject(application, &notes).await {
                Ok(rejected) => println!(
                    "  - rejected {}: {}",
                    rejected.id,
                    rejected.admin_notes.as_deref().unwrap_or_default()
                ),
                Err(err) => println!("  - rejection of {} failed: {}", application.id, err),
            }
        }
    }

    let stats = services.providers.provider_stats().await?;
    println!("\nProvider dashboard");
    println!(
        "- {} applications in review | {} providers ({} active, {} verified, {} pending)",
        stats.total_applications,
        stats.total_providers,
        stats.active_providers,
        stats.verified_providers,
        stats.pending_providers
    );
    for listing in services.providers.provider_listing().await? {
        println!(
            "  - {} [{}] owned by {} | {}",
            listing.profile.business_name,
            listing.profile.provider_type,
            listing.owner_name,
            listing.profile.verification_status.label()
        );
    }

    let fares = services.rides.fare_calculations().await?;
    if !fares.is_empty() {
        println!(
            "\nFare table ({} km estimate)",
            services.rides.estimated_distance_km()
        );
        for fare in fares.iter() {
            println!(
                "  - {}: base {:.2} + {:.2}/km -> {:.2}",
                fare.vehicle_type,
                fare.base_fare,
                fare.per_km_rate,
                services.rides.estimate_fare(fare)
            );
        }

        let booking = sample_booking(fares[0].vehicle_type);
        match services.rides.book_ride("demo-rider", &booking).await {
            Ok(ride) => println!(
                "- booked ride {} from {} to {} at {:.2}",
                ride.id, ride.pickup_address, ride.destination_address, ride.estimated_fare
            ),
            Err(err) => println!("- ride booking failed: {}", err),
        }
    }

    let bookings = services.bookings.bookings().await?;
    if !bookings.is_empty() {
        println!("\nService bookings ({})", bookings.len());
        for overview in bookings.iter() {
            println!(
                "  - {} | {} for {} by {} | {} | {:.2}",
                overview.booking.booking_date,
                overview.booking.service_type,
                overview.customer_name,
                overview.provider_name,
                overview.booking.status,
                overview.booking.price
            );
        }
    }

    println!(
        "\nGateway calls issued: {}",
        services.gateway.journal().len()
    );
    Ok(())
}

fn sample_gateway() -> Result<InMemoryGateway, AppError> {
    let gateway = InMemoryGateway::new();
    let now = Utc::now();

    let applications = [
        sample_application("app-001", "user-amina", "driver", "Amina Swift Rides", now)
            .with_documents([("license", "DL-40211"), ("logbook", "KDA 123X")]),
        sample_application("app-002", "user-brian", "bakery", "Brian's Oven", now - Duration::hours(3))
            .with_documents([("food_handler_cert", "FH-7781")]),
        sample_application("app-003", "user-chebet", "property_owner", "Chebet Lets", now - Duration::hours(6)),
    ];
    let rows = applications
        .iter()
        .map(|sample| to_record(&sample.application))
        .collect::<Result<Vec<Record>, _>>()?;
    gateway.seed(APPLICATIONS_TABLE, rows);

    gateway.seed(
        USER_PROFILES_TABLE,
        [
            json!({ "id": "user-amina", "full_name": "Amina Wairimu" }),
            json!({ "id": "user-brian", "email": "brian@oven.example" }),
        ]
        .into_iter()
        .filter_map(|value| value.as_object().cloned())
        .collect(),
    );

    gateway.seed(
        FARES_TABLE,
        [
            json!({ "vehicle_type": "taxi", "base_fare": 200.0, "per_km_rate": 50.0, "is_active": true }),
            json!({ "vehicle_type": "motorbike", "base_fare": 80.0, "per_km_rate": 20.0, "is_active": true }),
        ]
        .into_iter()
        .filter_map(|value| value.as_object().cloned())
        .collect(),
    );

    Ok(gateway)
}

struct SampleApplication {
    application: VendorApplication,
}

impl SampleApplication {
    fn with_documents<const N: usize>(mut self, pairs: [(&str, &str); N]) -> Self {
        let documents: DocumentBag = pairs
            .into_iter()
            .map(|(key, value)| (key, json!(value)))
            .collect();
        self.application.documents = Some(documents);
        self
    }
}

fn sample_application(
    id: &str,
    user_id: &str,
    service_type: &str,
    business_name: &str,
    submitted_at: chrono::DateTime<Utc>,
) -> SampleApplication {
    SampleApplication {
        application: VendorApplication {
            id: ApplicationId(id.to_string()),
            user_id: user_id.to_string(),
            service_type: service_type.to_string(),
            business_name: business_name.to_string(),
            business_description: None,
            business_phone: None,
            business_email: None,
            business_address: Some("Nairobi".to_string()),
            license_number: None,
            documents: None,
            status: ApplicationStatus::Pending,
            admin_notes: None,
            reviewed_at: None,
            submitted_at,
        },
    }
}

fn sample_booking(vehicle_type: VehicleType) -> RideBooking {
    RideBooking {
        pickup_address: "Kenyatta Avenue".to_string(),
        destination_address: "Westlands".to_string(),
        vehicle_type,
        pickup_location: GeoPoint {
            lat: -1.2864,
            lng: 36.8172,
        },
        destination_location: GeoPoint {
            lat: -1.2676,
            lng: 36.8108,
        },
    }
}
