use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::{
    from_record, from_rows, to_record, DataGateway, Direction, Filter, GatewayError, Query,
};

use super::documents::CLASSIFICATION_KEY;
use super::domain::{
    ApplicationId, ApplicationStatus, ProviderId, ProviderProfile, ProviderProfileDraft,
    ProviderType, VendorApplication, VerificationStatus, PRODUCTS_CLASSIFICATION,
};

pub const APPLICATIONS_TABLE: &str = "vendor_applications";
pub const PROFILES_TABLE: &str = "service_provider_profiles";

/// Composite identity of a provider profile.
pub const PROFILE_CONFLICT_KEYS: [&str; 2] = ["user_id", "provider_type"];

/// Typed access to the provider tables over any [`DataGateway`].
pub struct ProviderRepository<'a, G> {
    gateway: &'a G,
}

#[derive(Debug, Serialize)]
struct ApplicationReviewPatch<'a> {
    status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_notes: Option<&'a str>,
    reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ProviderReviewPatch<'a> {
    verification_status: VerificationStatus,
    is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_notes: Option<&'a str>,
}

impl<'a, G: DataGateway> ProviderRepository<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Pending and rejected applications outside the products classification, newest first.
    pub async fn review_queue(&self) -> Result<Vec<VendorApplication>, GatewayError> {
        let query = Query::all()
            .neq(CLASSIFICATION_KEY, PRODUCTS_CLASSIFICATION)
            .any_of(
                "status",
                [
                    ApplicationStatus::Pending.label(),
                    ApplicationStatus::Rejected.label(),
                ],
            )
            .order_by("submitted_at", Direction::Descending);
        let rows = self.gateway.select(APPLICATIONS_TABLE, &query).await?;
        from_rows(rows)
    }

    pub async fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<VendorApplication>, GatewayError> {
        let rows = self
            .gateway
            .select(APPLICATIONS_TABLE, &Query::all().eq("id", id.0.as_str()).limit(1))
            .await?;
        Ok(from_rows::<VendorApplication>(rows)?.into_iter().next())
    }

    /// All provider profiles, newest first.
    pub async fn providers(&self) -> Result<Vec<ProviderProfile>, GatewayError> {
        let query = Query::all().order_by("created_at", Direction::Descending);
        let rows = self.gateway.select(PROFILES_TABLE, &query).await?;
        from_rows(rows)
    }

    pub async fn provider(&self, id: &ProviderId) -> Result<Option<ProviderProfile>, GatewayError> {
        let rows = self
            .gateway
            .select(PROFILES_TABLE, &Query::all().eq("id", id.0.as_str()).limit(1))
            .await?;
        Ok(from_rows::<ProviderProfile>(rows)?.into_iter().next())
    }

    pub async fn profile_for(
        &self,
        user_id: &str,
        provider_type: ProviderType,
    ) -> Result<Option<ProviderProfile>, GatewayError> {
        let query = Query::all()
            .eq("user_id", user_id)
            .eq("provider_type", provider_type.label())
            .limit(1);
        let rows = self.gateway.select(PROFILES_TABLE, &query).await?;
        Ok(from_rows::<ProviderProfile>(rows)?.into_iter().next())
    }

    pub async fn upsert_profile(
        &self,
        draft: &ProviderProfileDraft,
    ) -> Result<ProviderProfile, GatewayError> {
        let row = self
            .gateway
            .upsert(PROFILES_TABLE, to_record(draft)?, &PROFILE_CONFLICT_KEYS)
            .await?;
        from_record(row)
    }

    /// Stamp a review outcome on an application; `None` when no row matched.
    ///
    /// A non-empty `from` restricts the update to rows currently in one of those statuses.
    pub async fn mark_application(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
        admin_notes: Option<&str>,
        reviewed_at: DateTime<Utc>,
        from: &[ApplicationStatus],
    ) -> Result<Option<VendorApplication>, GatewayError> {
        let patch = ApplicationReviewPatch {
            status,
            admin_notes,
            reviewed_at,
        };
        let mut filters = vec![Filter::eq("id", id.0.as_str())];
        if !from.is_empty() {
            filters.push(Filter::any_of(
                "status",
                from.iter().map(|status| status.label()),
            ));
        }
        let rows = self
            .gateway
            .update(APPLICATIONS_TABLE, to_record(&patch)?, &filters)
            .await?;
        Ok(from_rows::<VendorApplication>(rows)?.into_iter().next())
    }

    /// Set the verification outcome on a live profile; `None` when no row matched.
    pub async fn mark_provider(
        &self,
        id: &ProviderId,
        verification_status: VerificationStatus,
        is_active: bool,
        admin_notes: Option<&str>,
    ) -> Result<Option<ProviderProfile>, GatewayError> {
        let patch = ProviderReviewPatch {
            verification_status,
            is_active,
            admin_notes,
        };
        let rows = self
            .gateway
            .update(
                PROFILES_TABLE,
                to_record(&patch)?,
                &[Filter::eq("id", id.0.as_str())],
            )
            .await?;
        Ok(from_rows::<ProviderProfile>(rows)?.into_iter().next())
    }
}
