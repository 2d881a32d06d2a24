use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::{CacheError, QueryCache, QueryKey};
use crate::gateway::{DataGateway, GatewayError};
use crate::workflows::profiles::load_profiles;

use super::documents::{merge_profile_documents, DocumentBag};
use super::domain::{
    ApplicationId, ApplicationStatus, ProviderId, ProviderProfile, ProviderProfileDraft,
    ProviderType, VendorApplication, VerificationStatus,
};
use super::repository::ProviderRepository;
use super::views::{pending_only, OwnerDirectory, ProviderListing, ProviderStats};

pub const APPLICATIONS_KEY: &str = "admin-service-provider-applications";
pub const PROVIDERS_KEY: &str = "admin-service-providers";
pub const PROFILE_LOOKUP_KEY: &str = "service-provider-profile";
pub const OWNER_DIRECTORY_KEY: &str = "admin-profiles-providers";

pub const APPROVE_APPLICATION: &str = "approve-application";
pub const REJECT_APPLICATION: &str = "reject-application";
pub const APPROVE_PROVIDER: &str = "approve-provider";
pub const REJECT_PROVIDER: &str = "reject-provider";

pub fn applications_key() -> QueryKey {
    QueryKey::new([APPLICATIONS_KEY])
}

pub fn providers_key() -> QueryKey {
    QueryKey::new([PROVIDERS_KEY])
}

pub fn profile_lookup_key(user_id: &str, classification: &str) -> QueryKey {
    QueryKey::new([PROFILE_LOOKUP_KEY, user_id, classification])
}

/// Build the provider profile an approval writes.
///
/// `stored_documents` are the documents already on the profile being overwritten, if any.
pub fn draft_from_application(
    application: &VendorApplication,
    stored_documents: Option<&DocumentBag>,
) -> ProviderProfileDraft {
    ProviderProfileDraft {
        user_id: application.user_id.clone(),
        provider_type: ProviderType::from_classification(&application.service_type),
        business_name: application.business_name.clone(),
        business_description: application.business_description.clone(),
        phone_number: application.business_phone.clone(),
        email: application.business_email.clone(),
        location_address: application.business_address.clone(),
        verification_status: VerificationStatus::Approved,
        is_active: true,
        documents: merge_profile_documents(
            stored_documents,
            application.documents.as_ref(),
            &application.service_type,
        ),
    }
}

/// Approval and rejection of provider applications plus the admin read views.
pub struct ProviderApprovalService<G> {
    gateway: Arc<G>,
    cache: Arc<QueryCache>,
}

impl<G> ProviderApprovalService<G>
where
    G: DataGateway + 'static,
{
    pub fn new(gateway: Arc<G>, cache: Arc<QueryCache>) -> Self {
        Self { gateway, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn repository(&self) -> ProviderRepository<'_, G> {
        ProviderRepository::new(self.gateway.as_ref())
    }

    /// Approve an application: upsert its provider profile, then mark it approved.
    ///
    /// The profile write must succeed before the application is touched. If the status
    /// update fails afterwards the profile already exists and calling `approve` again
    /// completes the transition.
    pub async fn approve(
        &self,
        application: &VendorApplication,
    ) -> Result<ProviderProfile, ProviderWorkflowError> {
        let _pending = self.cache.begin_mutation(APPROVE_APPLICATION);
        ensure_provider_application(application)?;
        let repository = self.repository();
        let provider_type = application.provider_type();

        let stored = repository
            .profile_for(&application.user_id, provider_type)
            .await
            .inspect_err(|err| {
                warn!(application_id = %application.id, error = %err, "provider profile lookup failed");
            })?;
        let draft = draft_from_application(application, stored.as_ref().map(|p| &p.documents));

        let profile = repository.upsert_profile(&draft).await.inspect_err(|err| {
            warn!(application_id = %application.id, error = %err, "provider profile upsert failed");
        })?;

        let updated = repository
            .mark_application(
                &application.id,
                ApplicationStatus::Approved,
                None,
                Utc::now(),
                &[],
            )
            .await
            .inspect_err(|err| {
                warn!(
                    application_id = %application.id,
                    provider_id = %profile.id,
                    error = %err,
                    "provider profile stored but application status update failed; retry approval"
                );
            })?;
        if updated.is_none() {
            return Err(ProviderWorkflowError::ApplicationNotFound(
                application.id.clone(),
            ));
        }

        self.cache.invalidate(&applications_key());
        self.cache.invalidate(&providers_key());
        self.invalidate_profile_lookups(&application.user_id);

        info!(
            application_id = %application.id,
            provider_id = %profile.id,
            %provider_type,
            "application approved"
        );
        Ok(profile)
    }

    /// Reject an application, recording `notes` verbatim and the review time.
    pub async fn reject(
        &self,
        application: &VendorApplication,
        notes: &str,
    ) -> Result<VendorApplication, ProviderWorkflowError> {
        let _pending = self.cache.begin_mutation(REJECT_APPLICATION);
        ensure_provider_application(application)?;
        if !application.status.can_reject() {
            return Err(rejection_refused(&application.id, application.status));
        }

        let repository = self.repository();
        let updated = repository
            .mark_application(
                &application.id,
                ApplicationStatus::Rejected,
                Some(notes),
                Utc::now(),
                &ApplicationStatus::REJECTABLE,
            )
            .await
            .inspect_err(|err| {
                warn!(application_id = %application.id, error = %err, "application rejection failed");
            })?;

        // The stored row may have moved on since the caller read it.
        let updated = match updated {
            Some(updated) => updated,
            None => {
                return Err(match repository.application(&application.id).await? {
                    Some(current) => {
                        warn!(
                            application_id = %application.id,
                            status = %current.status,
                            "rejection skipped; stored application is no longer reviewable"
                        );
                        rejection_refused(&application.id, current.status)
                    }
                    None => ProviderWorkflowError::ApplicationNotFound(application.id.clone()),
                })
            }
        };

        self.cache.invalidate(&applications_key());
        self.invalidate_profile_lookups(&application.user_id);

        info!(application_id = %application.id, "application rejected");
        Ok(updated)
    }

    /// Load the current application row and approve it.
    pub async fn approve_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<ProviderProfile, ProviderWorkflowError> {
        let application = self.application(id).await?;
        self.approve(&application).await
    }

    /// Load the current application row and reject it.
    pub async fn reject_by_id(
        &self,
        id: &ApplicationId,
        notes: &str,
    ) -> Result<VendorApplication, ProviderWorkflowError> {
        let application = self.application(id).await?;
        self.reject(&application, notes).await
    }

    /// Uncached read of a single application.
    pub async fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<VendorApplication, ProviderWorkflowError> {
        self.repository()
            .application(id)
            .await?
            .ok_or_else(|| ProviderWorkflowError::ApplicationNotFound(id.clone()))
    }

    /// Mark a live profile as verified and active.
    pub async fn approve_provider(
        &self,
        id: &ProviderId,
    ) -> Result<ProviderProfile, ProviderWorkflowError> {
        let _pending = self.cache.begin_mutation(APPROVE_PROVIDER);
        let profile = self
            .repository()
            .mark_provider(id, VerificationStatus::Approved, true, None)
            .await?
            .ok_or_else(|| ProviderWorkflowError::ProviderNotFound(id.clone()))?;

        self.invalidate_provider(&profile);
        info!(provider_id = %id, "provider approved");
        Ok(profile)
    }

    /// Mark a live profile as rejected and inactive, keeping the reviewer's notes.
    pub async fn reject_provider(
        &self,
        id: &ProviderId,
        notes: &str,
    ) -> Result<ProviderProfile, ProviderWorkflowError> {
        let _pending = self.cache.begin_mutation(REJECT_PROVIDER);
        let profile = self
            .repository()
            .mark_provider(id, VerificationStatus::Rejected, false, Some(notes))
            .await?
            .ok_or_else(|| ProviderWorkflowError::ProviderNotFound(id.clone()))?;

        self.invalidate_provider(&profile);
        info!(provider_id = %id, "provider rejected");
        Ok(profile)
    }

    fn invalidate_provider(&self, profile: &ProviderProfile) {
        self.cache.invalidate(&providers_key());
        self.invalidate_profile_lookups(&profile.user_id);
    }

    /// Lookups are keyed by raw classification while profiles are keyed by the coerced
    /// provider type, so every lookup for the user is dropped.
    fn invalidate_profile_lookups(&self, user_id: &str) {
        self.cache
            .invalidate(&QueryKey::new([PROFILE_LOOKUP_KEY, user_id]));
    }

    /// Pending and rejected applications, newest first.
    pub async fn review_queue(
        &self,
    ) -> Result<Arc<Vec<VendorApplication>>, ProviderWorkflowError> {
        self.cache
            .fetch(applications_key(), move || async move {
                Ok::<_, ProviderWorkflowError>(self.repository().review_queue().await?)
            })
            .await
    }

    /// Applications still awaiting a first decision.
    pub async fn pending_applications(
        &self,
    ) -> Result<Vec<VendorApplication>, ProviderWorkflowError> {
        let queue = self.review_queue().await?;
        Ok(pending_only(&queue))
    }

    pub async fn providers(&self) -> Result<Arc<Vec<ProviderProfile>>, ProviderWorkflowError> {
        self.cache
            .fetch(providers_key(), move || async move {
                Ok::<_, ProviderWorkflowError>(self.repository().providers().await?)
            })
            .await
    }

    /// Providers with their owners' display names.
    pub async fn provider_listing(&self) -> Result<Vec<ProviderListing>, ProviderWorkflowError> {
        let providers = self.providers().await?;
        let owners = self.owner_directory().await;
        Ok(ProviderListing::build(&providers, &owners))
    }

    /// Dashboard counters, recomputed from the cached lists on every call.
    pub async fn provider_stats(&self) -> Result<ProviderStats, ProviderWorkflowError> {
        let queue = self.review_queue().await?;
        let providers = self.providers().await?;
        Ok(ProviderStats::from_profiles(&providers, queue.len()))
    }

    /// Profile created for `user_id` from an application with this classification.
    pub async fn provider_profile(
        &self,
        user_id: &str,
        classification: &str,
    ) -> Result<Option<ProviderProfile>, ProviderWorkflowError> {
        let provider_type = ProviderType::from_classification(classification);
        let profile = self
            .cache
            .fetch(
                profile_lookup_key(user_id, classification),
                move || async move {
                    let profile = self.repository().profile_for(user_id, provider_type).await?;
                    Ok::<_, ProviderWorkflowError>(profile)
                },
            )
            .await?;
        Ok((*profile).clone())
    }

    /// Owner names; a failed load yields an empty directory and is retried next time.
    pub async fn owner_directory(&self) -> Arc<OwnerDirectory> {
        let key = QueryKey::new([OWNER_DIRECTORY_KEY]);
        let loaded = self
            .cache
            .fetch(key, move || async move {
                let profiles = load_profiles(self.gateway.as_ref()).await?;
                Ok::<_, ProviderWorkflowError>(OwnerDirectory::from_profiles(&profiles))
            })
            .await;

        match loaded {
            Ok(directory) => directory,
            Err(err) => {
                warn!(error = %err, "owner directory unavailable");
                Arc::new(OwnerDirectory::default())
            }
        }
    }
}

fn ensure_provider_application(
    application: &VendorApplication,
) -> Result<(), ProviderWorkflowError> {
    if application.is_product_seller() {
        return Err(ProviderWorkflowError::ProductSeller(application.id.clone()));
    }
    Ok(())
}

fn rejection_refused(id: &ApplicationId, status: ApplicationStatus) -> ProviderWorkflowError {
    ProviderWorkflowError::InvalidTransition {
        id: id.clone(),
        status,
        action: "rejected",
    }
}

/// Error raised by the provider approval service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderWorkflowError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("provider profile {0} not found")]
    ProviderNotFound(ProviderId),
    #[error("application {0} is a product seller application and is not reviewed here")]
    ProductSeller(ApplicationId),
    #[error("application {id} is {status} and cannot be {action}")]
    InvalidTransition {
        id: ApplicationId,
        status: ApplicationStatus,
        action: &'static str,
    },
}
