//! Service-provider onboarding: vendor application review and live provider administration.
//!
//! Approving an application writes the provider profile first and only then flips the
//! application to `approved`; both steps are plain gateway calls without a surrounding
//! transaction, so a failed status update is repaired by approving again.

pub mod documents;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use documents::{merge_profile_documents, DocumentBag, CLASSIFICATION_KEY};
pub use domain::{
    ApplicationId, ApplicationStatus, ProviderId, ProviderProfile, ProviderProfileDraft,
    ProviderType, VendorApplication, VerificationStatus, PRODUCTS_CLASSIFICATION,
};
pub use repository::{ProviderRepository, APPLICATIONS_TABLE, PROFILES_TABLE};
pub use router::{provider_router, RejectionRequest};
pub use service::{
    applications_key, draft_from_application, profile_lookup_key, providers_key,
    ProviderApprovalService, ProviderWorkflowError,
};
pub use views::{pending_only, OwnerDirectory, ProviderListing, ProviderStats};
