use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::documents::DocumentBag;

/// Classification reserved for product sellers, handled outside the provider workflow.
pub const PRODUCTS_CLASSIFICATION: &str = "products";

/// Identifier wrapper for vendor applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for live provider profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a vendor application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Statuses a rejection may be recorded over: pending, and rejected again for note revisions.
    pub const REJECTABLE: [ApplicationStatus; 2] =
        [ApplicationStatus::Pending, ApplicationStatus::Rejected];

    pub const fn can_reject(self) -> bool {
        matches!(self, ApplicationStatus::Pending | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kinds of live provider the marketplace recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Vendor,
    Driver,
    PropertyOwner,
    ServiceProvider,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Vendor,
        ProviderType::Driver,
        ProviderType::PropertyOwner,
        ProviderType::ServiceProvider,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ProviderType::Vendor => "vendor",
            ProviderType::Driver => "driver",
            ProviderType::PropertyOwner => "property_owner",
            ProviderType::ServiceProvider => "service_provider",
        }
    }

    /// Exact match on the label; `None` for anything outside the enumeration.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == value)
    }

    /// Map an applicant-declared classification onto a provider type, falling back to
    /// [`ProviderType::ServiceProvider`] for unrecognised tags.
    pub fn from_classification(classification: &str) -> Self {
        Self::parse(classification).unwrap_or(ProviderType::ServiceProvider)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Approval marker on a live provider profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Approved,
    Pending,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Approved => "approved",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Signup request submitted by a would-be provider (`vendor_applications`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorApplication {
    pub id: ApplicationId,
    pub user_id: String,
    pub service_type: String,
    pub business_name: String,
    #[serde(default)]
    pub business_description: Option<String>,
    #[serde(default)]
    pub business_phone: Option<String>,
    #[serde(default)]
    pub business_email: Option<String>,
    #[serde(default)]
    pub business_address: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub documents: Option<DocumentBag>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl VendorApplication {
    pub fn provider_type(&self) -> ProviderType {
        ProviderType::from_classification(&self.service_type)
    }

    pub fn is_product_seller(&self) -> bool {
        self.service_type == PRODUCTS_CLASSIFICATION
    }
}

/// Live, approved provider record (`service_provider_profiles`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: ProviderId,
    pub user_id: String,
    pub provider_type: ProviderType,
    pub business_name: String,
    #[serde(default)]
    pub business_description: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    #[serde(default)]
    pub documents: DocumentBag,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Upsert payload derived from an application; identity is `(user_id, provider_type)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderProfileDraft {
    pub user_id: String,
    pub provider_type: ProviderType,
    pub business_name: String,
    pub business_description: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub location_address: Option<String>,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    pub documents: DocumentBag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_outside_enumeration_falls_back_to_service_provider() {
        assert_eq!(ProviderType::from_classification("driver"), ProviderType::Driver);
        assert_eq!(
            ProviderType::from_classification("property_owner"),
            ProviderType::PropertyOwner
        );
        assert_eq!(
            ProviderType::from_classification("bakery"),
            ProviderType::ServiceProvider
        );
        assert_eq!(
            ProviderType::from_classification("Driver"),
            ProviderType::ServiceProvider
        );
    }

    #[test]
    fn rejection_is_refused_once_approved() {
        assert!(ApplicationStatus::Pending.can_reject());
        assert!(ApplicationStatus::Rejected.can_reject());
        assert!(!ApplicationStatus::Approved.can_reject());
    }

    #[test]
    fn statuses_serialize_as_snake_case_labels() {
        assert_eq!(
            serde_json::to_value(ProviderType::PropertyOwner).expect("serializes"),
            serde_json::json!("property_owner")
        );
        assert_eq!(
            serde_json::to_value(ApplicationStatus::Rejected).expect("serializes"),
            serde_json::json!(ApplicationStatus::Rejected.label())
        );
    }
}
