use std::collections::HashMap;

use serde::Serialize;

use crate::workflows::profiles::{UserProfile, UNKNOWN_NAME};

use super::domain::{ApplicationStatus, ProviderProfile, VendorApplication, VerificationStatus};

/// Applications still awaiting a first decision, preserving queue order.
pub fn pending_only(applications: &[VendorApplication]) -> Vec<VendorApplication> {
    applications
        .iter()
        .filter(|application| {
            application.status == ApplicationStatus::Pending && !application.is_product_seller()
        })
        .cloned()
        .collect()
}

/// Headline counters for the provider dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub total_applications: usize,
    pub total_providers: usize,
    pub active_providers: usize,
    pub verified_providers: usize,
    pub pending_providers: usize,
}

impl ProviderStats {
    pub fn from_profiles(profiles: &[ProviderProfile], review_queue_len: usize) -> Self {
        let count = |status: VerificationStatus| {
            profiles
                .iter()
                .filter(|profile| profile.verification_status == status)
                .count()
        };

        Self {
            total_applications: review_queue_len,
            total_providers: profiles.len(),
            active_providers: profiles.iter().filter(|profile| profile.is_active).count(),
            verified_providers: count(VerificationStatus::Approved),
            pending_providers: count(VerificationStatus::Pending),
        }
    }
}

/// Owner display names keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct OwnerDirectory {
    names: HashMap<String, String>,
}

impl OwnerDirectory {
    pub fn from_profiles(profiles: &[UserProfile]) -> Self {
        let names = profiles
            .iter()
            .map(|profile| (profile.id.clone(), profile.display_name().to_string()))
            .collect();
        Self { names }
    }

    pub fn owner_name(&self, user_id: &str) -> &str {
        self.names
            .get(user_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Provider row as listed for administrators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderListing {
    #[serde(flatten)]
    pub profile: ProviderProfile,
    pub owner_name: String,
}

impl ProviderListing {
    pub fn build(profiles: &[ProviderProfile], owners: &OwnerDirectory) -> Vec<Self> {
        profiles
            .iter()
            .map(|profile| ProviderListing {
                owner_name: owners.owner_name(&profile.user_id).to_string(),
                profile: profile.clone(),
            })
            .collect()
    }
}
