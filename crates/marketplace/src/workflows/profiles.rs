//! Account profiles used to label owners, customers, and providers in admin views.

use serde::{Deserialize, Serialize};

use crate::gateway::{from_rows, DataGateway, GatewayError, Query};

pub const PROFILES_TABLE: &str = "profiles";

/// Label shown when a profile is missing or carries neither a name nor an e-mail.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        non_blank(self.full_name.as_deref())
            .or_else(|| non_blank(self.email.as_deref()))
            .unwrap_or(UNKNOWN_NAME)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Display name for an optional profile lookup result.
pub fn display_name_or_unknown(profile: Option<&UserProfile>) -> String {
    profile
        .map(UserProfile::display_name)
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

/// Every profile, as used by the provider owner directory.
pub async fn load_profiles<G: DataGateway>(gateway: &G) -> Result<Vec<UserProfile>, GatewayError> {
    let rows = gateway.select(PROFILES_TABLE, &Query::all()).await?;
    from_rows(rows)
}

/// Single profile by id; `None` when absent.
pub async fn find_profile<G: DataGateway>(
    gateway: &G,
    user_id: &str,
) -> Result<Option<UserProfile>, GatewayError> {
    let rows = gateway
        .select(PROFILES_TABLE, &Query::all().eq("id", user_id).limit(1))
        .await?;
    Ok(from_rows::<UserProfile>(rows)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use serde_json::json;

    fn profile(full_name: Option<&str>, email: Option<&str>) -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            full_name: full_name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn display_name_prefers_full_name_then_email() {
        assert_eq!(profile(Some("Ada"), Some("ada@example.com")).display_name(), "Ada");
        assert_eq!(profile(None, Some("ada@example.com")).display_name(), "ada@example.com");
        assert_eq!(profile(Some(""), None).display_name(), UNKNOWN_NAME);
        assert_eq!(display_name_or_unknown(None), UNKNOWN_NAME);
    }

    #[tokio::test]
    async fn find_profile_returns_none_for_missing_user() {
        let gateway = InMemoryGateway::new();
        let row = json!({ "id": "u1", "full_name": "Ada Lovelace" });
        if let serde_json::Value::Object(map) = row {
            gateway.seed(PROFILES_TABLE, vec![map]);
        }

        let found = find_profile(&gateway, "u1").await.expect("lookup succeeds");
        assert_eq!(found.map(|p| p.display_name().to_string()), Some("Ada Lovelace".to_string()));
        assert!(find_profile(&gateway, "u2").await.expect("lookup succeeds").is_none());
    }
}
