use serde::Serialize;

use crate::core::api::ApiClient;
use crate::models::user::UserProfile;

/// Fields of the profile-edit dialog; unset fields are left untouched by
/// the backend.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct ProfileClient {
    api: ApiClient,
}

impl ProfileClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn update(&self, update: &ProfileUpdate) -> Result<UserProfile, eyre::Report> {
        let profile: UserProfile = self.api.put("/api/profile", update).await?;
        tracing::info!("Profile updated for {}", profile.username);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unset_fields_are_omitted_from_the_payload() {
        let update = ProfileUpdate {
            username: Some("ada".to_string()),
            ..Default::default()
        };
        let payload = serde_json::to_value(&update).unwrap();
        assert_eq!(payload, serde_json::json!({ "username": "ada" }));
    }

    #[test]
    fn api_key_serializes_under_its_wire_name() {
        let update = ProfileUpdate {
            api_key: Some("sk-123".to_string()),
            ..Default::default()
        };
        let payload = serde_json::to_value(&update).unwrap();
        assert_eq!(payload, serde_json::json!({ "apiKey": "sk-123" }));
    }
}
