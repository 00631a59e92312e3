//! Profile service
//!
//! Reads the owner's profile document and updates the dietary preference.
//! The preference is written with merge semantics so other profile fields
//! are left alone.

use crate::config::{DIET_PREFERENCE_FIELD, PROFILE_COLLECTION};
use crate::database::{Document, Profile};
use crate::error::{AppError, Result};
use crate::gateway::RemoteCollectionGateway;
use crate::session::OwnerId;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProfileService {
    gateway: Arc<dyn RemoteCollectionGateway>,
}

impl ProfileService {
    pub fn new(gateway: Arc<dyn RemoteCollectionGateway>) -> Self {
        Self { gateway }
    }

    /// Load the profile, creating an empty profile document on first use
    pub async fn load_profile(&self, owner: &OwnerId) -> Result<Profile> {
        let doc = self
            .gateway
            .get(owner, PROFILE_COLLECTION, owner.as_str())
            .await?;

        match doc {
            Some(doc) => Profile::from_document(&doc).map_err(|e| {
                tracing::warn!("Profile for {} could not be parsed: {}", owner, e);
                AppError::NotFound(owner.to_string())
            }),
            None => {
                tracing::info!("Profile for {} does not exist; creating it", owner);
                self.gateway
                    .set(owner, PROFILE_COLLECTION, owner.as_str(), Document::new())
                    .await?;
                Ok(Profile::default())
            }
        }
    }

    pub async fn set_diet_preference(&self, owner: &OwnerId, preference: &str) -> Result<Profile> {
        let preference = preference.trim();
        if preference.is_empty() {
            return Err(AppError::validation(
                DIET_PREFERENCE_FIELD,
                "Preference cannot be empty",
            ));
        }

        let mut fields = Document::new();
        fields.insert(DIET_PREFERENCE_FIELD.to_string(), Value::from(preference));

        self.gateway
            .set_merge(owner, PROFILE_COLLECTION, owner.as_str(), fields)
            .await?;

        tracing::info!("Dietary preference updated for {}", owner);

        Ok(Profile {
            diet: Some(preference.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayCall, MemoryGateway};
    use serde_json::json;

    fn owner() -> OwnerId {
        OwnerId::new("uid-1").unwrap()
    }

    fn create_test_service() -> (ProfileService, MemoryGateway) {
        let gateway = MemoryGateway::new();
        (ProfileService::new(Arc::new(gateway.clone())), gateway)
    }

    #[tokio::test]
    async fn test_missing_profile_is_created() {
        let (service, gateway) = create_test_service();

        let profile = service.load_profile(&owner()).await.unwrap();
        assert_eq!(profile, Profile::default());
        assert_eq!(gateway.document_count(&owner(), PROFILE_COLLECTION).await, 1);

        // second load reads the created document without writing again
        service.load_profile(&owner()).await.unwrap();
        let writes = gateway
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, GatewayCall::Set { .. }))
            .count();
        assert_eq!(writes, 1);
    }

    #[tokio::test]
    async fn test_set_preference_merges() {
        let (service, gateway) = create_test_service();
        gateway
            .insert(
                &owner(),
                PROFILE_COLLECTION,
                "uid-1",
                json!({ "email": "cook@example.com" }).as_object().cloned().unwrap(),
            )
            .await;

        let profile = service
            .set_diet_preference(&owner(), "  vegetarian ")
            .await
            .unwrap();
        assert_eq!(profile.diet.as_deref(), Some("vegetarian"));

        let doc = gateway
            .get(&owner(), PROFILE_COLLECTION, "uid-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["diet"], json!("vegetarian"));
        assert_eq!(doc["email"], json!("cook@example.com"));

        assert_eq!(service.load_profile(&owner()).await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_empty_preference_is_rejected_locally() {
        let (service, gateway) = create_test_service();

        let err = service.set_diet_preference(&owner(), "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "diet", .. }));
        assert_eq!(gateway.call_count().await, 0);
    }
}
