// Profile registry - the leaf component that owns identity -> profile records.
//
// The feed only ever reads from here (through `is_registered`). A profile is
// created by the first `set_profile` call and overwritten by later ones; it is
// never deleted.

use crate::core::identity::Identity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Display name and biography for one identity.
///
/// The zero-value (`Profile::default()`) stands for "no profile": an empty
/// `display_name` means the identity is not registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub bio: String,
    /// When the profile was last written. `None` on the zero-value.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_registered(&self) -> bool {
        !self.display_name.is_empty()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting profiles.
///
/// `save_profile` must be a single atomic upsert: there is never more than
/// one record per identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get the stored profile for an identity, if any.
    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError>;

    /// Create or replace the profile for an identity.
    async fn save_profile(&self, identity: &Identity, profile: &Profile)
        -> Result<(), ProfileError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ProfileRegistry<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create or overwrite the caller's profile.
    ///
    /// The display name must contain something other than whitespace; the
    /// bio may be empty.
    pub async fn set_profile(
        &self,
        caller: &Identity,
        display_name: &str,
        bio: &str,
    ) -> Result<Profile, ProfileError> {
        if caller.is_blank() {
            tracing::warn!("Rejected profile for an empty identity");
            return Err(ProfileError::InvalidArgument(
                "Identity cannot be empty".to_string(),
            ));
        }

        if display_name.trim().is_empty() {
            tracing::warn!(caller = %caller, "Rejected profile with empty display name");
            return Err(ProfileError::InvalidArgument(
                "Display name cannot be empty".to_string(),
            ));
        }

        let profile = Profile {
            display_name: display_name.to_string(),
            bio: bio.to_string(),
            updated_at: Some(Utc::now()),
        };
        self.store.save_profile(caller, &profile).await?;

        tracing::info!(caller = %caller, display_name, "Profile saved");
        Ok(profile)
    }

    /// Look up a profile. Unknown identities get the zero-value profile.
    pub async fn get_profile(&self, identity: &Identity) -> Result<Profile, ProfileError> {
        Ok(self
            .store
            .get_profile(identity)
            .await?
            .unwrap_or_default())
    }

    pub async fn is_registered(&self, identity: &Identity) -> Result<bool, ProfileError> {
        Ok(self.get_profile(identity).await?.is_registered())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::profiles::InMemoryProfileStore;

    fn registry() -> ProfileRegistry<InMemoryProfileStore> {
        ProfileRegistry::new(InMemoryProfileStore::new())
    }

    #[tokio::test]
    async fn test_set_and_get_profile() {
        let registry = registry();
        let user1 = Identity::from("user1");

        registry
            .set_profile(&user1, "User1", "Hello, I'm User1!")
            .await
            .unwrap();

        let profile = registry.get_profile(&user1).await.unwrap();
        assert_eq!(profile.display_name, "User1");
        assert_eq!(profile.bio, "Hello, I'm User1!");
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_identity_gets_zero_value() {
        let registry = registry();

        let profile = registry.get_profile(&Identity::from("ghost")).await.unwrap();
        assert_eq!(profile, Profile::default());
        assert!(!registry.is_registered(&Identity::from("ghost")).await.unwrap());
    }

    #[tokio::test]
    async fn test_registration_is_permanent() {
        let registry = registry();
        let user = Identity::from("user");

        assert!(!registry.is_registered(&user).await.unwrap());
        registry.set_profile(&user, "User", "").await.unwrap();
        assert!(registry.is_registered(&user).await.unwrap());

        // A rejected update must not unregister anyone
        assert!(registry.set_profile(&user, "", "bio").await.is_err());
        assert!(registry.is_registered(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_profile_overwrites() {
        let registry = registry();
        let user = Identity::from("user");

        registry.set_profile(&user, "Old", "old bio").await.unwrap();
        registry.set_profile(&user, "New", "").await.unwrap();

        let profile = registry.get_profile(&user).await.unwrap();
        assert_eq!(profile.display_name, "New");
        assert_eq!(profile.bio, "");
    }

    #[tokio::test]
    async fn test_empty_identity_cannot_register() {
        let registry = registry();
        let ghost = Identity::from("");

        let err = registry.set_profile(&ghost, "Ghost", "").await.unwrap_err();
        assert!(matches!(err, ProfileError::InvalidArgument(_)));
        assert!(!registry.is_registered(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_display_name_rejected() {
        let registry = registry();
        let user = Identity::from("user");

        for name in ["", "   "] {
            let err = registry.set_profile(&user, name, "bio").await.unwrap_err();
            assert!(matches!(err, ProfileError::InvalidArgument(_)));
        }
        assert!(!registry.is_registered(&user).await.unwrap());
    }
}
