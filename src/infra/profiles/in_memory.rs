// In-memory ProfileStore backed by a DashMap.
// State lives for the lifetime of the process.

use crate::core::identity::Identity;
use crate::core::profiles::{Profile, ProfileError, ProfileStore};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryProfileStore {
    profiles: DashMap<Identity, Profile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError> {
        Ok(self.profiles.get(identity).map(|entry| entry.clone()))
    }

    async fn save_profile(
        &self,
        identity: &Identity,
        profile: &Profile,
    ) -> Result<(), ProfileError> {
        // insert() replaces any previous record, so there is never a second one
        self.profiles.insert(identity.clone(), profile.clone());
        Ok(())
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let store = InMemoryProfileStore::new();
        let alice = Identity::from("alice");

        assert!(store.get_profile(&alice).await.unwrap().is_none());

        let first = Profile {
            display_name: "Alice".to_string(),
            bio: "one".to_string(),
            updated_at: None,
        };
        store.save_profile(&alice, &first).await.unwrap();

        let second = Profile {
            bio: "two".to_string(),
            ..first.clone()
        };
        store.save_profile(&alice, &second).await.unwrap();

        assert_eq!(store.get_profile(&alice).await.unwrap(), Some(second));
        assert_eq!(store.profiles.len(), 1);
    }
}
