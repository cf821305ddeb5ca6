// SQLite-backed profile store.
//
// Tables:
// - profiles: One row per identity, upserted on every set_profile

use crate::core::identity::Identity;
use crate::core::profiles::{Profile, ProfileError, ProfileStore};
use crate::infra::timestamps;
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteProfileStore {
    pool: Pool<Sqlite>,
}

impl SqliteProfileStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                identity TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                updated_at TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>, ProfileError> {
        let row = sqlx::query(
            "SELECT display_name, bio, updated_at FROM profiles WHERE identity = ?",
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ProfileError::StorageError(e.to_string()))?;

        Ok(row.map(|row| Profile {
            display_name: row.get("display_name"),
            bio: row.get("bio"),
            updated_at: timestamps::parse_optional(row.get("updated_at")),
        }))
    }

    async fn save_profile(
        &self,
        identity: &Identity,
        profile: &Profile,
    ) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (identity, display_name, bio, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(identity) DO UPDATE SET
                display_name = excluded.display_name,
                bio = excluded.bio,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(identity.as_str())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(profile.updated_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::StorageError(e.to_string()))?;
        Ok(())
    }
}
