// SQLite-backed feed store.
//
// Tables:
// - tweets: One row per (author, idx), never deleted
// - tweet_flags: Who flagged which tweet (primary key enforces one flag each)
// - moderators: Identities granted removal rights
// - feed_events: Append-only audit log, JSON payloads
//
// Every write runs in a transaction together with its audit events.

use crate::core::feed::{FeedError, FeedEvent, FeedEventKind, FeedStore, RemovalSource, Tweet};
use crate::core::identity::Identity;
use crate::infra::timestamps;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, Transaction};

pub struct SqliteFeedStore {
    pool: Pool<Sqlite>,
}

fn storage_error(e: impl ToString) -> FeedError {
    FeedError::StorageError(e.to_string())
}

impl SqliteFeedStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), FeedError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweets (
                author TEXT NOT NULL,
                idx INTEGER NOT NULL,
                content TEXT NOT NULL,
                flag_count INTEGER NOT NULL DEFAULT 0,
                removed BOOLEAN NOT NULL DEFAULT 0,
                removal_reason TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                removed_at TEXT,
                removed_by TEXT,
                PRIMARY KEY (author, idx)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweet_flags (
                flagger TEXT NOT NULL,
                author TEXT NOT NULL,
                idx INTEGER NOT NULL,
                PRIMARY KEY (flagger, author, idx)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderators (
                identity TEXT PRIMARY KEY,
                added_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn insert_events(
        tx: &mut Transaction<'_, Sqlite>,
        events: &[FeedEvent],
    ) -> Result<(), FeedError> {
        for event in events {
            let payload = serde_json::to_string(&event.kind).map_err(storage_error)?;
            sqlx::query("INSERT INTO feed_events (at, payload) VALUES (?, ?)")
                .bind(event.at.to_rfc3339())
                .bind(payload)
                .execute(&mut **tx)
                .await
                .map_err(storage_error)?;
        }
        Ok(())
    }

    /// Write the moderation fields of an existing tweet.
    async fn write_moderation(
        tx: &mut Transaction<'_, Sqlite>,
        tweet: &Tweet,
    ) -> Result<(), FeedError> {
        let removed_by = tweet
            .removed_by
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(storage_error)?;

        let result = sqlx::query(
            r#"
            UPDATE tweets SET
                flag_count = ?,
                removed = ?,
                removal_reason = ?,
                removed_at = ?,
                removed_by = ?
            WHERE author = ? AND idx = ?
            "#,
        )
        .bind(tweet.flag_count as i64)
        .bind(tweet.removed)
        .bind(&tweet.removal_reason)
        .bind(tweet.removed_at.map(|t| t.to_rfc3339()))
        .bind(removed_by)
        .bind(tweet.author.as_str())
        .bind(tweet.index as i64)
        .execute(&mut **tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() != 1 {
            return Err(FeedError::StorageError(format!(
                "tweet {} by {} is not stored",
                tweet.index, tweet.author
            )));
        }
        Ok(())
    }
}

fn tweet_from_row(row: &SqliteRow) -> Result<Tweet, FeedError> {
    let removed_by: Option<String> = row.get("removed_by");
    let removed_by = removed_by
        .map(|json| serde_json::from_str::<RemovalSource>(&json))
        .transpose()
        .map_err(storage_error)?;

    Ok(Tweet {
        author: Identity::new(row.get::<String, _>("author")),
        index: row.get::<i64, _>("idx") as u64,
        content: row.get("content"),
        flag_count: row.get::<i64, _>("flag_count") as u32,
        removed: row.get("removed"),
        removal_reason: row.get("removal_reason"),
        created_at: timestamps::parse(&row.get::<String, _>("created_at")),
        removed_at: timestamps::parse_optional(row.get("removed_at")),
        removed_by,
    })
}

#[async_trait]
impl FeedStore for SqliteFeedStore {
    async fn tweet_count(&self, author: &Identity) -> Result<u64, FeedError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tweets WHERE author = ?")
            .bind(author.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn get_tweet(&self, author: &Identity, index: u64) -> Result<Option<Tweet>, FeedError> {
        let row = sqlx::query("SELECT * FROM tweets WHERE author = ? AND idx = ?")
            .bind(author.as_str())
            .bind(index as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(tweet_from_row).transpose()
    }

    async fn get_tweets(&self, author: &Identity) -> Result<Vec<Tweet>, FeedError> {
        let rows = sqlx::query("SELECT * FROM tweets WHERE author = ? ORDER BY idx ASC")
            .bind(author.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter().map(tweet_from_row).collect()
    }

    async fn append_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = sqlx::query("SELECT COUNT(*) AS n FROM tweets WHERE author = ?")
            .bind(tweet.author.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
        let count = row.get::<i64, _>("n") as u64;
        if count != tweet.index {
            return Err(FeedError::StorageError(format!(
                "tweet index {} does not follow {} stored tweets by {}",
                tweet.index, count, tweet.author
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO tweets (author, idx, content, flag_count, removed, removal_reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tweet.author.as_str())
        .bind(tweet.index as i64)
        .bind(&tweet.content)
        .bind(tweet.flag_count as i64)
        .bind(tweet.removed)
        .bind(&tweet.removal_reason)
        .bind(tweet.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        Self::insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn update_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        Self::write_moderation(&mut tx, tweet).await?;
        Self::insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn has_flagged(
        &self,
        flagger: &Identity,
        author: &Identity,
        index: u64,
    ) -> Result<bool, FeedError> {
        let row = sqlx::query(
            "SELECT 1 FROM tweet_flags WHERE flagger = ? AND author = ? AND idx = ?",
        )
        .bind(flagger.as_str())
        .bind(author.as_str())
        .bind(index as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.is_some())
    }

    async fn record_flag(
        &self,
        flagger: &Identity,
        tweet: &Tweet,
        events: &[FeedEvent],
    ) -> Result<(), FeedError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("INSERT INTO tweet_flags (flagger, author, idx) VALUES (?, ?, ?)")
            .bind(flagger.as_str())
            .bind(tweet.author.as_str())
            .bind(tweet.index as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        // The tweet update goes last: if the tweet is missing, the flag row
        // and audit rows written above are rolled back with it.
        Self::insert_events(&mut tx, events).await?;
        Self::write_moderation(&mut tx, tweet).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn is_moderator(&self, identity: &Identity) -> Result<bool, FeedError> {
        let row = sqlx::query("SELECT 1 FROM moderators WHERE identity = ?")
            .bind(identity.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.is_some())
    }

    async fn add_moderator(
        &self,
        identity: &Identity,
        events: &[FeedEvent],
    ) -> Result<(), FeedError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("INSERT OR IGNORE INTO moderators (identity, added_at) VALUES (?, ?)")
            .bind(identity.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        Self::insert_events(&mut tx, events).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn list_moderators(&self) -> Result<Vec<Identity>, FeedError> {
        let rows = sqlx::query("SELECT identity FROM moderators ORDER BY identity ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(rows
            .iter()
            .map(|row| Identity::new(row.get::<String, _>("identity")))
            .collect())
    }

    async fn list_events(&self) -> Result<Vec<FeedEvent>, FeedError> {
        let rows = sqlx::query("SELECT at, payload FROM feed_events ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            let kind: FeedEventKind = serde_json::from_str(&payload).map_err(storage_error)?;
            events.push(FeedEvent::new(
                timestamps::parse(&row.get::<String, _>("at")),
                kind,
            ));
        }
        Ok(events)
    }
}
