// Startup configuration, read from the environment (after `.env` is loaded).
//
// FEED_OWNER            identity allowed to add moderators (required)
// FEED_FLAG_THRESHOLD   flags needed for auto-removal (default 3)
// FEED_ALLOW_SELF_FLAG  whether authors may flag their own tweets (default true)
// FEED_DATABASE_URL     SQLite database; in-memory storage when unset

use crate::core::feed::{FeedConfig, DEFAULT_FLAG_THRESHOLD};
use crate::core::identity::Identity;
use anyhow::{anyhow, bail, Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let owner = get("FEED_OWNER")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow!("Missing FEED_OWNER environment variable! Set it in .env or the shell.")
            })?;

        let flag_threshold = match get("FEED_FLAG_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("FEED_FLAG_THRESHOLD is not a number: {raw:?}"))?,
            None => DEFAULT_FLAG_THRESHOLD,
        };
        if flag_threshold == 0 {
            bail!("FEED_FLAG_THRESHOLD must be at least 1");
        }

        let allow_self_flag = match get("FEED_ALLOW_SELF_FLAG") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .with_context(|| format!("FEED_ALLOW_SELF_FLAG must be true or false: {raw:?}"))?,
            None => true,
        };

        let database_url = get("FEED_DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let mut feed = FeedConfig::new(Identity::new(owner));
        feed.flag_threshold = flag_threshold;
        feed.allow_self_flag = allow_self_flag;

        Ok(Self { feed, database_url })
    }

    /// The sqlx connection string for `database_url`, creating the file on
    /// first use. Bare paths get the `sqlite://` scheme; URLs that already
    /// carry query options are left alone.
    pub fn sqlite_connection_string(&self) -> Option<String> {
        let url = self.database_url.as_deref()?;
        let conn_str = if !url.starts_with("sqlite:") {
            format!("sqlite://{}?mode=rwc", url)
        } else if url.contains('?') || url.contains(":memory:") {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        };
        Some(conn_str)
    }
}
