// Entry point for the moderated feed.
//
// **Architecture Overview:**
// - `core/` = Business logic (profile registry, moderated feed)
// - `infra/` = Implementations of core store traits (in-memory, SQLite)
// - `shell/` = Line-oriented execution environment over stdin
//
// This file's job is to:
// 1. Load configuration
// 2. Pick the storage backend and wire the services together
// 3. Feed stdin lines to the dispatcher, one call at a time

#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "shell/shell_layer.rs"]
mod shell;

mod config;

use crate::config::AppConfig;
use crate::core::feed::{FeedConfig, FeedStore, ModeratedFeed};
use crate::core::profiles::{ProfileRegistry, ProfileStore};
use crate::infra::feed::{InMemoryFeedStore, SqliteFeedStore};
use crate::infra::profiles::{InMemoryProfileStore, SqliteProfileStore};
use crate::shell::{parse_line, Dispatcher};
use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries call results
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    tracing::info!(
        owner = %config.feed.owner,
        flag_threshold = config.feed.flag_threshold,
        allow_self_flag = config.feed.allow_self_flag,
        "Starting moderated feed"
    );

    match config.sqlite_connection_string() {
        Some(conn_str) => {
            tracing::info!(database = %conn_str, "Using SQLite storage");
            ensure_database_dir(&conn_str)?;

            let pool = SqlitePoolOptions::new()
                .connect(&conn_str)
                .await
                .context("Failed to connect to feed database")?;

            let profile_store = SqliteProfileStore::new(pool.clone());
            profile_store
                .migrate()
                .await
                .context("Failed to migrate profile tables")?;
            let feed_store = SqliteFeedStore::new(pool);
            feed_store
                .migrate()
                .await
                .context("Failed to migrate feed tables")?;

            run(profile_store, feed_store, config.feed).await
        }
        None => {
            tracing::info!("Using in-memory storage; state ends with the process");
            run(
                InMemoryProfileStore::new(),
                InMemoryFeedStore::new(),
                config.feed,
            )
            .await
        }
    }
}

/// Make sure the directory holding a file-backed database exists.
fn ensure_database_dir(conn_str: &str) -> anyhow::Result<()> {
    if conn_str.contains(":memory:") {
        return Ok(());
    }
    let path = conn_str
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Wire the services and serve stdin until EOF.
async fn run<P, F>(profile_store: P, feed_store: F, feed_config: FeedConfig) -> anyhow::Result<()>
where
    P: ProfileStore,
    F: FeedStore,
{
    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    let profiles = Arc::new(ProfileRegistry::new(profile_store));
    let feed = Arc::new(ModeratedFeed::new(
        feed_store,
        Arc::clone(&profiles),
        feed_config,
    )?);
    let dispatcher = Dispatcher::new(profiles, feed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let invocation = match parse_line(&line) {
            Ok(Some(invocation)) => invocation,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };

        match dispatcher.dispatch(invocation).await {
            Ok(output) => println!("{}", output),
            Err(e) => println!("error: {}", e),
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
