// Feed domain models - tweets, moderation config and the audit log.
//
// Pure data: the rules that move a tweet between states live in
// feed_service.rs.

use crate::core::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason recorded when a tweet collects enough flags.
pub const AUTO_REMOVAL_REASON: &str = "auto-removed: flag threshold exceeded";

pub const DEFAULT_FLAG_THRESHOLD: u32 = 3;

/// Who removed a tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalSource {
    /// A moderator (or the owner) removed it by hand.
    Moderator(Identity),
    /// The flag count reached the configured threshold.
    FlagThreshold,
}

/// Where a tweet sits in the moderation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetStatus {
    Active,
    Flagged(u32),
    Removed,
}

/// A post in an author's append-only sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub author: Identity,
    /// Position in the author's sequence. Never reused or compacted.
    pub index: u64,
    pub content: String,
    pub flag_count: u32,
    /// Once true, stays true.
    pub removed: bool,
    /// Empty until removal, immutable afterwards.
    pub removal_reason: String,
    pub created_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<RemovalSource>,
}

impl Tweet {
    pub fn new(author: Identity, index: u64, content: String, created_at: DateTime<Utc>) -> Self {
        Self {
            author,
            index,
            content,
            flag_count: 0,
            removed: false,
            removal_reason: String::new(),
            created_at,
            removed_at: None,
            removed_by: None,
        }
    }

    pub fn status(&self) -> TweetStatus {
        if self.removed {
            TweetStatus::Removed
        } else if self.flag_count > 0 {
            TweetStatus::Flagged(self.flag_count)
        } else {
            TweetStatus::Active
        }
    }

    /// Flip the tweet into its terminal state.
    ///
    /// Callers check `removed` first; a removed tweet keeps its original
    /// reason and source.
    pub(crate) fn mark_removed(&mut self, reason: String, source: RemovalSource, at: DateTime<Utc>) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.removal_reason = reason;
        self.removed_by = Some(source);
        self.removed_at = Some(at);
    }
}

/// Configuration fixed when the feed is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// The identity allowed to add moderators. Implicitly a moderator itself.
    pub owner: Identity,
    /// Flag count at which a tweet is removed automatically. Must be >= 1.
    pub flag_threshold: u32,
    /// Whether authors may flag their own tweets.
    pub allow_self_flag: bool,
}

impl FeedConfig {
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
            allow_self_flag: true,
        }
    }
}

/// What a successful flag did to the tweet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagOutcome {
    pub flag_count: u32,
    /// True when this flag pushed the tweet over the threshold.
    pub auto_removed: bool,
}

/// One accepted state transition, as written to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub at: DateTime<Utc>,
    pub kind: FeedEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEventKind {
    TweetCreated {
        author: Identity,
        index: u64,
    },
    TweetFlagged {
        author: Identity,
        index: u64,
        flagger: Identity,
        flag_count: u32,
    },
    TweetRemoved {
        author: Identity,
        index: u64,
        reason: String,
        source: RemovalSource,
    },
    ModeratorAdded {
        identity: Identity,
        added_by: Identity,
    },
}

impl FeedEvent {
    pub fn new(at: DateTime<Utc>, kind: FeedEventKind) -> Self {
        Self { at, kind }
    }
}
