// Moderated feed service - publishing, flagging and moderator removal.
//
// This service handles:
// - Publishing (registered profiles only)
// - Flag bookkeeping (one flag per identity per tweet)
// - Auto-removal once a tweet reaches the flag threshold
// - Moderator role management and manual removal
//
// Every mutating call holds `gate` from its first read to its single store
// write, so operations never interleave.

use super::feed_models::{
    FeedConfig, FeedEvent, FeedEventKind, FlagOutcome, RemovalSource, Tweet, AUTO_REMOVAL_REASON,
};
use crate::core::identity::Identity;
use crate::core::profiles::{ProfileError, ProfileRegistry, ProfileStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Already removed: tweet {index} by {author}")]
    AlreadyRemoved { author: Identity, index: u64 },

    #[error("Already flagged: {flagger} already flagged tweet {index} by {author}")]
    AlreadyFlagged {
        flagger: Identity,
        author: Identity,
        index: u64,
    },

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting tweets, flags, moderators and the audit log.
///
/// Each write method is one atomic step: the state change and the events
/// passed alongside it are stored together or not at all.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Number of tweets the author has ever published.
    async fn tweet_count(&self, author: &Identity) -> Result<u64, FeedError>;

    async fn get_tweet(&self, author: &Identity, index: u64) -> Result<Option<Tweet>, FeedError>;

    /// All of an author's tweets in publish order.
    async fn get_tweets(&self, author: &Identity) -> Result<Vec<Tweet>, FeedError>;

    /// Append a tweet. `tweet.index` is always the author's current count.
    async fn append_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError>;

    /// Replace a stored tweet's moderation fields (flags, removal).
    async fn update_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError>;

    async fn has_flagged(
        &self,
        flagger: &Identity,
        author: &Identity,
        index: u64,
    ) -> Result<bool, FeedError>;

    /// Record `flagger`'s flag and store the updated tweet in one step.
    async fn record_flag(
        &self,
        flagger: &Identity,
        tweet: &Tweet,
        events: &[FeedEvent],
    ) -> Result<(), FeedError>;

    async fn is_moderator(&self, identity: &Identity) -> Result<bool, FeedError>;

    async fn add_moderator(&self, identity: &Identity, events: &[FeedEvent])
        -> Result<(), FeedError>;

    /// Explicitly added moderators (the owner is not stored).
    async fn list_moderators(&self) -> Result<Vec<Identity>, FeedError>;

    /// The audit log, oldest first.
    async fn list_events(&self) -> Result<Vec<FeedEvent>, FeedError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModeratedFeed<S: FeedStore, P: ProfileStore> {
    store: S,
    profiles: Arc<ProfileRegistry<P>>,
    config: FeedConfig,
    gate: Mutex<()>,
}

impl<S: FeedStore, P: ProfileStore> ModeratedFeed<S, P> {
    /// Create a feed. The configuration is fixed for the feed's lifetime.
    pub fn new(
        store: S,
        profiles: Arc<ProfileRegistry<P>>,
        config: FeedConfig,
    ) -> Result<Self, FeedError> {
        if config.flag_threshold == 0 {
            return Err(FeedError::InvalidArgument(
                "Flag threshold must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            store,
            profiles,
            config,
            gate: Mutex::new(()),
        })
    }

    pub fn owner(&self) -> &Identity {
        &self.config.owner
    }

    pub fn flag_threshold(&self) -> u32 {
        self.config.flag_threshold
    }

    /// Publish a tweet. Returns its index in the caller's sequence.
    pub async fn create_tweet(&self, caller: &Identity, content: &str) -> Result<u64, FeedError> {
        let _guard = self.gate.lock().await;

        if !self.profiles.is_registered(caller).await? {
            tracing::warn!(caller = %caller, "Unregistered identity tried to tweet");
            return Err(FeedError::Unauthorized("User not registered".to_string()));
        }

        if content.trim().is_empty() {
            return Err(FeedError::InvalidArgument(
                "Tweet content cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let index = self.store.tweet_count(caller).await?;
        let tweet = Tweet::new(caller.clone(), index, content.to_string(), now);
        let event = FeedEvent::new(
            now,
            FeedEventKind::TweetCreated {
                author: caller.clone(),
                index,
            },
        );
        self.store.append_tweet(&tweet, &[event]).await?;

        tracing::info!(author = %caller, index, "Tweet created");
        Ok(index)
    }

    /// Flag a tweet for review.
    ///
    /// The flag that brings the count to the threshold also removes the
    /// tweet, in the same store write.
    pub async fn flag_tweet(
        &self,
        caller: &Identity,
        author: &Identity,
        index: u64,
    ) -> Result<FlagOutcome, FeedError> {
        let _guard = self.gate.lock().await;

        if caller.is_blank() {
            return Err(FeedError::InvalidArgument(
                "Flagger identity cannot be empty".to_string(),
            ));
        }

        let mut tweet = self.load_tweet(author, index).await?;

        if tweet.removed {
            return Err(FeedError::AlreadyRemoved {
                author: author.clone(),
                index,
            });
        }

        if caller == author && !self.config.allow_self_flag {
            tracing::warn!(caller = %caller, index, "Rejected self-flag");
            return Err(FeedError::Unauthorized(
                "Authors cannot flag their own tweets".to_string(),
            ));
        }

        if self.store.has_flagged(caller, author, index).await? {
            tracing::warn!(caller = %caller, author = %author, index, "Duplicate flag rejected");
            return Err(FeedError::AlreadyFlagged {
                flagger: caller.clone(),
                author: author.clone(),
                index,
            });
        }

        let now = Utc::now();
        tweet.flag_count = tweet.flag_count.saturating_add(1);
        let mut events = vec![FeedEvent::new(
            now,
            FeedEventKind::TweetFlagged {
                author: author.clone(),
                index,
                flagger: caller.clone(),
                flag_count: tweet.flag_count,
            },
        )];

        let auto_removed = tweet.flag_count >= self.config.flag_threshold;
        if auto_removed {
            tweet.mark_removed(
                AUTO_REMOVAL_REASON.to_string(),
                RemovalSource::FlagThreshold,
                now,
            );
            events.push(FeedEvent::new(
                now,
                FeedEventKind::TweetRemoved {
                    author: author.clone(),
                    index,
                    reason: AUTO_REMOVAL_REASON.to_string(),
                    source: RemovalSource::FlagThreshold,
                },
            ));
        }

        self.store.record_flag(caller, &tweet, &events).await?;

        tracing::info!(
            flagger = %caller,
            author = %author,
            index,
            flag_count = tweet.flag_count,
            "Tweet flagged"
        );
        if auto_removed {
            tracing::info!(author = %author, index, "Tweet auto-removed at flag threshold");
        }

        Ok(FlagOutcome {
            flag_count: tweet.flag_count,
            auto_removed,
        })
    }

    /// Grant moderation rights. Owner only; adding an existing moderator is
    /// a no-op. Returns whether the identity was newly added.
    pub async fn add_moderator(
        &self,
        caller: &Identity,
        identity: &Identity,
    ) -> Result<bool, FeedError> {
        let _guard = self.gate.lock().await;

        if caller != &self.config.owner {
            tracing::warn!(caller = %caller, "Non-owner tried to add a moderator");
            return Err(FeedError::Unauthorized(
                "Only the owner can add moderators".to_string(),
            ));
        }

        if identity.is_blank() {
            return Err(FeedError::InvalidArgument(
                "Moderator identity cannot be empty".to_string(),
            ));
        }

        if self.check_moderator(identity).await? {
            return Ok(false);
        }

        let event = FeedEvent::new(
            Utc::now(),
            FeedEventKind::ModeratorAdded {
                identity: identity.clone(),
                added_by: caller.clone(),
            },
        );
        self.store.add_moderator(identity, &[event]).await?;

        tracing::info!(moderator = %identity, "Moderator added");
        Ok(true)
    }

    /// Remove a tweet by hand, regardless of its flag count.
    pub async fn remove_tweet(
        &self,
        caller: &Identity,
        author: &Identity,
        index: u64,
        reason: &str,
    ) -> Result<(), FeedError> {
        let _guard = self.gate.lock().await;

        if !self.check_moderator(caller).await? {
            tracing::warn!(caller = %caller, "Non-moderator tried to remove a tweet");
            return Err(FeedError::Unauthorized(
                "Only moderators can remove tweets".to_string(),
            ));
        }

        let mut tweet = self.load_tweet(author, index).await?;
        if tweet.removed {
            return Err(FeedError::AlreadyRemoved {
                author: author.clone(),
                index,
            });
        }

        let now = Utc::now();
        let source = RemovalSource::Moderator(caller.clone());
        tweet.mark_removed(reason.to_string(), source.clone(), now);
        let event = FeedEvent::new(
            now,
            FeedEventKind::TweetRemoved {
                author: author.clone(),
                index,
                reason: reason.to_string(),
                source,
            },
        );
        self.store.update_tweet(&tweet, &[event]).await?;

        tracing::info!(moderator = %caller, author = %author, index, reason, "Tweet removed");
        Ok(())
    }

    pub async fn get_tweet(&self, author: &Identity, index: u64) -> Result<Tweet, FeedError> {
        self.load_tweet(author, index).await
    }

    /// Every tweet the author published, removed ones included.
    pub async fn get_tweets(&self, author: &Identity) -> Result<Vec<Tweet>, FeedError> {
        self.store.get_tweets(author).await
    }

    /// The author's tweets that have not been removed.
    pub async fn active_tweets(&self, author: &Identity) -> Result<Vec<Tweet>, FeedError> {
        Ok(self
            .store
            .get_tweets(author)
            .await?
            .into_iter()
            .filter(|t| !t.removed)
            .collect())
    }

    pub async fn has_flagged(
        &self,
        identity: &Identity,
        author: &Identity,
        index: u64,
    ) -> Result<bool, FeedError> {
        self.store.has_flagged(identity, author, index).await
    }

    pub async fn is_moderator(&self, identity: &Identity) -> Result<bool, FeedError> {
        self.check_moderator(identity).await
    }

    /// The owner followed by every added moderator.
    pub async fn moderators(&self) -> Result<Vec<Identity>, FeedError> {
        let mut moderators = vec![self.config.owner.clone()];
        moderators.extend(
            self.store
                .list_moderators()
                .await?
                .into_iter()
                .filter(|m| m != &self.config.owner),
        );
        Ok(moderators)
    }

    pub async fn events(&self) -> Result<Vec<FeedEvent>, FeedError> {
        self.store.list_events().await
    }

    async fn check_moderator(&self, identity: &Identity) -> Result<bool, FeedError> {
        if identity == &self.config.owner {
            return Ok(true);
        }
        self.store.is_moderator(identity).await
    }

    async fn load_tweet(&self, author: &Identity, index: u64) -> Result<Tweet, FeedError> {
        self.store
            .get_tweet(author, index)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("tweet {} by {}", index, author)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::TweetStatus;
    use crate::infra::feed::InMemoryFeedStore;
    use crate::infra::profiles::InMemoryProfileStore;

    type TestFeed = ModeratedFeed<InMemoryFeedStore, InMemoryProfileStore>;

    fn id(name: &str) -> Identity {
        Identity::from(name)
    }

    fn setup(config: FeedConfig) -> (Arc<ProfileRegistry<InMemoryProfileStore>>, TestFeed) {
        let profiles = Arc::new(ProfileRegistry::new(InMemoryProfileStore::new()));
        let feed = ModeratedFeed::new(InMemoryFeedStore::new(), Arc::clone(&profiles), config)
            .unwrap();
        (profiles, feed)
    }

    fn default_setup() -> (Arc<ProfileRegistry<InMemoryProfileStore>>, TestFeed) {
        setup(FeedConfig::new(id("owner")))
    }

    #[tokio::test]
    async fn test_zero_threshold_rejected() {
        let profiles = Arc::new(ProfileRegistry::new(InMemoryProfileStore::new()));
        let config = FeedConfig {
            flag_threshold: 0,
            ..FeedConfig::new(id("owner"))
        };

        let result = ModeratedFeed::new(InMemoryFeedStore::new(), profiles, config);
        assert!(matches!(result, Err(FeedError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_unregistered_user_cannot_tweet() {
        let (_, feed) = default_setup();

        let err = feed
            .create_tweet(&id("user1"), "This is my first tweet!")
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Unauthorized(ref msg) if msg == "User not registered"));
        assert!(feed.get_tweets(&id("user1")).await.unwrap().is_empty());
        assert!(feed.events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registered_user_can_tweet() {
        let (profiles, feed) = default_setup();
        profiles
            .set_profile(&id("user1"), "User1", "Hello, I'm User1!")
            .await
            .unwrap();

        let index = feed
            .create_tweet(&id("user1"), "This is my first tweet!")
            .await
            .unwrap();
        assert_eq!(index, 0);

        let tweets = feed.get_tweets(&id("user1")).await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].content, "This is my first tweet!");
        assert_eq!(tweets[0].flag_count, 0);
        assert!(!tweets[0].removed);
        assert_eq!(tweets[0].status(), TweetStatus::Active);
    }

    #[tokio::test]
    async fn test_indexes_follow_publish_order() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();

        for i in 0..3 {
            let index = feed.create_tweet(&id("a"), &format!("post {}", i)).await.unwrap();
            assert_eq!(index, i);
        }

        let tweet = feed.get_tweet(&id("a"), 2).await.unwrap();
        assert_eq!(tweet.content, "post 2");
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();

        let err = feed.create_tweet(&id("a"), "  ").await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidArgument(_)));
        assert!(feed.get_tweets(&id("a")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_tweet_out_of_range() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "only one").await.unwrap();

        assert!(matches!(
            feed.get_tweet(&id("a"), 1).await,
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            feed.get_tweet(&id("nobody"), 0).await,
            Err(FeedError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_flag_increments_count() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("user1"), "User1", "").await.unwrap();
        profiles.set_profile(&id("user2"), "User2", "").await.unwrap();
        feed.create_tweet(&id("user1"), "This is a test tweet.").await.unwrap();

        let outcome = feed.flag_tweet(&id("user2"), &id("user1"), 0).await.unwrap();
        assert_eq!(outcome.flag_count, 1);
        assert!(!outcome.auto_removed);

        let tweet = feed.get_tweet(&id("user1"), 0).await.unwrap();
        assert_eq!(tweet.flag_count, 1);
        assert_eq!(tweet.status(), TweetStatus::Flagged(1));
        assert!(feed.has_flagged(&id("user2"), &id("user1"), 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_flag_rejected() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "hello").await.unwrap();

        feed.flag_tweet(&id("b"), &id("a"), 0).await.unwrap();
        let err = feed.flag_tweet(&id("b"), &id("a"), 0).await.unwrap_err();

        assert!(matches!(err, FeedError::AlreadyFlagged { .. }));
        assert_eq!(feed.get_tweet(&id("a"), 0).await.unwrap().flag_count, 1);
    }

    #[tokio::test]
    async fn test_flag_missing_tweet() {
        let (_, feed) = default_setup();

        let err = feed.flag_tweet(&id("b"), &id("a"), 0).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_threshold_auto_removes_on_crossing_call() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "This tweet will be flagged.").await.unwrap();

        let first = feed.flag_tweet(&id("f1"), &id("a"), 0).await.unwrap();
        let second = feed.flag_tweet(&id("f2"), &id("a"), 0).await.unwrap();
        assert!(!first.auto_removed && !second.auto_removed);
        assert!(!feed.get_tweet(&id("a"), 0).await.unwrap().removed);

        let third = feed.flag_tweet(&id("f3"), &id("a"), 0).await.unwrap();
        assert_eq!(third.flag_count, 3);
        assert!(third.auto_removed);

        let tweet = feed.get_tweet(&id("a"), 0).await.unwrap();
        assert!(tweet.removed);
        assert_eq!(tweet.removal_reason, AUTO_REMOVAL_REASON);
        assert_eq!(tweet.removed_by, Some(RemovalSource::FlagThreshold));
        assert!(feed.active_tweets(&id("a")).await.unwrap().is_empty());
        assert_eq!(feed.get_tweets(&id("a")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_removed_tweet_is_terminal() {
        let config = FeedConfig {
            flag_threshold: 1,
            ..FeedConfig::new(id("owner"))
        };
        let (profiles, feed) = setup(config);
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "bad").await.unwrap();

        assert!(feed.flag_tweet(&id("f1"), &id("a"), 0).await.unwrap().auto_removed);

        let flag_err = feed.flag_tweet(&id("f2"), &id("a"), 0).await.unwrap_err();
        assert!(matches!(flag_err, FeedError::AlreadyRemoved { .. }));

        let remove_err = feed
            .remove_tweet(&id("owner"), &id("a"), 0, "late")
            .await
            .unwrap_err();
        assert!(matches!(remove_err, FeedError::AlreadyRemoved { .. }));

        let tweet = feed.get_tweet(&id("a"), 0).await.unwrap();
        assert_eq!(tweet.flag_count, 1);
        assert_eq!(tweet.removal_reason, AUTO_REMOVAL_REASON);
    }

    #[tokio::test]
    async fn test_self_flag_policy() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "mine").await.unwrap();
        assert!(feed.flag_tweet(&id("a"), &id("a"), 0).await.is_ok());

        let strict = FeedConfig {
            allow_self_flag: false,
            ..FeedConfig::new(id("owner"))
        };
        let (profiles, feed) = setup(strict);
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "mine").await.unwrap();

        let err = feed.flag_tweet(&id("a"), &id("a"), 0).await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
        assert_eq!(feed.get_tweet(&id("a"), 0).await.unwrap().flag_count, 0);
    }

    #[tokio::test]
    async fn test_moderator_removes_tweet() {
        let (profiles, feed) = default_setup();
        feed.add_moderator(&id("owner"), &id("moderator")).await.unwrap();
        profiles.set_profile(&id("user1"), "User1", "").await.unwrap();
        feed.create_tweet(&id("user1"), "This is a test tweet.").await.unwrap();

        feed.remove_tweet(&id("moderator"), &id("user1"), 0, "Inappropriate content")
            .await
            .unwrap();

        let tweet = feed.get_tweet(&id("user1"), 0).await.unwrap();
        assert!(tweet.removed);
        assert_eq!(tweet.removal_reason, "Inappropriate content");
        assert_eq!(tweet.flag_count, 0);
        assert_eq!(
            tweet.removed_by,
            Some(RemovalSource::Moderator(id("moderator")))
        );
    }

    #[tokio::test]
    async fn test_non_moderator_cannot_remove() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "hello").await.unwrap();

        let err = feed
            .remove_tweet(&id("rando"), &id("a"), 0, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
        assert!(!feed.get_tweet(&id("a"), 0).await.unwrap().removed);
    }

    #[tokio::test]
    async fn test_owner_can_remove_and_reason_may_be_empty() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "hello").await.unwrap();

        feed.remove_tweet(&id("owner"), &id("a"), 0, "").await.unwrap();

        let tweet = feed.get_tweet(&id("a"), 0).await.unwrap();
        assert!(tweet.removed);
        assert_eq!(tweet.removal_reason, "");
    }

    #[tokio::test]
    async fn test_only_owner_adds_moderators() {
        let (_, feed) = default_setup();
        feed.add_moderator(&id("owner"), &id("m")).await.unwrap();

        // Moderators cannot grant the role onwards
        let err = feed.add_moderator(&id("m"), &id("x")).await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
        assert!(!feed.is_moderator(&id("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_identity_gets_no_role_or_tweets() {
        let (profiles, feed) = default_setup();
        let ghost = id("");

        assert!(profiles.set_profile(&ghost, "Ghost", "").await.is_err());
        let err = feed.create_tweet(&ghost, "hi").await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));

        let err = feed.add_moderator(&id("owner"), &ghost).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidArgument(_)));
        assert!(!feed.is_moderator(&ghost).await.unwrap());

        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "hello").await.unwrap();
        let err = feed.flag_tweet(&ghost, &id("a"), 0).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidArgument(_)));
        assert_eq!(feed.get_tweet(&id("a"), 0).await.unwrap().flag_count, 0);
        assert_eq!(feed.events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_moderator_is_idempotent() {
        let (_, feed) = default_setup();

        assert!(feed.add_moderator(&id("owner"), &id("m")).await.unwrap());
        assert!(!feed.add_moderator(&id("owner"), &id("m")).await.unwrap());

        assert_eq!(feed.moderators().await.unwrap(), vec![id("owner"), id("m")]);
        assert_eq!(feed.events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_events_record_accepted_transitions_only() {
        let config = FeedConfig {
            flag_threshold: 1,
            ..FeedConfig::new(id("owner"))
        };
        let (profiles, feed) = setup(config);
        profiles.set_profile(&id("a"), "A", "").await.unwrap();

        feed.create_tweet(&id("a"), "hello").await.unwrap();
        let _ = feed.create_tweet(&id("ghost"), "nope").await;
        feed.flag_tweet(&id("b"), &id("a"), 0).await.unwrap();
        let _ = feed.flag_tweet(&id("c"), &id("a"), 0).await;

        let kinds: Vec<FeedEventKind> = feed
            .events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], FeedEventKind::TweetCreated { index: 0, .. }));
        assert!(matches!(
            kinds[1],
            FeedEventKind::TweetFlagged { flag_count: 1, .. }
        ));
        assert!(matches!(
            kinds[2],
            FeedEventKind::TweetRemoved {
                source: RemovalSource::FlagThreshold,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_flags_reach_threshold_once() {
        let (profiles, feed) = default_setup();
        profiles.set_profile(&id("a"), "A", "").await.unwrap();
        feed.create_tweet(&id("a"), "contested").await.unwrap();
        let feed = Arc::new(feed);

        let mut handles = Vec::new();
        for i in 0..10 {
            let feed = Arc::clone(&feed);
            handles.push(tokio::spawn(async move {
                feed.flag_tweet(&id(&format!("f{}", i)), &id("a"), 0).await
            }));
        }

        let mut removals = 0;
        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => {
                    accepted += 1;
                    if outcome.auto_removed {
                        removals += 1;
                    }
                }
                Err(err) => assert!(matches!(err, FeedError::AlreadyRemoved { .. })),
            }
        }

        assert_eq!(accepted, 3);
        assert_eq!(removals, 1);
        assert_eq!(feed.get_tweet(&id("a"), 0).await.unwrap().flag_count, 3);
    }
}
