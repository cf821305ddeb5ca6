// In-memory FeedStore.
//
// Writes here cannot fail once their inputs are checked, so each write method
// validates first and then applies every change; nothing is left half-done.
// The feed service serializes writers, the maps only need to be safe to read
// from other tasks.

use crate::core::feed::{FeedError, FeedEvent, FeedStore, Tweet};
use crate::core::identity::Identity;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::RwLock;

/// (flagger, author, index)
type FlagKey = (Identity, Identity, u64);

pub struct InMemoryFeedStore {
    /// author -> tweets in publish order
    tweets: DashMap<Identity, Vec<Tweet>>,
    flags: DashSet<FlagKey>,
    moderators: DashSet<Identity>,
    events: RwLock<Vec<FeedEvent>>,
}

impl InMemoryFeedStore {
    pub fn new() -> Self {
        Self {
            tweets: DashMap::new(),
            flags: DashSet::new(),
            moderators: DashSet::new(),
            events: RwLock::new(Vec::new()),
        }
    }

    fn ensure_stored(&self, tweet: &Tweet) -> Result<(), FeedError> {
        let stored = self
            .tweets
            .get(&tweet.author)
            .map(|seq| (tweet.index as usize) < seq.len())
            .unwrap_or(false);
        if stored {
            Ok(())
        } else {
            Err(FeedError::StorageError(format!(
                "tweet {} by {} is not stored",
                tweet.index, tweet.author
            )))
        }
    }

    fn replace(&self, tweet: &Tweet) {
        if let Some(mut seq) = self.tweets.get_mut(&tweet.author) {
            if let Some(slot) = seq.get_mut(tweet.index as usize) {
                *slot = tweet.clone();
            }
        }
    }

    async fn push_events(&self, events: &[FeedEvent]) {
        self.events.write().await.extend_from_slice(events);
    }
}

#[async_trait]
impl FeedStore for InMemoryFeedStore {
    async fn tweet_count(&self, author: &Identity) -> Result<u64, FeedError> {
        Ok(self
            .tweets
            .get(author)
            .map(|seq| seq.len() as u64)
            .unwrap_or(0))
    }

    async fn get_tweet(&self, author: &Identity, index: u64) -> Result<Option<Tweet>, FeedError> {
        Ok(self
            .tweets
            .get(author)
            .and_then(|seq| seq.get(index as usize).cloned()))
    }

    async fn get_tweets(&self, author: &Identity) -> Result<Vec<Tweet>, FeedError> {
        Ok(self
            .tweets
            .get(author)
            .map(|seq| seq.clone())
            .unwrap_or_default())
    }

    async fn append_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError> {
        {
            let mut seq = self.tweets.entry(tweet.author.clone()).or_default();
            if seq.len() as u64 != tweet.index {
                return Err(FeedError::StorageError(format!(
                    "tweet index {} does not follow {} stored tweets by {}",
                    tweet.index,
                    seq.len(),
                    tweet.author
                )));
            }
            seq.push(tweet.clone());
        }
        self.push_events(events).await;
        Ok(())
    }

    async fn update_tweet(&self, tweet: &Tweet, events: &[FeedEvent]) -> Result<(), FeedError> {
        self.ensure_stored(tweet)?;
        self.replace(tweet);
        self.push_events(events).await;
        Ok(())
    }

    async fn has_flagged(
        &self,
        flagger: &Identity,
        author: &Identity,
        index: u64,
    ) -> Result<bool, FeedError> {
        Ok(self
            .flags
            .contains(&(flagger.clone(), author.clone(), index)))
    }

    async fn record_flag(
        &self,
        flagger: &Identity,
        tweet: &Tweet,
        events: &[FeedEvent],
    ) -> Result<(), FeedError> {
        self.ensure_stored(tweet)?;
        self.flags
            .insert((flagger.clone(), tweet.author.clone(), tweet.index));
        self.replace(tweet);
        self.push_events(events).await;
        Ok(())
    }

    async fn is_moderator(&self, identity: &Identity) -> Result<bool, FeedError> {
        Ok(self.moderators.contains(identity))
    }

    async fn add_moderator(
        &self,
        identity: &Identity,
        events: &[FeedEvent],
    ) -> Result<(), FeedError> {
        self.moderators.insert(identity.clone());
        self.push_events(events).await;
        Ok(())
    }

    async fn list_moderators(&self) -> Result<Vec<Identity>, FeedError> {
        let mut moderators: Vec<Identity> =
            self.moderators.iter().map(|m| m.key().clone()).collect();
        moderators.sort();
        Ok(moderators)
    }

    async fn list_events(&self) -> Result<Vec<FeedEvent>, FeedError> {
        Ok(self.events.read().await.clone())
    }
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}
