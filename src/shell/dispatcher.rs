// Dispatcher - runs parsed invocations against the core services.
//
// The dispatcher is where each call is attributed to its caller; the
// services then decide whether that caller may do it.

use super::commands::{Call, Invocation, HELP};
use super::formatter;
use crate::core::feed::{FeedError, FeedStore, ModeratedFeed};
use crate::core::profiles::{ProfileError, ProfileRegistry, ProfileStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

pub struct Dispatcher<F: FeedStore, P: ProfileStore> {
    profiles: Arc<ProfileRegistry<P>>,
    feed: Arc<ModeratedFeed<F, P>>,
}

impl<F: FeedStore, P: ProfileStore> Dispatcher<F, P> {
    pub fn new(profiles: Arc<ProfileRegistry<P>>, feed: Arc<ModeratedFeed<F, P>>) -> Self {
        Self { profiles, feed }
    }

    /// Run one invocation and render its result.
    pub async fn dispatch(&self, invocation: Invocation) -> Result<String, DispatchError> {
        let Invocation { caller, call } = invocation;
        tracing::debug!(caller = %caller, ?call, "Dispatching");

        let output = match call {
            Call::SetProfile { display_name, bio } => {
                let profile = self
                    .profiles
                    .set_profile(&caller, &display_name, &bio)
                    .await?;
                format!("profile saved: {}", formatter::format_profile(&caller, &profile))
            }
            Call::GetProfile { identity } => {
                let profile = self.profiles.get_profile(&identity).await?;
                formatter::format_profile(&identity, &profile)
            }
            Call::CreateTweet { content } => {
                let index = self.feed.create_tweet(&caller, &content).await?;
                format!("tweet {}#{} published", caller, index)
            }
            Call::GetTweets { author } => {
                let tweets = self.feed.get_tweets(&author).await?;
                formatter::format_tweets(&author, &tweets)
            }
            Call::ActiveTweets { author } => {
                let tweets = self.feed.active_tweets(&author).await?;
                formatter::format_tweets(&author, &tweets)
            }
            Call::GetTweet { author, index } => {
                let tweet = self.feed.get_tweet(&author, index).await?;
                if self.feed.has_flagged(&caller, &author, index).await? {
                    format!("{} (flagged by you)", formatter::format_tweet(&tweet))
                } else {
                    formatter::format_tweet(&tweet)
                }
            }
            Call::FlagTweet { author, index } => {
                let outcome = self.feed.flag_tweet(&caller, &author, index).await?;
                if outcome.auto_removed {
                    format!(
                        "tweet {}#{} flagged ({} flags) and auto-removed",
                        author, index, outcome.flag_count
                    )
                } else {
                    format!(
                        "tweet {}#{} flagged ({} of {} flags)",
                        author,
                        index,
                        outcome.flag_count,
                        self.feed.flag_threshold()
                    )
                }
            }
            Call::AddModerator { identity } => {
                if self.feed.add_moderator(&caller, &identity).await? {
                    format!("{} is now a moderator", identity)
                } else {
                    format!("{} is already a moderator", identity)
                }
            }
            Call::RemoveTweet {
                author,
                index,
                reason,
            } => {
                self.feed
                    .remove_tweet(&caller, &author, index, &reason)
                    .await?;
                format!("tweet {}#{} removed", author, index)
            }
            Call::Moderators => {
                let moderators = self.feed.moderators().await?;
                let names: Vec<String> = moderators.iter().map(|m| m.to_string()).collect();
                format!("moderators: {}", names.join(", "))
            }
            Call::Events => {
                let events = self.feed.events().await?;
                if events.is_empty() {
                    "no events".to_string()
                } else {
                    events
                        .iter()
                        .map(formatter::format_event)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Call::WhoAmI => {
                let mut roles = Vec::new();
                if &caller == self.feed.owner() {
                    roles.push("owner");
                }
                if self.feed.is_moderator(&caller).await? {
                    roles.push("moderator");
                }
                if self.profiles.is_registered(&caller).await? {
                    roles.push("registered");
                }
                if roles.is_empty() {
                    format!("{} (no roles)", caller)
                } else {
                    format!("{} ({})", caller, roles.join(", "))
                }
            }
            Call::Help => HELP.to_string(),
        };

        Ok(output)
    }
}
