// Plain-text rendering of core types for the shell.

use crate::core::feed::{FeedEvent, FeedEventKind, RemovalSource, Tweet, TweetStatus};
use crate::core::identity::Identity;
use crate::core::profiles::Profile;

pub fn format_profile(identity: &Identity, profile: &Profile) -> String {
    if !profile.is_registered() {
        return format!("{}: (no profile)", identity);
    }
    if profile.bio.is_empty() {
        format!("{}: {}", identity, profile.display_name)
    } else {
        format!("{}: {} - {}", identity, profile.display_name, profile.bio)
    }
}

pub fn format_tweet(tweet: &Tweet) -> String {
    let status = match tweet.status() {
        TweetStatus::Active => "active".to_string(),
        TweetStatus::Flagged(n) => format!("flagged x{}", n),
        TweetStatus::Removed => {
            let by = match &tweet.removed_by {
                Some(RemovalSource::Moderator(m)) => format!("by {}", m),
                Some(RemovalSource::FlagThreshold) | None => "by flags".to_string(),
            };
            format!(
                "removed {} (flags: {}, reason: {:?})",
                by, tweet.flag_count, tweet.removal_reason
            )
        }
    };

    format!(
        "[{}#{}] {:?} - {}",
        tweet.author, tweet.index, tweet.content, status
    )
}

pub fn format_tweets(author: &Identity, tweets: &[Tweet]) -> String {
    if tweets.is_empty() {
        return format!("{} has no tweets", author);
    }
    tweets
        .iter()
        .map(format_tweet)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_event(event: &FeedEvent) -> String {
    let at = event.at.format("%Y-%m-%d %H:%M:%S");
    let what = match &event.kind {
        FeedEventKind::TweetCreated { author, index } => {
            format!("{} published tweet {}", author, index)
        }
        FeedEventKind::TweetFlagged {
            author,
            index,
            flagger,
            flag_count,
        } => format!(
            "{} flagged {}#{} (now {} flags)",
            flagger, author, index, flag_count
        ),
        FeedEventKind::TweetRemoved {
            author,
            index,
            reason,
            source,
        } => match source {
            RemovalSource::Moderator(m) => {
                format!("{} removed {}#{}: {:?}", m, author, index, reason)
            }
            RemovalSource::FlagThreshold => {
                format!("{}#{} auto-removed: {:?}", author, index, reason)
            }
        },
        FeedEventKind::ModeratorAdded { identity, added_by } => {
            format!("{} made {} a moderator", added_by, identity)
        }
    };
    format!("{} {}", at, what)
}
