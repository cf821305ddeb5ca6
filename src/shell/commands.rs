// Command parsing for the shell.
//
// Grammar: `<caller> <command> [args...]`. Double quotes group words,
// `\"` and `\\` escape inside quotes, `#` starts a comment line.

use crate::core::identity::Identity;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unterminated quote")]
    UnterminatedQuote,

    #[error("Missing command after caller `{0}`")]
    MissingCommand(String),

    #[error("Unknown command `{0}` (try `help`)")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Identity cannot be empty")]
    EmptyIdentity,

    #[error("Invalid tweet index `{0}`")]
    InvalidIndex(String),
}

/// One operation, without its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetProfile { display_name: String, bio: String },
    GetProfile { identity: Identity },
    CreateTweet { content: String },
    GetTweets { author: Identity },
    ActiveTweets { author: Identity },
    GetTweet { author: Identity, index: u64 },
    FlagTweet { author: Identity, index: u64 },
    AddModerator { identity: Identity },
    RemoveTweet { author: Identity, index: u64, reason: String },
    Moderators,
    Events,
    WhoAmI,
    Help,
}

/// A call attributed to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub caller: Identity,
    pub call: Call,
}

pub const HELP: &str = "\
<caller> set-profile <display_name> [bio]
<caller> profile <identity>
<caller> tweet <content>
<caller> tweets <author>
<caller> active <author>
<caller> get-tweet <author> <index>
<caller> flag <author> <index>
<caller> add-moderator <identity>
<caller> remove <author> <index> [reason]
<caller> moderators
<caller> events
<caller> whoami
<caller> help";

/// Parse one input line. Blank lines and comments give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Invocation>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = tokenize(trimmed)?;
    let mut tokens = tokens.into_iter();
    // tokenize() never returns an empty list for non-blank input
    let caller = match tokens.next() {
        Some(caller) => caller,
        None => return Ok(None),
    };
    let caller = identity_arg(&caller)?;
    let command = tokens
        .next()
        .ok_or_else(|| ParseError::MissingCommand(caller.to_string()))?;
    let args: Vec<String> = tokens.collect();

    let call = match command.as_str() {
        "set-profile" => match args.as_slice() {
            [name] => Call::SetProfile {
                display_name: name.clone(),
                bio: String::new(),
            },
            [name, bio] => Call::SetProfile {
                display_name: name.clone(),
                bio: bio.clone(),
            },
            _ => return Err(ParseError::Usage("<caller> set-profile <display_name> [bio]")),
        },
        "profile" => match args.as_slice() {
            [identity] => Call::GetProfile {
                identity: identity_arg(identity)?,
            },
            _ => return Err(ParseError::Usage("<caller> profile <identity>")),
        },
        "tweet" => match args.as_slice() {
            [content] => Call::CreateTweet {
                content: content.clone(),
            },
            _ => return Err(ParseError::Usage("<caller> tweet <content>")),
        },
        "tweets" => match args.as_slice() {
            [author] => Call::GetTweets {
                author: identity_arg(author)?,
            },
            _ => return Err(ParseError::Usage("<caller> tweets <author>")),
        },
        "active" => match args.as_slice() {
            [author] => Call::ActiveTweets {
                author: identity_arg(author)?,
            },
            _ => return Err(ParseError::Usage("<caller> active <author>")),
        },
        "get-tweet" => match args.as_slice() {
            [author, index] => Call::GetTweet {
                author: identity_arg(author)?,
                index: parse_index(index)?,
            },
            _ => return Err(ParseError::Usage("<caller> get-tweet <author> <index>")),
        },
        "flag" => match args.as_slice() {
            [author, index] => Call::FlagTweet {
                author: identity_arg(author)?,
                index: parse_index(index)?,
            },
            _ => return Err(ParseError::Usage("<caller> flag <author> <index>")),
        },
        "add-moderator" => match args.as_slice() {
            [identity] => Call::AddModerator {
                identity: identity_arg(identity)?,
            },
            _ => return Err(ParseError::Usage("<caller> add-moderator <identity>")),
        },
        "remove" => match args.as_slice() {
            [author, index] => Call::RemoveTweet {
                author: identity_arg(author)?,
                index: parse_index(index)?,
                reason: String::new(),
            },
            [author, index, reason] => Call::RemoveTweet {
                author: identity_arg(author)?,
                index: parse_index(index)?,
                reason: reason.clone(),
            },
            _ => return Err(ParseError::Usage("<caller> remove <author> <index> [reason]")),
        },
        "moderators" => Call::Moderators,
        "events" => Call::Events,
        "whoami" => Call::WhoAmI,
        "help" => Call::Help,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(Invocation { caller, call }))
}

fn identity_arg(raw: &str) -> Result<Identity, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyIdentity);
    }
    Ok(Identity::from(raw))
}

fn parse_index(raw: &str) -> Result<u64, ParseError> {
    raw.parse::<u64>()
        .map_err(|_| ParseError::InvalidIndex(raw.to_string()))
}

fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                // "" is a real (empty) argument
                in_token = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(ParseError::UnterminatedQuote),
            },
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
