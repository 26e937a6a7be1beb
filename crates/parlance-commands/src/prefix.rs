//! Prefix selection: which leading strings mark a message as a command
//! invocation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{MessageEvent, UserId};

/// Generates the valid prefixes for a message. Implementations may vary
/// prefixes per guild or channel.
#[async_trait]
pub trait PrefixProvider: Send + Sync {
    async fn prefixes(&self, event: &MessageEvent) -> Vec<String>;
}

/// The mention forms of a bot user, usable as prefixes.
pub fn mention_prefixes(bot_id: UserId) -> Vec<String> {
    vec![format!("<@{bot_id}> "), format!("<@!{bot_id}> ")]
}

/// How the dispatcher decides whether a message is prefixed.
#[derive(Clone)]
pub enum PrefixPolicy {
    Static(Vec<String>),
    Dynamic(Arc<dyn PrefixProvider>),
}

impl PrefixPolicy {
    pub fn single(prefix: impl Into<String>) -> Self {
        Self::Static(vec![prefix.into()])
    }

    pub fn any_of<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Static(prefixes.into_iter().map(Into::into).collect())
    }

    pub fn dynamic(provider: Arc<dyn PrefixProvider>) -> Self {
        Self::Dynamic(provider)
    }

    /// Mentioning the bot is the prefix.
    pub fn when_mentioned(bot_id: UserId) -> Self {
        Self::Static(mention_prefixes(bot_id))
    }

    /// Mentioning the bot, or any of the given prefixes.
    pub fn when_mentioned_or<I, S>(bot_id: UserId, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = mention_prefixes(bot_id);
        all.extend(prefixes.into_iter().map(Into::into));
        Self::Static(all)
    }

    /// The first configured prefix the message body starts with.
    pub async fn matched_prefix(&self, event: &MessageEvent) -> Option<String> {
        let prefixes = match self {
            Self::Static(prefixes) => prefixes.clone(),
            Self::Dynamic(provider) => provider.prefixes(event).await,
        };
        prefixes.into_iter().find(|p| event.body.starts_with(p))
    }
}

impl fmt::Debug for PrefixPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(prefixes) => f.debug_tuple("Static").field(prefixes).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
