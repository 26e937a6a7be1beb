//! Boundary types shared with the surrounding platform layer: incoming
//! message events, the entity lookup capability, the reply capability,
//! and the per-dispatch command context.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Platform user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Platform channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Platform guild id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One incoming chat message, delivered by the gateway layer one at a
/// time per dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub body: String,
    pub author_id: UserId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author_is_bot: bool,
}

impl MessageEvent {
    pub fn new(body: impl Into<String>, author_id: UserId, channel_id: ChannelId) -> Self {
        Self {
            body: body.into(),
            author_id,
            channel_id,
            guild_id: None,
            author_is_bot: false,
        }
    }

    pub fn with_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }
}

/// Kinds of platform entities converters can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Member,
    Channel,
    Role,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Member => "member",
            EntityKind::Channel => "channel",
            EntityKind::Role => "role",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved platform entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
    pub name: String,
}

/// Where a lookup happens: the channel (and guild, if any) of the
/// message being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
}

/// Lookup capability into the platform's data, supplied by the caller.
/// Used by entity converters; implementations may hit caches or the
/// network and are awaited per conversion.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Resolves an entity by its exact id, or `None` if it does not
    /// exist in the given scope.
    async fn by_id(&self, kind: EntityKind, id: u64, scope: Scope) -> Option<EntityRef>;

    /// Returns the candidate set for name matching in the given scope.
    async fn candidates(&self, kind: EntityKind, scope: Scope) -> Vec<EntityRef>;
}

/// An [`EntityLookup`] that knows nothing. The default for dispatchers
/// whose commands use no entity parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

#[async_trait]
impl EntityLookup for NoLookup {
    async fn by_id(&self, _kind: EntityKind, _id: u64, _scope: Scope) -> Option<EntityRef> {
        None
    }

    async fn candidates(&self, _kind: EntityKind, _scope: Scope) -> Vec<EntityRef> {
        Vec::new()
    }
}

/// Reply capability: sends a message back to wherever `event` came from.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn reply(&self, event: &MessageEvent, content: &str) -> anyhow::Result<()>;
}

/// A [`Replier`] that discards everything. The default for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReplier;

#[async_trait]
impl Replier for NullReplier {
    async fn reply(&self, _event: &MessageEvent, _content: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Per-dispatch context handed to converters, checks and handlers.
/// Never persisted beyond one dispatch.
#[derive(Clone)]
pub struct CommandContext {
    pub event: MessageEvent,
    /// The prefix that matched this message.
    pub prefix: String,
    /// The name (or alias path) the command was invoked under, as typed.
    pub invoked_name: String,
    replier: Arc<dyn Replier>,
    lookup: Arc<dyn EntityLookup>,
}

impl CommandContext {
    pub fn new(
        event: MessageEvent,
        prefix: impl Into<String>,
        invoked_name: impl Into<String>,
        replier: Arc<dyn Replier>,
        lookup: Arc<dyn EntityLookup>,
    ) -> Self {
        Self {
            event,
            prefix: prefix.into(),
            invoked_name: invoked_name.into(),
            replier,
            lookup,
        }
    }

    pub fn author_id(&self) -> UserId {
        self.event.author_id
    }

    pub fn scope(&self) -> Scope {
        Scope {
            channel_id: self.event.channel_id,
            guild_id: self.event.guild_id,
        }
    }

    pub fn lookup(&self) -> &dyn EntityLookup {
        self.lookup.as_ref()
    }

    /// Sends a message back to the channel the invocation came from.
    pub async fn reply(&self, content: &str) -> anyhow::Result<()> {
        self.replier.reply(&self.event, content).await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("event", &self.event)
            .field("prefix", &self.prefix)
            .field("invoked_name", &self.invoked_name)
            .finish_non_exhaustive()
    }
}
