//! Command definitions and registered command nodes.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::BoundArguments;
use crate::context::CommandContext;
use crate::cooldown::CooldownPolicy;
use crate::error::{CheckError, RegistrationError};
use crate::signature::{ParamSpec, Signature};

/// The invocable attached to a command. Handler failures are opaque to
/// the engine and passed through to the dispatch outcome.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: CommandContext, args: BoundArguments) -> anyhow::Result<()>;
}

type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

struct FnHandler {
    f: Box<dyn Fn(CommandContext, BoundArguments) -> HandlerFuture + Send + Sync>,
}

#[async_trait]
impl CommandHandler for FnHandler {
    async fn run(&self, ctx: CommandContext, args: BoundArguments) -> anyhow::Result<()> {
        (self.f)(ctx, args).await
    }
}

/// Builds a handler from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(CommandContext, BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        f: Box::new(move |ctx, args| Box::pin(f(ctx, args))),
    })
}

/// A predicate gating a command invocation, run before the cooldown
/// gate. Rejections carry their own user-facing message.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, ctx: &CommandContext) -> Result<(), CheckError>;
}

type CheckFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

struct FnCheck {
    f: Box<dyn Fn(CommandContext) -> CheckFuture + Send + Sync>,
}

#[async_trait]
impl Check for FnCheck {
    async fn check(&self, ctx: &CommandContext) -> Result<(), CheckError> {
        if (self.f)(ctx.clone()).await {
            Ok(())
        } else {
            Err(CheckError::failed())
        }
    }
}

/// Builds a check from an async predicate closure.
pub fn check_fn<F, Fut>(f: F) -> Arc<dyn Check>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(FnCheck {
        f: Box::new(move |ctx| Box::pin(f(ctx))),
    })
}

/// A command definition, built with the `with_*` methods and handed to
/// the registry (or dispatcher builder) for registration.
pub struct CommandSpec {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) handler: Arc<dyn CommandHandler>,
    pub(crate) checks: Vec<Arc<dyn Check>>,
    pub(crate) cooldown: Option<CooldownPolicy>,
    pub(crate) parent_path: Vec<String>,
    pub(crate) enabled: bool,
    pub(crate) hidden: bool,
    pub(crate) ignore_extra: bool,
    pub(crate) help: Option<String>,
    pub(crate) brief: Option<String>,
    pub(crate) usage_override: Option<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            params: Vec::new(),
            handler,
            checks: Vec::new(),
            cooldown: None,
            parent_path: Vec::new(),
            enabled: true,
            hidden: false,
            ignore_extra: true,
            help: None,
            brief: None,
            usage_override: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_cooldown(mut self, policy: CooldownPolicy) -> Self {
        self.cooldown = Some(policy);
        self
    }

    /// Registers this command as a subcommand under the given path of
    /// already-registered command names.
    pub fn with_parent<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// When false, leftover tokens after a complete bind are an error.
    pub fn with_ignore_extra(mut self, ignore_extra: bool) -> Self {
        self.ignore_extra = ignore_extra;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage_override = Some(usage.into());
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parent_path", &self.parent_path)
            .finish_non_exhaustive()
    }
}

/// A registered command. Immutable after registration except for
/// subcommand additions; owned by its parent node or the registry root.
pub struct CommandNode {
    name: String,
    aliases: Vec<String>,
    /// Space-joined path from the root, computed at registration.
    qualified_name: String,
    signature: Signature,
    handler: Arc<dyn CommandHandler>,
    checks: Vec<Arc<dyn Check>>,
    cooldown: Option<CooldownPolicy>,
    enabled: bool,
    hidden: bool,
    ignore_extra: bool,
    help: Option<String>,
    brief: Option<String>,
    usage_override: Option<String>,
    children: Vec<CommandNode>,
    child_index: HashMap<String, usize>,
}

impl CommandNode {
    pub(crate) fn from_spec(
        spec: CommandSpec,
        qualified_name: String,
    ) -> Result<Self, RegistrationError> {
        let signature = Signature::new(spec.params)?;
        // brief falls back to the first help line
        let brief = spec.brief.or_else(|| {
            spec.help
                .as_ref()
                .and_then(|h| h.lines().next().map(str::to_string))
        });

        Ok(Self {
            name: spec.name,
            aliases: spec.aliases,
            qualified_name,
            signature,
            handler: spec.handler,
            checks: spec.checks,
            cooldown: spec.cooldown,
            enabled: spec.enabled,
            hidden: spec.hidden,
            ignore_extra: spec.ignore_extra,
            help: spec.help,
            brief,
            usage_override: spec.usage_override,
            children: Vec::new(),
            child_index: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The full space-joined name of this command.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn cooldown(&self) -> Option<&CooldownPolicy> {
        self.cooldown.as_ref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn ignore_extra(&self) -> bool {
        self.ignore_extra
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn brief(&self) -> Option<&str> {
        self.brief.as_deref()
    }

    /// How the command can be used, for help output.
    pub fn usage(&self) -> String {
        self.usage_override
            .clone()
            .unwrap_or_else(|| self.signature.render_usage())
    }

    /// The unique subcommands directly underneath this command.
    pub fn subcommands(&self) -> impl Iterator<Item = &CommandNode> {
        self.children.iter()
    }

    pub(crate) fn child(&self, key: &str) -> Option<&CommandNode> {
        self.child_index.get(key).map(|&i| &self.children[i])
    }

    pub(crate) fn child_mut(&mut self, key: &str) -> Option<&mut CommandNode> {
        self.child_index.get(key).copied().map(|i| &mut self.children[i])
    }

    /// Adds a subcommand. Keys are pre-normalized by the registry's
    /// case policy.
    pub(crate) fn add_child(
        &mut self,
        node: CommandNode,
        keys: Vec<String>,
    ) -> Result<(), RegistrationError> {
        for key in &keys {
            if self.child_index.contains_key(key) {
                return Err(RegistrationError::DuplicateName(format!(
                    "{} {key}",
                    self.qualified_name
                )));
            }
        }
        let index = self.children.len();
        self.children.push(node);
        for key in keys {
            self.child_index.insert(key, index);
        }
        Ok(())
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("qualified_name", &self.qualified_name)
            .field("aliases", &self.aliases)
            .field("enabled", &self.enabled)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ArgValue;
    use crate::signature::ArgType;

    fn noop() -> Arc<dyn CommandHandler> {
        handler_fn(|_ctx, _args| async { Ok(()) })
    }

    #[test]
    fn node_carries_spec_fields() {
        let spec = CommandSpec::new("ban", noop())
            .with_alias("b")
            .with_param(ParamSpec::required("user", ArgType::Member))
            .with_param(ParamSpec::optional("days", ArgType::Int, ArgValue::Int(0)))
            .with_help("Bans a user.\nLonger explanation.");

        let node = CommandNode::from_spec(spec, "ban".to_string()).unwrap();
        assert_eq!(node.qualified_name(), "ban");
        assert_eq!(node.aliases(), ["b"]);
        assert_eq!(node.usage(), "<user> [days=0]");
        assert_eq!(node.brief(), Some("Bans a user."));
        assert!(node.enabled());
    }

    #[test]
    fn bad_signature_fails_registration() {
        let spec = CommandSpec::new("x", noop())
            .with_param(ParamSpec::variadic("v", ArgType::Int))
            .with_param(ParamSpec::required("tail", ArgType::Int));
        assert!(CommandNode::from_spec(spec, "x".to_string()).is_err());
    }

    #[test]
    fn duplicate_child_keys_are_rejected() {
        let mut parent =
            CommandNode::from_spec(CommandSpec::new("tag", noop()), "tag".to_string()).unwrap();

        let add = CommandNode::from_spec(CommandSpec::new("add", noop()), "tag add".to_string())
            .unwrap();
        parent
            .add_child(add, vec!["add".to_string(), "a".to_string()])
            .unwrap();

        let clash = CommandNode::from_spec(CommandSpec::new("also", noop()), "tag also".to_string())
            .unwrap();
        let err = parent
            .add_child(clash, vec!["a".to_string()])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn check_fn_maps_false_to_failure() {
        let allow = check_fn(|_ctx| async { true });
        let deny = check_fn(|_ctx| async { false });

        let ctx = CommandContext::new(
            crate::context::MessageEvent::new(
                "!x",
                crate::context::UserId(1),
                crate::context::ChannelId(2),
            ),
            "!",
            "x",
            Arc::new(crate::context::NullReplier),
            Arc::new(crate::context::NoLookup),
        );

        assert!(allow.check(&ctx).await.is_ok());
        assert_eq!(deny.check(&ctx).await.unwrap_err(), CheckError::failed());
    }
}
