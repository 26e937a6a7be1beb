//! Dispatch orchestration: prefix match, tokenize, resolve, checks,
//! cooldown gate, argument binding, handler invocation, and reporting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::binder::Binder;
use crate::command::CommandSpec;
use crate::config::EngineConfig;
use crate::context::{
    CommandContext, EntityLookup, MessageEvent, NoLookup, NullReplier, Replier,
};
use crate::convert::{Converter, ConverterRegistry};
use crate::cooldown::{CooldownGate, CooldownVerdict};
use crate::error::{ArgumentError, CooldownError, Result};
use crate::mention::escape_mentions;
use crate::prefix::PrefixPolicy;
use crate::registry::CommandRegistry;
use crate::tokenizer::tokenize;

/// Terminal outcome of one dispatch attempt. Never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Not a command invocation; nothing was reported.
    Ignored,
    /// A valid prefix followed by an unregistered command name.
    UnknownCommand { name: String },
    /// A check predicate rejected the invocation.
    CheckFailed { command: String, detail: String },
    /// The cooldown gate rejected the invocation.
    Denied {
        command: String,
        retry_after: Duration,
    },
    /// Argument binding failed.
    ArgumentFailed {
        command: String,
        error: ArgumentError,
    },
    /// The handler itself failed; opaque to the engine.
    HandlerFailed { command: String, detail: String },
    Succeeded { command: String },
}

/// Observability hook. Sees every terminal outcome; handler errors are
/// additionally delivered in full.
#[async_trait]
pub trait DispatchObserver: Send + Sync {
    async fn on_outcome(&self, _event: &MessageEvent, _outcome: &DispatchOutcome) {}

    async fn on_handler_error(&self, _ctx: &CommandContext, _error: &anyhow::Error) {}
}

/// Builds a [`Dispatcher`].
pub struct DispatcherBuilder {
    config: EngineConfig,
    prefix: PrefixPolicy,
    replier: Arc<dyn Replier>,
    lookup: Arc<dyn EntityLookup>,
    observer: Option<Arc<dyn DispatchObserver>>,
    converters: Vec<(String, Arc<dyn Converter>)>,
    registry: Option<CommandRegistry>,
    specs: Vec<CommandSpec>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            prefix: PrefixPolicy::single("!"),
            replier: Arc::new(NullReplier),
            lookup: Arc::new(NoLookup),
            observer: None,
            converters: Vec::new(),
            registry: None,
            specs: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prefix(mut self, prefix: PrefixPolicy) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_replier(mut self, replier: Arc<dyn Replier>) -> Self {
        self.replier = replier;
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn EntityLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Registers a custom converter under a tag, reachable from
    /// `ArgType::Custom` parameters.
    pub fn with_converter(mut self, tag: impl Into<String>, converter: Arc<dyn Converter>) -> Self {
        self.converters.push((tag.into(), converter));
        self
    }

    /// Uses a pre-built registry instead of one derived from the
    /// config's case policy. Specs added with [`Self::command`] are
    /// registered into it at build time.
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Queues a command for registration at build time.
    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let mut registry = self.registry.unwrap_or_else(|| {
            CommandRegistry::new().with_case_insensitive(self.config.case_insensitive_commands)
        });
        for spec in self.specs {
            registry.register(spec)?;
        }

        let mut converters = ConverterRegistry::new()
            .with_case_insensitive_literals(self.config.case_insensitive_literals);
        for (tag, converter) in self.converters {
            converters.register(tag, converter);
        }

        Ok(Dispatcher {
            registry,
            converters,
            cooldowns: CooldownGate::new(),
            prefix: self.prefix,
            replier: self.replier,
            lookup: self.lookup,
            observer: self.observer,
            config: self.config,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates the dispatch pipeline. Every incoming message is
/// dispatched independently; `dispatch` may run concurrently on any
/// number of tasks.
pub struct Dispatcher {
    registry: CommandRegistry,
    converters: ConverterRegistry,
    cooldowns: CooldownGate,
    prefix: PrefixPolicy,
    replier: Arc<dyn Replier>,
    lookup: Arc<dyn EntityLookup>,
    observer: Option<Arc<dyn DispatchObserver>>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The cooldown table, exposed for stale-bucket maintenance.
    pub fn cooldowns(&self) -> &CooldownGate {
        &self.cooldowns
    }

    /// Dispatches one message event to completion, reporting failures
    /// to the invoker and every terminal outcome to the observer.
    pub async fn dispatch(&self, event: MessageEvent) -> DispatchOutcome {
        let (outcome, report) = self.run(&event).await;

        if let Some(text) = report {
            if let Err(err) = self.replier.reply(&event, &text).await {
                warn!(error = %err, "failed to deliver report");
            }
        }
        if let Some(observer) = &self.observer {
            observer.on_outcome(&event, &outcome).await;
        }

        outcome
    }

    async fn run(&self, event: &MessageEvent) -> (DispatchOutcome, Option<String>) {
        if event.author_is_bot || event.body.is_empty() {
            return (DispatchOutcome::Ignored, None);
        }

        let Some(prefix) = self.prefix.matched_prefix(event).await else {
            return (DispatchOutcome::Ignored, None);
        };
        let stripped = &event.body[prefix.len()..];

        let tokens = match tokenize(stripped) {
            Ok(tokens) => tokens,
            Err(err) => {
                debug!(error = %err, "message body failed to tokenize");
                return (DispatchOutcome::Ignored, None);
            }
        };
        if tokens.is_empty() {
            return (DispatchOutcome::Ignored, None);
        }

        let Some((node, consumed)) = self.registry.resolve(&tokens) else {
            let name = tokens[0].text.clone();
            debug!(%name, "unknown command");
            let report = self
                .config
                .report_unknown_commands
                .then(|| format!("Unknown command: `{}`.", escape_mentions(&name)));
            return (DispatchOutcome::UnknownCommand { name }, report);
        };

        let command = node.qualified_name().to_string();
        let invoked_name = tokens[..consumed]
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let ctx = CommandContext::new(
            event.clone(),
            prefix,
            invoked_name,
            Arc::clone(&self.replier),
            Arc::clone(&self.lookup),
        );

        for check in node.checks() {
            if let Err(err) = check.check(&ctx).await {
                debug!(%command, detail = %err, "check rejected invocation");
                let report = escape_mentions(&err.0);
                return (
                    DispatchOutcome::CheckFailed {
                        command,
                        detail: err.0,
                    },
                    Some(report),
                );
            }
        }

        if let Some(policy) = node.cooldown() {
            let verdict =
                self.cooldowns
                    .check_and_record(&command, event.author_id, policy, Instant::now());
            if let CooldownVerdict::Denied { retry_after } = verdict {
                let err = CooldownError { retry_after };
                return (
                    DispatchOutcome::Denied {
                        command,
                        retry_after,
                    },
                    Some(err.to_string()),
                );
            }
        }

        let binder = Binder::new(&self.converters)
            .with_allow_empty_variadic(self.config.allow_empty_variadic)
            .with_conversion_timeout(self.config.conversion_timeout);
        let args = match binder
            .bind(
                node.signature(),
                node.ignore_extra(),
                &ctx,
                &tokens[consumed..],
                stripped,
            )
            .await
        {
            Ok(args) => args,
            Err(error) => {
                debug!(%command, error = %error, "argument binding failed");
                let report = escape_mentions(&error.to_string());
                return (
                    DispatchOutcome::ArgumentFailed { command, error },
                    Some(report),
                );
            }
        };

        let fut = node.handler().run(ctx.clone(), args);
        let result = match self.config.handler_timeout {
            Some(limit) => match timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("handler timed out after {limit:?}")),
            },
            None => fut.await,
        };

        match result {
            Ok(()) => {
                info!(%command, "command completed");
                (DispatchOutcome::Succeeded { command }, None)
            }
            Err(err) => {
                error!(%command, error = %err, "handler failed");
                if let Some(observer) = &self.observer {
                    observer.on_handler_error(&ctx, &err).await;
                }
                let report = format!("Something went wrong running `{command}`.");
                (
                    DispatchOutcome::HandlerFailed {
                        command,
                        detail: err.to_string(),
                    },
                    Some(report),
                )
            }
        }
    }
}
