//! Parlance Commands
//!
//! A prefixed-command parsing and dispatch engine for chat platforms.
//! A raw message flows through the pipeline: prefix match, tokenization,
//! command resolution (aliases and nested subcommands, deepest match
//! wins), check predicates, the cooldown gate, signature-driven argument
//! conversion, and finally the handler. Every failure along the way maps
//! to a typed, reportable outcome.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use parlance_commands::{
//!     ArgType, ArgValue, CommandSpec, Dispatcher, MessageEvent, ParamSpec, PrefixPolicy,
//!     handler_fn,
//! };
//!
//! let dispatcher = Dispatcher::builder()
//!     .with_prefix(PrefixPolicy::single("!"))
//!     .with_replier(Arc::new(my_replier))
//!     .command(
//!         CommandSpec::new("roll", handler_fn(|ctx, args| async move {
//!             let sides = args.get("sides").and_then(|v| v.as_int()).unwrap_or(6);
//!             ctx.reply(&format!("you rolled a {}", roll(sides))).await
//!         }))
//!         .with_alias("r")
//!         .with_param(ParamSpec::optional("sides", ArgType::Int, ArgValue::Int(6))),
//!     )
//!     .build()?;
//!
//! // one call per incoming message; dispatches may run concurrently
//! dispatcher.dispatch(event).await;
//! ```

pub mod binder;
pub mod command;
pub mod config;
pub mod context;
pub mod convert;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod mention;
pub mod prefix;
pub mod registry;
pub mod signature;
pub mod tokenizer;

pub use binder::{ArgValue, Binder, BoundArgument, BoundArguments};
pub use command::{check_fn, handler_fn, Check, CommandHandler, CommandNode, CommandSpec};
pub use config::{ConfigManager, EngineConfig};
pub use context::{
    ChannelId, CommandContext, EntityKind, EntityLookup, EntityRef, GuildId, MessageEvent,
    NoLookup, NullReplier, Replier, Scope, UserId,
};
pub use convert::{convert_to_bool, Converter, ConverterRegistry};
pub use cooldown::{CooldownGate, CooldownPolicy, CooldownVerdict};
pub use dispatcher::{DispatchObserver, DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{
    ArgumentError, CheckError, CommandError, ConversionError, CooldownError, ParseError,
    RegistrationError, Result,
};
pub use mention::escape_mentions;
pub use prefix::{mention_prefixes, PrefixPolicy, PrefixProvider};
pub use registry::CommandRegistry;
pub use signature::{ArgType, ParamKind, ParamSpec, Signature};
pub use tokenizer::{tokenize, Token};
