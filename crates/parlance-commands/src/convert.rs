//! Pluggable token-to-value conversion.
//!
//! The registry owns the builtin conversions (primitives, platform
//! entities, literals, unions) and dispatches `Custom` types to whatever
//! converter was registered under their tag.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::binder::ArgValue;
use crate::context::{CommandContext, EntityKind, EntityRef};
use crate::error::ConversionError;
use crate::mention;
use crate::signature::ArgType;

/// A pluggable routine transforming a raw token into a typed value.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        ctx: &CommandContext,
        token: &str,
    ) -> Result<ArgValue, ConversionError>;
}

/// Parses the fixed boolean spelling set, case-insensitively.
pub fn convert_to_bool(token: &str) -> Result<bool, ConversionError> {
    let lowered = token.to_lowercase();
    match lowered.as_str() {
        "yes" | "y" | "true" | "t" | "1" | "enable" | "on" => Ok(true),
        "no" | "n" | "false" | "f" | "0" | "disable" | "off" => Ok(false),
        _ => Err(ConversionError::BadFormat {
            expected: "boolean".to_string(),
            token: token.to_string(),
            reason: "not a recognised boolean option".to_string(),
        }),
    }
}

/// Maps declared parameter types to conversion routines.
pub struct ConverterRegistry {
    custom: HashMap<String, Arc<dyn Converter>>,
    case_insensitive_literals: bool,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            case_insensitive_literals: false,
        }
    }

    pub fn with_case_insensitive_literals(mut self, flag: bool) -> Self {
        self.case_insensitive_literals = flag;
        self
    }

    /// Registers a converter under a tag. Registering a tag twice
    /// replaces the previous converter.
    pub fn register(&mut self, tag: impl Into<String>, converter: Arc<dyn Converter>) {
        let tag = tag.into();
        if self.custom.insert(tag.clone(), converter).is_some() {
            debug!(%tag, "replaced custom converter");
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.custom.contains_key(tag)
    }

    /// Converts one token according to its declared type.
    pub async fn convert(
        &self,
        ctx: &CommandContext,
        ty: &ArgType,
        token: &str,
    ) -> Result<ArgValue, ConversionError> {
        match ty {
            ArgType::String => Ok(ArgValue::Str(token.to_string())),
            ArgType::Int => token
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|e| ConversionError::BadFormat {
                    expected: "integer".to_string(),
                    token: token.to_string(),
                    reason: e.to_string(),
                }),
            ArgType::Float => token
                .parse::<f64>()
                .map(ArgValue::Float)
                .map_err(|e| ConversionError::BadFormat {
                    expected: "number".to_string(),
                    token: token.to_string(),
                    reason: e.to_string(),
                }),
            ArgType::Bool => convert_to_bool(token).map(ArgValue::Bool),
            ArgType::Member => self.convert_entity(ctx, EntityKind::Member, token).await,
            ArgType::Channel => self.convert_entity(ctx, EntityKind::Channel, token).await,
            ArgType::Role => self.convert_entity(ctx, EntityKind::Role, token).await,
            ArgType::Literal(allowed) => self.convert_literal(allowed, token),
            ArgType::OneOf(candidates) => {
                let mut attempts = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    match Box::pin(self.convert(ctx, candidate, token)).await {
                        Ok(value) => return Ok(value),
                        Err(err) => attempts.push(err),
                    }
                }
                Err(ConversionError::AllFailed {
                    token: token.to_string(),
                    attempts,
                })
            }
            ArgType::Custom(tag) => match self.custom.get(tag) {
                Some(converter) => converter.convert(ctx, token).await,
                None => {
                    warn!(%tag, "no converter registered for custom type");
                    Err(ConversionError::BadFormat {
                        expected: tag.clone(),
                        token: token.to_string(),
                        reason: "no converter registered for this type".to_string(),
                    })
                }
            },
        }
    }

    fn convert_literal(
        &self,
        allowed: &[String],
        token: &str,
    ) -> Result<ArgValue, ConversionError> {
        let matched = if self.case_insensitive_literals {
            allowed.iter().find(|v| v.eq_ignore_ascii_case(token))
        } else {
            allowed.iter().find(|v| v.as_str() == token)
        };
        match matched {
            Some(spelling) => Ok(ArgValue::Str(spelling.clone())),
            None => Err(ConversionError::BadFormat {
                expected: format!("one of [{}]", allowed.join(", ")),
                token: token.to_string(),
                reason: "not an allowed value".to_string(),
            }),
        }
    }

    /// Resolves a platform entity: raw id, then mention syntax, then
    /// exact name, then name prefix. The first unambiguous match wins.
    async fn convert_entity(
        &self,
        ctx: &CommandContext,
        kind: EntityKind,
        token: &str,
    ) -> Result<ArgValue, ConversionError> {
        let scope = ctx.scope();

        if let Some(id) = mention::parse_raw_id(token).or_else(|| mention::parse_mention(kind, token))
        {
            return match ctx.lookup().by_id(kind, id, scope).await {
                Some(entity) => Ok(ArgValue::Entity(entity)),
                None => Err(ConversionError::NotFound {
                    kind: kind.as_str().to_string(),
                    token: token.to_string(),
                }),
            };
        }

        let candidates = ctx.lookup().candidates(kind, scope).await;
        Self::match_by_name(kind, token, &candidates).map(ArgValue::Entity)
    }

    fn match_by_name(
        kind: EntityKind,
        token: &str,
        candidates: &[EntityRef],
    ) -> Result<EntityRef, ConversionError> {
        let exact: Vec<&EntityRef> = candidates.iter().filter(|e| e.name == token).collect();
        match exact.len() {
            1 => return Ok(exact[0].clone()),
            n if n > 1 => {
                return Err(ConversionError::Ambiguous {
                    kind: kind.as_str().to_string(),
                    token: token.to_string(),
                    count: n,
                })
            }
            _ => {}
        }

        let lowered = token.to_lowercase();
        let prefixed: Vec<&EntityRef> = candidates
            .iter()
            .filter(|e| e.name.to_lowercase().starts_with(&lowered))
            .collect();
        match prefixed.len() {
            0 => Err(ConversionError::NotFound {
                kind: kind.as_str().to_string(),
                token: token.to_string(),
            }),
            1 => Ok(prefixed[0].clone()),
            n => Err(ConversionError::Ambiguous {
                kind: kind.as_str().to_string(),
                token: token.to_string(),
                count: n,
            }),
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
