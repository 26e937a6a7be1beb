//! Binds remaining tokens to a command signature.
//!
//! Binding walks the signature in order, awaiting each conversion
//! sequentially, and is all-or-nothing: any failure aborts the bind and
//! nothing partial is observable.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::{CommandContext, EntityRef};
use crate::convert::ConverterRegistry;
use crate::error::{ArgumentError, ConversionError};
use crate::signature::{ParamKind, ParamSpec, Signature};
use crate::tokenizer::Token;

/// A converted argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    /// The absence of a value, usable as an optional default.
    None,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Entity(EntityRef),
    /// Ordered values of a greedy or variadic parameter.
    Many(Vec<ArgValue>),
}

impl ArgValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ArgValue::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            ArgValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Many(values) => Some(values),
            _ => None,
        }
    }

    /// Compact rendering for usage strings.
    pub fn render(&self) -> String {
        match self {
            ArgValue::None => "None".to_string(),
            ArgValue::Str(s) => s.clone(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => f.to_string(),
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Entity(e) => e.name.clone(),
            ArgValue::Many(values) => values
                .iter()
                .map(|v| v.render())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// One bound argument.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    pub name: String,
    pub value: ArgValue,
}

/// The converted values of one invocation, in signature order.
/// Constructed fresh per dispatch and discarded after the handler
/// returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundArguments {
    args: Vec<BoundArgument>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn value_at(&self, index: usize) -> Option<&ArgValue> {
        self.args.get(index).map(|a| &a.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundArgument> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn push(&mut self, name: &str, value: ArgValue) {
        self.args.push(BoundArgument {
            name: name.to_string(),
            value,
        });
    }
}

/// Binds tokens to signatures through a converter registry.
pub struct Binder<'a> {
    converters: &'a ConverterRegistry,
    allow_empty_variadic: bool,
    conversion_timeout: Option<Duration>,
}

impl<'a> Binder<'a> {
    pub fn new(converters: &'a ConverterRegistry) -> Self {
        Self {
            converters,
            allow_empty_variadic: false,
            conversion_timeout: None,
        }
    }

    pub fn with_allow_empty_variadic(mut self, allow: bool) -> Self {
        self.allow_empty_variadic = allow;
        self
    }

    pub fn with_conversion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    /// Binds `tokens` to `signature` in parameter order. `body` is the
    /// string the tokens were produced from; consume-rest slices it to
    /// keep the original whitespace.
    pub async fn bind(
        &self,
        signature: &Signature,
        ignore_extra: bool,
        ctx: &CommandContext,
        tokens: &[Token],
        body: &str,
    ) -> Result<BoundArguments, ArgumentError> {
        let mut bound = BoundArguments::default();
        let mut pos = 0usize;

        for param in signature.params() {
            match param.kind {
                ParamKind::Required => {
                    let token = tokens.get(pos).ok_or_else(|| missing(param))?;
                    let value = self
                        .convert_text(ctx, param, &token.text)
                        .await
                        .map_err(|source| conversion(param, pos + 1, source))?;
                    bound.push(&param.name, value);
                    pos += 1;
                }
                ParamKind::Optional => match tokens.get(pos) {
                    Some(token) => {
                        // defaults do not suppress type errors
                        let value = self
                            .convert_text(ctx, param, &token.text)
                            .await
                            .map_err(|source| conversion(param, pos + 1, source))?;
                        bound.push(&param.name, value);
                        pos += 1;
                    }
                    None => {
                        let default = param.default.clone().unwrap_or(ArgValue::None);
                        bound.push(&param.name, default);
                    }
                },
                ParamKind::Greedy => {
                    let mut values = Vec::new();
                    while let Some(token) = tokens.get(pos) {
                        match self.convert_text(ctx, param, &token.text).await {
                            Ok(value) => {
                                values.push(value);
                                pos += 1;
                            }
                            Err(err @ ConversionError::Timeout { .. }) => {
                                return Err(conversion(param, pos + 1, err));
                            }
                            Err(_) => break,
                        }
                    }
                    if values.is_empty() {
                        match &param.default {
                            Some(default) => bound.push(&param.name, default.clone()),
                            None => return Err(missing(param)),
                        }
                    } else {
                        bound.push(&param.name, ArgValue::Many(values));
                    }
                }
                ParamKind::Variadic => {
                    let mut values = Vec::new();
                    while let Some(token) = tokens.get(pos) {
                        let value = self
                            .convert_text(ctx, param, &token.text)
                            .await
                            .map_err(|source| conversion(param, pos + 1, source))?;
                        values.push(value);
                        pos += 1;
                    }
                    let allow_empty = param.allow_empty.unwrap_or(self.allow_empty_variadic);
                    if values.is_empty() && !allow_empty {
                        return Err(missing(param));
                    }
                    bound.push(&param.name, ArgValue::Many(values));
                }
                ParamKind::ConsumeRest => match tokens.get(pos) {
                    Some(first) => {
                        let rest = body[first.span.start..].trim_end();
                        let value = self
                            .convert_text(ctx, param, rest)
                            .await
                            .map_err(|source| conversion(param, pos + 1, source))?;
                        bound.push(&param.name, value);
                        pos = tokens.len();
                    }
                    None => match &param.default {
                        Some(default) => bound.push(&param.name, default.clone()),
                        None => return Err(missing(param)),
                    },
                },
            }
        }

        if pos < tokens.len() && !ignore_extra {
            return Err(ArgumentError::TooMany {
                surplus: tokens.len() - pos,
            });
        }

        trace!(bound = bound.len(), consumed = pos, "arguments bound");
        Ok(bound)
    }

    async fn convert_text(
        &self,
        ctx: &CommandContext,
        param: &ParamSpec,
        text: &str,
    ) -> Result<ArgValue, ConversionError> {
        let fut = self.converters.convert(ctx, &param.ty, text);
        let value = match self.conversion_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ConversionError::Timeout {
                    token: text.to_string(),
                })??,
            None => fut.await?,
        };

        if let ArgValue::Str(s) = &value {
            let length = s.chars().count();
            if let Some(min) = param.min_length {
                if length < min {
                    return Err(ConversionError::BadFormat {
                        expected: format!("string of at least {min} characters"),
                        token: text.to_string(),
                        reason: format!("only {length} characters"),
                    });
                }
            }
            if let Some(max) = param.max_length {
                if length > max {
                    return Err(ConversionError::BadFormat {
                        expected: format!("string of at most {max} characters"),
                        token: text.to_string(),
                        reason: format!("{length} characters"),
                    });
                }
            }
        }

        Ok(value)
    }
}

fn missing(param: &ParamSpec) -> ArgumentError {
    ArgumentError::Missing {
        parameter: param.name.clone(),
    }
}

fn conversion(param: &ParamSpec, position: usize, source: ConversionError) -> ArgumentError {
    ArgumentError::Conversion {
        parameter: param.name.clone(),
        position,
        source,
    }
}
