//! Parameter descriptors and the validated signature model.
//!
//! A [`Signature`] is derived once per command registration and shared
//! read-only across every invocation of its command.

use serde::{Deserialize, Serialize};

use crate::binder::ArgValue;
use crate::error::RegistrationError;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Int,
    Float,
    Bool,
    Member,
    Channel,
    Role,
    /// Only the listed spellings are accepted.
    Literal(Vec<String>),
    /// Candidates are tried in order; the first success wins.
    OneOf(Vec<ArgType>),
    /// Dispatched to the converter registered under this tag.
    Custom(String),
}

impl ArgType {
    /// Human-readable name used in error messages and usage strings.
    pub fn display_name(&self) -> String {
        match self {
            ArgType::String => "string".to_string(),
            ArgType::Int => "integer".to_string(),
            ArgType::Float => "number".to_string(),
            ArgType::Bool => "boolean".to_string(),
            ArgType::Member => "member".to_string(),
            ArgType::Channel => "channel".to_string(),
            ArgType::Role => "role".to_string(),
            ArgType::Literal(values) => format!("one of [{}]", values.join(", ")),
            ArgType::OneOf(types) => types
                .iter()
                .map(|t| t.display_name())
                .collect::<Vec<_>>()
                .join(" or "),
            ArgType::Custom(tag) => tag.clone(),
        }
    }
}

/// How a parameter consumes tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    /// Exactly one token; missing is an error.
    Required,
    /// One token if present, else the declared default.
    Optional,
    /// Converts tokens while conversion succeeds, then releases the
    /// first failing token back to the stream.
    Greedy,
    /// All remaining tokens, converted one by one.
    Variadic,
    /// All remaining text as one string, original whitespace kept.
    ConsumeRest,
}

/// One parameter of a command signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub ty: ArgType,
    /// Present for optional parameters; also allowed on greedy and
    /// consume-rest parameters as the empty-stream fallback.
    pub default: Option<ArgValue>,
    /// Per-parameter override of the engine's empty-variadic policy.
    pub allow_empty: Option<bool>,
    /// Minimum length for string values.
    pub min_length: Option<usize>,
    /// Maximum length for string values.
    pub max_length: Option<usize>,
}

impl ParamSpec {
    fn new(name: impl Into<String>, kind: ParamKind, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            default: None,
            allow_empty: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn required(name: impl Into<String>, ty: ArgType) -> Self {
        Self::new(name, ParamKind::Required, ty)
    }

    pub fn optional(name: impl Into<String>, ty: ArgType, default: ArgValue) -> Self {
        let mut spec = Self::new(name, ParamKind::Optional, ty);
        spec.default = Some(default);
        spec
    }

    pub fn greedy(name: impl Into<String>, ty: ArgType) -> Self {
        Self::new(name, ParamKind::Greedy, ty)
    }

    pub fn variadic(name: impl Into<String>, ty: ArgType) -> Self {
        Self::new(name, ParamKind::Variadic, ty)
    }

    pub fn rest(name: impl Into<String>, ty: ArgType) -> Self {
        Self::new(name, ParamKind::ConsumeRest, ty)
    }

    pub fn with_default(mut self, default: ArgValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = Some(allow);
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }

    fn is_collector(&self) -> bool {
        matches!(self.kind, ParamKind::Variadic | ParamKind::ConsumeRest)
    }
}

/// The ordered, validated parameter list of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    /// Validates the parameter list shape. Called once at registration.
    pub fn new(params: Vec<ParamSpec>) -> Result<Self, RegistrationError> {
        let invalid = |reason: String| RegistrationError::InvalidSignature(reason);

        let mut seen_optional: Option<&str> = None;
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(invalid(format!("duplicate parameter name: {}", param.name)));
            }

            if param.is_collector() && i + 1 != params.len() {
                return Err(invalid(format!(
                    "{} must be the last parameter",
                    param.name
                )));
            }

            match param.kind {
                ParamKind::Required => {
                    if let Some(prev) = seen_optional {
                        return Err(invalid(format!(
                            "required parameter {} follows optional parameter {prev}",
                            param.name
                        )));
                    }
                }
                ParamKind::Optional => {
                    if param.default.is_none() {
                        return Err(invalid(format!(
                            "optional parameter {} has no default",
                            param.name
                        )));
                    }
                    seen_optional = Some(&param.name);
                }
                ParamKind::Greedy => {
                    if matches!(param.ty, ArgType::String) {
                        return Err(invalid(format!(
                            "greedy parameter {} cannot be a plain string",
                            param.name
                        )));
                    }
                }
                ParamKind::Variadic => {
                    if param.default.is_some() {
                        return Err(invalid(format!(
                            "variadic parameter {} cannot have a default",
                            param.name
                        )));
                    }
                }
                ParamKind::ConsumeRest => {}
            }
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Renders a POSIX-like usage string: `<required> [optional=default]
    /// <variadic...>`, with `...` outside the brackets for greedy
    /// parameters.
    pub fn render_usage(&self) -> String {
        let mut parts = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let mut inner = match &param.default {
                Some(default) if !default.is_none() => {
                    format!("{}={}", param.name, default.render())
                }
                _ => param.name.clone(),
            };
            if matches!(param.kind, ParamKind::Variadic | ParamKind::ConsumeRest) {
                inner.push_str("...");
            }

            let mut part = if param.is_optional() {
                format!("[{inner}]")
            } else {
                format!("<{inner}>")
            };
            if matches!(param.kind, ParamKind::Greedy) {
                part.push_str("...");
            }
            parts.push(part);
        }
        parts.join(" ")
    }
}
