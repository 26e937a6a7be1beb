//! Mention and raw-id parsing, plus mention escaping for reply text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::EntityKind;

static RAW_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{15,20})$").unwrap());
static MEMBER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?([0-9]{15,20})>$").unwrap());
static CHANNEL_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<#([0-9]{15,20})>$").unwrap());
static ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@&([0-9]{15,20})>$").unwrap());
static PINGABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(everyone|here|[!&]?[0-9]{17,20})").unwrap());

/// Parses a bare numeric id token.
pub fn parse_raw_id(token: &str) -> Option<u64> {
    RAW_ID
        .captures(token)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses the mention syntax for the given entity kind.
pub fn parse_mention(kind: EntityKind, token: &str) -> Option<u64> {
    let re = match kind {
        EntityKind::Member => &*MEMBER_MENTION,
        EntityKind::Channel => &*CHANNEL_MENTION,
        EntityKind::Role => &*ROLE_MENTION,
    };
    re.captures(token)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Escapes mentions that could ping someone. Channel mentions are left
/// alone as they do not ping anybody.
pub fn escape_mentions(content: &str) -> String {
    PINGABLE.replace_all(content, "@\u{200b}$1").into_owned()
}
