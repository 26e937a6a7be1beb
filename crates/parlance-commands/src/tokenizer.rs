//! Whitespace and quoted-string splitting of message bodies.
//!
//! Tokens are separated by runs of whitespace. A token starting with `"`
//! is quoted: internal whitespace is preserved, `\"` and `\\` escape the
//! quote and the backslash, and a missing closing quote is a hard
//! [`ParseError`]. A quote character inside a bare token is literal.

use std::ops::Range;

use crate::error::ParseError;

const QUOTE: char = '"';
const ESCAPE: char = '\\';

/// One token of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Unescaped token text (quotes stripped for quoted tokens).
    pub text: String,
    /// Byte range of the token in the tokenized string, quotes included.
    pub span: Range<usize>,
    /// Whether the token was quoted.
    pub quoted: bool,
}

impl Token {
    fn new(text: String, span: Range<usize>, quoted: bool) -> Self {
        Self { text, span, quoted }
    }
}

/// Splits `body` into tokens in appearance order.
pub fn tokenize(body: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == QUOTE {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            let mut end = start + QUOTE.len_utf8();

            while let Some((idx, c)) = chars.next() {
                end = idx + c.len_utf8();
                if c == QUOTE {
                    closed = true;
                    break;
                }
                if c == ESCAPE {
                    match chars.peek().copied() {
                        Some((nidx, nc)) if nc == QUOTE || nc == ESCAPE => {
                            chars.next();
                            end = nidx + nc.len_utf8();
                            text.push(nc);
                        }
                        // A backslash before anything else stays literal.
                        _ => text.push(c),
                    }
                } else {
                    text.push(c);
                }
            }

            if !closed {
                return Err(ParseError { offset: start });
            }
            tokens.push(Token::new(text, start..end, true));
        } else {
            let mut text = String::new();
            let mut end = start;

            while let Some(&(idx, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                chars.next();
                text.push(c);
                end = idx + c.len_utf8();
            }
            tokens.push(Token::new(text, start..end, false));
        }
    }

    Ok(tokens)
}
