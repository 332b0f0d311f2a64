/*
 * pattern.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conversion pattern compiler.
//!
//! A pattern mixes literal text with conversion tokens of the form
//! `%name` or `%name{config}`:
//!
//! | token                        | renders                                   |
//! |------------------------------|-------------------------------------------|
//! | `%date{%Y-%m-%d}`            | the record time, through a layout         |
//! | `%level{upper}`              | the level (`upper`, `color`, ...)         |
//! | `%caller{full}`              | the call site                             |
//! | `%logger`                    | the logger name                           |
//! | `%message`                   | the message, verbatim                     |
//! | `%x{tid:["tid":$0]}`         | one named field, wrapped in literal text  |
//! | `%fields`                    | every other field, as an object           |
//!
//! Compilation never fails. Unknown tokens are emitted as their own raw
//! text, and a `%` that does not start a token is plain text.

use crate::strategy::{CallerEncoder, LevelEncoder, TimeEncoder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// The pattern used when none is configured.
pub const DEFAULT_PATTERN: &str =
    "%date{%Y-%m-%d %H:%M:%S.%3f} %level{upper} %caller %message %fields";

/// `name` or `name:before$0after`.
static FIELD_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)(:(.*)(\$0)(.*))?").expect("field reference regex is valid"));

/// One step of line rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Literal bytes from the pattern.
    Literal(Vec<u8>),
    Time,
    Level,
    /// Caller site, followed by the function name when that is enabled.
    Caller,
    LoggerName,
    Message,
    /// Every field named `name`, each wrapped in `before` and `after`.
    Field {
        name: String,
        before: String,
        after: String,
    },
    /// Every field not consumed by a [`Action::Field`], as an object.
    RemainingFields,
}

/// A compiled pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatPattern {
    pub(crate) source: String,
    pub(crate) actions: Vec<Action>,
    pub(crate) consumed: HashSet<String>,
    pub(crate) time_encoder: Option<TimeEncoder>,
    pub(crate) level_encoder: Option<LevelEncoder>,
    pub(crate) caller_encoder: Option<CallerEncoder>,
}

/// A `%name{config}` token as it appears in the source.
#[derive(Debug, PartialEq)]
struct Token<'a> {
    /// `%name{config}` exactly as written.
    raw: &'a str,
    name: &'a str,
    /// Contents between the braces; `None` if absent or empty.
    config: Option<&'a str>,
}

/// A token and the literal text that follows it up to the next token.
#[derive(Debug, PartialEq)]
struct Segment<'a> {
    token: Option<Token<'a>>,
    text: &'a str,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Length of the name following a `%` at `at`, or 0 if there is none.
fn name_len(bytes: &[u8], at: usize) -> usize {
    bytes[at + 1..]
        .iter()
        .take_while(|&&b| is_name_byte(b))
        .count()
}

/// Split a pattern into segments.
///
/// The first segment has no token when the pattern starts with literal
/// text. A `%` not followed by a name character stays in the literal run.
fn scan(pattern: &str) -> Vec<Segment<'_>> {
    let bytes = pattern.as_bytes();

    // Position of the next token start at or after `from`.
    let next_token = |from: usize| {
        let mut i = from;
        while i < bytes.len() {
            if bytes[i] == b'%' && name_len(bytes, i) > 0 {
                return i;
            }
            i += 1;
        }
        bytes.len()
    };

    let mut segments = Vec::new();
    let first = next_token(0);
    if first > 0 {
        segments.push(Segment {
            token: None,
            text: &pattern[..first],
        });
    }

    let mut pos = first;
    while pos < bytes.len() {
        let name_end = pos + 1 + name_len(bytes, pos);
        let name = &pattern[pos + 1..name_end];

        // `{...}` up to the first `}`, on a single line.
        let mut token_end = name_end;
        let mut config = None;
        if bytes.get(name_end) == Some(&b'{') {
            if let Some(close) = pattern[name_end + 1..].find(['}', '\n']) {
                let close = name_end + 1 + close;
                if bytes[close] == b'}' {
                    let inner = &pattern[name_end + 1..close];
                    config = (!inner.is_empty()).then_some(inner);
                    token_end = close + 1;
                }
            }
        }

        let text_end = next_token(token_end);
        segments.push(Segment {
            token: Some(Token {
                raw: &pattern[pos..token_end],
                name,
                config,
            }),
            text: &pattern[token_end..text_end],
        });
        pos = text_end;
    }

    segments
}

/// Parse `name:before$0after` into its parts.
fn parse_field_reference(config: &str) -> Option<(String, String, String)> {
    let caps = FIELD_REFERENCE.captures(config)?;
    let name = caps.get(1)?.as_str().to_string();
    let before = caps.get(3).map_or("", |m| m.as_str()).to_string();
    let after = caps.get(5).map_or("", |m| m.as_str()).to_string();
    Some((name, before, after))
}

impl FormatPattern {
    /// Compile a pattern.
    pub fn compile(pattern: &str) -> Self {
        let mut compiled = FormatPattern {
            source: pattern.to_string(),
            ..Default::default()
        };

        for segment in scan(pattern) {
            let mut text = segment.text.to_string();

            if let Some(token) = segment.token {
                match token.name {
                    "date" => {
                        if let Some(layout) = token.config {
                            compiled.time_encoder = Some(TimeEncoder::layout(layout));
                        }
                        compiled.actions.push(Action::Time);
                    }
                    "level" => {
                        if let Some(mode) = token.config {
                            compiled.level_encoder = Some(LevelEncoder::from_pattern_mode(mode));
                        }
                        compiled.actions.push(Action::Level);
                    }
                    "caller" => {
                        if let Some(mode) = token.config {
                            compiled.caller_encoder = Some(CallerEncoder::from_pattern_mode(mode));
                        }
                        compiled.actions.push(Action::Caller);
                    }
                    "logger" => compiled.actions.push(Action::LoggerName),
                    "message" => compiled.actions.push(Action::Message),
                    "x" => match token.config.and_then(parse_field_reference) {
                        Some((name, before, after)) => {
                            compiled.consumed.insert(name.clone());
                            compiled.actions.push(Action::Field {
                                name,
                                before,
                                after,
                            });
                        }
                        None => {
                            tracing::warn!(
                                token = token.raw,
                                "field reference needs a field name, e.g. %x{{tid}}; skipping"
                            );
                        }
                    },
                    "fields" => compiled.actions.push(Action::RemainingFields),
                    _ => {
                        tracing::trace!(token = token.raw, "unknown conversion token kept as text");
                        text.insert_str(0, token.raw);
                    }
                }
            }

            if !text.is_empty() {
                compiled.actions.push(Action::Literal(text.into_bytes()));
            }
        }

        tracing::debug!(
            pattern,
            actions = compiled.actions.len(),
            consumed = compiled.consumed.len(),
            "compiled log pattern"
        );
        compiled
    }

    /// The pattern this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether `%x{...}` renders the field named `key`.
    pub fn is_consumed(&self, key: &str) -> bool {
        self.consumed.contains(key)
    }

    pub fn consumed_fields(&self) -> &HashSet<String> {
        &self.consumed
    }

    /// Time strategy from the last configured `%date{...}`.
    pub fn time_encoder(&self) -> Option<&TimeEncoder> {
        self.time_encoder.as_ref()
    }

    /// Level strategy from the last configured `%level{...}`.
    pub fn level_encoder(&self) -> Option<LevelEncoder> {
        self.level_encoder
    }

    /// Caller strategy from the last configured `%caller{...}`.
    pub fn caller_encoder(&self) -> Option<CallerEncoder> {
        self.caller_encoder
    }
}
