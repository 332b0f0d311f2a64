/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Encoder configuration.
//!
//! An [`EncoderConfig`] says which record parts are enabled (a part whose
//! key is empty is omitted), how each part is rendered, and how lines end.
//! It deserializes from the camelCase layout common to structured-logging
//! configs:
//!
//! ```ignore
//! {
//!   "messageKey": "msg",
//!   "levelKey": "level",
//!   "timeKey": "ts",
//!   "levelEncoder": "capital",
//!   "timeEncoder": { "layout": "%Y-%m-%d" }
//! }
//! ```

use crate::error::{EncodeError, EncodeResult};
use crate::field::Reflected;
use crate::strategy::{CallerEncoder, DurationEncoder, LevelEncoder, NameEncoder, TimeEncoder};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Default line terminator.
pub const DEFAULT_LINE_ENDING: &str = "\n";

/// Serializes arbitrary values for [`crate::field::FieldValue::Reflected`].
pub trait ReflectedEncoder: Send + Sync {
    fn encode(&self, value: &dyn Reflected, out: &mut Vec<u8>) -> EncodeResult<()>;
}

/// The default reflection fallback: compact JSON via serde_json, without
/// HTML escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReflectedEncoder;

impl ReflectedEncoder for JsonReflectedEncoder {
    fn encode(&self, value: &dyn Reflected, out: &mut Vec<u8>) -> EncodeResult<()> {
        value.write_json(out).map_err(EncodeError::from)
    }
}

/// Output keys, strategies and line ending for an encoder.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub time_key: String,
    pub name_key: String,
    pub caller_key: String,
    pub function_key: String,
    pub stacktrace_key: String,
    pub skip_line_ending: bool,
    pub line_ending: String,

    pub level_encoder: LevelEncoder,
    pub time_encoder: TimeEncoder,
    pub duration_encoder: DurationEncoder,
    pub caller_encoder: CallerEncoder,
    pub name_encoder: NameEncoder,

    #[serde(skip)]
    pub reflected_encoder: Option<Arc<dyn ReflectedEncoder>>,
}

impl EncoderConfig {
    /// The usual production defaults: every part enabled except the
    /// function name, epoch-seconds timestamps, lowercase levels, short
    /// callers and `\n` line endings.
    pub fn production() -> Self {
        Self {
            message_key: "msg".to_string(),
            level_key: "level".to_string(),
            time_key: "ts".to_string(),
            name_key: "logger".to_string(),
            caller_key: "caller".to_string(),
            function_key: String::new(),
            stacktrace_key: "stacktrace".to_string(),
            skip_line_ending: false,
            line_ending: DEFAULT_LINE_ENDING.to_string(),
            level_encoder: LevelEncoder::default(),
            time_encoder: TimeEncoder::default(),
            duration_encoder: DurationEncoder::default(),
            caller_encoder: CallerEncoder::default(),
            name_encoder: NameEncoder::default(),
            reflected_encoder: None,
        }
    }

    pub fn with_reflected_encoder(mut self, encoder: impl ReflectedEncoder + 'static) -> Self {
        self.reflected_encoder = Some(Arc::new(encoder));
        self
    }

    /// Resolve the line ending: `skip_line_ending` wins, and an empty
    /// ending falls back to `\n`.
    pub fn normalized(mut self) -> Self {
        if self.skip_line_ending {
            self.line_ending = String::new();
        } else if self.line_ending.is_empty() {
            self.line_ending = DEFAULT_LINE_ENDING.to_string();
        }
        if self.reflected_encoder.is_none() {
            self.reflected_encoder = Some(Arc::new(JsonReflectedEncoder));
        }
        self
    }

    pub(crate) fn reflected(&self) -> &dyn ReflectedEncoder {
        match &self.reflected_encoder {
            Some(encoder) => encoder.as_ref(),
            None => &JsonReflectedEncoder,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl fmt::Debug for EncoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderConfig")
            .field("message_key", &self.message_key)
            .field("level_key", &self.level_key)
            .field("time_key", &self.time_key)
            .field("name_key", &self.name_key)
            .field("caller_key", &self.caller_key)
            .field("function_key", &self.function_key)
            .field("stacktrace_key", &self.stacktrace_key)
            .field("skip_line_ending", &self.skip_line_ending)
            .field("line_ending", &self.line_ending)
            .field("level_encoder", &self.level_encoder)
            .field("time_encoder", &self.time_encoder)
            .field("duration_encoder", &self.duration_encoder)
            .field("caller_encoder", &self.caller_encoder)
            .field("name_encoder", &self.name_encoder)
            .field("reflected_encoder", &self.reflected_encoder.is_some())
            .finish()
    }
}
