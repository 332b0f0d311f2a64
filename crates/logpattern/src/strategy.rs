/*
 * strategy.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering strategies for timestamps, levels, callers, durations and
//! logger names.
//!
//! Each strategy is a small enum chosen either by [`crate::EncoderConfig`]
//! (by name, e.g. `"iso8601"`) or by a pattern token's configuration
//! (e.g. `%level{upper}`). Unrecognized names select the default variant.

use crate::record::{Caller, Level};
use crate::sink::PrimitiveArrayEncoder;
use crate::time_layout::TimeLayout;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta};
use serde::Deserialize;
use std::borrow::Cow;

/// Nanoseconds since the Unix epoch, saturating outside the i64 range.
pub fn epoch_nanos(t: &DateTime<FixedOffset>) -> i64 {
    t.timestamp_nanos_opt()
        .unwrap_or_else(|| t.timestamp().saturating_mul(1_000_000_000))
}

// ============================================================================
// Time
// ============================================================================

/// How timestamps are written.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TimeEncoder {
    /// Floating-point seconds since the epoch.
    #[default]
    EpochSeconds,
    /// Floating-point milliseconds since the epoch.
    EpochMillis,
    /// Integer nanoseconds since the epoch.
    EpochNanos,
    /// `2006-01-02T15:04:05.000-0700`
    Iso8601,
    /// RFC 3339 with whole seconds.
    Rfc3339,
    /// RFC 3339 with as many fractional digits as needed.
    Rfc3339Nano,
    /// A translated strftime-style layout.
    Layout(TimeLayout),
}

impl TimeEncoder {
    /// Build a layout strategy from a strftime-style layout.
    pub fn layout(layout: &str) -> Self {
        TimeEncoder::Layout(TimeLayout::translate(layout))
    }

    pub fn encode(&self, t: &DateTime<FixedOffset>, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            TimeEncoder::EpochSeconds => enc.append_float64(epoch_nanos(t) as f64 / 1e9),
            TimeEncoder::EpochMillis => enc.append_float64(epoch_nanos(t) as f64 / 1e6),
            TimeEncoder::EpochNanos => enc.append_int64(epoch_nanos(t)),
            TimeEncoder::Iso8601 => {
                enc.append_string(&t.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string())
            }
            TimeEncoder::Rfc3339 => {
                enc.append_string(&t.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            TimeEncoder::Rfc3339Nano => {
                enc.append_string(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TimeEncoder::Layout(layout) => {
                let formatted = layout.format(t);
                if !formatted.is_empty() {
                    enc.append_string(&formatted);
                }
            }
        }
    }
}

impl From<&str> for TimeEncoder {
    fn from(name: &str) -> Self {
        match name {
            "rfc3339nano" | "RFC3339Nano" => TimeEncoder::Rfc3339Nano,
            "rfc3339" | "RFC3339" => TimeEncoder::Rfc3339,
            "iso8601" | "ISO8601" => TimeEncoder::Iso8601,
            "millis" => TimeEncoder::EpochMillis,
            "nanos" => TimeEncoder::EpochNanos,
            _ => TimeEncoder::EpochSeconds,
        }
    }
}

impl<'de> Deserialize<'de> for TimeEncoder {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Layout { layout: String },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Name(name) => TimeEncoder::from(name.as_str()),
            Repr::Layout { layout } => TimeEncoder::layout(&layout),
        })
    }
}

// ============================================================================
// Level
// ============================================================================

/// How levels are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum LevelEncoder {
    /// `info`
    #[default]
    Lowercase,
    /// `info`, wrapped in an ANSI color.
    LowercaseColor,
    /// `INFO`
    Capital,
    /// `INFO`, wrapped in an ANSI color.
    CapitalColor,
}

impl LevelEncoder {
    /// Select a strategy from a `%level{...}` configuration.
    pub fn from_pattern_mode(mode: &str) -> Self {
        match mode {
            "upper" | "capital" => LevelEncoder::Capital,
            "capitalcolor" => LevelEncoder::CapitalColor,
            "color" => LevelEncoder::LowercaseColor,
            _ => LevelEncoder::Lowercase,
        }
    }

    pub fn render(self, level: Level) -> Cow<'static, str> {
        match self {
            LevelEncoder::Lowercase => Cow::Borrowed(level.as_str()),
            LevelEncoder::Capital => Cow::Borrowed(level.capital_str()),
            LevelEncoder::LowercaseColor => colorize(level, level.as_str()),
            LevelEncoder::CapitalColor => colorize(level, level.capital_str()),
        }
    }
}

fn colorize(level: Level, name: &str) -> Cow<'static, str> {
    Cow::Owned(format!("\x1b[{}m{}\x1b[0m", level.color_code(), name))
}

impl From<&str> for LevelEncoder {
    fn from(name: &str) -> Self {
        match name {
            "capital" => LevelEncoder::Capital,
            "capitalColor" => LevelEncoder::CapitalColor,
            "color" => LevelEncoder::LowercaseColor,
            _ => LevelEncoder::Lowercase,
        }
    }
}

impl From<String> for LevelEncoder {
    fn from(name: String) -> Self {
        LevelEncoder::from(name.as_str())
    }
}

// ============================================================================
// Caller
// ============================================================================

/// How call sites are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum CallerEncoder {
    /// `package/file.rs:42`
    #[default]
    Short,
    /// `/full/path/to/package/file.rs:42`
    Full,
}

impl CallerEncoder {
    /// Select a strategy from a `%caller{...}` configuration.
    pub fn from_pattern_mode(mode: &str) -> Self {
        match mode {
            "full" => CallerEncoder::Full,
            _ => CallerEncoder::Short,
        }
    }

    pub fn render(self, caller: &Caller) -> String {
        match self {
            CallerEncoder::Short => caller.trimmed_path(),
            CallerEncoder::Full => caller.full_path(),
        }
    }
}

impl From<&str> for CallerEncoder {
    fn from(name: &str) -> Self {
        CallerEncoder::from_pattern_mode(name)
    }
}

impl From<String> for CallerEncoder {
    fn from(name: String) -> Self {
        CallerEncoder::from(name.as_str())
    }
}

// ============================================================================
// Duration
// ============================================================================

/// How durations are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum DurationEncoder {
    /// Floating-point seconds.
    #[default]
    Seconds,
    /// Integer milliseconds.
    Millis,
    /// Integer nanoseconds.
    Nanos,
}

impl DurationEncoder {
    pub fn encode(self, d: TimeDelta, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            DurationEncoder::Seconds => {
                let secs = d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1e9;
                enc.append_float64(secs);
            }
            DurationEncoder::Millis => enc.append_int64(d.num_milliseconds()),
            DurationEncoder::Nanos => enc.append_int64(duration_nanos(d)),
        }
    }
}

/// Integer nanoseconds, saturating for durations beyond ~292 years.
pub fn duration_nanos(d: TimeDelta) -> i64 {
    d.num_nanoseconds().unwrap_or(if d < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

impl From<&str> for DurationEncoder {
    fn from(name: &str) -> Self {
        match name {
            "nanos" => DurationEncoder::Nanos,
            "ms" => DurationEncoder::Millis,
            _ => DurationEncoder::Seconds,
        }
    }
}

impl From<String> for DurationEncoder {
    fn from(name: String) -> Self {
        DurationEncoder::from(name.as_str())
    }
}

// ============================================================================
// Name
// ============================================================================

/// How logger names are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum NameEncoder {
    #[default]
    Full,
}

impl NameEncoder {
    pub fn render(self, name: &str) -> &str {
        match self {
            NameEncoder::Full => name,
        }
    }
}

impl From<String> for NameEncoder {
    fn from(_name: String) -> Self {
        NameEncoder::Full
    }
}
