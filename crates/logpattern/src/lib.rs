/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Logback-style pattern encoder for structured log records.
//!
//! A pattern string is compiled once into a list of actions, then every
//! record is rendered into a single text line by replaying those actions.
//! Supported tokens:
//!
//! - Timestamp: `%date` or `%date{%Y-%m-%d %H:%M:%S.%3f}`
//! - Level: `%level`, `%level{upper}`, `%level{color}`, `%level{capitalcolor}`
//! - Caller: `%caller`, `%caller{full}`
//! - Logger name: `%logger`
//! - Message: `%message`
//! - One field by name: `%x{tid}` or `%x{tid:[tid=$0]}`
//! - Every remaining field as a JSON-like object: `%fields`
//!
//! Any other text, including unknown `%tokens`, is copied verbatim.
//!
//! # Example
//!
//! ```ignore
//! use logpattern::{EncoderConfig, Field, Level, LogbackEncoder, Record};
//!
//! let encoder = LogbackEncoder::new(
//!     EncoderConfig::production(),
//!     "%date{%Y-%m-%d} %level{upper} %message %fields",
//! );
//! let record = Record::new(Level::Info, "hello").with_time(now);
//! let line = encoder.encode_entry(&record, &[Field::string("tid", "abc")])?;
//! assert_eq!(line.as_bytes(), b"2024-01-02 INFO hello {\"tid\": \"abc\"}\n");
//! ```

pub mod buffer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod field;
pub mod pattern;
pub mod record;
pub mod registry;
pub mod sink;
pub mod strategy;
pub mod time_layout;

// Re-export main types at crate root
pub use buffer::{Buffer, BufferPool};
pub use config::{EncoderConfig, JsonReflectedEncoder, ReflectedEncoder};
pub use encoder::{Encoder, LineWriter, LogbackEncoder};
pub use error::{EncodeError, EncodeResult, RegistryError};
pub use field::{ArrayMarshaler, Complex, Field, FieldValue, ObjectMarshaler, Reflected};
pub use pattern::{Action, DEFAULT_PATTERN, FormatPattern};
pub use record::{Caller, Level, Record};
pub use registry::{DEFAULT_ENCODING_NAME, EncoderRegistry};
pub use sink::{ArrayEncoder, ObjectEncoder, PrimitiveArrayEncoder};
pub use strategy::{CallerEncoder, DurationEncoder, LevelEncoder, NameEncoder, TimeEncoder};
pub use time_layout::TimeLayout;
