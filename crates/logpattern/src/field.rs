/*
 * field.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Structured key/value fields attached to a record.
//!
//! A [`Field`] is a key plus a typed [`FieldValue`]. Fields know how to add
//! themselves to an [`ObjectEncoder`]; nested structures are supplied as
//! [`ObjectMarshaler`] / [`ArrayMarshaler`] implementations, and arbitrary
//! serde values as [`Reflected`] ones.

use crate::buffer::Buffer;
use crate::error::EncodeResult;
use crate::sink::{ArrayEncoder, BareText, ObjectEncoder, PrimitiveArrayEncoder};
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::fmt;
use std::sync::Arc;

/// A complex number, rendered as `"re+imi"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// A value that writes its own keyed contents.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> EncodeResult<()>;
}

/// A value that writes its own positional contents.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> EncodeResult<()>;
}

/// A value encoded through the reflection fallback.
///
/// Implemented for every `serde::Serialize` type.
pub trait Reflected: Send + Sync {
    /// Write this value as JSON into `out`.
    fn write_json(&self, out: &mut Vec<u8>) -> serde_json::Result<()>;
}

impl<T> Reflected for T
where
    T: serde::Serialize + Send + Sync,
{
    fn write_json(&self, out: &mut Vec<u8>) -> serde_json::Result<()> {
        serde_json::to_writer(out, self)
    }
}

/// The typed payload of a field.
#[derive(Clone)]
pub enum FieldValue {
    /// Adds nothing.
    Skip,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Float32(f32),
    Complex128(Complex),
    Complex64(Complex),
    String(String),
    /// Raw bytes that should be text; invalid UTF-8 is replaced.
    ByteString(Vec<u8>),
    /// Opaque bytes, written as base64.
    Binary(Vec<u8>),
    Duration(TimeDelta),
    Time(DateTime<FixedOffset>),
    Object(Arc<dyn ObjectMarshaler>),
    Array(Arc<dyn ArrayMarshaler>),
    /// `None` encodes as `null`.
    Reflected(Option<Arc<dyn Reflected>>),
    /// Opens a nested namespace named by the field key.
    Namespace,
    /// An error message, added as a string.
    Error(String),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Skip => f.write_str("Skip"),
            FieldValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            FieldValue::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            FieldValue::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            FieldValue::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            FieldValue::Float32(v) => f.debug_tuple("Float32").field(v).finish(),
            FieldValue::Complex128(v) => f.debug_tuple("Complex128").field(v).finish(),
            FieldValue::Complex64(v) => f.debug_tuple("Complex64").field(v).finish(),
            FieldValue::String(v) => f.debug_tuple("String").field(v).finish(),
            FieldValue::ByteString(v) => f
                .debug_tuple("ByteString")
                .field(&String::from_utf8_lossy(v))
                .finish(),
            FieldValue::Binary(v) => f.debug_tuple("Binary").field(&v.len()).finish(),
            FieldValue::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            FieldValue::Time(v) => f.debug_tuple("Time").field(v).finish(),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Reflected(None) => f.write_str("Reflected(null)"),
            FieldValue::Reflected(Some(_)) => f.write_str("Reflected(..)"),
            FieldValue::Namespace => f.write_str("Namespace"),
            FieldValue::Error(v) => f.debug_tuple("Error").field(v).finish(),
        }
    }
}

/// A structured key/value pair.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn skip() -> Self {
        Self::new("", FieldValue::Skip)
    }

    pub fn bool(key: impl Into<String>, v: bool) -> Self {
        Self::new(key, FieldValue::Bool(v))
    }

    pub fn int64(key: impl Into<String>, v: i64) -> Self {
        Self::new(key, FieldValue::Int64(v))
    }

    pub fn uint64(key: impl Into<String>, v: u64) -> Self {
        Self::new(key, FieldValue::Uint64(v))
    }

    pub fn float64(key: impl Into<String>, v: f64) -> Self {
        Self::new(key, FieldValue::Float64(v))
    }

    pub fn float32(key: impl Into<String>, v: f32) -> Self {
        Self::new(key, FieldValue::Float32(v))
    }

    pub fn complex128(key: impl Into<String>, v: Complex) -> Self {
        Self::new(key, FieldValue::Complex128(v))
    }

    pub fn complex64(key: impl Into<String>, v: Complex) -> Self {
        Self::new(key, FieldValue::Complex64(v))
    }

    pub fn string(key: impl Into<String>, v: impl Into<String>) -> Self {
        Self::new(key, FieldValue::String(v.into()))
    }

    pub fn byte_string(key: impl Into<String>, v: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::ByteString(v.into()))
    }

    pub fn binary(key: impl Into<String>, v: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::Binary(v.into()))
    }

    pub fn duration(key: impl Into<String>, v: TimeDelta) -> Self {
        Self::new(key, FieldValue::Duration(v))
    }

    pub fn time(key: impl Into<String>, v: DateTime<FixedOffset>) -> Self {
        Self::new(key, FieldValue::Time(v))
    }

    pub fn object(key: impl Into<String>, v: impl ObjectMarshaler + 'static) -> Self {
        Self::new(key, FieldValue::Object(Arc::new(v)))
    }

    pub fn array(key: impl Into<String>, v: impl ArrayMarshaler + 'static) -> Self {
        Self::new(key, FieldValue::Array(Arc::new(v)))
    }

    /// A list of strings, written as a JSON array.
    pub fn strings(key: impl Into<String>, v: Vec<String>) -> Self {
        Self::array(key, Strings(v))
    }

    /// Any serde value, encoded through the reflection fallback.
    pub fn reflected(key: impl Into<String>, v: impl Reflected + 'static) -> Self {
        Self::new(key, FieldValue::Reflected(Some(Arc::new(v))))
    }

    pub fn null(key: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Reflected(None))
    }

    pub fn namespace(key: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Namespace)
    }

    /// An error under the conventional `error` key.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::new("error", FieldValue::Error(err.to_string()))
    }

    /// Add this field to `enc`.
    ///
    /// A failing object or array marshaler still leaves balanced output;
    /// its message is then recorded as an extra `<key>Error` string field.
    /// Failures of the reflection fallback are returned, even from inside a
    /// nested marshaler.
    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) -> EncodeResult<()> {
        let key = self.key.as_str();
        let marshaled = match &self.value {
            FieldValue::Skip => Ok(()),
            FieldValue::Bool(v) => {
                enc.add_bool(key, *v);
                Ok(())
            }
            FieldValue::Int64(v) => {
                enc.add_int64(key, *v);
                Ok(())
            }
            FieldValue::Uint64(v) => {
                enc.add_uint64(key, *v);
                Ok(())
            }
            FieldValue::Float64(v) => {
                enc.add_float64(key, *v);
                Ok(())
            }
            FieldValue::Float32(v) => {
                enc.add_float32(key, *v);
                Ok(())
            }
            FieldValue::Complex128(v) => {
                enc.add_complex128(key, *v);
                Ok(())
            }
            FieldValue::Complex64(v) => {
                enc.add_complex64(key, *v);
                Ok(())
            }
            FieldValue::String(v) => {
                enc.add_string(key, v);
                Ok(())
            }
            FieldValue::ByteString(v) => {
                enc.add_byte_string(key, v);
                Ok(())
            }
            FieldValue::Binary(v) => {
                enc.add_binary(key, v);
                Ok(())
            }
            FieldValue::Duration(v) => {
                enc.add_duration(key, *v);
                Ok(())
            }
            FieldValue::Time(v) => {
                enc.add_time(key, *v);
                Ok(())
            }
            FieldValue::Object(v) => enc.add_object(key, v.as_ref()),
            FieldValue::Array(v) => enc.add_array(key, v.as_ref()),
            FieldValue::Reflected(v) => return enc.add_reflected(key, v.as_deref()),
            FieldValue::Namespace => {
                enc.open_namespace(key);
                Ok(())
            }
            FieldValue::Error(v) => {
                enc.add_string(key, v);
                Ok(())
            }
        };

        match marshaled {
            Err(err) if err.is_reflection() => Err(err),
            Err(err) => {
                enc.add_string(&format!("{key}Error"), &err.to_string());
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Write the value alone, as unquoted text, for `%x{...}` substitution.
    ///
    /// Strings are copied verbatim. Scalars use their plain text form.
    /// Nested structures, reflected values and namespaces write nothing.
    pub(crate) fn append_bare_value(&self, buf: &mut Buffer) {
        if let FieldValue::String(v) | FieldValue::Error(v) = &self.value {
            buf.append_str(v);
            return;
        }
        let mut bare = BareText::new(buf);
        match &self.value {
            FieldValue::ByteString(v) => bare.append_byte_string(v),
            FieldValue::Bool(v) => bare.append_bool(*v),
            FieldValue::Int64(v) => bare.append_int64(*v),
            FieldValue::Uint64(v) => bare.append_uint64(*v),
            FieldValue::Float64(v) => bare.append_float64(*v),
            FieldValue::Float32(v) => bare.append_float32(*v),
            FieldValue::Complex128(v) => bare.append_complex128(*v),
            FieldValue::Complex64(v) => bare.append_complex64(*v),
            FieldValue::Duration(v) => match v.num_nanoseconds() {
                Some(nanos) => bare.append_int64(nanos),
                None => bare.append_string(&v.to_string()),
            },
            FieldValue::Time(v) => bare.append_string(&v.to_rfc3339()),
            FieldValue::String(_)
            | FieldValue::Error(_)
            | FieldValue::Binary(_)
            | FieldValue::Skip
            | FieldValue::Object(_)
            | FieldValue::Array(_)
            | FieldValue::Reflected(_)
            | FieldValue::Namespace => {}
        }
    }
}

/// Array marshaler behind [`Field::strings`].
#[derive(Debug, Clone)]
struct Strings(Vec<String>);

impl ArrayMarshaler for Strings {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> EncodeResult<()> {
        for s in &self.0 {
            enc.append_string(s);
        }
        Ok(())
    }
}
