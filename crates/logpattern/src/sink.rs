/*
 * sink.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The structured-value emission surface.
//!
//! These traits are what fields, rendering strategies and user marshalers
//! write through. [`crate::encoder::LineWriter`] implements all three; the
//! [`BareText`] adapter implements only [`PrimitiveArrayEncoder`], for text
//! rendered outside any JSON context (the timestamp, level and caller at
//! the top of a line).

use crate::buffer::Buffer;
use crate::error::EncodeResult;
use crate::escape::{append_escaped_bytes, append_escaped_str};
use crate::field::{ArrayMarshaler, Complex, ObjectMarshaler, Reflected};
use chrono::{DateTime, FixedOffset, TimeDelta};

/// Positional scalar values.
pub trait PrimitiveArrayEncoder {
    fn append_bool(&mut self, v: bool);
    fn append_byte_string(&mut self, v: &[u8]);
    fn append_complex128(&mut self, v: Complex);
    fn append_float64(&mut self, v: f64);
    fn append_int64(&mut self, v: i64);
    fn append_uint64(&mut self, v: u64);
    fn append_string(&mut self, v: &str);

    /// Complex number with both parts at 32-bit precision.
    fn append_complex64(&mut self, v: Complex);
    fn append_float32(&mut self, v: f32);

    fn append_int32(&mut self, v: i32) {
        self.append_int64(i64::from(v));
    }
    fn append_int16(&mut self, v: i16) {
        self.append_int64(i64::from(v));
    }
    fn append_int8(&mut self, v: i8) {
        self.append_int64(i64::from(v));
    }
    fn append_isize(&mut self, v: isize) {
        self.append_int64(v as i64);
    }
    fn append_uint32(&mut self, v: u32) {
        self.append_uint64(u64::from(v));
    }
    fn append_uint16(&mut self, v: u16) {
        self.append_uint64(u64::from(v));
    }
    fn append_uint8(&mut self, v: u8) {
        self.append_uint64(u64::from(v));
    }
    fn append_usize(&mut self, v: usize) {
        self.append_uint64(v as u64);
    }
}

/// Positional values, including nested structures.
pub trait ArrayEncoder: PrimitiveArrayEncoder {
    fn append_duration(&mut self, v: TimeDelta);
    fn append_time(&mut self, v: DateTime<FixedOffset>);
    fn append_array(&mut self, v: &dyn ArrayMarshaler) -> EncodeResult<()>;
    fn append_object(&mut self, v: &dyn ObjectMarshaler) -> EncodeResult<()>;
    /// `None` writes `null`.
    fn append_reflected(&mut self, v: Option<&dyn Reflected>) -> EncodeResult<()>;
}

/// Keyed values.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> EncodeResult<()>;
    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> EncodeResult<()>;
    /// Binary payloads are written as standard base64 strings.
    fn add_binary(&mut self, key: &str, v: &[u8]);
    fn add_byte_string(&mut self, key: &str, v: &[u8]);
    fn add_bool(&mut self, key: &str, v: bool);
    fn add_complex128(&mut self, key: &str, v: Complex);
    fn add_complex64(&mut self, key: &str, v: Complex);
    fn add_duration(&mut self, key: &str, v: TimeDelta);
    fn add_float64(&mut self, key: &str, v: f64);
    fn add_float32(&mut self, key: &str, v: f32);
    fn add_int64(&mut self, key: &str, v: i64);
    fn add_uint64(&mut self, key: &str, v: u64);
    fn add_reflected(&mut self, key: &str, v: Option<&dyn Reflected>) -> EncodeResult<()>;
    /// Open a nested object; every later key lands inside it until the
    /// line is finalized.
    fn open_namespace(&mut self, key: &str);
    fn add_string(&mut self, key: &str, v: &str);
    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>);

    fn add_int32(&mut self, key: &str, v: i32) {
        self.add_int64(key, i64::from(v));
    }
    fn add_int16(&mut self, key: &str, v: i16) {
        self.add_int64(key, i64::from(v));
    }
    fn add_int8(&mut self, key: &str, v: i8) {
        self.add_int64(key, i64::from(v));
    }
    fn add_isize(&mut self, key: &str, v: isize) {
        self.add_int64(key, v as i64);
    }
    fn add_uint32(&mut self, key: &str, v: u32) {
        self.add_uint64(key, u64::from(v));
    }
    fn add_uint16(&mut self, key: &str, v: u16) {
        self.add_uint64(key, u64::from(v));
    }
    fn add_uint8(&mut self, key: &str, v: u8) {
        self.add_uint64(key, u64::from(v));
    }
    fn add_usize(&mut self, key: &str, v: usize) {
        self.add_uint64(key, v as u64);
    }
}

/// Append `re±imi`; a `+` is added only when the imaginary part's own
/// formatting carries no sign.
pub(crate) fn append_complex_parts(buf: &mut Buffer, v: Complex, bits: u32) {
    buf.append_float(v.re, bits);
    let imag = crate::buffer::format_float(v.im, bits);
    if !imag.starts_with(['+', '-']) {
        buf.append_byte(b'+');
    }
    buf.append_str(&imag);
    buf.append_byte(b'i');
}

/// Plain text output with no separators and no quoting.
///
/// Strings are still escaped, so a hostile logger name cannot break the
/// line apart.
pub struct BareText<'a> {
    buf: &'a mut Buffer,
}

impl<'a> BareText<'a> {
    pub fn new(buf: &'a mut Buffer) -> Self {
        Self { buf }
    }
}

impl PrimitiveArrayEncoder for BareText<'_> {
    fn append_bool(&mut self, v: bool) {
        self.buf.append_bool(v);
    }

    fn append_byte_string(&mut self, v: &[u8]) {
        append_escaped_bytes(self.buf.vec_mut(), v);
    }

    fn append_complex128(&mut self, v: Complex) {
        append_complex_parts(self.buf, v, 64);
    }

    fn append_complex64(&mut self, v: Complex) {
        append_complex_parts(self.buf, v, 32);
    }

    fn append_float64(&mut self, v: f64) {
        self.buf.append_float(v, 64);
    }

    fn append_float32(&mut self, v: f32) {
        self.buf.append_float(f64::from(v), 32);
    }

    fn append_int64(&mut self, v: i64) {
        self.buf.append_int(v);
    }

    fn append_uint64(&mut self, v: u64) {
        self.buf.append_uint(v);
    }

    fn append_string(&mut self, v: &str) {
        append_escaped_str(self.buf.vec_mut(), v);
    }
}
