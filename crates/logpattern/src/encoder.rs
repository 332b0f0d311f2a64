/*
 * encoder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The line renderer.
//!
//! A [`LogbackEncoder`] is the shared, read-only template: configuration,
//! compiled pattern, buffer pool and any context fields added through
//! [`LogbackEncoder::with_fields`]. Each call to
//! [`LogbackEncoder::encode_entry`] creates a short-lived [`LineWriter`]
//! over a pooled buffer, replays the pattern's actions into it, and hands
//! back the finished line.

use crate::buffer::{Buffer, BufferPool};
use crate::config::EncoderConfig;
use crate::error::EncodeResult;
use crate::escape::{append_escaped_bytes, append_escaped_str};
use crate::field::{ArrayMarshaler, Complex, Field, ObjectMarshaler, Reflected};
use crate::pattern::{Action, FormatPattern};
use crate::record::Record;
use crate::sink::{
    ArrayEncoder, BareText, ObjectEncoder, PrimitiveArrayEncoder, append_complex_parts,
};
use crate::strategy::{duration_nanos, epoch_nanos};
use base64::Engine;
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::sync::Arc;

/// The contract a surrounding logging core expects from an encoder.
pub trait Encoder: Send + Sync {
    /// Render one record and its fields into a finished line.
    fn encode_entry(&self, record: &Record, fields: &[Field]) -> EncodeResult<Buffer>;

    /// A child encoder whose lines carry `fields` as context.
    fn with_fields(&self, fields: &[Field]) -> EncodeResult<Box<dyn Encoder>>;
}

/// A pattern-driven encoder template.
#[derive(Debug, Clone)]
pub struct LogbackEncoder {
    config: Arc<EncoderConfig>,
    pattern: Arc<FormatPattern>,
    pool: Arc<BufferPool>,
    /// Context fields, already encoded.
    context: Vec<u8>,
    /// Namespaces opened by the context fields and not yet closed.
    open_namespaces: usize,
}

impl LogbackEncoder {
    /// Compile `pattern` and build an encoder from it.
    pub fn new(config: EncoderConfig, pattern: &str) -> Self {
        Self::with_pattern(config, Arc::new(FormatPattern::compile(pattern)))
    }

    /// Build an encoder from an already compiled pattern.
    ///
    /// Strategies configured inside the pattern (`%date{...}`,
    /// `%level{...}`, `%caller{...}`) override those in `config`.
    pub fn with_pattern(config: EncoderConfig, pattern: Arc<FormatPattern>) -> Self {
        let mut config = config.normalized();
        if let Some(time_encoder) = pattern.time_encoder() {
            config.time_encoder = time_encoder.clone();
        }
        if let Some(level_encoder) = pattern.level_encoder() {
            config.level_encoder = level_encoder;
        }
        if let Some(caller_encoder) = pattern.caller_encoder() {
            config.caller_encoder = caller_encoder;
        }

        Self {
            config: Arc::new(config),
            pattern,
            pool: BufferPool::new(),
            context: Vec::new(),
            open_namespaces: 0,
        }
    }

    /// Use `pool` for every buffer this encoder and its children check out.
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn pattern(&self) -> &FormatPattern {
        &self.pattern
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    fn line(&self) -> LineWriter<'_> {
        LineWriter {
            config: &self.config,
            pattern: &self.pattern,
            pool: &self.pool,
            buf: self.pool.get(),
            open_namespaces: self.open_namespaces,
            reflect_buf: None,
        }
    }

    /// Render one record.
    ///
    /// Fails only if the reflection fallback fails; the partial line is
    /// then discarded and its buffers go back to the pool.
    pub fn encode_entry(&self, record: &Record, fields: &[Field]) -> EncodeResult<Buffer> {
        let mut line = self.line();
        line.run(record, fields)?;

        if !self.context.is_empty() {
            line.add_element_separator();
            line.buf.append_bytes(&self.context);
        }

        line.close_open_namespaces();

        if !record.stack.is_empty() && !self.config.stacktrace_key.is_empty() {
            line.buf.append_byte(b'\n');
            line.buf.append_str(&record.stack);
        }
        line.buf.append_str(&self.config.line_ending);

        Ok(line.finish())
    }

    /// A child encoder that appends `fields` to every line it renders.
    ///
    /// Namespaces opened here stay open until each line is finalized.
    pub fn with_fields(&self, fields: &[Field]) -> EncodeResult<Self> {
        let mut line = self.line();
        line.buf.append_bytes(&self.context);
        for field in fields {
            field.add_to(&mut line)?;
        }
        let open_namespaces = line.open_namespaces;
        let context = line.finish().into_vec();

        Ok(Self {
            config: Arc::clone(&self.config),
            pattern: Arc::clone(&self.pattern),
            pool: Arc::clone(&self.pool),
            context,
            open_namespaces,
        })
    }
}

impl Encoder for LogbackEncoder {
    fn encode_entry(&self, record: &Record, fields: &[Field]) -> EncodeResult<Buffer> {
        LogbackEncoder::encode_entry(self, record, fields)
    }

    fn with_fields(&self, fields: &[Field]) -> EncodeResult<Box<dyn Encoder>> {
        Ok(Box::new(LogbackEncoder::with_fields(self, fields)?))
    }
}

/// Per-line working state.
///
/// Open for appends from creation until [`LineWriter::finish`], which
/// consumes it. The reflection scratch buffer is taken from the pool the
/// first time a reflected value is encoded.
pub struct LineWriter<'a> {
    config: &'a EncoderConfig,
    pattern: &'a FormatPattern,
    pool: &'a Arc<BufferPool>,
    buf: Buffer,
    open_namespaces: usize,
    reflect_buf: Option<Buffer>,
}

impl LineWriter<'_> {
    /// Run every action of the pattern.
    fn run(&mut self, record: &Record, fields: &[Field]) -> EncodeResult<()> {
        let pattern = self.pattern;
        let config = self.config;

        for action in pattern.actions() {
            match action {
                Action::Literal(bytes) => self.buf.append_bytes(bytes),

                Action::Time => {
                    if let Some(time) = record.time.filter(|_| !config.time_key.is_empty()) {
                        let before = self.buf.len();
                        config
                            .time_encoder
                            .encode(&time, &mut BareText::new(&mut self.buf));
                        if self.buf.len() == before {
                            self.buf.append_int(epoch_nanos(&time));
                        }
                    }
                }

                Action::Level => {
                    if !config.level_key.is_empty() {
                        let rendered = config.level_encoder.render(record.level);
                        if rendered.is_empty() {
                            self.buf.append_str(record.level.as_str());
                        } else {
                            self.buf.append_str(&rendered);
                        }
                    }
                }

                Action::Caller => {
                    if let Some(caller) = &record.caller {
                        if !config.caller_key.is_empty() {
                            let mut rendered = config.caller_encoder.render(caller);
                            if rendered.is_empty() {
                                rendered = caller.to_string();
                            }
                            append_escaped_str(self.buf.vec_mut(), &rendered);
                        }
                        if !config.function_key.is_empty() {
                            self.buf.append_str(&caller.function);
                        }
                    }
                }

                Action::LoggerName => {
                    if !record.logger_name.is_empty() && !config.name_key.is_empty() {
                        let mut rendered = config.name_encoder.render(&record.logger_name);
                        if rendered.is_empty() {
                            rendered = record.logger_name.as_str();
                        }
                        append_escaped_str(self.buf.vec_mut(), rendered);
                    }
                }

                Action::Message => {
                    if !config.message_key.is_empty() {
                        self.buf.append_str(&record.message);
                    }
                }

                Action::Field {
                    name,
                    before,
                    after,
                } => {
                    for field in fields.iter().filter(|f| f.key == *name) {
                        self.buf.append_str(before);
                        field.append_bare_value(&mut self.buf);
                        self.buf.append_str(after);
                    }
                }

                Action::RemainingFields => self.append_remaining_fields(pattern, fields)?,
            }
        }
        Ok(())
    }

    /// `{...}` with every field the pattern does not consume.
    fn append_remaining_fields(
        &mut self,
        pattern: &FormatPattern,
        fields: &[Field],
    ) -> EncodeResult<()> {
        let outer = std::mem::take(&mut self.open_namespaces);
        self.buf.append_byte(b'{');
        let result = fields
            .iter()
            .filter(|f| !pattern.is_consumed(&f.key))
            .try_for_each(|f| f.add_to(&mut *self));
        self.close_open_namespaces();
        self.buf.append_byte(b'}');
        self.open_namespaces = outer;
        result
    }

    /// Consume the writer, returning the line.
    fn finish(self) -> Buffer {
        self.buf
    }

    /// Write `, ` unless the buffer is empty or ends in `{ [ : ,` or space.
    fn add_element_separator(&mut self) {
        match self.buf.last() {
            None | Some(b'{' | b'[' | b':' | b',' | b' ') => {}
            Some(_) => self.buf.append_str(", "),
        }
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_escaped_str(self.buf.vec_mut(), key);
        self.buf.append_str("\": ");
    }

    fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.append_byte(b'}');
        }
        self.open_namespaces = 0;
    }

    fn append_float(&mut self, v: f64, bits: u32) {
        self.add_element_separator();
        if v.is_finite() {
            self.buf.append_float(v, bits);
        } else {
            self.buf.append_byte(b'"');
            self.buf.append_float(v, bits);
            self.buf.append_byte(b'"');
        }
    }

    fn append_complex(&mut self, v: Complex, bits: u32) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_complex_parts(&mut self.buf, v, bits);
        self.buf.append_byte(b'"');
    }

    /// Serialize `value` into the scratch buffer, without a trailing newline.
    fn reflect(&mut self, value: &dyn Reflected) -> EncodeResult<()> {
        let pool = self.pool;
        let scratch = self.reflect_buf.get_or_insert_with(|| pool.get());
        scratch.reset();
        self.config.reflected().encode(value, scratch.vec_mut())?;
        scratch.trim_newline();
        Ok(())
    }

    /// Copy the scratch bytes, or `null` if the reflected encoder wrote none.
    fn append_reflected_bytes(&mut self) {
        match &self.reflect_buf {
            Some(scratch) if !scratch.is_empty() => self.buf.append_bytes(scratch.as_bytes()),
            _ => self.buf.append_str("null"),
        }
    }
}

impl PrimitiveArrayEncoder for LineWriter<'_> {
    fn append_bool(&mut self, v: bool) {
        self.add_element_separator();
        self.buf.append_bool(v);
    }

    fn append_byte_string(&mut self, v: &[u8]) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_escaped_bytes(self.buf.vec_mut(), v);
        self.buf.append_byte(b'"');
    }

    fn append_complex128(&mut self, v: Complex) {
        self.append_complex(v, 64);
    }

    fn append_complex64(&mut self, v: Complex) {
        self.append_complex(v, 32);
    }

    fn append_float64(&mut self, v: f64) {
        self.append_float(v, 64);
    }

    fn append_float32(&mut self, v: f32) {
        self.append_float(f64::from(v), 32);
    }

    fn append_int64(&mut self, v: i64) {
        self.add_element_separator();
        self.buf.append_int(v);
    }

    fn append_uint64(&mut self, v: u64) {
        self.add_element_separator();
        self.buf.append_uint(v);
    }

    fn append_string(&mut self, v: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_escaped_str(self.buf.vec_mut(), v);
        self.buf.append_byte(b'"');
    }
}

impl ArrayEncoder for LineWriter<'_> {
    fn append_duration(&mut self, v: TimeDelta) {
        let before = self.buf.len();
        self.config.duration_encoder.encode(v, self);
        if self.buf.len() == before {
            self.append_int64(duration_nanos(v));
        }
    }

    fn append_time(&mut self, v: DateTime<FixedOffset>) {
        let before = self.buf.len();
        let config = self.config;
        config.time_encoder.encode(&v, self);
        if self.buf.len() == before {
            self.append_int64(epoch_nanos(&v));
        }
    }

    fn append_array(&mut self, v: &dyn ArrayMarshaler) -> EncodeResult<()> {
        self.add_element_separator();
        self.buf.append_byte(b'[');
        let result = v.marshal_log_array(self);
        self.buf.append_byte(b']');
        result
    }

    fn append_object(&mut self, v: &dyn ObjectMarshaler) -> EncodeResult<()> {
        // Only namespaces opened by this object are closed here.
        let outer = std::mem::take(&mut self.open_namespaces);
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let result = v.marshal_log_object(self);
        self.close_open_namespaces();
        self.buf.append_byte(b'}');
        self.open_namespaces = outer;
        result
    }

    fn append_reflected(&mut self, v: Option<&dyn Reflected>) -> EncodeResult<()> {
        match v {
            None => {
                self.add_element_separator();
                self.buf.append_str("null");
            }
            Some(value) => {
                self.reflect(value)?;
                self.add_element_separator();
                self.append_reflected_bytes();
            }
        }
        Ok(())
    }
}

impl ObjectEncoder for LineWriter<'_> {
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> EncodeResult<()> {
        self.add_key(key);
        self.append_array(v)
    }

    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> EncodeResult<()> {
        self.add_key(key);
        self.append_object(v)
    }

    fn add_binary(&mut self, key: &str, v: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(v);
        self.add_string(key, &encoded);
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.add_key(key);
        self.append_byte_string(v);
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.add_key(key);
        self.append_bool(v);
    }

    fn add_complex128(&mut self, key: &str, v: Complex) {
        self.add_key(key);
        self.append_complex128(v);
    }

    fn add_complex64(&mut self, key: &str, v: Complex) {
        self.add_key(key);
        self.append_complex64(v);
    }

    fn add_duration(&mut self, key: &str, v: TimeDelta) {
        self.add_key(key);
        self.append_duration(v);
    }

    fn add_float64(&mut self, key: &str, v: f64) {
        self.add_key(key);
        self.append_float64(v);
    }

    fn add_float32(&mut self, key: &str, v: f32) {
        self.add_key(key);
        self.append_float32(v);
    }

    fn add_int64(&mut self, key: &str, v: i64) {
        self.add_key(key);
        self.append_int64(v);
    }

    fn add_uint64(&mut self, key: &str, v: u64) {
        self.add_key(key);
        self.append_uint64(v);
    }

    fn add_reflected(&mut self, key: &str, v: Option<&dyn Reflected>) -> EncodeResult<()> {
        // Encode first so a failure leaves no dangling key.
        if let Some(value) = v {
            self.reflect(value)?;
            self.add_key(key);
            self.append_reflected_bytes();
        } else {
            self.add_key(key);
            self.buf.append_str("null");
        }
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.add_key(key);
        self.append_string(v);
    }

    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>) {
        self.add_key(key);
        self.append_time(v);
    }
}
