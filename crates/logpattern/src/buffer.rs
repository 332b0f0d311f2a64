/*
 * buffer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Pooled byte buffers.
//!
//! Every rendered line, and every scratch buffer used for reflected values,
//! comes from a [`BufferPool`]. A [`Buffer`] gives its storage back to the
//! pool when dropped, so buffers are released on every exit path.

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::ops::Deref;
use std::sync::Arc;

/// Capacity new buffers start with.
const INITIAL_CAPACITY: usize = 1024;

/// Default number of idle buffers a pool keeps around.
const DEFAULT_RETAINED: usize = 64;

/// Buffers that grew beyond this are dropped instead of recycled.
const MAX_RECYCLED_CAPACITY: usize = 64 * 1024;

/// A free list of byte vectors shared across threads.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
}

impl BufferPool {
    /// Create a pool that keeps up to 64 idle buffers.
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_RETAINED)
    }

    /// Create a pool that keeps up to `max_retained` idle buffers.
    pub fn with_capacity(max_retained: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        })
    }

    /// Create a pool that never retains anything.
    ///
    /// Every checkout allocates and every return frees. Rendering behaves
    /// identically; only allocation changes.
    pub fn unpooled() -> Arc<Self> {
        Self::with_capacity(0)
    }

    /// Check out an empty buffer.
    pub fn get(self: &Arc<Self>) -> Buffer {
        let bytes = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_CAPACITY));
        Buffer {
            bytes,
            pool: Some(Arc::clone(self)),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut bytes: Vec<u8>) {
        if bytes.capacity() > MAX_RECYCLED_CAPACITY {
            return;
        }
        bytes.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            free.push(bytes);
        }
    }
}

/// A growable byte buffer that returns to its pool on drop.
pub struct Buffer {
    bytes: Vec<u8>,
    pool: Option<Arc<BufferPool>>,
}

impl Buffer {
    /// A buffer that belongs to no pool.
    pub fn detached() -> Self {
        Self {
            bytes: Vec::new(),
            pool: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The last byte written, if any.
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// Mutable access to the underlying vector, for the escaper.
    pub(crate) fn vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    pub fn append_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    pub fn append_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    pub fn append_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    pub fn append_bool(&mut self, v: bool) {
        self.append_str(if v { "true" } else { "false" });
    }

    pub fn append_int(&mut self, v: i64) {
        // Writing into a Vec cannot fail.
        let _ = write!(self.bytes, "{v}");
    }

    pub fn append_uint(&mut self, v: u64) {
        let _ = write!(self.bytes, "{v}");
    }

    /// Append a finite float in its shortest round-trip decimal form.
    ///
    /// `bits` selects 32- or 64-bit precision. Non-finite values are written
    /// by [`format_float`]'s rules (`NaN`, `+Inf`, `-Inf`) without quotes.
    pub fn append_float(&mut self, v: f64, bits: u32) {
        self.append_str(&format_float(v, bits));
    }

    /// Remove one trailing `\n`, if present.
    pub fn trim_newline(&mut self) {
        if self.bytes.last() == Some(&b'\n') {
            self.bytes.pop();
        }
    }

    /// Lossy view for tests and diagnostics.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Take the bytes out, releasing nothing back to the pool.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.pool = None;
        std::mem::take(&mut self.bytes)
    }
}

/// Format a float the way the encoder prints numbers.
///
/// Finite values use the shortest representation that round-trips at the
/// requested precision. Non-finite values become `NaN`, `+Inf` or `-Inf`.
pub fn format_float(v: f64, bits: u32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if bits == 32 {
        (v as f32).to_string()
    } else {
        v.to_string()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(std::mem::take(&mut self.bytes));
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}
