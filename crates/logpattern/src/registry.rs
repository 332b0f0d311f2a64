/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Named encoder patterns.

use crate::config::EncoderConfig;
use crate::encoder::LogbackEncoder;
use crate::error::RegistryError;
use crate::pattern::{DEFAULT_PATTERN, FormatPattern};
use std::collections::HashMap;
use std::sync::Arc;

/// The name used when `register` or `build` is given an empty one.
pub const DEFAULT_ENCODING_NAME: &str = "logpattern";

/// Registry of compiled patterns, keyed by encoding name.
#[derive(Debug, Default)]
pub struct EncoderRegistry {
    patterns: HashMap<String, Arc<FormatPattern>>,
}

fn resolve_name(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_ENCODING_NAME
    } else {
        name
    }
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    /// Compile `pattern` and register it under `name`.
    ///
    /// An empty name means [`DEFAULT_ENCODING_NAME`]; an empty pattern
    /// means [`DEFAULT_PATTERN`]. Names can be registered once.
    pub fn register(&mut self, name: &str, pattern: &str) -> Result<(), RegistryError> {
        let name = resolve_name(name);
        if self.patterns.contains_key(name) {
            return Err(RegistryError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let pattern = if pattern.is_empty() {
            DEFAULT_PATTERN
        } else {
            pattern
        };
        let compiled = FormatPattern::compile(pattern);
        tracing::debug!(
            name,
            pattern,
            actions = compiled.actions().len(),
            "registered encoding"
        );
        self.patterns.insert(name.to_string(), Arc::new(compiled));
        Ok(())
    }

    /// Build an encoder for a registered name.
    pub fn build(
        &self,
        name: &str,
        config: EncoderConfig,
    ) -> Result<LogbackEncoder, RegistryError> {
        let name = resolve_name(name);
        let pattern = self
            .patterns
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;
        Ok(LogbackEncoder::with_pattern(config, Arc::clone(pattern)))
    }

    /// The compiled pattern registered under `name`.
    pub fn pattern(&self, name: &str) -> Option<&FormatPattern> {
        self.patterns.get(resolve_name(name)).map(Arc::as_ref)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
