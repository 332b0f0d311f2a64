/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for encoding and registration.

use thiserror::Error;

/// Errors raised while rendering a line.
///
/// Pattern compilation never fails; everything here comes from user
/// marshalers or from the reflection fallback.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// An object or array marshaler reported a failure.
    #[error("{message}")]
    Marshal { message: String },

    /// The reflection fallback could not serialize a value.
    #[error("Reflection error: {0}")]
    Reflect(#[from] serde_json::Error),

    /// A custom reflected encoder failed.
    #[error("Reflection error: {message}")]
    Custom { message: String },
}

impl EncodeError {
    /// Convenience constructor for marshaler implementations.
    pub fn marshal(message: impl Into<String>) -> Self {
        EncodeError::Marshal {
            message: message.into(),
        }
    }

    /// Whether this error came from the reflection fallback.
    pub fn is_reflection(&self) -> bool {
        matches!(self, EncodeError::Reflect(_) | EncodeError::Custom { .. })
    }
}

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Errors raised by the [`crate::registry::EncoderRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("encoding {name:?} already exists")]
    AlreadyExists { name: String },

    #[error("no encoding registered for {name:?}")]
    NotFound { name: String },
}
