//! Error taxonomy for the codec layer.

use thiserror::Error;

/// The single error taxonomy raised by every type in this crate (spec §7).
///
/// Every variant names the type variant and the property it was raised for,
/// so a caller juggling many properties can tell at a glance which one
/// misbehaved.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value's primitive wire category does not match what the type expects.
    #[error("{type_name}[{property}]: type mismatch: {message}")]
    TypeMismatch {
        type_name: &'static str,
        property: String,
        message: String,
    },

    /// A structural check failed: bad UUID/slug shape, non-integer where one
    /// is required, an out-of-range `PositiveInteger`, a non-finite number, etc.
    #[error("{type_name}[{property}]: invalid format: {message}")]
    FormatInvalid {
        type_name: &'static str,
        property: String,
        message: String,
    },

    /// JSON-Schema validation failed.
    #[error("{type_name}[{property}]: schema validation failed: {errors:?}")]
    SchemaInvalid {
        type_name: &'static str,
        property: String,
        errors: Vec<String>,
        value: serde_json::Value,
    },

    /// The payload exceeds the size cap (256 KiB, or 256 KiB - 32 encrypted).
    #[error("{type_name}[{property}]: size exceeded: {message}")]
    SizeExceeded {
        type_name: &'static str,
        property: String,
        message: String,
    },

    /// `filterCondition` or `compare` invoked on a type that does not support it.
    #[error("{type_name}[{property}]: not comparable")]
    NotComparable {
        type_name: &'static str,
        property: String,
    },

    /// A base operation was invoked without an override (defensive default).
    #[error("{type_name}[{property}]: not implemented")]
    NotImplemented {
        type_name: &'static str,
        property: String,
    },

    /// The envelope on deserialize was corrupt: missing chunk count,
    /// malformed base64, truncated ciphertext, or a padding failure.
    #[error("{type_name}[{property}]: decode failure: {message}")]
    DecodeFailure {
        type_name: &'static str,
        property: String,
        message: String,
    },
}

impl CodecError {
    pub fn type_mismatch(type_name: &'static str, property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeMismatch { type_name, property: property.into(), message: message.into() }
    }

    pub fn format_invalid(type_name: &'static str, property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FormatInvalid { type_name, property: property.into(), message: message.into() }
    }

    pub fn schema_invalid(
        type_name: &'static str,
        property: impl Into<String>,
        errors: Vec<String>,
        value: serde_json::Value,
    ) -> Self {
        Self::SchemaInvalid { type_name, property: property.into(), errors, value }
    }

    pub fn size_exceeded(type_name: &'static str, property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SizeExceeded { type_name, property: property.into(), message: message.into() }
    }

    pub fn not_comparable(type_name: &'static str, property: impl Into<String>) -> Self {
        Self::NotComparable { type_name, property: property.into() }
    }

    pub fn not_implemented(type_name: &'static str, property: impl Into<String>) -> Self {
        Self::NotImplemented { type_name, property: property.into() }
    }

    pub fn decode_failure(type_name: &'static str, property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailure { type_name, property: property.into(), message: message.into() }
    }
}

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::format_invalid("UUID", "id", "not a valid uuid");
        assert_eq!(err.to_string(), "UUID[id]: invalid format: not a valid uuid");
    }

    #[test]
    fn test_not_comparable_display() {
        let err = CodecError::not_comparable("Blob", "payload");
        assert_eq!(err.to_string(), "Blob[payload]: not comparable");
    }
}
