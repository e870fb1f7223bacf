//! Error types for identifier parsing and fixed-point math

use thiserror::Error;

/// Result type for type-level operations
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors raised while constructing identifiers or doing checked math
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Keycode is empty, too long or has characters outside A-Z
    #[error("Invalid keycode: {value:?}")]
    InvalidKeycode { value: String },

    /// SubKeycode does not follow `<PARENT>.<SUFFIX>`
    #[error("Invalid subkeycode: {value:?}")]
    InvalidSubKeycode { value: String },

    /// Tag does not fit in its fixed-width encoding
    #[error("Tag {value:?} exceeds {max} bytes")]
    TagTooLong { value: String, max: usize },

    /// Role contains characters outside a-z and '_'
    #[error("Invalid role: {value:?}")]
    InvalidRole { value: String },

    /// Hex string could not be decoded
    #[error("Invalid hex value: {value:?}")]
    InvalidHex { value: String },

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow
    #[error("Arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,
}

impl TypesError {
    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidKeycode { .. } => "INVALID_KEYCODE",
            Self::InvalidSubKeycode { .. } => "INVALID_SUBKEYCODE",
            Self::TagTooLong { .. } => "TAG_TOO_LONG",
            Self::InvalidRole { .. } => "INVALID_ROLE",
            Self::InvalidHex { .. } => "INVALID_HEX",
            Self::Overflow => "OVERFLOW",
            Self::Underflow => "UNDERFLOW",
            Self::DivisionByZero => "DIVISION_BY_ZERO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = TypesError::InvalidKeycode {
            value: "trsry".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_KEYCODE");
        assert_eq!(TypesError::Overflow.error_code(), "OVERFLOW");
    }
}
