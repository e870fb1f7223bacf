//! Module capability identifiers
//!
//! A `Keycode` names a module; a `SubKeycode` names a submodule and is always
//! `<PARENT>.<SUFFIX>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Maximum width of a keycode
pub const KEYCODE_LEN: usize = 5;

/// Maximum width of a subkeycode
pub const SUBKEYCODE_LEN: usize = 20;

/// A 5-byte module identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keycode([u8; KEYCODE_LEN]);

impl Keycode {
    /// Build a keycode without validation.
    ///
    /// The kernel validates every keycode at install time, so a malformed
    /// literal fails there rather than here.
    pub const fn from_bytes(bytes: [u8; KEYCODE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse and validate a keycode (1-5 uppercase A-Z characters)
    pub fn new(code: &str) -> Result<Self, TypesError> {
        let raw = code.as_bytes();
        if raw.is_empty() || raw.len() > KEYCODE_LEN {
            return Err(TypesError::InvalidKeycode {
                value: code.to_string(),
            });
        }
        let mut bytes = [0u8; KEYCODE_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        let keycode = Self(bytes);
        keycode.validate()?;
        Ok(keycode)
    }

    /// Check the keycode is non-empty, A-Z only and zero padded
    pub fn validate(&self) -> Result<(), TypesError> {
        let mut seen_padding = false;
        for (i, &b) in self.0.iter().enumerate() {
            if b == 0 {
                if i == 0 {
                    return Err(self.invalid());
                }
                seen_padding = true;
            } else if seen_padding || !b.is_ascii_uppercase() {
                return Err(self.invalid());
            }
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; KEYCODE_LEN] {
        &self.0
    }

    /// The keycode without trailing padding
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(KEYCODE_LEN);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }

    fn invalid(&self) -> TypesError {
        TypesError::InvalidKeycode {
            value: String::from_utf8_lossy(&self.0).into_owned(),
        }
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keycode({})", self.as_str())
    }
}

impl FromStr for Keycode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Keycode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Keycode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Keycode::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A 20-byte submodule identifier of the form `<PARENT>.<SUFFIX>`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubKeycode([u8; SUBKEYCODE_LEN]);

impl SubKeycode {
    /// Encode a subkeycode without validating it against a parent
    pub fn new(code: &str) -> Result<Self, TypesError> {
        let raw = code.as_bytes();
        if raw.is_empty() || raw.len() > SUBKEYCODE_LEN || !code.is_ascii() {
            return Err(TypesError::InvalidSubKeycode {
                value: code.to_string(),
            });
        }
        let mut bytes = [0u8; SUBKEYCODE_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    /// Compile-time constructor for well-known subkeycodes
    pub const fn literal(code: &str) -> Self {
        let raw = code.as_bytes();
        assert!(raw.len() <= SUBKEYCODE_LEN, "subkeycode exceeds 20 bytes");
        let mut bytes = [0u8; SUBKEYCODE_LEN];
        let mut i = 0;
        while i < raw.len() {
            bytes[i] = raw[i];
            i += 1;
        }
        Self(bytes)
    }

    /// The subkeycode without trailing padding
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(SUBKEYCODE_LEN);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }

    /// Validate against the parent keycode.
    ///
    /// The prefix must equal the parent, followed by `.` and a 3+ character
    /// suffix of A-Z, 0-9 or `_`; the remainder must be zero padding.
    pub fn validate_for(&self, parent: &Keycode) -> Result<(), TypesError> {
        let invalid = || TypesError::InvalidSubKeycode {
            value: self.as_str().to_string(),
        };

        let prefix = parent.as_str();
        let len = self.as_str().len();
        if self.0[len..].iter().any(|&b| b != 0) {
            return Err(invalid());
        }

        let suffix = self
            .as_str()
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(invalid)?;

        let valid_char = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_';
        if suffix.len() < 3 || !suffix.chars().all(valid_char) {
            return Err(invalid());
        }
        Ok(())
    }

    /// The keycode portion before the `.`
    pub fn parent_keycode(&self) -> Option<Keycode> {
        let (prefix, _) = self.as_str().split_once('.')?;
        Keycode::new(prefix).ok()
    }
}

impl fmt::Display for SubKeycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for SubKeycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubKeycode({})", self.as_str())
    }
}

impl FromStr for SubKeycode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for SubKeycode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubKeycode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SubKeycode::new(&s).map_err(serde::de::Error::custom)
    }
}
