//! Fixed-width classification tags
//!
//! Categories, category groups and roles are 32-byte tags compared by exact,
//! case-sensitive byte equality. The all-zero tag is the "empty" value (SPPLY
//! uses it as the uncategorize signal).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Width of every tag
pub const TAG_LEN: usize = 32;

/// Macro to generate 32-byte tag types with common implementations
macro_rules! define_tag_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; TAG_LEN]);

        impl $name {
            /// The empty tag
            pub const EMPTY: $name = $name([0u8; TAG_LEN]);

            /// Encode a tag, right-padded with zero bytes
            pub fn new(value: &str) -> Result<Self, TypesError> {
                let raw = value.as_bytes();
                if raw.len() > TAG_LEN {
                    return Err(TypesError::TagTooLong {
                        value: value.to_string(),
                        max: TAG_LEN,
                    });
                }
                let mut bytes = [0u8; TAG_LEN];
                bytes[..raw.len()].copy_from_slice(raw);
                Ok(Self(bytes))
            }

            /// Compile-time constructor for well-known tags
            pub const fn literal(value: &str) -> Self {
                let raw = value.as_bytes();
                assert!(raw.len() <= TAG_LEN, "tag exceeds 32 bytes");
                let mut bytes = [0u8; TAG_LEN];
                let mut i = 0;
                while i < raw.len() {
                    bytes[i] = raw[i];
                    i += 1;
                }
                Self(bytes)
            }

            pub fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0 == [0u8; TAG_LEN]
            }

            /// The tag without trailing padding
            pub fn as_str(&self) -> &str {
                let len = self.0.iter().position(|&b| b == 0).unwrap_or(TAG_LEN);
                std::str::from_utf8(&self.0[..len]).unwrap_or("")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $name::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_tag_type!(Category, "A supply or treasury category, e.g. `protocol-owned-treasury`");
define_tag_type!(CategoryGroup, "A treasury category group, e.g. `liquidity-preference`");
define_tag_type!(Role, "A ROLES role, e.g. `custodian`");

impl Role {
    /// Only lowercase a-z and `_` are allowed, and the role must not be empty
    pub fn validate(&self) -> Result<(), TypesError> {
        let invalid = || TypesError::InvalidRole {
            value: String::from_utf8_lossy(&self.0).trim_end_matches('\0').to_string(),
        };
        if self.is_empty() {
            return Err(invalid());
        }
        let len = self.as_str().len();
        let body_ok = self.0[..len]
            .iter()
            .all(|&b| b.is_ascii_lowercase() || b == b'_');
        let padding_ok = self.0[len..].iter().all(|&b| b == 0);
        if body_ok && padding_ok {
            Ok(())
        } else {
            Err(invalid())
        }
    }
}
