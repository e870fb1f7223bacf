//! Identity types for Bophades
//!
//! `Address` names every account, token, module and policy. `Selector` is the
//! opaque capability identifier of a single module operation: the first four
//! bytes of the keccak256 hash of its signature.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::TypesError;

/// A 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a human-readable label
    ///
    /// Uses the last 20 bytes of keccak256(label), the same truncation EVM
    /// addresses use.
    pub fn derive(label: &str) -> Self {
        let hash = Keccak256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse a `0x`-prefixed (or bare) 40 character hex string
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(stripped).map_err(|_| TypesError::InvalidHex {
            value: s.to_string(),
        })?;
        let bytes: [u8; 20] = raw.try_into().map_err(|_| TypesError::InvalidHex {
            value: s.to_string(),
        })?;
        Ok(Self(bytes))
    }

    /// Short form used in logs (`0x1234..abcd`)
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}..{}", &full[..4], &full[36..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 4-byte function selector
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// The empty selector, meaning "no operation"
    pub const ZERO: Selector = Selector([0u8; 4]);

    /// Compute the selector of a function signature, e.g. `mintOhm(address,uint256)`
    pub fn from_signature(signature: &str) -> Self {
        let hash = Keccak256::digest(signature.as_bytes());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&hash[..4]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 4]
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let raw = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 4] = raw
            .try_into()
            .map_err(|_| serde::de::Error::custom("selector must be 4 bytes"))?;
        Ok(Selector(bytes))
    }
}
