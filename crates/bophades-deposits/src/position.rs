//! Position records and their token metadata

use bophades_types::Address;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Conversion price marking a position that can never convert
pub const NON_CONVERSION_PRICE: u128 = u128::MAX;

/// Expiry marking a position that never expires (2^48 - 1)
pub const NON_CONVERSION_EXPIRY: u64 = (1 << 48) - 1;

/// A deposit position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// The policy that created the position and may update it
    pub operator: Address,
    pub owner: Address,
    pub asset: Address,
    pub period_months: u8,
    pub remaining_deposit: u128,
    /// Deposit asset per OHM, scaled by the asset's decimals
    pub conversion_price: u128,
    pub expiry: u64,
    /// Whether the position is represented by an ERC721 token
    pub wrapped: bool,
    #[serde(with = "hex_bytes")]
    pub additional_data: Vec<u8>,
}

impl Position {
    pub fn is_convertible(&self) -> bool {
        self.conversion_price != NON_CONVERSION_PRICE && self.expiry != NON_CONVERSION_EXPIRY
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }
}

/// Parameters for `DepositModule::mint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    pub owner: Address,
    pub asset: Address,
    pub period_months: u8,
    pub remaining_deposit: u128,
    pub conversion_price: u128,
    pub expiry: u64,
    pub wrap: bool,
    pub additional_data: Vec<u8>,
}

/// Renders the `token_uri` of a position
pub trait PositionTokenRenderer: Send + Sync {
    fn token_uri(&self, position_id: u64, position: &Position) -> String;
}

/// Inline JSON metadata
#[derive(Debug, Clone, Default)]
pub struct JsonPositionRenderer {
    pub name: String,
}

impl JsonPositionRenderer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PositionTokenRenderer for JsonPositionRenderer {
    fn token_uri(&self, position_id: u64, position: &Position) -> String {
        let metadata = json!({
            "name": format!("{} #{}", self.name, position_id),
            "attributes": [
                { "trait_type": "Asset", "value": position.asset },
                { "trait_type": "Period (months)", "value": position.period_months },
                { "trait_type": "Remaining Deposit", "value": position.remaining_deposit.to_string() },
                { "trait_type": "Conversion Price", "value": position.conversion_price.to_string() },
                { "trait_type": "Expiry", "value": position.expiry },
                { "trait_type": "Convertible", "value": position.is_convertible() },
            ],
        });
        format!("data:application/json;utf8,{metadata}")
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
