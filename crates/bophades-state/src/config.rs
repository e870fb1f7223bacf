//! Protocol configuration
//!
//! Loaded from an optional TOML file, `config/default` and `config/local`,
//! then `BOPHADES__*` environment variables. Amounts are whole tokens and are
//! scaled by the token's decimals at boot. Accounts are either `0x` hex
//! addresses or labels that are hashed into an address, so `"TRSRY"` names
//! the treasury module itself.

use bophades_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Full protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Kernel executor; also the operator granted every policy role at boot
    pub executor: String,

    /// Clock start; `None` follows the system clock
    pub start_timestamp: Option<u64>,

    /// gOHM index in OHM base units (9 decimals)
    pub gohm_index: u64,

    /// OHM already bridged to other chains, in whole OHM
    pub cross_chain_supply: u64,

    /// Tokens besides OHM
    pub tokens: Vec<TokenConfig>,

    /// Initial balances, in whole tokens
    pub balances: Vec<BalanceConfig>,

    pub treasury: TreasurySettings,

    pub supply: SupplySettings,

    /// Relayer allowed to deliver bridge messages; no bridge pool without one
    pub bridge_relayer: Option<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            executor: "executor".to_string(),
            start_timestamp: Some(1_700_000_000),
            gohm_index: 269_238_508_004,
            cross_chain_supply: 0,
            tokens: vec![
                TokenConfig::new("USDS", 18),
                TokenConfig::new("sUSDS", 18),
                TokenConfig::new("WETH", 18),
            ],
            balances: vec![
                BalanceConfig::new("alice", "OHM", 1_000_000),
                BalanceConfig::new("TRSRY", "OHM", 250_000),
                BalanceConfig::new("dao", "OHM", 50_000),
                BalanceConfig::new("TRSRY", "USDS", 20_000_000),
                BalanceConfig::new("TRSRY", "sUSDS", 15_000_000),
                BalanceConfig::new("clearinghouse", "sUSDS", 5_000_000),
                BalanceConfig::new("TRSRY", "WETH", 1_000),
                BalanceConfig::new("alice", "USDS", 100_000),
            ],
            treasury: TreasurySettings {
                assets: vec![
                    AssetConfig {
                        token: "USDS".to_string(),
                        locations: Vec::new(),
                        categories: vec!["liquid".into(), "stable".into(), "reserves".into()],
                    },
                    AssetConfig {
                        token: "sUSDS".to_string(),
                        locations: vec!["clearinghouse".to_string()],
                        categories: vec!["liquid".into(), "stable".into(), "reserves".into()],
                    },
                    AssetConfig {
                        token: "WETH".to_string(),
                        locations: Vec::new(),
                        categories: vec!["liquid".into(), "volatile".into(), "strategic".into()],
                    },
                ],
            },
            supply: SupplySettings {
                categories: Vec::new(),
                locations: vec![
                    LocationConfig::new("TRSRY", "protocol-owned-treasury"),
                    LocationConfig::new("dao", "dao"),
                ],
                migration_offset: None,
            },
            bridge_relayer: Some("relayer".to_string()),
        }
    }
}

impl ProtocolConfig {
    /// Load from `.env`, config files and `BOPHADES__*` variables
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("BOPHADES")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parse a TOML document; missing fields keep their defaults
    pub fn from_toml(document: &str) -> Result<Self> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u8,
    /// Fee burned on every transfer, in basis points
    #[serde(default)]
    pub transfer_fee_bps: u16,
}

impl TokenConfig {
    pub fn new(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            transfer_fee_bps: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub holder: String,
    pub token: String,
    pub amount: u64,
}

impl BalanceConfig {
    pub fn new(holder: &str, token: &str, amount: u64) -> Self {
        Self {
            holder: holder.to_string(),
            token: token.to_string(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasurySettings {
    pub assets: Vec<AssetConfig>,
}

/// A TRSRY asset with its external locations and categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub token: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplySettings {
    /// Categories added on top of the SPPLY defaults
    pub categories: Vec<SupplyCategoryConfig>,
    pub locations: Vec<LocationConfig>,
    pub migration_offset: Option<MigrationOffsetConfig>,
}

/// An SPPLY category; submodule functions are given by signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCategoryConfig {
    pub name: String,
    #[serde(default)]
    pub use_submodules: bool,
    /// e.g. `getProtocolOwnedTreasuryOhm()`
    pub metric: Option<String>,
    /// e.g. `getProtocolOwnedLiquidityReserves()`
    pub reserves: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub location: String,
    pub category: String,
}

impl LocationConfig {
    pub fn new(location: &str, category: &str) -> Self {
        Self {
            location: location.to_string(),
            category: category.to_string(),
        }
    }
}

/// Unmigrated gOHM held by the legacy migrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOffsetConfig {
    pub location: String,
    /// In whole gOHM
    pub gohm: u64,
}

/// Resolve a configured account: `0x` hex, otherwise a derived label
pub fn resolve_account(account: &str) -> Result<Address> {
    if account.starts_with("0x") {
        return Ok(Address::from_hex(account)?);
    }
    Ok(Address::derive(account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let config = ProtocolConfig::from_toml(
            r#"
            executor = "multisig"
            gohm_index = 100000000000

            [[tokens]]
            symbol = "FEE"
            decimals = 6
            transfer_fee_bps = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.executor, "multisig");
        assert_eq!(config.gohm_index, 100_000_000_000);
        assert_eq!(config.tokens.len(), 1);
        assert_eq!(config.tokens[0].transfer_fee_bps, 100);
        assert_eq!(config.bridge_relayer, ProtocolConfig::default().bridge_relayer);
    }

    #[test]
    fn test_resolve_account() {
        assert_eq!(resolve_account("TRSRY").unwrap(), Address::derive("TRSRY"));
        let hex = format!("0x{}", "11".repeat(20));
        assert_eq!(resolve_account(&hex).unwrap(), Address::from_hex(&hex).unwrap());
        assert!(resolve_account("0xzz").is_err());
    }
}
