//! Bophades protocol state - one configured kernel with every module and policy
//!
//! This crate wires the building blocks together so the CLI (and tests) can
//! work with a whole protocol instead of individual modules.
//!
//! ```text
//! ProtocolConfig (TOML / BOPHADES__* env)
//!     │
//!     ▼ Protocol::boot
//! Kernel ── ROLES, MINTR, SPPLY, TRSRY, DEPOS
//!        └─ RolesAdmin, TreasuryCustodian, TreasuryConfig, SupplyConfig,
//!           DepositFacility, BridgeTokenPool
//!     │
//!     ▼ Protocol::snapshot
//! ProtocolSnapshot (metrics, supply categories, treasury assets, bridge)
//! ```
//!
//! # Invariants
//!
//! 1. Boot configures modules only through policies, never by calling modules directly
//! 2. A failed boot step aborts the whole boot
//! 3. Snapshots only read; they never store observations

pub mod config;
pub mod error;
pub mod protocol;
pub mod snapshot;

pub use config::{
    resolve_account, AssetConfig, BalanceConfig, LocationConfig, MigrationOffsetConfig, ProtocolConfig,
    SupplyCategoryConfig, SupplySettings, TokenConfig, TreasurySettings,
};
pub use error::{Result, StateError};
pub use protocol::Protocol;
pub use snapshot::{AssetReport, BridgeReport, MetricReport, ProtocolSnapshot, SupplyCategoryReport};
