//! SPPLY - OHM supply accounting
//!
//! Supply is classified by category. A category is either *direct* (the sum
//! of OHM and gOHM held by its locations) or *submodule-backed* (additionally
//! the sum of one metric over every installed submodule). Composite metrics
//! are derived by subtracting categories from the total supply:
//!
//! ```text
//! total          = OHM supply + cross-chain supply
//! circulating    = total - protocol-owned-treasury - dao
//! floating       = circulating - protocol-owned-liquidity - protocol-owned-borrowable
//! collateralized = sum of submodule collateralized OHM
//! backed         = floating - collateralized
//! ```
//!
//! # Invariants
//!
//! 1. A location belongs to at most one category and must be cleared before it moves
//! 2. gOHM is always converted at the live index before summation
//! 3. Any submodule failure fails the whole query; there is no partial aggregation
//! 4. A stored snapshot is returned unchanged until the next store

pub mod error;
pub mod module;
pub mod submodule;
pub mod submodules;

pub use error::{Result, SubmoduleError, SubmoduleResult, SupplyError};
pub use module::{
    CategoryData, Metric, SupplyFn, SupplyModule, DAO, PROTOCOL_OWNED_BORROWABLE, PROTOCOL_OWNED_LIQUIDITY,
    PROTOCOL_OWNED_TREASURY, SPPLY_KEYCODE,
};
pub use submodule::{Reserves, SubmoduleMetric, SubmoduleReserves, SupplyCommand, SupplySubmodule};
