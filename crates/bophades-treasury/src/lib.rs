//! TRSRY - treasury reserves and asset accounting
//!
//! Holds protocol reserves, lends them out to approved debtors, and tracks an
//! asset registry whose balances also count tokens parked at external
//! locations. Assets are classified through category groups.
//!
//! ```text
//! reserve balance = held by TRSRY + total debt
//! asset balance   = reserve balance + sum of location balances
//! ```
//!
//! # Invariants
//!
//! 1. `total_debt[token]` always equals the sum of every debtor's debt in `token`
//! 2. No withdrawal or new debt while deactivated
//! 3. Withdrawals and repayments are not reentrant
//! 4. An asset holds at most one category per group
//! 5. Category balances report the oldest contributing timestamp

pub mod assets;
pub mod error;
pub mod module;
pub mod taxonomy;

pub use error::{Result, TreasuryError};
pub use module::{AssetData, TreasuryFn, TreasuryModule, TRSRY_KEYCODE};
pub use taxonomy::{
    ILLIQUID, LIQUID, LIQUIDITY_PREFERENCE, MARKET_SENSITIVITY, PROTOCOL_OWNED_LIQUIDITY, RESERVES, STABLE,
    STRATEGIC, VALUE_BASKETS, VOLATILE,
};
