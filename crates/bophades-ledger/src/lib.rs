//! Bophades Ledger - In-memory token ledgers
//!
//! The modules never hold balances themselves; they read and move tokens
//! through these ledgers:
//!
//! - `Erc20` - fungible token interface, implemented by `TokenLedger`
//! - `Gohm` - index-based wrapper exposing `balance_from` / `balance_to`
//! - `NftLedger` - ERC721 ownership records (DEPOS wrapped positions)
//! - `TokenRegistry` - address to token lookup (the "has code" check)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. `total_supply` equals the sum of all balances
//! 3. Every mint, burn and transfer is journaled (append-only)
//! 4. No ledger lock is held while a transfer hook runs

pub mod error;
pub mod gohm;
pub mod nft;
pub mod registry;
pub mod token;

pub use error::*;
pub use gohm::*;
pub use nft::*;
pub use registry::*;
pub use token::*;
