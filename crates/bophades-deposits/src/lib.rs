//! DEPOS - convertible deposit positions
//!
//! A position records a deposit that can later be converted into OHM at a
//! fixed price before it expires. Positions live in the module's own book and
//! may additionally be wrapped into an ERC721 token for transfer.
//!
//! ```text
//! unwrapped <-> wrapped        (wrap / unwrap, owner only)
//! remaining -> remaining - x   (split, the new position receives x)
//! ```
//!
//! # Invariants
//!
//! 1. A wrapped position's owner, the owner index and the ERC721 owner always agree
//! 2. Splitting conserves the total remaining deposit
//! 3. Only the operator that minted a position may update it
//! 4. Conversion previews are zero once a position has expired

pub mod error;
pub mod module;
pub mod position;

pub use error::{DepositError, Result};
pub use module::{DepositFn, DepositModule, DEPOS_KEYCODE};
pub use position::{
    JsonPositionRenderer, MintParams, Position, PositionTokenRenderer, NON_CONVERSION_EXPIRY, NON_CONVERSION_PRICE,
};
