//! Bophades Types - Canonical identifier and accounting types
//!
//! This crate contains the foundational types shared by the kernel, every
//! module and every policy. It has zero dependencies on other bophades crates.
//!
//! - Identity types (`Address`, `Selector`)
//! - Capability identifiers (`Keycode`, `SubKeycode`)
//! - Classification tags (`Category`, `CategoryGroup`, `Role`)
//! - Snapshot types (`Cache`, `Variant`)
//! - The shared block `Clock`
//! - Fixed-point helpers for 9/18 decimal token math
//!
//! # Invariants
//!
//! 1. Keycodes are 1-5 uppercase ASCII letters, zero padded
//! 2. SubKeycodes are always prefixed by their parent keycode
//! 3. All tag comparisons are exact, case-sensitive byte equality
//! 4. Arithmetic never wraps silently

pub mod cache;
pub mod clock;
pub mod error;
pub mod identity;
pub mod keycode;
pub mod math;
pub mod tag;

pub use cache::*;
pub use clock::*;
pub use error::*;
pub use identity::*;
pub use keycode::*;
pub use tag::*;

/// Decimals of the OHM token
pub const OHM_DECIMALS: u8 = 9;

/// Decimals of the gOHM token
pub const GOHM_DECIMALS: u8 = 18;

/// Decimals of the gOHM index
pub const INDEX_DECIMALS: u8 = 9;
