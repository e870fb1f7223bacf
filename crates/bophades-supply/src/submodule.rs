//! Supply submodule interface
//!
//! SPPLY never calls a submodule by raw selector. Categories store a
//! `SubmoduleMetric` / `SubmoduleReserves` operation, and the parent
//! dispatches it through `SupplySubmodule`. Selectors only appear at the edge
//! (`add_category_by_selectors`), where they are resolved against the fixed
//! allow-list below.

use std::fmt;
use std::sync::Arc;

use bophades_kernel::{ModuleFunction, Submodule};
use bophades_types::{Address, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{SubmoduleError, SubmoduleResult};
use crate::submodules::LiquidityPool;

/// Metric functions every supply submodule exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmoduleMetric {
    CollateralizedOhm,
    ProtocolOwnedBorrowableOhm,
    ProtocolOwnedLiquidityOhm,
    ProtocolOwnedTreasuryOhm,
}

impl SubmoduleMetric {
    pub const ALL: [SubmoduleMetric; 4] = [
        SubmoduleMetric::CollateralizedOhm,
        SubmoduleMetric::ProtocolOwnedBorrowableOhm,
        SubmoduleMetric::ProtocolOwnedLiquidityOhm,
        SubmoduleMetric::ProtocolOwnedTreasuryOhm,
    ];
}

impl ModuleFunction for SubmoduleMetric {
    fn signature(self) -> &'static str {
        match self {
            SubmoduleMetric::CollateralizedOhm => "getCollateralizedOhm()",
            SubmoduleMetric::ProtocolOwnedBorrowableOhm => "getProtocolOwnedBorrowableOhm()",
            SubmoduleMetric::ProtocolOwnedLiquidityOhm => "getProtocolOwnedLiquidityOhm()",
            SubmoduleMetric::ProtocolOwnedTreasuryOhm => "getProtocolOwnedTreasuryOhm()",
        }
    }
}

impl TryFrom<Selector> for SubmoduleMetric {
    type Error = Selector;

    fn try_from(selector: Selector) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.selector() == selector)
            .ok_or(selector)
    }
}

/// Reserves functions every supply submodule exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmoduleReserves {
    ProtocolOwnedLiquidityReserves,
}

impl SubmoduleReserves {
    pub const ALL: [SubmoduleReserves; 1] = [SubmoduleReserves::ProtocolOwnedLiquidityReserves];
}

impl ModuleFunction for SubmoduleReserves {
    fn signature(self) -> &'static str {
        match self {
            SubmoduleReserves::ProtocolOwnedLiquidityReserves => "getProtocolOwnedLiquidityReserves()",
        }
    }
}

impl TryFrom<Selector> for SubmoduleReserves {
    type Error = Selector;

    fn try_from(selector: Selector) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|reserves| reserves.selector() == selector)
            .ok_or(selector)
    }
}

/// Token balances held by one source (a location, pool or vault)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub source: Address,
    pub tokens: Vec<Address>,
    pub balances: Vec<u128>,
}

/// Parent-issued configuration changes, routed through `exec_on_submodule`
#[derive(Clone)]
pub enum SupplyCommand {
    SetGohmOffset(u128),
    SetCollateralizedOhm(u128),
    SetProtocolOwnedBorrowableOhm(u128),
    SetProtocolOwnedLiquidityOhm(u128),
    SetProtocolOwnedTreasuryOhm(u128),
    SetSource(Address),
    AddPool(Arc<dyn LiquidityPool>),
    RemovePool(Address),
    AddHolder(Address),
    RemoveHolder(Address),
}

impl SupplyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SupplyCommand::SetGohmOffset(_) => "setGOhmOffset",
            SupplyCommand::SetCollateralizedOhm(_) => "setCollateralizedOhm",
            SupplyCommand::SetProtocolOwnedBorrowableOhm(_) => "setProtocolOwnedBorrowableOhm",
            SupplyCommand::SetProtocolOwnedLiquidityOhm(_) => "setProtocolOwnedLiquidityOhm",
            SupplyCommand::SetProtocolOwnedTreasuryOhm(_) => "setProtocolOwnedTreasuryOhm",
            SupplyCommand::SetSource(_) => "setSource",
            SupplyCommand::AddPool(_) => "addPool",
            SupplyCommand::RemovePool(_) => "removePool",
            SupplyCommand::AddHolder(_) => "addHolder",
            SupplyCommand::RemoveHolder(_) => "removeHolder",
        }
    }
}

impl fmt::Debug for SupplyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyCommand::SetGohmOffset(v)
            | SupplyCommand::SetCollateralizedOhm(v)
            | SupplyCommand::SetProtocolOwnedBorrowableOhm(v)
            | SupplyCommand::SetProtocolOwnedLiquidityOhm(v)
            | SupplyCommand::SetProtocolOwnedTreasuryOhm(v) => write!(f, "{}({})", self.name(), v),
            SupplyCommand::AddPool(pool) => write!(f, "{}({})", self.name(), pool.address()),
            SupplyCommand::SetSource(a)
            | SupplyCommand::RemovePool(a)
            | SupplyCommand::AddHolder(a)
            | SupplyCommand::RemoveHolder(a) => write!(f, "{}({})", self.name(), a),
        }
    }
}

/// A pluggable data source installed under SPPLY
pub trait SupplySubmodule: Submodule {
    fn get_collateralized_ohm(&self) -> SubmoduleResult<u128>;

    fn get_protocol_owned_borrowable_ohm(&self) -> SubmoduleResult<u128>;

    fn get_protocol_owned_liquidity_ohm(&self) -> SubmoduleResult<u128>;

    fn get_protocol_owned_treasury_ohm(&self) -> SubmoduleResult<u128>;

    fn get_protocol_owned_liquidity_reserves(&self) -> SubmoduleResult<Vec<Reserves>>;

    /// Number of sources the submodule aggregates
    fn get_source_count(&self) -> usize;

    /// Apply a parent-issued command; callers other than the parent are rejected
    fn execute(&self, caller: &Address, command: SupplyCommand) -> SubmoduleResult<()> {
        let _ = caller;
        Err(SubmoduleError::UnsupportedCommand {
            submodule: self.subkeycode(),
            command: command.name().to_string(),
        })
    }

    fn metric(&self, metric: SubmoduleMetric) -> SubmoduleResult<u128> {
        match metric {
            SubmoduleMetric::CollateralizedOhm => self.get_collateralized_ohm(),
            SubmoduleMetric::ProtocolOwnedBorrowableOhm => self.get_protocol_owned_borrowable_ohm(),
            SubmoduleMetric::ProtocolOwnedLiquidityOhm => self.get_protocol_owned_liquidity_ohm(),
            SubmoduleMetric::ProtocolOwnedTreasuryOhm => self.get_protocol_owned_treasury_ohm(),
        }
    }

    fn reserves(&self, reserves: SubmoduleReserves) -> SubmoduleResult<Vec<Reserves>> {
        match reserves {
            SubmoduleReserves::ProtocolOwnedLiquidityReserves => {
                self.get_protocol_owned_liquidity_reserves()
            }
        }
    }
}
