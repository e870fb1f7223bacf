//! Manually maintained supply figures
//!
//! For sources that cannot be read on-chain: the parent sets each metric
//! through `exec_on_submodule`.

use std::sync::Arc;

use bophades_kernel::{only_parent, Submodule};
use bophades_types::{Address, Keycode, SubKeycode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SubmoduleError, SubmoduleResult};
use crate::module::SPPLY_KEYCODE;
use crate::submodule::{Reserves, SupplyCommand, SupplySubmodule};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFigures {
    pub collateralized_ohm: u128,
    pub protocol_owned_borrowable_ohm: u128,
    pub protocol_owned_liquidity_ohm: u128,
    pub protocol_owned_treasury_ohm: u128,
    pub source: Address,
}

pub struct CustomSupply {
    subkeycode: SubKeycode,
    address: Address,
    parent: Address,
    ohm: Address,
    figures: RwLock<CustomFigures>,
}

impl CustomSupply {
    /// `subkeycode` must be a valid `SPPLY.*` subkeycode; the registry checks it on install
    pub fn new(
        subkeycode: SubKeycode,
        address: Address,
        parent: Address,
        ohm: Address,
        figures: CustomFigures,
    ) -> Arc<Self> {
        Arc::new(Self {
            subkeycode,
            address,
            parent,
            ohm,
            figures: RwLock::new(figures),
        })
    }

    pub fn figures(&self) -> CustomFigures {
        *self.figures.read()
    }
}

impl Submodule for CustomSupply {
    fn subkeycode(&self) -> SubKeycode {
        self.subkeycode
    }

    fn parent(&self) -> Keycode {
        SPPLY_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn address(&self) -> Address {
        self.address
    }
}

impl SupplySubmodule for CustomSupply {
    fn get_collateralized_ohm(&self) -> SubmoduleResult<u128> {
        Ok(self.figures.read().collateralized_ohm)
    }

    fn get_protocol_owned_borrowable_ohm(&self) -> SubmoduleResult<u128> {
        Ok(self.figures.read().protocol_owned_borrowable_ohm)
    }

    fn get_protocol_owned_liquidity_ohm(&self) -> SubmoduleResult<u128> {
        Ok(self.figures.read().protocol_owned_liquidity_ohm)
    }

    fn get_protocol_owned_treasury_ohm(&self) -> SubmoduleResult<u128> {
        Ok(self.figures.read().protocol_owned_treasury_ohm)
    }

    fn get_protocol_owned_liquidity_reserves(&self) -> SubmoduleResult<Vec<Reserves>> {
        let figures = self.figures();
        Ok(vec![Reserves {
            source: figures.source,
            tokens: vec![self.ohm],
            balances: vec![figures.protocol_owned_liquidity_ohm],
        }])
    }

    fn get_source_count(&self) -> usize {
        1
    }

    fn execute(&self, caller: &Address, command: SupplyCommand) -> SubmoduleResult<()> {
        only_parent(&self.parent, caller)?;
        let name = command.name();
        {
            let mut figures = self.figures.write();
            match command {
                SupplyCommand::SetCollateralizedOhm(v) => figures.collateralized_ohm = v,
                SupplyCommand::SetProtocolOwnedBorrowableOhm(v) => figures.protocol_owned_borrowable_ohm = v,
                SupplyCommand::SetProtocolOwnedLiquidityOhm(v) => figures.protocol_owned_liquidity_ohm = v,
                SupplyCommand::SetProtocolOwnedTreasuryOhm(v) => figures.protocol_owned_treasury_ohm = v,
                SupplyCommand::SetSource(source) => figures.source = source,
                _ => {
                    return Err(SubmoduleError::UnsupportedCommand {
                        submodule: self.subkeycode,
                        command: name.to_string(),
                    })
                }
            }
        }
        info!(subkeycode = %self.subkeycode, command = name, "custom supply updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> Arc<CustomSupply> {
        CustomSupply::new(
            SubKeycode::literal("SPPLY.CUSTOM"),
            Address::derive("custom"),
            Address::derive("SPPLY"),
            Address::derive("OHM"),
            CustomFigures::default(),
        )
    }

    #[test]
    fn test_parent_sets_each_metric() {
        let submodule = custom();
        let parent = Address::derive("SPPLY");
        submodule.execute(&parent, SupplyCommand::SetCollateralizedOhm(5)).unwrap();
        submodule.execute(&parent, SupplyCommand::SetProtocolOwnedLiquidityOhm(7)).unwrap();
        submodule
            .execute(&parent, SupplyCommand::SetSource(Address::derive("vault")))
            .unwrap();

        assert_eq!(submodule.get_collateralized_ohm().unwrap(), 5);
        assert_eq!(submodule.get_protocol_owned_liquidity_ohm().unwrap(), 7);
        let reserves = submodule.get_protocol_owned_liquidity_reserves().unwrap();
        assert_eq!(reserves[0].source, Address::derive("vault"));
        assert_eq!(reserves[0].balances, vec![7]);
    }

    #[test]
    fn test_pool_commands_unsupported() {
        let submodule = custom();
        let result = submodule.execute(
            &Address::derive("SPPLY"),
            SupplyCommand::AddHolder(Address::derive("x")),
        );
        assert!(matches!(result, Err(SubmoduleError::UnsupportedCommand { .. })));
    }
}
