//! Migration offset
//!
//! gOHM that was counted in the total supply but sits unmigrated in the
//! legacy migrator. Reported as protocol-owned treasury OHM at the live index.

use std::sync::Arc;

use bophades_kernel::{only_parent, Submodule};
use bophades_ledger::Gohm;
use bophades_types::{Address, Keycode, SubKeycode};
use parking_lot::RwLock;
use tracing::info;

use crate::error::{SubmoduleError, SubmoduleResult};
use crate::module::SPPLY_KEYCODE;
use crate::submodule::{Reserves, SupplyCommand, SupplySubmodule};

pub const MIGRATION_OFFSET_SUBKEYCODE: SubKeycode = SubKeycode::literal("SPPLY.MIGOFFSET");

pub struct MigrationOffsetSupply {
    address: Address,
    parent: Address,
    gohm: Arc<dyn Gohm>,
    location: Address,
    gohm_offset: RwLock<u128>,
}

impl MigrationOffsetSupply {
    pub fn new(
        address: Address,
        parent: Address,
        gohm: Arc<dyn Gohm>,
        location: Address,
        gohm_offset: u128,
    ) -> Arc<Self> {
        Arc::new(Self {
            address,
            parent,
            gohm,
            location,
            gohm_offset: RwLock::new(gohm_offset),
        })
    }

    pub fn gohm_offset(&self) -> u128 {
        *self.gohm_offset.read()
    }

    pub fn location(&self) -> Address {
        self.location
    }
}

impl Submodule for MigrationOffsetSupply {
    fn subkeycode(&self) -> SubKeycode {
        MIGRATION_OFFSET_SUBKEYCODE
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

impl SupplySubmodule for MigrationOffsetSupply {
    fn get_collateralized_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_borrowable_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_liquidity_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_treasury_ohm(&self) -> SubmoduleResult<u128> {
        Ok(self.gohm.balance_from(self.gohm_offset())?)
    }

    fn get_protocol_owned_liquidity_reserves(&self) -> SubmoduleResult<Vec<Reserves>> {
        Ok(Vec::new())
    }

    fn get_source_count(&self) -> usize {
        1
    }

    fn execute(&self, caller: &Address, command: SupplyCommand) -> SubmoduleResult<()> {
        only_parent(&self.parent, caller)?;
        match command {
            SupplyCommand::SetGohmOffset(offset) => {
                *self.gohm_offset.write() = offset;
                info!(offset, "gOHM migration offset updated");
                Ok(())
            }
            other => Err(SubmoduleError::UnsupportedCommand {
                submodule: self.subkeycode(),
                command: other.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bophades_kernel::KernelError;
    use bophades_ledger::GohmToken;

    fn offset() -> Arc<MigrationOffsetSupply> {
        // index 100 OHM per gOHM
        let gohm = Arc::new(GohmToken::new(100_000_000_000));
        MigrationOffsetSupply::new(
            Address::derive("SPPLY.MIGOFFSET"),
            Address::derive("SPPLY"),
            gohm,
            Address::derive("migrator"),
            2_000_000_000_000_000_000,
        )
    }

    #[test]
    fn test_offset_converted_at_index() {
        let submodule = offset();
        // 2 gOHM * 100 = 200 OHM (9 decimals)
        assert_eq!(submodule.get_protocol_owned_treasury_ohm().unwrap(), 200_000_000_000);
        assert_eq!(submodule.get_collateralized_ohm().unwrap(), 0);
        assert!(submodule.subkeycode().validate_for(&SPPLY_KEYCODE).is_ok());
    }

    #[test]
    fn test_only_parent_sets_offset() {
        let submodule = offset();
        let result = submodule.execute(&Address::derive("mallory"), SupplyCommand::SetGohmOffset(0));
        assert!(matches!(
            result,
            Err(SubmoduleError::Kernel(KernelError::OnlyParent { .. }))
        ));
        submodule
            .execute(&Address::derive("SPPLY"), SupplyCommand::SetGohmOffset(0))
            .unwrap();
        assert_eq!(submodule.get_protocol_owned_treasury_ohm().unwrap(), 0);
    }

    #[test]
    fn test_unsupported_command() {
        let submodule = offset();
        let result = submodule.execute(&Address::derive("SPPLY"), SupplyCommand::SetCollateralizedOhm(1));
        assert!(matches!(result, Err(SubmoduleError::UnsupportedCommand { .. })));
    }
}
