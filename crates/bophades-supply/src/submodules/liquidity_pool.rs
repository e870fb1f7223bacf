//! Protocol-owned liquidity across AMM pools
//!
//! The protocol's share of each pool is the LP tokens held by the configured
//! holders over the pool's LP supply; reserves and OHM are reported pro-rata.

use std::sync::Arc;

use bophades_kernel::{only_parent, Submodule};
use bophades_types::{math, Address, Keycode, SubKeycode};
use parking_lot::RwLock;
use tracing::info;

use crate::error::{SubmoduleError, SubmoduleResult};
use crate::module::SPPLY_KEYCODE;
use crate::submodule::{Reserves, SupplyCommand, SupplySubmodule};
use crate::submodules::pool::LiquidityPool;

pub const LIQUIDITY_POOL_SUBKEYCODE: SubKeycode = SubKeycode::literal("SPPLY.POOL");

#[derive(Default)]
struct PoolSet {
    pools: Vec<Arc<dyn LiquidityPool>>,
    holders: Vec<Address>,
}

pub struct LiquidityPoolSupply {
    address: Address,
    parent: Address,
    ohm: Address,
    state: RwLock<PoolSet>,
}

impl LiquidityPoolSupply {
    pub fn new(address: Address, parent: Address, ohm: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            parent,
            ohm,
            state: RwLock::new(PoolSet::default()),
        })
    }

    pub fn pools(&self) -> Vec<Address> {
        self.state.read().pools.iter().map(|pool| pool.address()).collect()
    }

    pub fn holders(&self) -> Vec<Address> {
        self.state.read().holders.clone()
    }

    fn snapshot(&self) -> (Vec<Arc<dyn LiquidityPool>>, Vec<Address>) {
        let state = self.state.read();
        (state.pools.clone(), state.holders.clone())
    }

    /// Protocol-owned share of each reserve of `pool`
    fn owned_reserves(pool: &dyn LiquidityPool, holders: &[Address]) -> SubmoduleResult<Vec<u128>> {
        let supply = pool.lp_total_supply();
        if supply == 0 {
            return Ok(vec![0; pool.reserves().len()]);
        }
        let mut owned = 0u128;
        for holder in holders {
            owned = math::checked_add(owned, pool.lp_balance_of(holder))?;
        }
        pool.reserves()
            .into_iter()
            .map(|reserve| Ok(math::mul_div(reserve, owned, supply)?))
            .collect()
    }

    fn invalid(reason: &str) -> SubmoduleError {
        SubmoduleError::InvalidParams {
            reason: reason.to_string(),
        }
    }
}

impl Submodule for LiquidityPoolSupply {
    fn subkeycode(&self) -> SubKeycode {
        LIQUIDITY_POOL_SUBKEYCODE
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

impl SupplySubmodule for LiquidityPoolSupply {
    fn get_collateralized_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_borrowable_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_liquidity_ohm(&self) -> SubmoduleResult<u128> {
        let (pools, holders) = self.snapshot();
        let mut total = 0u128;
        for pool in &pools {
            let owned = Self::owned_reserves(pool.as_ref(), &holders)?;
            for (token, amount) in pool.tokens().iter().zip(owned) {
                if *token == self.ohm {
                    total = math::checked_add(total, amount)?;
                }
            }
        }
        Ok(total)
    }

    fn get_protocol_owned_treasury_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_liquidity_reserves(&self) -> SubmoduleResult<Vec<Reserves>> {
        let (pools, holders) = self.snapshot();
        pools
            .iter()
            .map(|pool| {
                Ok(Reserves {
                    source: pool.address(),
                    tokens: pool.tokens(),
                    balances: Self::owned_reserves(pool.as_ref(), &holders)?,
                })
            })
            .collect()
    }

    fn get_source_count(&self) -> usize {
        self.state.read().pools.len()
    }

    fn execute(&self, caller: &Address, command: SupplyCommand) -> SubmoduleResult<()> {
        only_parent(&self.parent, caller)?;
        let name = command.name();
        if let SupplyCommand::AddPool(pool) = &command {
            if !pool.tokens().contains(&self.ohm) {
                return Err(Self::invalid("pool does not contain OHM"));
            }
        }
        {
            let mut state = self.state.write();
            match command {
                SupplyCommand::AddPool(pool) => {
                    let address = pool.address();
                    if state.pools.iter().any(|p| p.address() == address) {
                        return Err(Self::invalid("pool already added"));
                    }
                    state.pools.push(pool);
                }
                SupplyCommand::RemovePool(address) => {
                    let before = state.pools.len();
                    state.pools.retain(|p| p.address() != address);
                    if state.pools.len() == before {
                        return Err(Self::invalid("pool not added"));
                    }
                }
                SupplyCommand::AddHolder(holder) => {
                    if holder.is_zero() || state.holders.contains(&holder) {
                        return Err(Self::invalid("holder is zero or already added"));
                    }
                    state.holders.push(holder);
                }
                SupplyCommand::RemoveHolder(holder) => {
                    let before = state.holders.len();
                    state.holders.retain(|h| *h != holder);
                    if state.holders.len() == before {
                        return Err(Self::invalid("holder not added"));
                    }
                }
                _ => {
                    return Err(SubmoduleError::UnsupportedCommand {
                        submodule: LIQUIDITY_POOL_SUBKEYCODE,
                        command: name.to_string(),
                    })
                }
            }
        }
        info!(command = name, "liquidity pool supply updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submodules::pool::ConstantProductPool;
    use bophades_ledger::{Erc20, TokenLedger};

    #[test]
    fn test_pro_rata_liquidity() {
        let ohm = Arc::new(TokenLedger::new("OHM", 9));
        let dai = Arc::new(TokenLedger::new("DAI", 18));
        let pool = ConstantProductPool::new("OHM-DAI", ohm.clone(), dai.clone());
        let treasury = Address::derive("treasury");
        let lp = Address::derive("lp");
        for who in [&treasury, &lp] {
            ohm.mint(who, 1_000).unwrap();
            dai.mint(who, 4_000).unwrap();
        }
        pool.add_liquidity(&treasury, 1_000, 4_000).unwrap();
        pool.add_liquidity(&lp, 1_000, 4_000).unwrap();

        let parent = Address::derive("SPPLY");
        let submodule = LiquidityPoolSupply::new(Address::derive("pol"), parent, ohm.address());
        submodule.execute(&parent, SupplyCommand::AddPool(pool.clone())).unwrap();
        submodule.execute(&parent, SupplyCommand::AddHolder(treasury)).unwrap();

        // treasury owns half of a pool holding 2000 OHM
        assert_eq!(submodule.get_protocol_owned_liquidity_ohm().unwrap(), 1_000);
        let reserves = submodule.get_protocol_owned_liquidity_reserves().unwrap();
        assert_eq!(reserves[0].source, pool.address());
        assert_eq!(reserves[0].balances, vec![1_000, 4_000]);
        assert_eq!(submodule.get_source_count(), 1);
    }

    #[test]
    fn test_pool_without_ohm_rejected() {
        let dai = Arc::new(TokenLedger::new("DAI", 18));
        let usdc = Arc::new(TokenLedger::new("USDC", 6));
        let pool = ConstantProductPool::new("DAI-USDC", dai, usdc);
        let parent = Address::derive("SPPLY");
        let submodule = LiquidityPoolSupply::new(Address::derive("pol"), parent, Address::derive("token:OHM"));
        assert!(matches!(
            submodule.execute(&parent, SupplyCommand::AddPool(pool)),
            Err(SubmoduleError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_empty_pool_reports_zero() {
        let ohm = Arc::new(TokenLedger::new("OHM", 9));
        let dai = Arc::new(TokenLedger::new("DAI", 18));
        let pool = ConstantProductPool::new("OHM-DAI", ohm.clone(), dai);
        let parent = Address::derive("SPPLY");
        let submodule = LiquidityPoolSupply::new(Address::derive("pol"), parent, ohm.address());
        submodule.execute(&parent, SupplyCommand::AddPool(pool)).unwrap();
        assert_eq!(submodule.get_protocol_owned_liquidity_ohm().unwrap(), 0);
    }
}
