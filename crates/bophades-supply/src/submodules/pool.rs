//! Liquidity pool collaborator

use std::sync::Arc;

use bophades_ledger::{Erc20, LedgerError, TokenLedger};
use bophades_types::{math, Address, TypesError};
use tracing::debug;

/// The read surface SPPLY needs from an AMM pool
pub trait LiquidityPool: Send + Sync {
    fn address(&self) -> Address;

    /// Pool tokens, index-aligned with `reserves`
    fn tokens(&self) -> Vec<Address>;

    fn reserves(&self) -> Vec<u128>;

    fn lp_total_supply(&self) -> u128;

    fn lp_balance_of(&self, holder: &Address) -> u128;
}

/// Two-token x*y=k pool whose reserves are its own token balances
pub struct ConstantProductPool {
    address: Address,
    token0: Arc<dyn Erc20>,
    token1: Arc<dyn Erc20>,
    lp: TokenLedger,
}

impl ConstantProductPool {
    pub fn new(label: &str, token0: Arc<dyn Erc20>, token1: Arc<dyn Erc20>) -> Arc<Self> {
        let address = Address::derive(&format!("pool:{label}"));
        Arc::new(Self {
            address,
            token0,
            token1,
            lp: TokenLedger::with_address(Address::derive(&format!("lp:{label}")), format!("{label}-LP"), 18),
        })
    }

    pub fn lp_token(&self) -> &TokenLedger {
        &self.lp
    }

    /// Deposit both tokens from `provider` and mint LP tokens to them
    pub fn add_liquidity(&self, provider: &Address, amount0: u128, amount1: u128) -> Result<u128, LedgerError> {
        let reserve0 = self.token0.balance_of(&self.address);
        let reserve1 = self.token1.balance_of(&self.address);
        let supply = self.lp.total_supply();

        let minted = if supply == 0 {
            let product = amount0.checked_mul(amount1).ok_or(LedgerError::Overflow)?;
            isqrt(product)
        } else {
            let by0 = math::mul_div(amount0, supply, reserve0).map_err(to_ledger)?;
            let by1 = math::mul_div(amount1, supply, reserve1).map_err(to_ledger)?;
            by0.min(by1)
        };

        self.token0.transfer(provider, &self.address, amount0)?;
        self.token1.transfer(provider, &self.address, amount1)?;
        self.lp.mint(provider, minted)?;
        debug!(pool = %self.address.short(), provider = %provider.short(), minted, "liquidity added");
        Ok(minted)
    }
}

fn to_ledger(_: TypesError) -> LedgerError {
    LedgerError::Overflow
}

/// Floor square root
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

impl LiquidityPool for ConstantProductPool {
    fn address(&self) -> Address {
        self.address
    }

    fn tokens(&self) -> Vec<Address> {
        vec![self.token0.address(), self.token1.address()]
    }

    fn reserves(&self) -> Vec<u128> {
        vec![
            self.token0.balance_of(&self.address),
            self.token1.balance_of(&self.address),
        ]
    }

    fn lp_total_supply(&self) -> u128 {
        self.lp.total_supply()
    }

    fn lp_balance_of(&self, holder: &Address) -> u128 {
        self.lp.balance_of(holder)
    }
}
