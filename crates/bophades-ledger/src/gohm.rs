//! gOHM: the index-wrapped governance token
//!
//! One gOHM is worth `index` OHM (index has 9 decimals, gOHM has 18).

use bophades_types::{math, Address, GOHM_DECIMALS};
use parking_lot::RwLock;

use crate::error::{LedgerError, Result};
use crate::token::{Erc20, TokenLedger};

/// Index-based conversion between gOHM and OHM
pub trait Gohm: Erc20 {
    /// Current index, 9 decimals
    fn index(&self) -> u128;

    /// gOHM amount to OHM: `amount * index / 1e18`
    fn balance_from(&self, amount: u128) -> Result<u128>;

    /// OHM amount to gOHM: `amount * 1e18 / index`
    fn balance_to(&self, amount: u128) -> Result<u128>;
}

pub struct GohmToken {
    inner: TokenLedger,
    index: RwLock<u128>,
}

impl GohmToken {
    pub fn new(index: u128) -> Self {
        Self {
            inner: TokenLedger::new("gOHM", GOHM_DECIMALS),
            index: RwLock::new(index),
        }
    }

    /// Rebase the index
    pub fn set_index(&self, index: u128) {
        *self.index.write() = index;
    }
}

impl Gohm for GohmToken {
    fn index(&self) -> u128 {
        *self.index.read()
    }

    fn balance_from(&self, amount: u128) -> Result<u128> {
        let unit = math::scale(GOHM_DECIMALS).map_err(|_| LedgerError::Overflow)?;
        math::mul_div(amount, self.index(), unit).map_err(|_| LedgerError::Overflow)
    }

    fn balance_to(&self, amount: u128) -> Result<u128> {
        let unit = math::scale(GOHM_DECIMALS).map_err(|_| LedgerError::Overflow)?;
        math::mul_div(amount, unit, self.index()).map_err(|_| LedgerError::Overflow)
    }
}

impl Erc20 for GohmToken {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn symbol(&self) -> &str {
        self.inner.symbol()
    }

    fn decimals(&self) -> u8 {
        self.inner.decimals()
    }

    fn total_supply(&self) -> u128 {
        self.inner.total_supply()
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.inner.balance_of(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.inner.allowance(owner, spender)
    }

    fn approve(&self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        self.inner.approve(owner, spender, amount)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.inner.transfer(from, to, amount)
    }

    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.inner.transfer_from(spender, from, to, amount)
    }

    fn mint(&self, to: &Address, amount: u128) -> Result<()> {
        self.inner.mint(to, amount)
    }

    fn burn_from(&self, spender: &Address, from: &Address, amount: u128) -> Result<()> {
        self.inner.burn_from(spender, from, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_from_uses_index() {
        // index 100 OHM per gOHM
        let gohm = GohmToken::new(100_000_000_000);
        let one_gohm = 1_000_000_000_000_000_000u128;
        assert_eq!(gohm.balance_from(one_gohm).unwrap(), 100_000_000_000);
        assert_eq!(gohm.balance_to(100_000_000_000).unwrap(), one_gohm);
    }

    #[test]
    fn test_rebase_changes_conversion() {
        let gohm = GohmToken::new(1_000_000_000);
        let half = 500_000_000_000_000_000u128;
        assert_eq!(gohm.balance_from(half).unwrap(), 500_000_000);
        gohm.set_index(2_000_000_000);
        assert_eq!(gohm.balance_from(half).unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_zero_index_cannot_convert_to() {
        let gohm = GohmToken::new(0);
        assert!(gohm.balance_to(1).is_err());
    }
}
