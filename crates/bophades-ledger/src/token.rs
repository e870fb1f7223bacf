//! Fungible token ledger

use std::collections::HashMap;
use std::sync::Arc;

use bophades_types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, Result};

/// Basis point denominator for transfer fees
pub const BPS: u128 = 10_000;

/// The ERC20 surface the modules consume
pub trait Erc20: Send + Sync {
    fn address(&self) -> Address;
    fn symbol(&self) -> &str;
    fn decimals(&self) -> u8;
    fn total_supply(&self) -> u128;
    fn balance_of(&self, account: &Address) -> u128;
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;
    fn approve(&self, owner: &Address, spender: &Address, amount: u128) -> Result<()>;
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<()>;
    /// Move `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> Result<()>;
    fn mint(&self, to: &Address, amount: u128) -> Result<()>;
    /// Burn `amount` from `from`, spending `spender`'s allowance unless they are the same account
    fn burn_from(&self, spender: &Address, from: &Address, amount: u128) -> Result<()>;
}

/// Callback run after every successful transfer, with no ledger lock held.
///
/// Models tokens that call back into the recipient (ERC777-style).
pub trait TransferHook: Send + Sync {
    fn on_transfer(&self, from: &Address, to: &Address, amount: u128);
}

/// Kind of journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Mint,
    Burn,
    Transfer,
    Fee,
}

/// A single journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub kind: EntryKind,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
}

#[derive(Default)]
struct TokenState {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
    entries: Vec<LedgerEntry>,
}

impl TokenState {
    fn balance(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn journal(&mut self, kind: EntryKind, from: Address, to: Address, amount: u128) {
        let sequence = self.entries.len() as u64;
        self.entries.push(LedgerEntry {
            sequence,
            kind,
            from,
            to,
            amount,
        });
    }

    fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        if owner == spender {
            return Ok(());
        }
        let available = self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0);
        if available == u128::MAX {
            return Ok(());
        }
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                available,
                required: amount,
            });
        }
        self.allowances.insert((*owner, *spender), available - amount);
        Ok(())
    }

    fn debit(&mut self, account: &Address, amount: u128) -> Result<()> {
        let available = self.balance(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *account,
                available,
                required: amount,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: u128) -> Result<()> {
        let balance = self
            .balance(account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balances.insert(*account, balance);
        Ok(())
    }
}

/// In-memory ERC20 ledger
///
/// Optionally charges a fee on every transfer (burned), which models the
/// nonstandard tokens TRSRY must tolerate on debt repayment.
pub struct TokenLedger {
    address: Address,
    symbol: String,
    decimals: u8,
    transfer_fee_bps: u16,
    state: RwLock<TokenState>,
    hook: RwLock<Option<Arc<dyn TransferHook>>>,
}

impl TokenLedger {
    /// Create a token whose address is derived from its symbol
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        let symbol = symbol.into();
        let address = Address::derive(&format!("token:{}", symbol));
        Self::with_address(address, symbol, decimals)
    }

    pub fn with_address(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            transfer_fee_bps: 0,
            state: RwLock::new(TokenState::default()),
            hook: RwLock::new(None),
        }
    }

    /// Charge `bps` basis points on every transfer
    pub fn with_transfer_fee(mut self, bps: u16) -> Self {
        self.transfer_fee_bps = bps.min(BPS as u16);
        self
    }

    pub fn set_transfer_hook(&self, hook: Option<Arc<dyn TransferHook>>) {
        *self.hook.write() = hook;
    }

    pub fn transfer_fee_bps(&self) -> u16 {
        self.transfer_fee_bps
    }

    /// All journal entries (append-only)
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().entries.clone()
    }

    fn move_tokens(&self, spender: Option<&Address>, from: &Address, to: &Address, amount: u128) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let fee = amount * u128::from(self.transfer_fee_bps) / BPS;
        {
            let mut state = self.state.write();
            // validate both sides before touching balances
            let available = state.balance(from);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    account: *from,
                    available,
                    required: amount,
                });
            }
            if let Some(spender) = spender {
                state.spend_allowance(from, spender, amount)?;
            }
            state.debit(from, amount)?;
            state.credit(to, amount - fee)?;
            state.journal(EntryKind::Transfer, *from, *to, amount - fee);
            if fee > 0 {
                state.total_supply -= fee;
                state.journal(EntryKind::Fee, *from, Address::ZERO, fee);
            }
        }
        debug!(token = %self.symbol, from = %from.short(), to = %to.short(), amount, fee, "transfer");

        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            hook.on_transfer(from, to, amount - fee);
        }
        Ok(())
    }
}

impl Erc20 for TokenLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn total_supply(&self) -> u128 {
        self.state.read().total_supply
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.state.read().balance(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.state
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.state.write().allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.move_tokens(None, from, to, amount)
    }

    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.move_tokens(Some(spender), from, to, amount)
    }

    fn mint(&self, to: &Address, amount: u128) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let mut state = self.state.write();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        state.credit(to, amount)?;
        state.total_supply = supply;
        state.journal(EntryKind::Mint, Address::ZERO, *to, amount);
        Ok(())
    }

    fn burn_from(&self, spender: &Address, from: &Address, amount: u128) -> Result<()> {
        let mut state = self.state.write();
        let available = state.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *from,
                available,
                required: amount,
            });
        }
        state.spend_allowance(from, spender, amount)?;
        state.debit(from, amount)?;
        state.total_supply -= amount;
        state.journal(EntryKind::Burn, *from, Address::ZERO, amount);
        Ok(())
    }
}
