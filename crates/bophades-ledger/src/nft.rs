//! ERC721 ownership ledger

use std::collections::{HashMap, HashSet};

use bophades_types::Address;
use parking_lot::RwLock;

use crate::error::{LedgerError, Result};

#[derive(Default)]
struct NftState {
    owners: HashMap<u64, Address>,
    balances: HashMap<Address, u64>,
    approvals: HashMap<u64, Address>,
    operators: HashSet<(Address, Address)>,
}

/// Non-fungible token ledger
pub struct NftLedger {
    name: String,
    symbol: String,
    state: RwLock<NftState>,
}

impl NftLedger {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            state: RwLock::new(NftState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exists(&self, token_id: u64) -> bool {
        self.state.read().owners.contains_key(&token_id)
    }

    pub fn owner_of(&self, token_id: u64) -> Result<Address> {
        self.state
            .read()
            .owners
            .get(&token_id)
            .copied()
            .ok_or(LedgerError::TokenNotMinted { token_id })
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.state.read().balances.get(owner).copied().unwrap_or(0)
    }

    pub fn get_approved(&self, token_id: u64) -> Option<Address> {
        self.state.read().approvals.get(&token_id).copied()
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.state.read().operators.contains(&(*owner, *operator))
    }

    pub fn mint(&self, to: &Address, token_id: u64) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let mut state = self.state.write();
        if state.owners.contains_key(&token_id) {
            return Err(LedgerError::TokenAlreadyMinted { token_id });
        }
        state.owners.insert(token_id, *to);
        *state.balances.entry(*to).or_default() += 1;
        Ok(())
    }

    pub fn burn(&self, token_id: u64) -> Result<()> {
        let mut state = self.state.write();
        let owner = state
            .owners
            .remove(&token_id)
            .ok_or(LedgerError::TokenNotMinted { token_id })?;
        state.approvals.remove(&token_id);
        if let Some(balance) = state.balances.get_mut(&owner) {
            *balance = balance.saturating_sub(1);
        }
        Ok(())
    }

    /// Approve `spender` for a single token; only the owner or an operator may approve
    pub fn approve(&self, caller: &Address, spender: &Address, token_id: u64) -> Result<()> {
        let mut state = self.state.write();
        let owner = *state
            .owners
            .get(&token_id)
            .ok_or(LedgerError::TokenNotMinted { token_id })?;
        if *caller != owner && !state.operators.contains(&(owner, *caller)) {
            return Err(LedgerError::NotOwnerOrApproved {
                token_id,
                caller: *caller,
            });
        }
        state.approvals.insert(token_id, *spender);
        Ok(())
    }

    pub fn set_approval_for_all(&self, owner: &Address, operator: &Address, approved: bool) {
        let mut state = self.state.write();
        if approved {
            state.operators.insert((*owner, *operator));
        } else {
            state.operators.remove(&(*owner, *operator));
        }
    }

    /// Transfer a token; `caller` must be the owner, approved, or an operator
    pub fn transfer_from(&self, caller: &Address, from: &Address, to: &Address, token_id: u64) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let mut state = self.state.write();
        let owner = *state
            .owners
            .get(&token_id)
            .ok_or(LedgerError::TokenNotMinted { token_id })?;
        if owner != *from {
            return Err(LedgerError::WrongFrom {
                token_id,
                from: *from,
            });
        }
        let authorized = *caller == owner
            || state.approvals.get(&token_id) == Some(caller)
            || state.operators.contains(&(owner, *caller));
        if !authorized {
            return Err(LedgerError::NotOwnerOrApproved {
                token_id,
                caller: *caller,
            });
        }

        state.approvals.remove(&token_id);
        if let Some(balance) = state.balances.get_mut(from) {
            *balance = balance.saturating_sub(1);
        }
        *state.balances.entry(*to).or_default() += 1;
        state.owners.insert(token_id, *to);
        Ok(())
    }
}
