//! MINTR - OHM supply boundary
//!
//! The only path through which OHM is created or destroyed. Minting is
//! bounded by a per-policy approval that the minting itself consumes, and
//! the whole module can be switched off.
//!
//! # Invariants
//!
//! 1. A policy never mints more than its outstanding approval
//! 2. No mint or burn while deactivated
//! 3. Zero-amount mints and burns are rejected

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bophades_kernel::{Kernel, KernelAdapter, KernelError, Module, ModuleFunction};
use bophades_ledger::{Erc20, LedgerError};
use bophades_types::{Address, Keycode};
use parking_lot::RwLock;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

pub const MINTR_KEYCODE: Keycode = Keycode::from_bytes(*b"MINTR");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinterError {
    #[error("Minter is not active")]
    NotActive,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Policy {policy} is not approved to mint {requested} (approved {approved})")]
    NotApproved {
        policy: Address,
        approved: u128,
        requested: u128,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl MinterError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotActive => "MINTR_NOT_ACTIVE",
            Self::ZeroAmount => "MINTR_ZERO_AMOUNT",
            Self::NotApproved { .. } => "MINTR_NOT_APPROVED",
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MinterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinterFn {
    MintOhm,
    BurnOhm,
    IncreaseMintApproval,
    DecreaseMintApproval,
    Activate,
    Deactivate,
}

impl ModuleFunction for MinterFn {
    fn signature(self) -> &'static str {
        match self {
            MinterFn::MintOhm => "mintOhm(address,uint256)",
            MinterFn::BurnOhm => "burnOhm(address,uint256)",
            MinterFn::IncreaseMintApproval => "increaseMintApproval(address,uint256)",
            MinterFn::DecreaseMintApproval => "decreaseMintApproval(address,uint256)",
            MinterFn::Activate => "activate()",
            MinterFn::Deactivate => "deactivate()",
        }
    }
}

struct MinterState {
    active: bool,
    mint_approval: HashMap<Address, u128>,
}

pub struct MinterModule {
    address: Address,
    adapter: KernelAdapter,
    ohm: Arc<dyn Erc20>,
    state: RwLock<MinterState>,
}

impl MinterModule {
    pub fn new(kernel: &Arc<Kernel>, address: Address, ohm: Arc<dyn Erc20>) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            ohm,
            state: RwLock::new(MinterState {
                active: true,
                mint_approval: HashMap::new(),
            }),
        })
    }

    pub fn ohm(&self) -> &Arc<dyn Erc20> {
        &self.ohm
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    pub fn mint_approval(&self, policy: &Address) -> u128 {
        self.state.read().mint_approval.get(policy).copied().unwrap_or(0)
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.is_active() {
            return Err(MinterError::NotActive);
        }
        Ok(())
    }

    /// Mint `amount` OHM to `to`, consuming the caller's approval
    pub fn mint_ohm(&self, caller: &Address, to: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, MinterFn::MintOhm.selector())?;
        self.ensure_active()?;
        if amount == 0 {
            return Err(MinterError::ZeroAmount);
        }

        let approved = self.mint_approval(caller);
        if approved < amount {
            return Err(MinterError::NotApproved {
                policy: *caller,
                approved,
                requested: amount,
            });
        }

        self.ohm.mint(to, amount)?;
        self.state
            .write()
            .mint_approval
            .insert(*caller, approved - amount);

        info!(policy = %caller.short(), to = %to.short(), amount, "OHM minted");
        self.adapter.emit(
            self.address,
            "Mint",
            json!({ "policy": caller, "to": to, "amount": amount.to_string() }),
        );
        Ok(())
    }

    /// Burn `amount` OHM from `from`; `from` must have approved MINTR unless it is MINTR itself
    pub fn burn_ohm(&self, caller: &Address, from: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, MinterFn::BurnOhm.selector())?;
        self.ensure_active()?;
        if amount == 0 {
            return Err(MinterError::ZeroAmount);
        }

        self.ohm.burn_from(&self.address, from, amount)?;

        info!(policy = %caller.short(), from = %from.short(), amount, "OHM burned");
        self.adapter.emit(
            self.address,
            "Burn",
            json!({ "policy": caller, "from": from, "amount": amount.to_string() }),
        );
        Ok(())
    }

    pub fn increase_mint_approval(&self, caller: &Address, policy: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, MinterFn::IncreaseMintApproval.selector())?;
        let approval = {
            let mut state = self.state.write();
            let entry = state.mint_approval.entry(*policy).or_insert(0);
            *entry = entry.saturating_add(amount);
            *entry
        };
        info!(policy = %policy.short(), approval, "mint approval increased");
        self.adapter.emit(
            self.address,
            "IncreaseMintApproval",
            json!({ "policy": policy, "approval": approval.to_string() }),
        );
        Ok(())
    }

    pub fn decrease_mint_approval(&self, caller: &Address, policy: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, MinterFn::DecreaseMintApproval.selector())?;
        let approval = {
            let mut state = self.state.write();
            let entry = state.mint_approval.entry(*policy).or_insert(0);
            *entry = entry.saturating_sub(amount);
            *entry
        };
        info!(policy = %policy.short(), approval, "mint approval decreased");
        self.adapter.emit(
            self.address,
            "DecreaseMintApproval",
            json!({ "policy": policy, "approval": approval.to_string() }),
        );
        Ok(())
    }

    pub fn activate(&self, caller: &Address) -> Result<()> {
        self.permissioned(caller, MinterFn::Activate.selector())?;
        self.state.write().active = true;
        info!("minter activated");
        Ok(())
    }

    /// Emergency stop: all mints and burns fail until reactivated
    pub fn deactivate(&self, caller: &Address) -> Result<()> {
        self.permissioned(caller, MinterFn::Deactivate.selector())?;
        self.state.write().active = false;
        warn!("minter deactivated");
        Ok(())
    }
}

impl Module for MinterModule {
    fn keycode(&self) -> Keycode {
        MINTR_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bophades_kernel::testing::StaticPolicy;
    use bophades_kernel::{Actions, Permissions, Policy, Target};
    use bophades_ledger::TokenLedger;
    use bophades_types::{Clock, OHM_DECIMALS};

    struct Fixture {
        minter: Arc<MinterModule>,
        ohm: Arc<TokenLedger>,
        policy: Address,
        _kernel: Arc<Kernel>,
    }

    fn setup() -> Fixture {
        let executor = Address::derive("executor");
        let kernel = Kernel::new(Address::derive("kernel"), executor, Arc::new(Clock::at(1)));
        let ohm = Arc::new(TokenLedger::new("OHM", OHM_DECIMALS));
        let minter = MinterModule::new(&kernel, Address::derive("MINTR"), ohm.clone());
        kernel
            .execute_action(&executor, Actions::InstallModule, Target::Module(minter.clone()))
            .unwrap();
        let all = [
            MinterFn::MintOhm,
            MinterFn::BurnOhm,
            MinterFn::IncreaseMintApproval,
            MinterFn::DecreaseMintApproval,
            MinterFn::Activate,
            MinterFn::Deactivate,
        ];
        let permissions = all.iter().map(|f| Permissions::new(MINTR_KEYCODE, *f)).collect();
        let policy = StaticPolicy::activate(&kernel, &executor, "minter-policy", permissions).unwrap();
        Fixture {
            minter,
            ohm,
            policy: policy.address(),
            _kernel: kernel,
        }
    }

    #[test]
    fn test_mint_consumes_approval() {
        let f = setup();
        let alice = Address::derive("alice");
        f.minter.increase_mint_approval(&f.policy, &f.policy, 100).unwrap();
        f.minter.mint_ohm(&f.policy, &alice, 60).unwrap();
        assert_eq!(f.ohm.balance_of(&alice), 60);
        assert_eq!(f.minter.mint_approval(&f.policy), 40);

        let result = f.minter.mint_ohm(&f.policy, &alice, 41);
        assert!(matches!(
            result,
            Err(MinterError::NotApproved { approved: 40, requested: 41, .. })
        ));
    }

    #[test]
    fn test_approval_saturates() {
        let f = setup();
        f.minter.increase_mint_approval(&f.policy, &f.policy, u128::MAX).unwrap();
        f.minter.increase_mint_approval(&f.policy, &f.policy, 5).unwrap();
        assert_eq!(f.minter.mint_approval(&f.policy), u128::MAX);

        f.minter.decrease_mint_approval(&f.policy, &f.policy, u128::MAX).unwrap();
        f.minter.decrease_mint_approval(&f.policy, &f.policy, 5).unwrap();
        assert_eq!(f.minter.mint_approval(&f.policy), 0);
    }

    #[test]
    fn test_burn_requires_allowance() {
        let f = setup();
        let alice = Address::derive("alice");
        f.ohm.mint(&alice, 50).unwrap();
        assert!(matches!(
            f.minter.burn_ohm(&f.policy, &alice, 10),
            Err(MinterError::Ledger(LedgerError::InsufficientAllowance { .. }))
        ));
        f.ohm.approve(&alice, &f.minter.address(), 10).unwrap();
        f.minter.burn_ohm(&f.policy, &alice, 10).unwrap();
        assert_eq!(f.ohm.balance_of(&alice), 40);
        assert_eq!(f.ohm.total_supply(), 40);
    }

    #[test]
    fn test_deactivated_rejects_mint_and_burn() {
        let f = setup();
        f.minter.increase_mint_approval(&f.policy, &f.policy, 10).unwrap();
        f.minter.deactivate(&f.policy).unwrap();
        assert_eq!(
            f.minter.mint_ohm(&f.policy, &Address::derive("alice"), 1),
            Err(MinterError::NotActive)
        );
        f.minter.activate(&f.policy).unwrap();
        assert!(f.minter.mint_ohm(&f.policy, &Address::derive("alice"), 1).is_ok());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let f = setup();
        assert_eq!(
            f.minter.mint_ohm(&f.policy, &Address::derive("alice"), 0),
            Err(MinterError::ZeroAmount)
        );
    }
}
