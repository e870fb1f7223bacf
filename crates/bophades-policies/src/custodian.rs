//! TreasuryCustodian - manual control over TRSRY approvals and debt

use std::sync::Arc;

use bophades_kernel::{require_version, Dependency, Kernel, KernelAdapter, Permissions, Policy};
use bophades_roles::{RolesModule, ROLES_KEYCODE};
use bophades_treasury::{TreasuryFn, TreasuryModule, TRSRY_KEYCODE};
use bophades_types::{math, Address, Keycode, Role};
use serde_json::json;
use tracing::info;

use crate::error::{PolicyError, Result};

pub const CUSTODIAN_ROLE: Role = Role::literal("custodian");

pub struct TreasuryCustodian {
    address: Address,
    adapter: KernelAdapter,
    roles: Dependency<RolesModule>,
    treasury: Dependency<TreasuryModule>,
}

impl TreasuryCustodian {
    pub fn new(kernel: &Arc<Kernel>, address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            roles: Dependency::new(ROLES_KEYCODE),
            treasury: Dependency::new(TRSRY_KEYCODE),
        })
    }

    fn only_custodian(&self, caller: &Address) -> Result<Arc<TreasuryModule>> {
        self.roles.get()?.require_role(&CUSTODIAN_ROLE, caller)?;
        Ok(self.treasury.get()?)
    }

    pub fn grant_withdrawer_approval(
        &self,
        caller: &Address,
        withdrawer: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        treasury.increase_withdraw_approval(&self.address, withdrawer, token, amount)?;
        Ok(())
    }

    pub fn reduce_withdrawer_approval(
        &self,
        caller: &Address,
        withdrawer: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        treasury.decrease_withdraw_approval(&self.address, withdrawer, token, amount)?;
        Ok(())
    }

    pub fn grant_debtor_approval(&self, caller: &Address, debtor: &Address, token: &Address, amount: u128) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        treasury.increase_debtor_approval(&self.address, debtor, token, amount)?;
        Ok(())
    }

    pub fn reduce_debtor_approval(&self, caller: &Address, debtor: &Address, token: &Address, amount: u128) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        treasury.decrease_debtor_approval(&self.address, debtor, token, amount)?;
        Ok(())
    }

    pub fn increase_debt(&self, caller: &Address, token: &Address, debtor: &Address, amount: u128) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        let debt = math::checked_add(treasury.reserve_debt(token, debtor), amount)?;
        treasury.set_debt(&self.address, debtor, token, debt)?;
        Ok(())
    }

    pub fn decrease_debt(&self, caller: &Address, token: &Address, debtor: &Address, amount: u128) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        let debt = math::checked_sub(treasury.reserve_debt(token, debtor), amount)?;
        treasury.set_debt(&self.address, debtor, token, debt)?;
        Ok(())
    }

    /// Zero every TRSRY approval a deactivated policy still holds on `tokens`
    pub fn revoke_policy_approvals(&self, caller: &Address, policy: &Address, tokens: &[Address]) -> Result<()> {
        let treasury = self.only_custodian(caller)?;
        if self.adapter.kernel()?.is_policy_active(policy) {
            return Err(PolicyError::PolicyStillActive { policy: *policy });
        }
        for token in tokens {
            let withdraw = treasury.withdraw_approval(policy, token);
            if withdraw > 0 {
                treasury.decrease_withdraw_approval(&self.address, policy, token, withdraw)?;
            }
            let debt = treasury.debt_approval(policy, token);
            if debt > 0 {
                treasury.decrease_debtor_approval(&self.address, policy, token, debt)?;
            }
        }
        info!(policy = %policy.short(), tokens = tokens.len(), "policy approvals revoked");
        self.adapter.emit(
            self.address,
            "PolicyApprovalsRevoked",
            json!({ "policy": policy, "tokens": tokens }),
        );
        Ok(())
    }
}

impl Policy for TreasuryCustodian {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> bophades_kernel::Result<Vec<Keycode>> {
        let kernel = self.adapter.kernel()?;
        let roles = self.roles.bind(&kernel)?;
        let treasury = self.treasury.bind(&kernel)?;
        require_version(roles.as_ref(), 1)?;
        require_version(treasury.as_ref(), 1)?;
        Ok(vec![TRSRY_KEYCODE, ROLES_KEYCODE])
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        [
            TreasuryFn::IncreaseWithdrawApproval,
            TreasuryFn::DecreaseWithdrawApproval,
            TreasuryFn::IncreaseDebtorApproval,
            TreasuryFn::DecreaseDebtorApproval,
            TreasuryFn::SetDebt,
        ]
        .iter()
        .map(|f| Permissions::new(TRSRY_KEYCODE, *f))
        .collect()
    }
}
