//! DepositFacility - takes reserve deposits into TRSRY and converts them to OHM
//!
//! Deposits move the asset straight from the depositor into TRSRY and record a
//! DEPOS position operated by this facility. Conversion consumes position
//! balance and mints OHM at the position's conversion price; the deposit stays
//! in the treasury as payment.

use std::collections::BTreeSet;
use std::sync::Arc;

use bophades_deposits::{DepositError, DepositFn, DepositModule, MintParams, DEPOS_KEYCODE};
use bophades_kernel::{
    require_version, Dependency, Kernel, KernelAdapter, Module, ModuleFunction, Permissions, Policy,
};
use bophades_ledger::Erc20;
use bophades_minter::{MinterError, MinterFn, MinterModule, MINTR_KEYCODE};
use bophades_roles::{RolesModule, ROLES_KEYCODE};
use bophades_treasury::{TreasuryModule, TRSRY_KEYCODE};
use bophades_types::{math, Address, Keycode, Role};
use serde_json::json;
use tracing::info;

use crate::enabler::{Enabled, PolicyEnabler};
use crate::error::{PolicyError, Result};

/// May open deposits on behalf of depositors
pub const DEPOSIT_OPERATOR_ROLE: Role = Role::literal("deposit_operator");

/// Length of a deposit period month, in seconds
pub const MONTH: u64 = 30 * 24 * 60 * 60;

/// A deposit to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub depositor: Address,
    pub asset: Address,
    pub amount: u128,
    pub period_months: u8,
    /// Deposit asset per OHM, in the asset's decimals
    pub conversion_price: u128,
    pub wrap: bool,
}

pub struct DepositFacility {
    address: Address,
    adapter: KernelAdapter,
    enabler: PolicyEnabler,
    roles: Dependency<RolesModule>,
    treasury: Dependency<TreasuryModule>,
    minter: Dependency<MinterModule>,
    deposits: Dependency<DepositModule>,
}

impl DepositFacility {
    pub fn new(kernel: &Arc<Kernel>, address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            enabler: PolicyEnabler::new(),
            roles: Dependency::new(ROLES_KEYCODE),
            treasury: Dependency::new(TRSRY_KEYCODE),
            minter: Dependency::new(MINTR_KEYCODE),
            deposits: Dependency::new(DEPOS_KEYCODE),
        })
    }

    /// Pull `request.amount` from the depositor into TRSRY and open a position
    ///
    /// The depositor must have approved this facility on the asset.
    pub fn deposit(&self, caller: &Address, request: DepositRequest) -> Result<u64> {
        self.enabler.require_enabled()?;
        self.roles.get()?.require_role(&DEPOSIT_OPERATOR_ROLE, caller)?;
        if request.depositor.is_zero() {
            return Err(PolicyError::invalid("depositor is the zero address"));
        }
        if request.amount == 0 || request.conversion_price == 0 || request.period_months == 0 {
            return Err(PolicyError::invalid("amount, price and period must be non-zero"));
        }

        let treasury = self.treasury.get()?;
        let deposits = self.deposits.get()?;
        let token = treasury.tokens().get(&request.asset)?;
        let expiry = self
            .adapter
            .now()?
            .checked_add(u64::from(request.period_months) * MONTH)
            .ok_or_else(|| PolicyError::invalid("expiry overflows"))?;

        // the position must be recordable before any funds move
        self.ensure_permitted(&*deposits, DepositFn::Mint.selector())?;
        token.transfer_from(&self.address, &request.depositor, &treasury.address(), request.amount)?;
        let id = deposits.mint(
            &self.address,
            MintParams {
                owner: request.depositor,
                asset: request.asset,
                period_months: request.period_months,
                remaining_deposit: request.amount,
                conversion_price: request.conversion_price,
                expiry,
                wrap: request.wrap,
                additional_data: Vec::new(),
            },
        )?;

        info!(id, depositor = %request.depositor.short(), amount = request.amount, "deposit opened");
        self.adapter.emit(
            self.address,
            "CreatedDeposit",
            json!({
                "id": id,
                "depositor": request.depositor,
                "asset": request.asset,
                "amount": request.amount.to_string(),
                "expiry": expiry,
            }),
        );
        Ok(id)
    }

    /// OHM `convert` would mint for these positions, without touching them
    pub fn preview_convert(&self, caller: &Address, ids: &[u64], amounts: &[u128]) -> Result<u128> {
        let deposits = self.deposits.get()?;
        let plan = self.plan(&deposits, caller, ids, amounts)?;
        total_converted(&plan)
    }

    /// Convert `amounts` of the caller's positions into OHM; returns the OHM minted
    pub fn convert(&self, caller: &Address, ids: &[u64], amounts: &[u128]) -> Result<u128> {
        self.enabler.require_enabled()?;
        let deposits = self.deposits.get()?;
        let minter = self.minter.get()?;

        let plan = self.plan(&deposits, caller, ids, amounts)?;
        let total = total_converted(&plan)?;
        self.preflight_mint(&deposits, &minter, total)?;

        for (id, remaining, _) in &plan {
            deposits.set_remaining_deposit(&self.address, *id, *remaining)?;
        }
        minter.increase_mint_approval(&self.address, &self.address, total)?;
        minter.mint_ohm(&self.address, caller, total)?;

        info!(owner = %caller.short(), positions = ids.len(), ohm = total, "deposits converted");
        self.adapter.emit(
            self.address,
            "ConvertedDeposit",
            json!({ "owner": caller, "ids": ids, "ohm": total.to_string() }),
        );
        Ok(total)
    }

    /// Everything the mint step needs, checked before any position changes
    fn preflight_mint(&self, deposits: &DepositModule, minter: &MinterModule, total: u128) -> Result<()> {
        self.ensure_permitted(deposits, DepositFn::SetRemainingDeposit.selector())?;
        self.ensure_permitted(minter, MinterFn::IncreaseMintApproval.selector())?;
        self.ensure_permitted(minter, MinterFn::MintOhm.selector())?;
        if !minter.is_active() {
            return Err(MinterError::NotActive.into());
        }
        math::checked_add(minter.mint_approval(&self.address), total)?;
        math::checked_add(minter.ohm().total_supply(), total)?;
        Ok(())
    }

    /// Validate every position up front; yields (id, remaining after, OHM out)
    fn plan(
        &self,
        deposits: &DepositModule,
        caller: &Address,
        ids: &[u64],
        amounts: &[u128],
    ) -> Result<Vec<(u64, u128, u128)>> {
        if ids.is_empty() || ids.len() != amounts.len() {
            return Err(PolicyError::invalid("ids and amounts must be non-empty and equal length"));
        }
        let unique: BTreeSet<u64> = ids.iter().copied().collect();
        if unique.len() != ids.len() {
            return Err(PolicyError::invalid("duplicate position id"));
        }

        let mut plan = Vec::with_capacity(ids.len());
        for (id, amount) in ids.iter().zip(amounts) {
            let position = deposits.get_position(*id)?;
            if position.owner != *caller {
                return Err(DepositError::NotOwner { id: *id, caller: *caller }.into());
            }
            if position.operator != self.address {
                return Err(PolicyError::invalid(format!("position {id} belongs to another facility")));
            }
            let converted = deposits.preview_convert(*id, *amount)?;
            if converted == 0 {
                return Err(PolicyError::invalid(format!("position {id} converts to nothing")));
            }
            plan.push((*id, position.remaining_deposit - amount, converted));
        }
        Ok(plan)
    }
}

fn total_converted(plan: &[(u64, u128, u128)]) -> Result<u128> {
    let mut total = 0u128;
    for (_, _, converted) in plan {
        total = math::checked_add(total, *converted)?;
    }
    Ok(total)
}

impl Enabled for DepositFacility {
    fn enabler(&self) -> &PolicyEnabler {
        &self.enabler
    }

    fn roles(&self) -> Result<Arc<RolesModule>> {
        Ok(self.roles.get()?)
    }
}

impl Policy for DepositFacility {
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
        let minter = self.minter.bind(&kernel)?;
        let deposits = self.deposits.bind(&kernel)?;
        require_version(roles.as_ref(), 1)?;
        require_version(treasury.as_ref(), 1)?;
        require_version(minter.as_ref(), 1)?;
        require_version(deposits.as_ref(), 1)?;
        Ok(vec![ROLES_KEYCODE, TRSRY_KEYCODE, MINTR_KEYCODE, DEPOS_KEYCODE])
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        vec![
            Permissions::new(DEPOS_KEYCODE, DepositFn::Mint),
            Permissions::new(DEPOS_KEYCODE, DepositFn::SetRemainingDeposit),
            Permissions::new(MINTR_KEYCODE, MinterFn::MintOhm),
            Permissions::new(MINTR_KEYCODE, MinterFn::IncreaseMintApproval),
        ]
    }
}
