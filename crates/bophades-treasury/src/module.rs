use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bophades_kernel::{Kernel, KernelAdapter, Module, ModuleFunction, ReentrancyGuard};
use bophades_ledger::{Erc20, TokenRegistry};
use bophades_types::{math, Address, Cache, Category, CategoryGroup, Keycode};
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Result, TreasuryError};

pub const TRSRY_KEYCODE: Keycode = Keycode::from_bytes(*b"TRSRY");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasuryFn {
    IncreaseWithdrawApproval,
    DecreaseWithdrawApproval,
    WithdrawReserves,
    IncreaseDebtorApproval,
    DecreaseDebtorApproval,
    IncurDebt,
    RepayDebt,
    SetDebt,
    Activate,
    Deactivate,
    AddAsset,
    RemoveAsset,
    AddAssetLocation,
    RemoveAssetLocation,
    StoreBalance,
    AddCategoryGroup,
    RemoveCategoryGroup,
    AddCategory,
    RemoveCategory,
    Categorize,
    Uncategorize,
}

impl TreasuryFn {
    pub const ALL: [TreasuryFn; 21] = [
        TreasuryFn::IncreaseWithdrawApproval,
        TreasuryFn::DecreaseWithdrawApproval,
        TreasuryFn::WithdrawReserves,
        TreasuryFn::IncreaseDebtorApproval,
        TreasuryFn::DecreaseDebtorApproval,
        TreasuryFn::IncurDebt,
        TreasuryFn::RepayDebt,
        TreasuryFn::SetDebt,
        TreasuryFn::Activate,
        TreasuryFn::Deactivate,
        TreasuryFn::AddAsset,
        TreasuryFn::RemoveAsset,
        TreasuryFn::AddAssetLocation,
        TreasuryFn::RemoveAssetLocation,
        TreasuryFn::StoreBalance,
        TreasuryFn::AddCategoryGroup,
        TreasuryFn::RemoveCategoryGroup,
        TreasuryFn::AddCategory,
        TreasuryFn::RemoveCategory,
        TreasuryFn::Categorize,
        TreasuryFn::Uncategorize,
    ];
}

impl ModuleFunction for TreasuryFn {
    fn signature(self) -> &'static str {
        match self {
            TreasuryFn::IncreaseWithdrawApproval => "increaseWithdrawApproval(address,address,uint256)",
            TreasuryFn::DecreaseWithdrawApproval => "decreaseWithdrawApproval(address,address,uint256)",
            TreasuryFn::WithdrawReserves => "withdrawReserves(address,address,uint256)",
            TreasuryFn::IncreaseDebtorApproval => "increaseDebtorApproval(address,address,uint256)",
            TreasuryFn::DecreaseDebtorApproval => "decreaseDebtorApproval(address,address,uint256)",
            TreasuryFn::IncurDebt => "incurDebt(address,uint256)",
            TreasuryFn::RepayDebt => "repayDebt(address,address,uint256)",
            TreasuryFn::SetDebt => "setDebt(address,address,uint256)",
            TreasuryFn::Activate => "activate()",
            TreasuryFn::Deactivate => "deactivate()",
            TreasuryFn::AddAsset => "addAsset(address,address[])",
            TreasuryFn::RemoveAsset => "removeAsset(address)",
            TreasuryFn::AddAssetLocation => "addAssetLocation(address,address)",
            TreasuryFn::RemoveAssetLocation => "removeAssetLocation(address,address)",
            TreasuryFn::StoreBalance => "storeBalance(address)",
            TreasuryFn::AddCategoryGroup => "addCategoryGroup(bytes32)",
            TreasuryFn::RemoveCategoryGroup => "removeCategoryGroup(bytes32)",
            TreasuryFn::AddCategory => "addCategory(bytes32,bytes32)",
            TreasuryFn::RemoveCategory => "removeCategory(bytes32)",
            TreasuryFn::Categorize => "categorize(address,bytes32)",
            TreasuryFn::Uncategorize => "uncategorize(address,bytes32)",
        }
    }
}

/// Registry entry for an approved asset
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetData {
    pub approved: bool,
    pub updated_at: u64,
    pub last_balance: u128,
    /// External addresses whose balances also count towards the treasury
    pub locations: Vec<Address>,
}

impl AssetData {
    pub fn cache(&self) -> Cache {
        Cache::new(self.last_balance, self.updated_at)
    }
}

#[derive(Default)]
pub(crate) struct TreasuryState {
    pub(crate) active: bool,
    /// withdrawer -> token -> amount
    pub(crate) withdraw_approval: HashMap<(Address, Address), u128>,
    /// debtor -> token -> amount
    pub(crate) debt_approval: HashMap<(Address, Address), u128>,
    /// (token, debtor) -> outstanding
    pub(crate) reserve_debt: HashMap<(Address, Address), u128>,
    pub(crate) total_debt: HashMap<Address, u128>,

    pub(crate) assets: Vec<Address>,
    pub(crate) asset_data: HashMap<Address, AssetData>,

    pub(crate) category_groups: Vec<CategoryGroup>,
    /// Every category, in insertion order, with the group it belongs to
    pub(crate) categories: Vec<(Category, CategoryGroup)>,
    /// (asset, group) -> the single category the asset holds in that group
    pub(crate) categorization: HashMap<(Address, CategoryGroup), Category>,
}

impl TreasuryState {
    pub(crate) fn group_of(&self, category: &Category) -> Option<CategoryGroup> {
        self.categories
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, group)| *group)
    }
}

/// TRSRY v1.1
pub struct TreasuryModule {
    pub(crate) address: Address,
    pub(crate) adapter: KernelAdapter,
    pub(crate) tokens: Arc<TokenRegistry>,
    guard: ReentrancyGuard,
    pub(crate) state: RwLock<TreasuryState>,
}

impl TreasuryModule {
    /// A new, active treasury with the default category groups
    pub fn new(kernel: &Arc<Kernel>, address: Address, tokens: Arc<TokenRegistry>) -> Arc<Self> {
        let mut state = TreasuryState {
            active: true,
            ..TreasuryState::default()
        };
        crate::taxonomy::seed_defaults(&mut state);
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            tokens,
            guard: ReentrancyGuard::new(),
            state: RwLock::new(state),
        })
    }

    pub fn tokens(&self) -> &Arc<TokenRegistry> {
        &self.tokens
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.is_active() {
            return Err(TreasuryError::NotActive);
        }
        Ok(())
    }

    pub(crate) fn now(&self) -> Result<u64> {
        Ok(self.adapter.now()?)
    }

    pub(crate) fn token(&self, asset: &Address) -> Result<Arc<dyn Erc20>> {
        Ok(self.tokens.get(asset)?)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn withdraw_approval(&self, withdrawer: &Address, token: &Address) -> u128 {
        let state = self.state.read();
        state.withdraw_approval.get(&(*withdrawer, *token)).copied().unwrap_or(0)
    }

    pub fn debt_approval(&self, debtor: &Address, token: &Address) -> u128 {
        let state = self.state.read();
        state.debt_approval.get(&(*debtor, *token)).copied().unwrap_or(0)
    }

    pub fn reserve_debt(&self, token: &Address, debtor: &Address) -> u128 {
        let state = self.state.read();
        state.reserve_debt.get(&(*token, *debtor)).copied().unwrap_or(0)
    }

    pub fn total_debt(&self, token: &Address) -> u128 {
        self.state.read().total_debt.get(token).copied().unwrap_or(0)
    }

    /// Every debtor with outstanding debt in `token`
    pub fn debtors(&self, token: &Address) -> Vec<(Address, u128)> {
        let state = self.state.read();
        let mut debtors: Vec<_> = state
            .reserve_debt
            .iter()
            .filter(|((t, _), amount)| t == token && **amount > 0)
            .map(|((_, debtor), amount)| (*debtor, *amount))
            .collect();
        debtors.sort();
        debtors
    }

    /// Tokens held by the treasury plus everything lent out
    pub fn get_reserve_balance(&self, token: &Address) -> Result<u128> {
        let held = self.token(token)?.balance_of(&self.address);
        Ok(math::checked_add(held, self.total_debt(token))?)
    }

    // ========================================================================
    // Approvals
    // ========================================================================

    pub fn increase_withdraw_approval(
        &self,
        caller: &Address,
        withdrawer: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        self.permissioned(caller, TreasuryFn::IncreaseWithdrawApproval.selector())?;
        let approval = adjust(&mut self.state.write().withdraw_approval, (*withdrawer, *token), amount, true);
        info!(withdrawer = %withdrawer.short(), token = %token.short(), approval, "withdraw approval increased");
        self.emit_approval("IncreaseWithdrawApproval", withdrawer, token, approval);
        Ok(())
    }

    pub fn decrease_withdraw_approval(
        &self,
        caller: &Address,
        withdrawer: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        self.permissioned(caller, TreasuryFn::DecreaseWithdrawApproval.selector())?;
        let approval = adjust(&mut self.state.write().withdraw_approval, (*withdrawer, *token), amount, false);
        info!(withdrawer = %withdrawer.short(), token = %token.short(), approval, "withdraw approval decreased");
        self.emit_approval("DecreaseWithdrawApproval", withdrawer, token, approval);
        Ok(())
    }

    pub fn increase_debtor_approval(
        &self,
        caller: &Address,
        debtor: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        self.permissioned(caller, TreasuryFn::IncreaseDebtorApproval.selector())?;
        let approval = adjust(&mut self.state.write().debt_approval, (*debtor, *token), amount, true);
        info!(debtor = %debtor.short(), token = %token.short(), approval, "debtor approval increased");
        self.emit_approval("IncreaseDebtorApproval", debtor, token, approval);
        Ok(())
    }

    pub fn decrease_debtor_approval(
        &self,
        caller: &Address,
        debtor: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<()> {
        self.permissioned(caller, TreasuryFn::DecreaseDebtorApproval.selector())?;
        let approval = adjust(&mut self.state.write().debt_approval, (*debtor, *token), amount, false);
        info!(debtor = %debtor.short(), token = %token.short(), approval, "debtor approval decreased");
        self.emit_approval("DecreaseDebtorApproval", debtor, token, approval);
        Ok(())
    }

    fn emit_approval(&self, name: &str, who: &Address, token: &Address, approval: u128) {
        self.adapter.emit(
            self.address,
            name,
            json!({ "policy": who, "token": token, "approval": approval.to_string() }),
        );
    }

    // ========================================================================
    // Reserves
    // ========================================================================

    /// Send `amount` of `token` to `to`, consuming the caller's withdraw approval
    pub fn withdraw_reserves(&self, caller: &Address, to: &Address, token: &Address, amount: u128) -> Result<()> {
        let _lock = self.guard.enter()?;
        self.permissioned(caller, TreasuryFn::WithdrawReserves.selector())?;
        self.ensure_active()?;
        let erc20 = self.token(token)?;

        {
            let mut state = self.state.write();
            let approved = state.withdraw_approval.get(&(*caller, *token)).copied().unwrap_or(0);
            if approved < amount {
                return Err(TreasuryError::WithdrawNotApproved {
                    withdrawer: *caller,
                    token: *token,
                    approved,
                    requested: amount,
                });
            }
            state.withdraw_approval.insert((*caller, *token), approved - amount);
        }

        if let Err(err) = erc20.transfer(&self.address, to, amount) {
            adjust(&mut self.state.write().withdraw_approval, (*caller, *token), amount, true);
            return Err(err.into());
        }

        info!(withdrawer = %caller.short(), to = %to.short(), token = erc20.symbol(), amount, "reserves withdrawn");
        self.adapter.emit(
            self.address,
            "Withdrawal",
            json!({ "policy": caller, "to": to, "token": token, "amount": amount.to_string() }),
        );
        Ok(())
    }

    // ========================================================================
    // Debt
    // ========================================================================

    /// Borrow `amount` of `token` to the caller; the debt keeps counting as reserves
    pub fn incur_debt(&self, caller: &Address, token: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, TreasuryFn::IncurDebt.selector())?;
        self.ensure_active()?;
        let erc20 = self.token(token)?;

        {
            let mut state = self.state.write();
            let approved = state.debt_approval.get(&(*caller, *token)).copied().unwrap_or(0);
            if approved < amount {
                return Err(TreasuryError::DebtNotApproved {
                    debtor: *caller,
                    token: *token,
                    approved,
                    requested: amount,
                });
            }
            let debt = state.reserve_debt.get(&(*token, *caller)).copied().unwrap_or(0);
            let total = state.total_debt.get(token).copied().unwrap_or(0);
            let debt = math::checked_add(debt, amount)?;
            let total = math::checked_add(total, amount)?;
            state.debt_approval.insert((*caller, *token), approved - amount);
            state.reserve_debt.insert((*token, *caller), debt);
            state.total_debt.insert(*token, total);
        }

        if let Err(err) = erc20.transfer(&self.address, caller, amount) {
            let mut state = self.state.write();
            adjust(&mut state.debt_approval, (*caller, *token), amount, true);
            adjust(&mut state.reserve_debt, (*token, *caller), amount, false);
            adjust(&mut state.total_debt, *token, amount, false);
            return Err(err.into());
        }

        info!(debtor = %caller.short(), token = erc20.symbol(), amount, "debt incurred");
        self.adapter.emit(
            self.address,
            "DebtIncurred",
            json!({ "token": token, "policy": caller, "amount": amount.to_string() }),
        );
        Ok(())
    }

    /// Pull `amount` of `token` from the caller against `debtor`'s debt
    ///
    /// Only what actually arrives is credited, so fee-on-transfer tokens
    /// repay less than requested.
    pub fn repay_debt(&self, caller: &Address, debtor: &Address, token: &Address, amount: u128) -> Result<u128> {
        let _lock = self.guard.enter()?;
        self.permissioned(caller, TreasuryFn::RepayDebt.selector())?;
        let erc20 = self.token(token)?;

        let debt = self.reserve_debt(token, debtor);
        if debt == 0 {
            return Err(TreasuryError::NoDebtOutstanding {
                debtor: *debtor,
                token: *token,
            });
        }
        if amount > debt {
            return Err(TreasuryError::RepaymentExceedsDebt { debt, amount });
        }

        let before = erc20.balance_of(&self.address);
        erc20.transfer_from(&self.address, caller, &self.address, amount)?;
        let received = erc20.balance_of(&self.address).saturating_sub(before);
        let repaid = amount.min(received);

        {
            let mut state = self.state.write();
            adjust(&mut state.reserve_debt, (*token, *debtor), repaid, false);
            adjust(&mut state.total_debt, *token, repaid, false);
        }

        if repaid < amount {
            warn!(token = erc20.symbol(), requested = amount, repaid, "repayment short of requested amount");
        }
        info!(debtor = %debtor.short(), token = erc20.symbol(), repaid, "debt repaid");
        self.adapter.emit(
            self.address,
            "DebtRepaid",
            json!({ "token": token, "policy": debtor, "amount": repaid.to_string() }),
        );
        Ok(repaid)
    }

    /// Overwrite a debtor's debt, reconciling the aggregate by the delta
    pub fn set_debt(&self, caller: &Address, debtor: &Address, token: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, TreasuryFn::SetDebt.selector())?;
        {
            let mut state = self.state.write();
            let old = state.reserve_debt.get(&(*token, *debtor)).copied().unwrap_or(0);
            let total = state.total_debt.get(token).copied().unwrap_or(0);
            let total = if amount >= old {
                math::checked_add(total, amount - old)?
            } else {
                math::checked_sub(total, old - amount)?
            };
            state.reserve_debt.insert((*token, *debtor), amount);
            state.total_debt.insert(*token, total);
        }
        info!(debtor = %debtor.short(), token = %token.short(), amount, "debt set");
        self.adapter.emit(
            self.address,
            "DebtSet",
            json!({ "token": token, "policy": debtor, "amount": amount.to_string() }),
        );
        Ok(())
    }

    // ========================================================================
    // Emergency switch
    // ========================================================================

    pub fn activate(&self, caller: &Address) -> Result<()> {
        self.permissioned(caller, TreasuryFn::Activate.selector())?;
        self.state.write().active = true;
        info!("treasury activated");
        Ok(())
    }

    pub fn deactivate(&self, caller: &Address) -> Result<()> {
        self.permissioned(caller, TreasuryFn::Deactivate.selector())?;
        self.state.write().active = false;
        warn!("treasury deactivated");
        Ok(())
    }
}

/// Saturating increase or decrease of a map entry; returns the new value
fn adjust<K: std::hash::Hash + Eq>(map: &mut HashMap<K, u128>, key: K, amount: u128, increase: bool) -> u128 {
    let entry = map.entry(key).or_insert(0);
    *entry = if increase {
        entry.saturating_add(amount)
    } else {
        entry.saturating_sub(amount)
    };
    debug!(value = *entry, "treasury entry adjusted");
    *entry
}

impl Module for TreasuryModule {
    fn keycode(&self) -> Keycode {
        TRSRY_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 1)
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
