//! TreasuryConfig - TRSRY asset registry and taxonomy administration

use std::sync::Arc;

use bophades_kernel::{require_version, Dependency, Kernel, KernelAdapter, Permissions, Policy};
use bophades_roles::{RolesModule, ROLES_KEYCODE};
use bophades_treasury::{TreasuryFn, TreasuryModule, TRSRY_KEYCODE};
use bophades_types::{Address, Cache, Category, CategoryGroup, Keycode, Role};
use tracing::debug;

use crate::error::Result;

pub const TREASURY_ADMIN_ROLE: Role = Role::literal("treasury_admin");

pub struct TreasuryConfig {
    address: Address,
    adapter: KernelAdapter,
    roles: Dependency<RolesModule>,
    treasury: Dependency<TreasuryModule>,
}

impl TreasuryConfig {
    pub fn new(kernel: &Arc<Kernel>, address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            roles: Dependency::new(ROLES_KEYCODE),
            treasury: Dependency::new(TRSRY_KEYCODE),
        })
    }

    fn only_admin(&self, caller: &Address) -> Result<Arc<TreasuryModule>> {
        self.roles.get()?.require_role(&TREASURY_ADMIN_ROLE, caller)?;
        Ok(self.treasury.get()?)
    }

    pub fn add_asset(&self, caller: &Address, asset: &Address, locations: &[Address]) -> Result<()> {
        Ok(self.only_admin(caller)?.add_asset(&self.address, asset, locations)?)
    }

    pub fn remove_asset(&self, caller: &Address, asset: &Address) -> Result<()> {
        Ok(self.only_admin(caller)?.remove_asset(&self.address, asset)?)
    }

    pub fn add_asset_location(&self, caller: &Address, asset: &Address, location: &Address) -> Result<()> {
        Ok(self
            .only_admin(caller)?
            .add_asset_location(&self.address, asset, location)?)
    }

    pub fn remove_asset_location(&self, caller: &Address, asset: &Address, location: &Address) -> Result<()> {
        Ok(self
            .only_admin(caller)?
            .remove_asset_location(&self.address, asset, location)?)
    }

    pub fn add_category_group(&self, caller: &Address, group: CategoryGroup) -> Result<()> {
        Ok(self.only_admin(caller)?.add_category_group(&self.address, group)?)
    }

    pub fn remove_category_group(&self, caller: &Address, group: CategoryGroup) -> Result<()> {
        Ok(self.only_admin(caller)?.remove_category_group(&self.address, group)?)
    }

    pub fn add_category(&self, caller: &Address, category: Category, group: CategoryGroup) -> Result<()> {
        Ok(self.only_admin(caller)?.add_category(&self.address, category, group)?)
    }

    pub fn remove_category(&self, caller: &Address, category: Category) -> Result<()> {
        Ok(self.only_admin(caller)?.remove_category(&self.address, category)?)
    }

    pub fn categorize(&self, caller: &Address, asset: &Address, category: Category) -> Result<()> {
        Ok(self.only_admin(caller)?.categorize(&self.address, asset, category)?)
    }

    pub fn uncategorize(&self, caller: &Address, asset: &Address, category: Category) -> Result<()> {
        Ok(self.only_admin(caller)?.uncategorize(&self.address, asset, category)?)
    }

    /// Snapshot the balance of every approved asset
    pub fn store_balances(&self, caller: &Address) -> Result<Vec<(Address, Cache)>> {
        let treasury = self.only_admin(caller)?;
        let mut stored = Vec::new();
        for asset in treasury.get_assets() {
            let cache = treasury.store_balance(&self.address, &asset)?;
            debug!(asset = %asset.short(), balance = cache.value, "asset balance stored");
            stored.push((asset, cache));
        }
        Ok(stored)
    }
}

impl Policy for TreasuryConfig {
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
            TreasuryFn::AddAsset,
            TreasuryFn::RemoveAsset,
            TreasuryFn::AddAssetLocation,
            TreasuryFn::RemoveAssetLocation,
            TreasuryFn::AddCategoryGroup,
            TreasuryFn::RemoveCategoryGroup,
            TreasuryFn::AddCategory,
            TreasuryFn::RemoveCategory,
            TreasuryFn::Categorize,
            TreasuryFn::Uncategorize,
            TreasuryFn::StoreBalance,
        ]
        .iter()
        .map(|f| Permissions::new(TRSRY_KEYCODE, *f))
        .collect()
    }
}
