//! SupplyConfig - SPPLY categories, locations and submodules

use std::sync::Arc;

use bophades_kernel::{
    require_version, Dependency, Kernel, KernelAdapter, ModuleWithSubmodules, Permissions, Policy, SubmoduleFn,
};
use bophades_roles::{RolesModule, ROLES_KEYCODE};
use bophades_supply::{
    Metric, SubmoduleMetric, SubmoduleReserves, SupplyCommand, SupplyFn, SupplyModule, SupplySubmodule,
    SPPLY_KEYCODE,
};
use bophades_types::{Address, Cache, Category, Keycode, Role, SubKeycode};
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Configures categories, locations and submodules
pub const SUPPLY_ADMIN_ROLE: Role = Role::literal("supply_admin");

/// Stores observations
pub const SUPPLY_KEEPER_ROLE: Role = Role::literal("supply_keeper");

/// Everything `store_observations` wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observations {
    pub metrics: Vec<(Metric, Cache)>,
    pub categories: Vec<(Category, Cache)>,
}

pub struct SupplyConfig {
    address: Address,
    adapter: KernelAdapter,
    roles: Dependency<RolesModule>,
    supply: Dependency<SupplyModule>,
}

impl SupplyConfig {
    pub fn new(kernel: &Arc<Kernel>, address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            roles: Dependency::new(ROLES_KEYCODE),
            supply: Dependency::new(SPPLY_KEYCODE),
        })
    }

    fn only_role(&self, role: &Role, caller: &Address) -> Result<Arc<SupplyModule>> {
        self.roles.get()?.require_role(role, caller)?;
        Ok(self.supply.get()?)
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub fn add_supply_category(
        &self,
        caller: &Address,
        category: Category,
        use_submodules: bool,
        metric: Option<SubmoduleMetric>,
        reserves: Option<SubmoduleReserves>,
    ) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.add_category(&self.address, category, use_submodules, metric, reserves)?;
        Ok(())
    }

    pub fn remove_supply_category(&self, caller: &Address, category: Category) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.remove_category(&self.address, category)?;
        Ok(())
    }

    /// Assign `location` to `category`; `Category::EMPTY` removes it
    pub fn categorize_supply(&self, caller: &Address, location: Address, category: Category) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.categorize(&self.address, location, category)?;
        Ok(())
    }

    pub fn install_submodule(&self, caller: &Address, submodule: Arc<dyn SupplySubmodule>) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.install_submodule(&self.address, submodule)?;
        Ok(())
    }

    pub fn upgrade_submodule(&self, caller: &Address, submodule: Arc<dyn SupplySubmodule>) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.upgrade_submodule(&self.address, submodule)?;
        Ok(())
    }

    pub fn uninstall_submodule(&self, caller: &Address, subkeycode: &SubKeycode) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.uninstall_submodule(&self.address, subkeycode)?;
        Ok(())
    }

    pub fn exec_on_submodule(&self, caller: &Address, subkeycode: &SubKeycode, command: SupplyCommand) -> Result<()> {
        let supply = self.only_role(&SUPPLY_ADMIN_ROLE, caller)?;
        supply.exec_on_submodule(&self.address, subkeycode, command)?;
        Ok(())
    }

    // ========================================================================
    // Keeper
    // ========================================================================

    /// Snapshot every metric and every category
    pub fn store_observations(&self, caller: &Address) -> Result<Observations> {
        let supply = self.only_role(&SUPPLY_KEEPER_ROLE, caller)?;
        let mut categories = Vec::new();
        for category in supply.get_categories() {
            categories.push((category, supply.store_category_supply(&self.address, category)?));
        }
        let mut metrics = Vec::new();
        for metric in Metric::ALL {
            metrics.push((metric, supply.store_metric(&self.address, metric)?));
        }
        info!(
            categories = categories.len(),
            metrics = metrics.len(),
            "supply observations stored"
        );
        Ok(Observations { metrics, categories })
    }
}

impl Policy for SupplyConfig {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> bophades_kernel::Result<Vec<Keycode>> {
        let kernel = self.adapter.kernel()?;
        let roles = self.roles.bind(&kernel)?;
        let supply = self.supply.bind(&kernel)?;
        require_version(roles.as_ref(), 1)?;
        require_version(supply.as_ref(), 1)?;
        Ok(vec![SPPLY_KEYCODE, ROLES_KEYCODE])
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        let module_fns = [
            SupplyFn::AddCategory,
            SupplyFn::RemoveCategory,
            SupplyFn::Categorize,
            SupplyFn::StoreCategorySupply,
            SupplyFn::StoreMetric,
        ]
        .map(|f| Permissions::new(SPPLY_KEYCODE, f));
        let submodule_fns = [
            SubmoduleFn::InstallSubmodule,
            SubmoduleFn::UpgradeSubmodule,
            SubmoduleFn::UninstallSubmodule,
            SubmoduleFn::ExecOnSubmodule,
        ]
        .map(|f| Permissions::new(SPPLY_KEYCODE, f));
        module_fns.into_iter().chain(submodule_fns).collect()
    }
}
