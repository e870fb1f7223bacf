//! SPPLY module

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bophades_kernel::{
    Kernel, KernelAdapter, Module, ModuleFunction, ModuleWithSubmodules, SubmoduleFn, SubmoduleRegistry,
};
use bophades_ledger::{Erc20, Gohm};
use bophades_types::{math, Address, Cache, Category, Keycode, Selector, SubKeycode, Variant};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, SupplyError};
use crate::submodule::{Reserves, SubmoduleMetric, SubmoduleReserves, SupplyCommand, SupplySubmodule};

pub const SPPLY_KEYCODE: Keycode = Keycode::from_bytes(*b"SPPLY");

pub const PROTOCOL_OWNED_TREASURY: Category = Category::literal("protocol-owned-treasury");
pub const DAO: Category = Category::literal("dao");
pub const PROTOCOL_OWNED_LIQUIDITY: Category = Category::literal("protocol-owned-liquidity");
pub const PROTOCOL_OWNED_BORROWABLE: Category = Category::literal("protocol-owned-borrowable");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyFn {
    IncreaseCrossChainSupply,
    DecreaseCrossChainSupply,
    AddCategory,
    RemoveCategory,
    Categorize,
    StoreCategorySupply,
    StoreMetric,
}

impl ModuleFunction for SupplyFn {
    fn signature(self) -> &'static str {
        match self {
            SupplyFn::IncreaseCrossChainSupply => "increaseCrossChainSupply(uint256)",
            SupplyFn::DecreaseCrossChainSupply => "decreaseCrossChainSupply(uint256)",
            SupplyFn::AddCategory => "addCategory(bytes32,bool,bytes4,bytes4)",
            SupplyFn::RemoveCategory => "removeCategory(bytes32)",
            SupplyFn::Categorize => "categorize(address,bytes32)",
            SupplyFn::StoreCategorySupply => "storeCategorySupply(bytes32)",
            SupplyFn::StoreMetric => "storeMetric(uint8)",
        }
    }
}

/// Composite supply metrics derived from categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Metric {
    TotalSupply = 0,
    CirculatingSupply = 1,
    FloatingSupply = 2,
    CollateralizedSupply = 3,
    BackedSupply = 4,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::TotalSupply,
        Metric::CirculatingSupply,
        Metric::FloatingSupply,
        Metric::CollateralizedSupply,
        Metric::BackedSupply,
    ];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::TotalSupply => "total",
            Metric::CirculatingSupply => "circulating",
            Metric::FloatingSupply => "floating",
            Metric::CollateralizedSupply => "collateralized",
            Metric::BackedSupply => "backed",
        };
        f.write_str(name)
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown metric: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryData {
    pub approved: bool,
    pub use_submodules: bool,
    pub submodule_metric: Option<SubmoduleMetric>,
    pub submodule_reserves: Option<SubmoduleReserves>,
    pub total: Cache,
}

#[derive(Default)]
struct SupplyState {
    total_cross_chain_supply: u128,
    categories: Vec<Category>,
    category_data: HashMap<Category, CategoryData>,
    locations: Vec<Address>,
    category_by_location: HashMap<Address, Category>,
    metric_cache: HashMap<Metric, Cache>,
}

impl SupplyState {
    fn approved(&self, category: &Category) -> Result<CategoryData> {
        self.category_data
            .get(category)
            .filter(|data| data.approved)
            .copied()
            .ok_or(SupplyError::CategoryNotApproved {
                category: *category,
            })
    }

    fn locations_in(&self, category: &Category) -> Vec<Address> {
        self.locations
            .iter()
            .filter(|location| self.category_by_location.get(location) == Some(category))
            .copied()
            .collect()
    }
}

/// Categorized OHM supply accounting
pub struct SupplyModule {
    address: Address,
    adapter: KernelAdapter,
    ohm: Arc<dyn Erc20>,
    gohm: Arc<dyn Gohm>,
    state: RwLock<SupplyState>,
    submodules: SubmoduleRegistry<dyn SupplySubmodule>,
}

impl SupplyModule {
    /// Create SPPLY with the four default categories approved
    pub fn new(
        kernel: &Arc<Kernel>,
        address: Address,
        ohm: Arc<dyn Erc20>,
        gohm: Arc<dyn Gohm>,
        initial_cross_chain_supply: u128,
    ) -> Arc<Self> {
        let mut state = SupplyState {
            total_cross_chain_supply: initial_cross_chain_supply,
            ..SupplyState::default()
        };
        let defaults = [
            (PROTOCOL_OWNED_TREASURY, false, None, None),
            (DAO, false, None, None),
            (
                PROTOCOL_OWNED_LIQUIDITY,
                true,
                Some(SubmoduleMetric::ProtocolOwnedLiquidityOhm),
                Some(SubmoduleReserves::ProtocolOwnedLiquidityReserves),
            ),
            (
                PROTOCOL_OWNED_BORROWABLE,
                true,
                Some(SubmoduleMetric::ProtocolOwnedBorrowableOhm),
                None,
            ),
        ];
        for (category, use_submodules, submodule_metric, submodule_reserves) in defaults {
            state.categories.push(category);
            state.category_data.insert(
                category,
                CategoryData {
                    approved: true,
                    use_submodules,
                    submodule_metric,
                    submodule_reserves,
                    total: Cache::default(),
                },
            );
        }

        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            ohm,
            gohm,
            state: RwLock::new(state),
            submodules: SubmoduleRegistry::new(SPPLY_KEYCODE),
        })
    }

    pub fn ohm(&self) -> &Arc<dyn Erc20> {
        &self.ohm
    }

    pub fn gohm(&self) -> &Arc<dyn Gohm> {
        &self.gohm
    }

    fn now(&self) -> Result<u64> {
        Ok(self.adapter.now()?)
    }

    // =========================================================================
    // Cross-chain supply
    // =========================================================================

    pub fn total_cross_chain_supply(&self) -> u128 {
        self.state.read().total_cross_chain_supply
    }

    pub fn increase_cross_chain_supply(&self, caller: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, SupplyFn::IncreaseCrossChainSupply.selector())?;
        let supply = {
            let mut state = self.state.write();
            state.total_cross_chain_supply = math::checked_add(state.total_cross_chain_supply, amount)?;
            state.total_cross_chain_supply
        };
        info!(amount, supply, "cross-chain supply increased");
        self.adapter.emit(
            self.address,
            "CrossChainSupplyUpdated",
            json!({ "supply": supply.to_string() }),
        );
        Ok(())
    }

    pub fn decrease_cross_chain_supply(&self, caller: &Address, amount: u128) -> Result<()> {
        self.permissioned(caller, SupplyFn::DecreaseCrossChainSupply.selector())?;
        let supply = {
            let mut state = self.state.write();
            state.total_cross_chain_supply = state
                .total_cross_chain_supply
                .checked_sub(amount)
                .ok_or_else(|| SupplyError::invalid("cross-chain supply underflow"))?;
            state.total_cross_chain_supply
        };
        info!(amount, supply, "cross-chain supply decreased");
        self.adapter.emit(
            self.address,
            "CrossChainSupplyUpdated",
            json!({ "supply": supply.to_string() }),
        );
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn add_category(
        &self,
        caller: &Address,
        category: Category,
        use_submodules: bool,
        submodule_metric: Option<SubmoduleMetric>,
        submodule_reserves: Option<SubmoduleReserves>,
    ) -> Result<()> {
        self.permissioned(caller, SupplyFn::AddCategory.selector())?;
        if category.is_empty() {
            return Err(SupplyError::invalid("empty category"));
        }
        if use_submodules && submodule_metric.is_none() {
            return Err(SupplyError::invalid("submodule category without a metric"));
        }
        if !use_submodules && (submodule_metric.is_some() || submodule_reserves.is_some()) {
            return Err(SupplyError::invalid("submodule functions on a direct category"));
        }

        {
            let mut state = self.state.write();
            if state.category_data.get(&category).is_some_and(|data| data.approved) {
                return Err(SupplyError::CategoryAlreadyApproved { category });
            }
            state.categories.push(category);
            state.category_data.insert(
                category,
                CategoryData {
                    approved: true,
                    use_submodules,
                    submodule_metric,
                    submodule_reserves,
                    total: Cache::default(),
                },
            );
        }

        info!(%category, use_submodules, "supply category added");
        self.adapter.emit(
            self.address,
            "CategoryAdded",
            json!({
                "category": category,
                "useSubmodules": use_submodules,
                "metric": submodule_metric,
                "reserves": submodule_reserves,
            }),
        );
        Ok(())
    }

    /// `add_category` with raw selectors; the zero selector means "none"
    pub fn add_category_by_selectors(
        &self,
        caller: &Address,
        category: Category,
        use_submodules: bool,
        metric_selector: Selector,
        reserves_selector: Selector,
    ) -> Result<()> {
        let metric = if metric_selector.is_zero() {
            None
        } else {
            Some(
                SubmoduleMetric::try_from(metric_selector)
                    .map_err(|selector| SupplyError::InvalidSelector { selector })?,
            )
        };
        let reserves = if reserves_selector.is_zero() {
            None
        } else {
            Some(
                SubmoduleReserves::try_from(reserves_selector)
                    .map_err(|selector| SupplyError::InvalidSelector { selector })?,
            )
        };
        self.add_category(caller, category, use_submodules, metric, reserves)
    }

    pub fn remove_category(&self, caller: &Address, category: Category) -> Result<()> {
        self.permissioned(caller, SupplyFn::RemoveCategory.selector())?;
        {
            let mut state = self.state.write();
            state.approved(&category)?;
            if state.category_by_location.values().any(|c| *c == category) {
                return Err(SupplyError::CategoryInUse { category });
            }
            state.categories.retain(|c| *c != category);
            state.category_data.remove(&category);
        }

        info!(%category, "supply category removed");
        self.adapter
            .emit(self.address, "CategoryRemoved", json!({ "category": category }));
        Ok(())
    }

    /// Assign `location` to `category`, or clear it when `category` is empty.
    ///
    /// A categorized location must be cleared before it can move.
    pub fn categorize(&self, caller: &Address, location: Address, category: Category) -> Result<()> {
        self.permissioned(caller, SupplyFn::Categorize.selector())?;
        if location.is_zero() {
            return Err(SupplyError::invalid("zero location"));
        }

        {
            let mut state = self.state.write();
            if category.is_empty() {
                if state.category_by_location.remove(&location).is_none() {
                    return Err(SupplyError::LocationNotCategorized { location });
                }
                state.locations.retain(|l| *l != location);
            } else {
                state.approved(&category)?;
                if let Some(existing) = state.category_by_location.get(&location) {
                    return Err(SupplyError::LocationAlreadyCategorized {
                        location,
                        category: *existing,
                    });
                }
                state.locations.push(location);
                state.category_by_location.insert(location, category);
            }
        }

        info!(location = %location.short(), %category, "location categorized");
        self.adapter.emit(
            self.address,
            "LocationCategorized",
            json!({ "location": location, "category": category }),
        );
        Ok(())
    }

    pub fn get_categories(&self) -> Vec<Category> {
        self.state.read().categories.clone()
    }

    pub fn get_category_data(&self, category: &Category) -> Result<CategoryData> {
        self.state.read().approved(category)
    }

    /// The category of `location`, `Category::EMPTY` if uncategorized
    pub fn get_category_by_location(&self, location: &Address) -> Category {
        self.state
            .read()
            .category_by_location
            .get(location)
            .copied()
            .unwrap_or(Category::EMPTY)
    }

    pub fn get_locations(&self) -> Vec<Address> {
        self.state.read().locations.clone()
    }

    pub fn get_locations_by_category(&self, category: &Category) -> Result<Vec<Address>> {
        let state = self.state.read();
        state.approved(category)?;
        Ok(state.locations_in(category))
    }

    // =========================================================================
    // Category supply
    // =========================================================================

    fn submodule_metric_sum(&self, metric: SubmoduleMetric) -> Result<u128> {
        let mut total = 0u128;
        for submodule in self.submodules.all() {
            let value = submodule
                .metric(metric)
                .map_err(|err| SupplyError::SubmoduleFailed {
                    submodule: submodule.subkeycode(),
                    operation: metric.signature().to_string(),
                    reason: err.to_string(),
                })?;
            total = math::checked_add(total, value)?;
        }
        Ok(total)
    }

    fn current_category_supply(&self, category: &Category) -> Result<u128> {
        let (data, locations) = {
            let state = self.state.read();
            (state.approved(category)?, state.locations_in(category))
        };

        let mut ohm_total = 0u128;
        let mut gohm_total = 0u128;
        for location in &locations {
            ohm_total = math::checked_add(ohm_total, self.ohm.balance_of(location))?;
            gohm_total = math::checked_add(gohm_total, self.gohm.balance_of(location))?;
        }
        let mut supply = math::checked_add(ohm_total, self.gohm.balance_from(gohm_total)?)?;

        if data.use_submodules {
            if let Some(metric) = data.submodule_metric {
                supply = math::checked_add(supply, self.submodule_metric_sum(metric)?)?;
            }
        }
        Ok(supply)
    }

    pub fn get_supply_by_category(&self, category: &Category, variant: Variant) -> Result<Cache> {
        match variant {
            Variant::Current => Ok(Cache::new(self.current_category_supply(category)?, self.now()?)),
            Variant::Last => Ok(self.state.read().approved(category)?.total),
        }
    }

    /// The stored supply if no older than `max_age`, otherwise the live value
    pub fn get_supply_by_category_max_age(&self, category: &Category, max_age: u64) -> Result<u128> {
        let cached = self.state.read().approved(category)?.total;
        if cached.is_fresh(self.now()?, max_age) {
            return Ok(cached.value);
        }
        self.current_category_supply(category)
    }

    /// Per-location OHM/gOHM reserves, followed by each submodule's reserves
    pub fn get_reserves_by_category(&self, category: &Category) -> Result<Vec<Reserves>> {
        let (data, locations) = {
            let state = self.state.read();
            (state.approved(category)?, state.locations_in(category))
        };

        let mut reserves = Vec::with_capacity(locations.len());
        for location in locations {
            reserves.push(Reserves {
                source: location,
                tokens: vec![self.ohm.address(), self.gohm.address()],
                balances: vec![
                    self.ohm.balance_of(&location),
                    self.gohm.balance_from(self.gohm.balance_of(&location))?,
                ],
            });
        }

        if data.use_submodules {
            if let Some(selector) = data.submodule_reserves {
                for submodule in self.submodules.all() {
                    let found = submodule
                        .reserves(selector)
                        .map_err(|err| SupplyError::SubmoduleFailed {
                            submodule: submodule.subkeycode(),
                            operation: selector.signature().to_string(),
                            reason: err.to_string(),
                        })?;
                    reserves.extend(found);
                }
            }
        }
        Ok(reserves)
    }

    pub fn store_category_supply(&self, caller: &Address, category: Category) -> Result<Cache> {
        self.permissioned(caller, SupplyFn::StoreCategorySupply.selector())?;
        let cache = Cache::new(self.current_category_supply(&category)?, self.now()?);
        {
            let mut state = self.state.write();
            let data = state
                .category_data
                .get_mut(&category)
                .filter(|data| data.approved)
                .ok_or(SupplyError::CategoryNotApproved { category })?;
            data.total = cache;
        }
        debug!(%category, value = cache.value, "category supply stored");
        self.adapter.emit(
            self.address,
            "CategorySupplyStored",
            json!({ "category": category, "value": cache.value.to_string(), "timestamp": cache.timestamp }),
        );
        Ok(cache)
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    fn category_value(&self, category: &Category) -> Result<u128> {
        self.current_category_supply(category)
    }

    fn subtract(a: u128, b: u128, what: &str) -> Result<u128> {
        a.checked_sub(b)
            .ok_or_else(|| SupplyError::invalid(format!("{what} would be negative")))
    }

    fn current_metric(&self, metric: Metric) -> Result<u128> {
        match metric {
            Metric::TotalSupply => Ok(math::checked_add(
                self.ohm.total_supply(),
                self.total_cross_chain_supply(),
            )?),
            Metric::CirculatingSupply => {
                let total = self.current_metric(Metric::TotalSupply)?;
                let treasury = self.category_value(&PROTOCOL_OWNED_TREASURY)?;
                let dao = self.category_value(&DAO)?;
                let circulating = Self::subtract(total, treasury, "circulating supply")?;
                Self::subtract(circulating, dao, "circulating supply")
            }
            Metric::FloatingSupply => {
                let circulating = self.current_metric(Metric::CirculatingSupply)?;
                let liquidity = self.category_value(&PROTOCOL_OWNED_LIQUIDITY)?;
                let borrowable = self.category_value(&PROTOCOL_OWNED_BORROWABLE)?;
                let floating = Self::subtract(circulating, liquidity, "floating supply")?;
                Self::subtract(floating, borrowable, "floating supply")
            }
            Metric::CollateralizedSupply => self.submodule_metric_sum(SubmoduleMetric::CollateralizedOhm),
            Metric::BackedSupply => {
                let floating = self.current_metric(Metric::FloatingSupply)?;
                let collateralized = self.current_metric(Metric::CollateralizedSupply)?;
                Self::subtract(floating, collateralized, "backed supply")
            }
        }
    }

    pub fn get_metric(&self, metric: Metric, variant: Variant) -> Result<Cache> {
        match variant {
            Variant::Current => Ok(Cache::new(self.current_metric(metric)?, self.now()?)),
            Variant::Last => Ok(self
                .state
                .read()
                .metric_cache
                .get(&metric)
                .copied()
                .unwrap_or_default()),
        }
    }

    pub fn get_metric_max_age(&self, metric: Metric, max_age: u64) -> Result<u128> {
        let cached = self.get_metric(metric, Variant::Last)?;
        if cached.is_fresh(self.now()?, max_age) {
            return Ok(cached.value);
        }
        self.current_metric(metric)
    }

    pub fn store_metric(&self, caller: &Address, metric: Metric) -> Result<Cache> {
        self.permissioned(caller, SupplyFn::StoreMetric.selector())?;
        let cache = Cache::new(self.current_metric(metric)?, self.now()?);
        self.state.write().metric_cache.insert(metric, cache);
        debug!(%metric, value = cache.value, "metric stored");
        self.adapter.emit(
            self.address,
            "MetricStored",
            json!({ "metric": metric as u8, "value": cache.value.to_string(), "timestamp": cache.timestamp }),
        );
        Ok(cache)
    }

    // =========================================================================
    // Submodules
    // =========================================================================

    /// Forward a configuration command to an installed submodule
    pub fn exec_on_submodule(
        &self,
        caller: &Address,
        subkeycode: &SubKeycode,
        command: SupplyCommand,
    ) -> Result<()> {
        self.permissioned(caller, SubmoduleFn::ExecOnSubmodule.selector())?;
        let submodule = self.submodules.get(subkeycode)?;
        let name = command.name();
        submodule
            .execute(&self.address, command)
            .map_err(|err| SupplyError::SubmoduleFailed {
                submodule: *subkeycode,
                operation: name.to_string(),
                reason: err.to_string(),
            })?;
        debug!(%subkeycode, command = name, "executed on submodule");
        Ok(())
    }

    pub fn get_submodule(&self, subkeycode: &SubKeycode) -> Result<Arc<dyn SupplySubmodule>> {
        Ok(self.submodules.get(subkeycode)?)
    }
}

impl Module for SupplyModule {
    fn keycode(&self) -> Keycode {
        SPPLY_KEYCODE
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

impl ModuleWithSubmodules for SupplyModule {
    type Sub = dyn SupplySubmodule;

    fn submodules(&self) -> &SubmoduleRegistry<dyn SupplySubmodule> {
        &self.submodules
    }
}
