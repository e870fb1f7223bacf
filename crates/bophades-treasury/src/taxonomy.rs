//! Category groups and categories
//!
//! A group partitions its categories: an asset holds at most one category per
//! group, and categorizing it again within the same group replaces the old one.

use bophades_kernel::{Module, ModuleFunction};
use bophades_types::{Address, Category, CategoryGroup};
use serde_json::json;
use tracing::info;

use crate::error::{Result, TreasuryError};
use crate::module::{TreasuryFn, TreasuryModule, TreasuryState};

pub const LIQUIDITY_PREFERENCE: CategoryGroup = CategoryGroup::literal("liquidity-preference");
pub const VALUE_BASKETS: CategoryGroup = CategoryGroup::literal("value-baskets");
pub const MARKET_SENSITIVITY: CategoryGroup = CategoryGroup::literal("market-sensitivity");

pub const LIQUID: Category = Category::literal("liquid");
pub const ILLIQUID: Category = Category::literal("illiquid");
pub const RESERVES: Category = Category::literal("reserves");
pub const STRATEGIC: Category = Category::literal("strategic");
pub const PROTOCOL_OWNED_LIQUIDITY: Category = Category::literal("protocol-owned-liquidity");
pub const STABLE: Category = Category::literal("stable");
pub const VOLATILE: Category = Category::literal("volatile");

pub(crate) fn seed_defaults(state: &mut TreasuryState) {
    let defaults = [
        (LIQUIDITY_PREFERENCE, &[LIQUID, ILLIQUID][..]),
        (VALUE_BASKETS, &[RESERVES, STRATEGIC, PROTOCOL_OWNED_LIQUIDITY][..]),
        (MARKET_SENSITIVITY, &[STABLE, VOLATILE][..]),
    ];
    for (group, categories) in defaults {
        state.category_groups.push(group);
        state
            .categories
            .extend(categories.iter().map(|category| (*category, group)));
    }
}

impl TreasuryModule {
    pub fn add_category_group(&self, caller: &Address, group: CategoryGroup) -> Result<()> {
        self.permissioned(caller, TreasuryFn::AddCategoryGroup.selector())?;
        if group.is_empty() {
            return Err(TreasuryError::invalid("empty category group"));
        }
        {
            let mut state = self.state.write();
            if state.category_groups.contains(&group) {
                return Err(TreasuryError::CategoryGroupExists { group });
            }
            state.category_groups.push(group);
        }
        info!(%group, "category group added");
        self.adapter
            .emit(self.address, "CategoryGroupAdded", json!({ "categoryGroup": group }));
        Ok(())
    }

    /// Remove `group` together with its categories and every categorization in it
    pub fn remove_category_group(&self, caller: &Address, group: CategoryGroup) -> Result<()> {
        self.permissioned(caller, TreasuryFn::RemoveCategoryGroup.selector())?;
        {
            let mut state = self.state.write();
            if !state.category_groups.contains(&group) {
                return Err(TreasuryError::CategoryGroupDoesNotExist { group });
            }
            state.category_groups.retain(|g| *g != group);
            state.categories.retain(|(_, g)| *g != group);
            state.categorization.retain(|(_, g), _| *g != group);
        }
        info!(%group, "category group removed");
        self.adapter
            .emit(self.address, "CategoryGroupRemoved", json!({ "categoryGroup": group }));
        Ok(())
    }

    pub fn add_category(&self, caller: &Address, category: Category, group: CategoryGroup) -> Result<()> {
        self.permissioned(caller, TreasuryFn::AddCategory.selector())?;
        if category.is_empty() {
            return Err(TreasuryError::invalid("empty category"));
        }
        {
            let mut state = self.state.write();
            if !state.category_groups.contains(&group) {
                return Err(TreasuryError::CategoryGroupDoesNotExist { group });
            }
            if state.group_of(&category).is_some() {
                return Err(TreasuryError::CategoryExists { category });
            }
            state.categories.push((category, group));
        }
        info!(%category, %group, "category added");
        self.adapter.emit(
            self.address,
            "CategoryAdded",
            json!({ "category": category, "categoryGroup": group }),
        );
        Ok(())
    }

    pub fn remove_category(&self, caller: &Address, category: Category) -> Result<()> {
        self.permissioned(caller, TreasuryFn::RemoveCategory.selector())?;
        {
            let mut state = self.state.write();
            if state.group_of(&category).is_none() {
                return Err(TreasuryError::CategoryDoesNotExist { category });
            }
            state.categories.retain(|(c, _)| *c != category);
            state.categorization.retain(|_, c| *c != category);
        }
        info!(%category, "category removed");
        self.adapter
            .emit(self.address, "CategoryRemoved", json!({ "category": category }));
        Ok(())
    }

    /// Place `asset` in `category`, replacing its previous category in the same group
    pub fn categorize(&self, caller: &Address, asset: &Address, category: Category) -> Result<()> {
        self.permissioned(caller, TreasuryFn::Categorize.selector())?;
        let previous = {
            let mut state = self.state.write();
            if !state.asset_data.contains_key(asset) {
                return Err(TreasuryError::AssetNotApproved { asset: *asset });
            }
            let group = state
                .group_of(&category)
                .ok_or(TreasuryError::CategoryDoesNotExist { category })?;
            state.categorization.insert((*asset, group), category)
        };
        match previous {
            Some(old) if old != category => {
                info!(asset = %asset.short(), from = %old, to = %category, "asset recategorized")
            }
            _ => info!(asset = %asset.short(), %category, "asset categorized"),
        }
        self.adapter
            .emit(self.address, "Categorized", json!({ "asset": asset, "category": category }));
        Ok(())
    }

    pub fn uncategorize(&self, caller: &Address, asset: &Address, category: Category) -> Result<()> {
        self.permissioned(caller, TreasuryFn::Uncategorize.selector())?;
        {
            let mut state = self.state.write();
            if !state.asset_data.contains_key(asset) {
                return Err(TreasuryError::AssetNotApproved { asset: *asset });
            }
            let group = state
                .group_of(&category)
                .ok_or(TreasuryError::CategoryDoesNotExist { category })?;
            if state.categorization.get(&(*asset, group)) != Some(&category) {
                return Err(TreasuryError::AssetNotInCategory {
                    asset: *asset,
                    category,
                });
            }
            state.categorization.remove(&(*asset, group));
        }
        info!(asset = %asset.short(), %category, "asset uncategorized");
        self.adapter
            .emit(self.address, "Uncategorized", json!({ "asset": asset, "category": category }));
        Ok(())
    }

    pub fn get_category_groups(&self) -> Vec<CategoryGroup> {
        self.state.read().category_groups.clone()
    }

    pub fn get_categories_by_group(&self, group: &CategoryGroup) -> Result<Vec<Category>> {
        let state = self.state.read();
        if !state.category_groups.contains(group) {
            return Err(TreasuryError::CategoryGroupDoesNotExist { group: *group });
        }
        Ok(state
            .categories
            .iter()
            .filter(|(_, g)| g == group)
            .map(|(category, _)| *category)
            .collect())
    }

    /// The asset's category within `group`, or `Category::EMPTY`
    pub fn get_category_by_group(&self, asset: &Address, group: &CategoryGroup) -> Result<Category> {
        let state = self.state.read();
        if !state.category_groups.contains(group) {
            return Err(TreasuryError::CategoryGroupDoesNotExist { group: *group });
        }
        Ok(state
            .categorization
            .get(&(*asset, *group))
            .copied()
            .unwrap_or(Category::EMPTY))
    }
}
