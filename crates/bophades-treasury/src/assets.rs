//! Approved assets, their external locations and cached balances

use bophades_kernel::{Module, ModuleFunction};
use bophades_types::{math, Address, Cache, Category, Variant};
use serde_json::json;
use tracing::info;

use crate::error::{Result, TreasuryError};
use crate::module::{AssetData, TreasuryFn, TreasuryModule};

impl TreasuryModule {
    // ========================================================================
    // Registry
    // ========================================================================

    /// Approve `asset`, counting balances held at `locations` as well as TRSRY's own
    pub fn add_asset(&self, caller: &Address, asset: &Address, locations: &[Address]) -> Result<()> {
        self.permissioned(caller, TreasuryFn::AddAsset.selector())?;
        if self.is_approved(asset) {
            return Err(TreasuryError::AssetAlreadyApproved { asset: *asset });
        }
        if !self.tokens.has_code(asset) {
            return Err(TreasuryError::invalid(format!("{asset} is not a token")));
        }
        for (i, location) in locations.iter().enumerate() {
            if location.is_zero() {
                return Err(TreasuryError::invalid("zero location"));
            }
            if locations[..i].contains(location) {
                return Err(TreasuryError::invalid(format!("duplicate location {location}")));
            }
        }

        let now = self.now()?;
        let data = AssetData {
            approved: true,
            updated_at: now,
            last_balance: 0,
            locations: locations.to_vec(),
        };
        let balance = self.current_balance(asset, &data.locations)?;
        {
            let mut state = self.state.write();
            state.assets.push(*asset);
            state.asset_data.insert(
                *asset,
                AssetData {
                    last_balance: balance,
                    ..data
                },
            );
        }

        info!(asset = %asset.short(), locations = locations.len(), balance, "asset added");
        self.adapter
            .emit(self.address, "AssetAdded", json!({ "asset": asset, "locations": locations }));
        Ok(())
    }

    /// Drop `asset` from the registry along with all of its categorizations
    pub fn remove_asset(&self, caller: &Address, asset: &Address) -> Result<()> {
        self.permissioned(caller, TreasuryFn::RemoveAsset.selector())?;
        {
            let mut state = self.state.write();
            if state.asset_data.remove(asset).is_none() {
                return Err(TreasuryError::AssetNotApproved { asset: *asset });
            }
            state.assets.retain(|a| a != asset);
            state.categorization.retain(|(a, _), _| a != asset);
        }
        info!(asset = %asset.short(), "asset removed");
        self.adapter.emit(self.address, "AssetRemoved", json!({ "asset": asset }));
        Ok(())
    }

    pub fn add_asset_location(&self, caller: &Address, asset: &Address, location: &Address) -> Result<()> {
        self.permissioned(caller, TreasuryFn::AddAssetLocation.selector())?;
        if location.is_zero() {
            return Err(TreasuryError::invalid("zero location"));
        }
        {
            let mut state = self.state.write();
            let data = state
                .asset_data
                .get_mut(asset)
                .ok_or(TreasuryError::AssetNotApproved { asset: *asset })?;
            if data.locations.contains(location) {
                return Err(TreasuryError::invalid(format!("duplicate location {location}")));
            }
            data.locations.push(*location);
        }
        info!(asset = %asset.short(), location = %location.short(), "asset location added");
        self.adapter.emit(
            self.address,
            "AssetLocationAdded",
            json!({ "asset": asset, "location": location }),
        );
        Ok(())
    }

    pub fn remove_asset_location(&self, caller: &Address, asset: &Address, location: &Address) -> Result<()> {
        self.permissioned(caller, TreasuryFn::RemoveAssetLocation.selector())?;
        {
            let mut state = self.state.write();
            let data = state
                .asset_data
                .get_mut(asset)
                .ok_or(TreasuryError::AssetNotApproved { asset: *asset })?;
            let before = data.locations.len();
            data.locations.retain(|l| l != location);
            if data.locations.len() == before {
                return Err(TreasuryError::invalid(format!("{location} is not a location of {asset}")));
            }
        }
        info!(asset = %asset.short(), location = %location.short(), "asset location removed");
        self.adapter.emit(
            self.address,
            "AssetLocationRemoved",
            json!({ "asset": asset, "location": location }),
        );
        Ok(())
    }

    pub fn is_approved(&self, asset: &Address) -> bool {
        self.state
            .read()
            .asset_data
            .get(asset)
            .map(|data| data.approved)
            .unwrap_or(false)
    }

    pub fn get_assets(&self) -> Vec<Address> {
        self.state.read().assets.clone()
    }

    pub fn get_asset_data(&self, asset: &Address) -> Result<AssetData> {
        self.state
            .read()
            .asset_data
            .get(asset)
            .cloned()
            .ok_or(TreasuryError::AssetNotApproved { asset: *asset })
    }

    // ========================================================================
    // Balances
    // ========================================================================

    /// Reserve balance plus whatever sits at the external locations
    fn current_balance(&self, asset: &Address, locations: &[Address]) -> Result<u128> {
        let token = self.token(asset)?;
        let mut balance = self.get_reserve_balance(asset)?;
        for location in locations {
            balance = math::checked_add(balance, token.balance_of(location))?;
        }
        Ok(balance)
    }

    pub fn get_asset_balance(&self, asset: &Address, variant: Variant) -> Result<Cache> {
        let data = self.get_asset_data(asset)?;
        match variant {
            Variant::Current => Ok(Cache::new(self.current_balance(asset, &data.locations)?, self.now()?)),
            Variant::Last => Ok(data.cache()),
        }
    }

    /// The cached balance if younger than `max_age`, otherwise a live read
    pub fn get_asset_balance_max_age(&self, asset: &Address, max_age: u64) -> Result<u128> {
        let cached = self.get_asset_data(asset)?.cache();
        if cached.is_fresh(self.now()?, max_age) {
            return Ok(cached.value);
        }
        Ok(self.get_asset_balance(asset, Variant::Current)?.value)
    }

    /// Snapshot the live balance of `asset`
    pub fn store_balance(&self, caller: &Address, asset: &Address) -> Result<Cache> {
        self.permissioned(caller, TreasuryFn::StoreBalance.selector())?;
        let current = self.get_asset_balance(asset, Variant::Current)?;
        {
            let mut state = self.state.write();
            let data = state
                .asset_data
                .get_mut(asset)
                .ok_or(TreasuryError::AssetNotApproved { asset: *asset })?;
            data.last_balance = current.value;
            data.updated_at = current.timestamp;
        }
        info!(asset = %asset.short(), balance = current.value, "balance stored");
        self.adapter.emit(
            self.address,
            "BalanceStored",
            json!({ "asset": asset, "balance": current.value.to_string(), "timestamp": current.timestamp }),
        );
        Ok(current)
    }

    pub fn get_assets_by_category(&self, category: &Category) -> Result<Vec<Address>> {
        let state = self.state.read();
        let group = state
            .group_of(category)
            .ok_or(TreasuryError::CategoryDoesNotExist { category: *category })?;
        Ok(state
            .assets
            .iter()
            .filter(|asset| state.categorization.get(&(**asset, group)) == Some(category))
            .copied()
            .collect())
    }

    /// Sum of every asset in `category`, stamped with the oldest per-asset timestamp
    pub fn get_category_balance(&self, category: &Category, variant: Variant) -> Result<Cache> {
        let assets = self.get_assets_by_category(category)?;
        let mut total = Cache::new(0, self.now()?);
        for asset in &assets {
            let balance = self.get_asset_balance(asset, variant)?;
            total.value = math::checked_add(total.value, balance.value)?;
            total.timestamp = total.timestamp.min(balance.timestamp);
        }
        Ok(total)
    }
}
