//! Point-in-time report of supply, treasury, bridge and deposit state

use bophades_kernel::Policy;
use bophades_ledger::Erc20;
use bophades_policies::Enabled;
use bophades_supply::Metric;
use bophades_types::{Address, Category, Variant};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::protocol::Protocol;

/// Everything the CLI reports, read with `Variant::Current`
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolSnapshot {
    /// Protocol clock
    pub timestamp: u64,
    /// Wall clock when the snapshot was taken
    pub generated_at: DateTime<Utc>,
    pub kernel: Address,
    pub executor: Address,
    pub active_policies: usize,
    pub metrics: Vec<MetricReport>,
    pub supply_categories: Vec<SupplyCategoryReport>,
    pub treasury_assets: Vec<AssetReport>,
    pub bridge: Option<BridgeReport>,
    pub positions: u64,
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricReport {
    pub metric: Metric,
    #[serde(serialize_with = "as_string")]
    pub value: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyCategoryReport {
    pub category: Category,
    #[serde(serialize_with = "as_string")]
    pub supply: u128,
    pub locations: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReport {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    #[serde(serialize_with = "as_string")]
    pub balance: u128,
    #[serde(serialize_with = "as_string")]
    pub reserve_balance: u128,
    #[serde(serialize_with = "as_string")]
    pub total_debt: u128,
    pub locations: Vec<Address>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    pub address: Address,
    pub enabled: bool,
    #[serde(serialize_with = "as_string")]
    pub bridged_supply: u128,
    #[serde(serialize_with = "as_string")]
    pub cross_chain_supply: u128,
    pub failed_messages: usize,
}

fn as_string<S: Serializer>(value: &u128, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

impl Protocol {
    pub fn metrics(&self) -> Result<Vec<MetricReport>> {
        Metric::ALL
            .into_iter()
            .map(|metric| {
                Ok(MetricReport {
                    metric,
                    value: self.supply.get_metric(metric, Variant::Current)?.value,
                })
            })
            .collect()
    }

    pub fn supply_categories(&self) -> Result<Vec<SupplyCategoryReport>> {
        let mut reports = Vec::new();
        for category in self.supply.get_categories() {
            reports.push(SupplyCategoryReport {
                supply: self.supply.get_supply_by_category(&category, Variant::Current)?.value,
                locations: self.supply.get_locations_by_category(&category)?,
                category,
            });
        }
        Ok(reports)
    }

    pub fn treasury_assets(&self) -> Result<Vec<AssetReport>> {
        let groups = self.treasury.get_category_groups();
        let mut reports = Vec::new();
        for asset in self.treasury.get_assets() {
            let token = self.tokens.get(&asset)?;
            let data = self.treasury.get_asset_data(&asset)?;
            let mut categories = Vec::new();
            for group in &groups {
                let category = self.treasury.get_category_by_group(&asset, group)?;
                if !category.is_empty() {
                    categories.push(category);
                }
            }
            reports.push(AssetReport {
                symbol: token.symbol().to_string(),
                address: asset,
                decimals: token.decimals(),
                balance: self.treasury.get_asset_balance(&asset, Variant::Current)?.value,
                reserve_balance: self.treasury.get_reserve_balance(&asset)?,
                total_debt: self.treasury.total_debt(&asset),
                locations: data.locations,
                categories,
            });
        }
        Ok(reports)
    }

    pub fn bridge_report(&self) -> Option<BridgeReport> {
        self.bridge.as_ref().map(|bridge| BridgeReport {
            address: bridge.address(),
            enabled: bridge.is_enabled(),
            bridged_supply: bridge.bridged_supply(),
            cross_chain_supply: self.supply.total_cross_chain_supply(),
            failed_messages: bridge.failed_messages().len(),
        })
    }

    pub fn snapshot(&self) -> Result<ProtocolSnapshot> {
        Ok(ProtocolSnapshot {
            timestamp: self.kernel.now(),
            generated_at: Utc::now(),
            kernel: self.kernel.address(),
            executor: self.kernel.executor(),
            active_policies: self.kernel.active_policies().len(),
            metrics: self.metrics()?,
            supply_categories: self.supply_categories()?,
            treasury_assets: self.treasury_assets()?,
            bridge: self.bridge_report(),
            positions: self.deposits.get_position_count(),
            events: self.kernel.events().len(),
        })
    }
}
