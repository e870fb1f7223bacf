//! Boot a configured protocol: kernel, modules, policies and initial state

use std::sync::Arc;

use bophades_deposits::DepositModule;
use bophades_kernel::{Actions, Kernel, Module, Policy, Target};
use bophades_ledger::{Erc20, GohmToken, TokenLedger, TokenRegistry};
use bophades_minter::MinterModule;
use bophades_policies::{
    BridgeTokenPool, DepositFacility, Enabled, Observations, RolesAdmin, SupplyConfig, TreasuryConfig,
    TreasuryCustodian, ADMIN_ROLE, CUSTODIAN_ROLE, DEPOSIT_OPERATOR_ROLE, SUPPLY_ADMIN_ROLE, SUPPLY_KEEPER_ROLE,
    TREASURY_ADMIN_ROLE,
};
use bophades_roles::RolesModule;
use bophades_supply::submodules::MigrationOffsetSupply;
use bophades_supply::{SubmoduleMetric, SubmoduleReserves, SupplyError, SupplyModule};
use bophades_treasury::TreasuryModule;
use bophades_types::{math, Address, Cache, Category, Clock, Selector, GOHM_DECIMALS, OHM_DECIMALS};
use tracing::{debug, info};

use crate::config::{resolve_account, ProtocolConfig};
use crate::error::{Result, StateError};

/// A booted protocol and handles to every contract in it
pub struct Protocol {
    pub config: ProtocolConfig,
    pub kernel: Arc<Kernel>,
    pub executor: Address,
    pub tokens: Arc<TokenRegistry>,
    pub ohm: Arc<TokenLedger>,
    pub gohm: Arc<GohmToken>,

    // Modules
    pub roles: Arc<RolesModule>,
    pub minter: Arc<MinterModule>,
    pub supply: Arc<SupplyModule>,
    pub treasury: Arc<TreasuryModule>,
    pub deposits: Arc<DepositModule>,

    // Policies
    pub roles_admin: Arc<RolesAdmin>,
    pub custodian: Arc<TreasuryCustodian>,
    pub treasury_config: Arc<TreasuryConfig>,
    pub supply_config: Arc<SupplyConfig>,
    pub deposit_facility: Arc<DepositFacility>,
    pub bridge: Option<Arc<BridgeTokenPool>>,
}

impl Protocol {
    /// Build, install and configure everything `config` describes
    ///
    /// The executor is the RolesAdmin admin and is granted every policy role,
    /// so the rest of the configuration flows through the policies.
    pub fn boot(config: ProtocolConfig) -> Result<Self> {
        let executor = resolve_account(&config.executor)?;
        let clock = match config.start_timestamp {
            Some(timestamp) => Clock::at(timestamp),
            None => Clock::system(),
        };
        let kernel = Kernel::new(Address::derive("Kernel"), executor, Arc::new(clock));

        // ====================================================================
        // Tokens
        // ====================================================================

        let tokens = Arc::new(TokenRegistry::new());
        let ohm = Arc::new(TokenLedger::new("OHM", OHM_DECIMALS));
        let gohm = Arc::new(GohmToken::new(u128::from(config.gohm_index)));
        tokens.register(ohm.clone());
        tokens.register(gohm.clone());
        for token in &config.tokens {
            if tokens.by_symbol(&token.symbol).is_some() {
                return Err(StateError::invalid(format!("duplicate token {}", token.symbol)));
            }
            let ledger = TokenLedger::new(token.symbol.as_str(), token.decimals).with_transfer_fee(token.transfer_fee_bps);
            tokens.register(Arc::new(ledger));
        }

        // ====================================================================
        // Modules
        // ====================================================================

        let cross_chain_supply = whole(config.cross_chain_supply, OHM_DECIMALS)?;
        let roles = RolesModule::new(&kernel, Address::derive("ROLES"));
        let minter = MinterModule::new(&kernel, Address::derive("MINTR"), ohm.clone());
        let supply = SupplyModule::new(
            &kernel,
            Address::derive("SPPLY"),
            ohm.clone(),
            gohm.clone(),
            cross_chain_supply,
        );
        let treasury = TreasuryModule::new(&kernel, Address::derive("TRSRY"), tokens.clone());
        let deposits = DepositModule::new(&kernel, Address::derive("DEPOS"), "Olympus Deposit Position", "ODP");

        let modules: [Arc<dyn Module>; 5] = [
            roles.clone(),
            minter.clone(),
            supply.clone(),
            treasury.clone(),
            deposits.clone(),
        ];
        for module in modules {
            kernel.execute_action(&executor, Actions::InstallModule, Target::Module(module))?;
        }

        // ====================================================================
        // Policies
        // ====================================================================

        let roles_admin = RolesAdmin::new(&kernel, Address::derive("RolesAdmin"), executor);
        let custodian = TreasuryCustodian::new(&kernel, Address::derive("TreasuryCustodian"));
        let treasury_config = TreasuryConfig::new(&kernel, Address::derive("TreasuryConfig"));
        let supply_config = SupplyConfig::new(&kernel, Address::derive("SupplyConfig"));
        let deposit_facility = DepositFacility::new(&kernel, Address::derive("DepositFacility"));
        let bridge = match &config.bridge_relayer {
            Some(relayer) => Some(BridgeTokenPool::new(
                &kernel,
                Address::derive("BridgeTokenPool"),
                resolve_account(relayer)?,
            )),
            None => None,
        };

        let mut policies: Vec<Arc<dyn Policy>> = vec![
            roles_admin.clone(),
            custodian.clone(),
            treasury_config.clone(),
            supply_config.clone(),
            deposit_facility.clone(),
        ];
        if let Some(bridge) = &bridge {
            policies.push(bridge.clone());
        }
        for policy in policies {
            kernel.execute_action(&executor, Actions::ActivatePolicy, Target::Policy(policy))?;
        }

        for role in [
            ADMIN_ROLE,
            CUSTODIAN_ROLE,
            TREASURY_ADMIN_ROLE,
            SUPPLY_ADMIN_ROLE,
            SUPPLY_KEEPER_ROLE,
            DEPOSIT_OPERATOR_ROLE,
        ] {
            roles_admin.grant_role(&executor, role, executor)?;
        }

        let protocol = Self {
            config,
            kernel,
            executor,
            tokens,
            ohm,
            gohm,
            roles,
            minter,
            supply,
            treasury,
            deposits,
            roles_admin,
            custodian,
            treasury_config,
            supply_config,
            deposit_facility,
            bridge,
        };
        protocol.apply_balances()?;
        protocol.apply_treasury()?;
        protocol.apply_supply()?;

        protocol.deposit_facility.enable(&executor)?;
        if let Some(bridge) = &protocol.bridge {
            bridge.enable(&executor)?;
        }

        info!(
            kernel = %protocol.kernel.address().short(),
            tokens = protocol.tokens.all().len(),
            assets = protocol.treasury.get_assets().len(),
            "protocol booted"
        );
        Ok(protocol)
    }

    fn apply_balances(&self) -> Result<()> {
        for balance in &self.config.balances {
            let token = self.token(&balance.token)?;
            let holder = resolve_account(&balance.holder)?;
            let amount = whole(balance.amount, token.decimals())?;
            token.mint(&holder, amount)?;
            debug!(holder = %balance.holder, token = %balance.token, amount, "initial balance minted");
        }
        Ok(())
    }

    fn apply_treasury(&self) -> Result<()> {
        for asset in &self.config.treasury.assets {
            let token = self.token(&asset.token)?.address();
            let locations = asset
                .locations
                .iter()
                .map(|location| resolve_account(location))
                .collect::<Result<Vec<_>>>()?;
            self.treasury_config.add_asset(&self.executor, &token, &locations)?;
            for category in &asset.categories {
                self.treasury_config
                    .categorize(&self.executor, &token, Category::new(category)?)?;
            }
        }
        Ok(())
    }

    fn apply_supply(&self) -> Result<()> {
        let settings = &self.config.supply;
        for category in &settings.categories {
            let metric = match &category.metric {
                Some(signature) => Some(
                    SubmoduleMetric::try_from(Selector::from_signature(signature))
                        .map_err(|selector| SupplyError::InvalidSelector { selector })?,
                ),
                None => None,
            };
            let reserves = match &category.reserves {
                Some(signature) => Some(
                    SubmoduleReserves::try_from(Selector::from_signature(signature))
                        .map_err(|selector| SupplyError::InvalidSelector { selector })?,
                ),
                None => None,
            };
            self.supply_config.add_supply_category(
                &self.executor,
                Category::new(&category.name)?,
                category.use_submodules,
                metric,
                reserves,
            )?;
        }

        for location in &settings.locations {
            self.supply_config.categorize_supply(
                &self.executor,
                resolve_account(&location.location)?,
                Category::new(&location.category)?,
            )?;
        }

        if let Some(offset) = &settings.migration_offset {
            let submodule = MigrationOffsetSupply::new(
                Address::derive("SPPLY.MIGOFFSET"),
                self.supply.address(),
                self.gohm.clone(),
                resolve_account(&offset.location)?,
                whole(offset.gohm, GOHM_DECIMALS)?,
            );
            self.supply_config.install_submodule(&self.executor, submodule)?;
        }
        Ok(())
    }

    /// Look up a token by symbol
    pub fn token(&self, symbol: &str) -> Result<Arc<dyn Erc20>> {
        self.tokens
            .by_symbol(symbol)
            .ok_or_else(|| StateError::UnknownToken {
                symbol: symbol.to_string(),
            })
    }

    /// Store every SPPLY metric and category as the executor
    pub fn store_observations(&self) -> Result<Observations> {
        Ok(self.supply_config.store_observations(&self.executor)?)
    }

    /// Store every TRSRY asset balance as the executor
    pub fn store_balances(&self) -> Result<Vec<(Address, Cache)>> {
        Ok(self.treasury_config.store_balances(&self.executor)?)
    }
}

/// Whole tokens to base units
fn whole(amount: u64, decimals: u8) -> Result<u128> {
    Ok(math::to_raw(u128::from(amount), decimals)?)
}
