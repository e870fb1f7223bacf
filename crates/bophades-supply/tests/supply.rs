use std::sync::Arc;

use bophades_kernel::testing::StaticPolicy;
use bophades_kernel::{
    Actions, Kernel, KernelError, Module, ModuleFunction, ModuleWithSubmodules, Permissions, Policy, Submodule,
    SubmoduleFn, Target,
};
use bophades_ledger::{Erc20, GohmToken, TokenLedger};
use bophades_supply::submodules::custom::CustomFigures;
use bophades_supply::submodules::CustomSupply;
use bophades_supply::*;
use bophades_types::{Address, Cache, Category, Clock, Keycode, Selector, SubKeycode, Variant};
use proptest::prelude::*;

const START: u64 = 1_700_000_000;
const INDEX: u128 = 100_000_000_000;

struct Fixture {
    kernel: Arc<Kernel>,
    supply: Arc<SupplyModule>,
    ohm: Arc<TokenLedger>,
    gohm: Arc<GohmToken>,
    policy: Address,
}

fn setup() -> Fixture {
    let executor = Address::derive("executor");
    let kernel = Kernel::new(Address::derive("kernel"), executor, Arc::new(Clock::at(START)));
    let ohm = Arc::new(TokenLedger::new("OHM", 9));
    let gohm = Arc::new(GohmToken::new(INDEX));
    let supply = SupplyModule::new(&kernel, Address::derive("SPPLY"), ohm.clone(), gohm.clone(), 0);
    kernel
        .execute_action(&executor, Actions::InstallModule, Target::Module(supply.clone()))
        .unwrap();

    let mut permissions: Vec<Permissions> = [
        SupplyFn::IncreaseCrossChainSupply,
        SupplyFn::DecreaseCrossChainSupply,
        SupplyFn::AddCategory,
        SupplyFn::RemoveCategory,
        SupplyFn::Categorize,
        SupplyFn::StoreCategorySupply,
        SupplyFn::StoreMetric,
    ]
    .iter()
    .map(|f| Permissions::new(SPPLY_KEYCODE, *f))
    .collect();
    permissions.extend(
        [
            SubmoduleFn::InstallSubmodule,
            SubmoduleFn::UpgradeSubmodule,
            SubmoduleFn::UninstallSubmodule,
            SubmoduleFn::ExecOnSubmodule,
        ]
        .iter()
        .map(|f| Permissions::new(SPPLY_KEYCODE, *f)),
    );
    let policy = StaticPolicy::activate(&kernel, &executor, "supply-config", permissions).unwrap();

    Fixture {
        kernel,
        supply,
        ohm,
        gohm,
        policy: policy.address(),
    }
}

fn custom(f: &Fixture, code: &str, figures: CustomFigures) -> Arc<CustomSupply> {
    CustomSupply::new(
        SubKeycode::new(code).unwrap(),
        Address::derive(code),
        f.supply.address(),
        f.ohm.address(),
        figures,
    )
}

struct FailingSubmodule;

impl Submodule for FailingSubmodule {
    fn subkeycode(&self) -> SubKeycode {
        SubKeycode::literal("SPPLY.BROKEN")
    }

    fn parent(&self) -> Keycode {
        SPPLY_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn address(&self) -> Address {
        Address::derive("broken")
    }
}

impl SupplySubmodule for FailingSubmodule {
    fn get_collateralized_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_borrowable_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_liquidity_ohm(&self) -> SubmoduleResult<u128> {
        Err(SubmoduleError::InvalidParams {
            reason: "oracle down".to_string(),
        })
    }

    fn get_protocol_owned_treasury_ohm(&self) -> SubmoduleResult<u128> {
        Ok(0)
    }

    fn get_protocol_owned_liquidity_reserves(&self) -> SubmoduleResult<Vec<Reserves>> {
        Ok(Vec::new())
    }

    fn get_source_count(&self) -> usize {
        0
    }
}

// ============================================================================
// Category supply
// ============================================================================

#[test]
fn test_treasury_category_scenario() {
    let f = setup();
    let a = Address::derive("location-a");
    let b = Address::derive("location-b");
    f.ohm.mint(&a, 1_000_000_000_000).unwrap();
    f.supply.categorize(&f.policy, a, PROTOCOL_OWNED_TREASURY).unwrap();

    let current = f.supply.get_supply_by_category(&PROTOCOL_OWNED_TREASURY, Variant::Current).unwrap();
    assert_eq!(current, Cache::new(1_000_000_000_000, START));

    f.ohm.mint(&b, 500_000_000_000).unwrap();
    f.supply.categorize(&f.policy, b, PROTOCOL_OWNED_TREASURY).unwrap();
    let current = f.supply.get_supply_by_category(&PROTOCOL_OWNED_TREASURY, Variant::Current).unwrap();
    assert_eq!(current, Cache::new(1_500_000_000_000, START));
    assert_eq!(
        f.supply.get_locations_by_category(&PROTOCOL_OWNED_TREASURY).unwrap(),
        vec![a, b]
    );
}

#[test]
fn test_gohm_converted_at_index() {
    let f = setup();
    let dao = Address::derive("dao-wallet");
    // 1.5 gOHM at 100 OHM per gOHM
    f.gohm.mint(&dao, 1_500_000_000_000_000_000).unwrap();
    f.ohm.mint(&dao, 10).unwrap();
    f.supply.categorize(&f.policy, dao, DAO).unwrap();

    let supply = f.supply.get_supply_by_category(&DAO, Variant::Current).unwrap();
    assert_eq!(supply.value, 150_000_000_000 + 10);

    let reserves = f.supply.get_reserves_by_category(&DAO).unwrap();
    assert_eq!(reserves.len(), 1);
    assert_eq!(reserves[0].balances, vec![10, 150_000_000_000]);
}

#[test]
fn test_category_exclusivity() {
    let f = setup();
    let location = Address::derive("location");
    f.supply.categorize(&f.policy, location, PROTOCOL_OWNED_TREASURY).unwrap();

    let result = f.supply.categorize(&f.policy, location, DAO);
    assert!(matches!(
        result,
        Err(SupplyError::LocationAlreadyCategorized { category, .. }) if category == PROTOCOL_OWNED_TREASURY
    ));

    f.supply.categorize(&f.policy, location, Category::EMPTY).unwrap();
    assert_eq!(f.supply.get_category_by_location(&location), Category::EMPTY);
    f.supply.categorize(&f.policy, location, DAO).unwrap();
    assert_eq!(f.supply.get_category_by_location(&location), DAO);
}

#[test]
fn test_categorize_validation() {
    let f = setup();
    let location = Address::derive("location");
    assert!(matches!(
        f.supply.categorize(&f.policy, Address::ZERO, DAO),
        Err(SupplyError::InvalidParams { .. })
    ));
    assert!(matches!(
        f.supply.categorize(&f.policy, location, Category::EMPTY),
        Err(SupplyError::LocationNotCategorized { .. })
    ));
    assert!(matches!(
        f.supply.categorize(&f.policy, location, Category::new("unknown").unwrap()),
        Err(SupplyError::CategoryNotApproved { .. })
    ));
}

#[test]
fn test_cache_monotonicity() {
    let f = setup();
    let location = Address::derive("location");
    f.ohm.mint(&location, 700).unwrap();
    f.supply.categorize(&f.policy, location, PROTOCOL_OWNED_TREASURY).unwrap();

    let stored = f.supply.store_category_supply(&f.policy, PROTOCOL_OWNED_TREASURY).unwrap();
    assert_eq!(stored, Cache::new(700, START));

    f.ohm.mint(&location, 300).unwrap();
    f.kernel.clock().advance(3_600);

    let last = f.supply.get_supply_by_category(&PROTOCOL_OWNED_TREASURY, Variant::Last).unwrap();
    assert_eq!(last, Cache::new(700, START));
    let current = f.supply.get_supply_by_category(&PROTOCOL_OWNED_TREASURY, Variant::Current).unwrap();
    assert_eq!(current, Cache::new(1_000, START + 3_600));

    assert_eq!(f.supply.get_supply_by_category_max_age(&PROTOCOL_OWNED_TREASURY, 3_600).unwrap(), 700);
    assert_eq!(f.supply.get_supply_by_category_max_age(&PROTOCOL_OWNED_TREASURY, 3_599).unwrap(), 1_000);
}

// ============================================================================
// Category management
// ============================================================================

#[test]
fn test_add_category_validation() {
    let f = setup();
    let staked = Category::new("staked").unwrap();

    assert!(matches!(
        f.supply.add_category(&f.policy, Category::EMPTY, false, None, None),
        Err(SupplyError::InvalidParams { .. })
    ));
    assert!(matches!(
        f.supply.add_category(&f.policy, DAO, false, None, None),
        Err(SupplyError::CategoryAlreadyApproved { .. })
    ));
    assert!(matches!(
        f.supply.add_category(&f.policy, staked, true, None, None),
        Err(SupplyError::InvalidParams { .. })
    ));
    assert!(matches!(
        f.supply.add_category(&f.policy, staked, false, Some(SubmoduleMetric::CollateralizedOhm), None),
        Err(SupplyError::InvalidParams { .. })
    ));

    let off_list = Selector::from_signature("balanceOf(address)");
    assert!(matches!(
        f.supply.add_category_by_selectors(&f.policy, staked, true, off_list, Selector::ZERO),
        Err(SupplyError::InvalidSelector { selector }) if selector == off_list
    ));

    f.supply
        .add_category_by_selectors(
            &f.policy,
            staked,
            true,
            SubmoduleMetric::ProtocolOwnedTreasuryOhm.selector(),
            Selector::ZERO,
        )
        .unwrap();
    let data = f.supply.get_category_data(&staked).unwrap();
    assert!(data.use_submodules);
    assert_eq!(data.submodule_metric, Some(SubmoduleMetric::ProtocolOwnedTreasuryOhm));
    assert_eq!(data.submodule_reserves, None);
}

#[test]
fn test_remove_category() {
    let f = setup();
    let location = Address::derive("location");
    f.supply.categorize(&f.policy, location, DAO).unwrap();
    assert!(matches!(
        f.supply.remove_category(&f.policy, DAO),
        Err(SupplyError::CategoryInUse { .. })
    ));

    f.supply.categorize(&f.policy, location, Category::EMPTY).unwrap();
    f.supply.remove_category(&f.policy, DAO).unwrap();
    assert!(!f.supply.get_categories().contains(&DAO));
    assert!(matches!(
        f.supply.remove_category(&f.policy, DAO),
        Err(SupplyError::CategoryNotApproved { .. })
    ));
}

#[test]
fn test_unpermissioned_caller_rejected() {
    let f = setup();
    let result = f.supply.categorize(&Address::derive("mallory"), Address::derive("x"), DAO);
    assert!(matches!(
        result,
        Err(SupplyError::Kernel(KernelError::PolicyNotPermitted { .. }))
    ));
}

// ============================================================================
// Metrics and submodules
// ============================================================================

fn with_metrics_fixture() -> Fixture {
    let f = setup();
    let treasury = Address::derive("treasury");
    let dao = Address::derive("dao");
    f.ohm.mint(&treasury, 1_000).unwrap();
    f.ohm.mint(&dao, 200).unwrap();
    f.ohm.mint(&Address::derive("holder"), 3_000).unwrap();
    f.supply.increase_cross_chain_supply(&f.policy, 500).unwrap();
    f.supply.categorize(&f.policy, treasury, PROTOCOL_OWNED_TREASURY).unwrap();
    f.supply.categorize(&f.policy, dao, DAO).unwrap();

    let figures = CustomFigures {
        collateralized_ohm: 400,
        protocol_owned_borrowable_ohm: 100,
        protocol_owned_liquidity_ohm: 300,
        protocol_owned_treasury_ohm: 0,
        source: Address::derive("vault"),
    };
    f.supply
        .install_submodule(&f.policy, custom(&f, "SPPLY.CUSTOM", figures))
        .unwrap();
    f
}

#[test]
fn test_metric_chain() {
    let f = with_metrics_fixture();
    let metric = |m| f.supply.get_metric(m, Variant::Current).unwrap().value;
    assert_eq!(metric(Metric::TotalSupply), 4_700);
    assert_eq!(metric(Metric::CirculatingSupply), 3_500);
    assert_eq!(metric(Metric::FloatingSupply), 3_100);
    assert_eq!(metric(Metric::CollateralizedSupply), 400);
    assert_eq!(metric(Metric::BackedSupply), 2_700);

    let reserves = f.supply.get_reserves_by_category(&PROTOCOL_OWNED_LIQUIDITY).unwrap();
    assert_eq!(reserves.len(), 1);
    assert_eq!(reserves[0].balances, vec![300]);
}

#[test]
fn test_store_metric_and_max_age() {
    let f = with_metrics_fixture();
    assert_eq!(f.supply.get_metric(Metric::TotalSupply, Variant::Last).unwrap(), Cache::default());
    f.supply.store_metric(&f.policy, Metric::TotalSupply).unwrap();
    f.ohm.mint(&Address::derive("holder"), 300).unwrap();
    f.kernel.clock().advance(60);

    assert_eq!(
        f.supply.get_metric(Metric::TotalSupply, Variant::Last).unwrap(),
        Cache::new(4_700, START)
    );
    assert_eq!(f.supply.get_metric_max_age(Metric::TotalSupply, 60).unwrap(), 4_700);
    assert_eq!(f.supply.get_metric_max_age(Metric::TotalSupply, 59).unwrap(), 5_000);
}

#[test]
fn test_negative_metric_is_an_error() {
    let f = with_metrics_fixture();
    let code = SubKeycode::new("SPPLY.CUSTOM").unwrap();
    f.supply
        .exec_on_submodule(&f.policy, &code, SupplyCommand::SetCollateralizedOhm(1_000_000))
        .unwrap();
    assert!(matches!(
        f.supply.get_metric(Metric::BackedSupply, Variant::Current),
        Err(SupplyError::InvalidParams { .. })
    ));
}

#[test]
fn test_submodule_failure_propagates() {
    let f = with_metrics_fixture();
    f.supply.install_submodule(&f.policy, Arc::new(FailingSubmodule)).unwrap();

    let result = f.supply.get_supply_by_category(&PROTOCOL_OWNED_LIQUIDITY, Variant::Current);
    assert!(matches!(
        result,
        Err(SupplyError::SubmoduleFailed { submodule, .. }) if submodule.as_str() == "SPPLY.BROKEN"
    ));
    assert!(f.supply.get_metric(Metric::FloatingSupply, Variant::Current).is_err());
    // categories that do not consult the failing metric are unaffected
    assert!(f.supply.get_metric(Metric::CirculatingSupply, Variant::Current).is_ok());
}

#[test]
fn test_submodule_lifecycle() {
    let f = setup();
    let code = SubKeycode::new("SPPLY.CUSTOM").unwrap();
    let first = custom(&f, "SPPLY.CUSTOM", CustomFigures::default());

    let stranger = Address::derive("stranger");
    assert!(matches!(
        f.supply.install_submodule(&stranger, first.clone()),
        Err(KernelError::PolicyNotPermitted { .. })
    ));

    f.supply.install_submodule(&f.policy, first).unwrap();
    assert_eq!(f.supply.get_submodules(), vec![code]);

    let figures = CustomFigures {
        protocol_owned_borrowable_ohm: 42,
        ..CustomFigures::default()
    };
    let upgraded = CustomSupply::new(code, Address::derive("custom-v2"), f.supply.address(), f.ohm.address(), figures);
    f.supply.upgrade_submodule(&f.policy, upgraded).unwrap();
    let supply = f.supply.get_supply_by_category(&PROTOCOL_OWNED_BORROWABLE, Variant::Current).unwrap();
    assert_eq!(supply.value, 42);

    f.supply.uninstall_submodule(&f.policy, &code).unwrap();
    assert!(f.supply.get_submodules().is_empty());
    assert!(matches!(
        f.supply.exec_on_submodule(&f.policy, &code, SupplyCommand::SetCollateralizedOhm(1)),
        Err(SupplyError::Kernel(KernelError::SubmoduleNotInstalled { .. }))
    ));
}

#[test]
fn test_exec_rejects_unsupported_command() {
    let f = setup();
    let code = SubKeycode::new("SPPLY.CUSTOM").unwrap();
    f.supply
        .install_submodule(&f.policy, custom(&f, "SPPLY.CUSTOM", CustomFigures::default()))
        .unwrap();
    let result = f.supply.exec_on_submodule(&f.policy, &code, SupplyCommand::AddHolder(Address::derive("h")));
    assert!(matches!(result, Err(SupplyError::SubmoduleFailed { .. })));
}

#[test]
fn test_cross_chain_supply_underflow() {
    let f = setup();
    f.supply.increase_cross_chain_supply(&f.policy, 10).unwrap();
    assert!(matches!(
        f.supply.decrease_cross_chain_supply(&f.policy, 11),
        Err(SupplyError::InvalidParams { .. })
    ));
    f.supply.decrease_cross_chain_supply(&f.policy, 10).unwrap();
    assert_eq!(f.supply.total_cross_chain_supply(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_location_in_at_most_one_category(ops in proptest::collection::vec((0usize..4, 0usize..3), 1..40)) {
        let f = setup();
        let locations: Vec<Address> = (0..4).map(|i| Address::derive(&format!("loc-{i}"))).collect();
        let categories = [Category::EMPTY, PROTOCOL_OWNED_TREASURY, DAO];

        for (loc, cat) in ops {
            let location = locations[loc];
            let category = categories[cat];
            let before = f.supply.get_category_by_location(&location);
            let result = f.supply.categorize(&f.policy, location, category);
            if !before.is_empty() && !category.is_empty() {
                prop_assert!(result.is_err());
                prop_assert_eq!(f.supply.get_category_by_location(&location), before);
            }
        }

        let all = f.supply.get_locations();
        let mut deduped = all.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(all.len(), deduped.len());
        let by_category: usize = [PROTOCOL_OWNED_TREASURY, DAO]
            .iter()
            .map(|c| f.supply.get_locations_by_category(c).unwrap().len())
            .sum();
        prop_assert_eq!(by_category, all.len());
    }
}
