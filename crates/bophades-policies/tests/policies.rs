use std::sync::Arc;

use bophades_deposits::{DepositError, DepositModule};
use bophades_kernel::testing::StaticPolicy;
use bophades_kernel::{Actions, Kernel, KernelError, Module, Permissions, Policy, Target};
use bophades_ledger::{Erc20, GohmToken, TokenLedger, TokenRegistry};
use bophades_minter::{MinterError, MinterFn, MinterModule, MINTR_KEYCODE};
use bophades_policies::{
    BridgeMessage, BridgeTokenPool, DepositFacility, DepositRequest, Enabled, PolicyError, RolesAdmin, SupplyConfig,
    TreasuryConfig, TreasuryCustodian, ADMIN_ROLE, CUSTODIAN_ROLE, DEPOSIT_OPERATOR_ROLE, EMERGENCY_ROLE, MONTH,
    SUPPLY_ADMIN_ROLE, SUPPLY_KEEPER_ROLE, TREASURY_ADMIN_ROLE,
};
use bophades_roles::{RolesError, RolesModule};
use bophades_supply::{Metric, SupplyFn, SupplyModule, PROTOCOL_OWNED_TREASURY, SPPLY_KEYCODE};
use bophades_treasury::{TreasuryModule, LIQUID, LIQUIDITY_PREFERENCE};
use bophades_types::{Address, Clock, Role, Variant};
use uuid::Uuid;

const START: u64 = 1_700_000_000;
const E9: u128 = 1_000_000_000;
const E18: u128 = 1_000_000_000_000_000_000;

struct Protocol {
    kernel: Arc<Kernel>,
    executor: Address,
    ohm: Arc<TokenLedger>,
    usds: Arc<TokenLedger>,
    minter: Arc<MinterModule>,
    supply: Arc<SupplyModule>,
    treasury: Arc<TreasuryModule>,
    deposits: Arc<DepositModule>,
    roles_admin: Arc<RolesAdmin>,
    admin: Address,
    alice: Address,
    bob: Address,
}

impl Protocol {
    fn boot() -> Self {
        let executor = Address::derive("executor");
        let kernel = Kernel::new(Address::derive("kernel"), executor, Arc::new(Clock::at(START)));

        let tokens = Arc::new(TokenRegistry::new());
        let ohm = Arc::new(TokenLedger::new("OHM", 9));
        let usds = Arc::new(TokenLedger::new("USDS", 18));
        tokens.register(ohm.clone());
        tokens.register(usds.clone());

        let roles = RolesModule::new(&kernel, Address::derive("ROLES"));
        let minter = MinterModule::new(&kernel, Address::derive("MINTR"), ohm.clone());
        let supply = SupplyModule::new(
            &kernel,
            Address::derive("SPPLY"),
            ohm.clone(),
            Arc::new(GohmToken::new(100 * E9)),
            0,
        );
        let treasury = TreasuryModule::new(&kernel, Address::derive("TRSRY"), tokens);
        let deposits = DepositModule::new(&kernel, Address::derive("DEPOS"), "Convertible Deposit", "CDP");
        let modules: [Arc<dyn Module>; 5] = [
            roles,
            minter.clone(),
            supply.clone(),
            treasury.clone(),
            deposits.clone(),
        ];
        for module in modules {
            kernel
                .execute_action(&executor, Actions::InstallModule, Target::Module(module))
                .unwrap();
        }

        let admin = Address::derive("admin");
        let roles_admin = RolesAdmin::new(&kernel, Address::derive("RolesAdmin"), admin);
        kernel
            .execute_action(&executor, Actions::ActivatePolicy, Target::Policy(roles_admin.clone()))
            .unwrap();

        Self {
            kernel,
            executor,
            ohm,
            usds,
            minter,
            supply,
            treasury,
            deposits,
            roles_admin,
            admin,
            alice: Address::derive("alice"),
            bob: Address::derive("bob"),
        }
    }

    fn activate(&self, policy: Arc<dyn Policy>) {
        self.kernel
            .execute_action(&self.executor, Actions::ActivatePolicy, Target::Policy(policy))
            .unwrap();
    }

    fn grant(&self, role: Role, wallet: Address) {
        self.roles_admin.grant_role(&self.admin, role, wallet).unwrap();
    }
}

// ============================================================================
// RolesAdmin
// ============================================================================

#[test]
fn test_roles_admin_two_step_handover() {
    let p = Protocol::boot();
    let next = Address::derive("next-admin");

    assert_eq!(
        p.roles_admin.grant_role(&p.alice, CUSTODIAN_ROLE, p.alice),
        Err(PolicyError::OnlyAdmin { caller: p.alice })
    );
    p.roles_admin.push_new_admin(&p.admin, next).unwrap();
    assert_eq!(p.roles_admin.pending_admin(), Some(next));
    assert_eq!(
        p.roles_admin.pull_new_admin(&p.alice),
        Err(PolicyError::OnlyNewAdmin { caller: p.alice })
    );

    p.roles_admin.pull_new_admin(&next).unwrap();
    assert_eq!(p.roles_admin.admin(), next);
    assert_eq!(p.roles_admin.pending_admin(), None);
    assert!(p.roles_admin.grant_role(&p.admin, CUSTODIAN_ROLE, p.alice).is_err());
    p.roles_admin.grant_role(&next, CUSTODIAN_ROLE, p.alice).unwrap();
    p.roles_admin.revoke_role(&next, CUSTODIAN_ROLE, p.alice).unwrap();
}

#[test]
fn test_roles_admin_rejects_invalid_role() {
    let p = Protocol::boot();
    assert!(matches!(
        p.roles_admin.grant_role(&p.admin, Role::literal("Bad Role"), p.alice),
        Err(PolicyError::Roles(RolesError::InvalidRole { .. }))
    ));
}

// ============================================================================
// PolicyEnabler
// ============================================================================

#[test]
fn test_enable_and_disable() {
    let p = Protocol::boot();
    let facility = DepositFacility::new(&p.kernel, Address::derive("DepositFacility"));
    p.activate(facility.clone());
    let guardian = Address::derive("guardian");
    p.grant(ADMIN_ROLE, p.admin);
    p.grant(EMERGENCY_ROLE, guardian);

    assert!(!facility.is_enabled());
    assert!(matches!(
        facility.enable(&guardian),
        Err(PolicyError::Roles(RolesError::RequireRole { .. }))
    ));
    facility.enable(&p.admin).unwrap();
    assert!(facility.is_enabled());
    assert_eq!(facility.enable(&p.admin), Err(PolicyError::NotDisabled));

    assert!(matches!(
        facility.disable(&p.alice),
        Err(PolicyError::Roles(RolesError::RequireRole { .. }))
    ));
    facility.disable(&guardian).unwrap();
    assert_eq!(facility.disable(&p.admin), Err(PolicyError::NotEnabled));
    assert_eq!(p.kernel.events().named("Enabled").len(), 1);
    assert_eq!(p.kernel.events().named("Disabled").len(), 1);
}

// ============================================================================
// TreasuryCustodian
// ============================================================================

#[test]
fn test_custodian_manages_approvals_and_debt() {
    let p = Protocol::boot();
    let custodian = TreasuryCustodian::new(&p.kernel, Address::derive("TreasuryCustodian"));
    p.activate(custodian.clone());
    let keeper = Address::derive("custodian");
    p.grant(CUSTODIAN_ROLE, keeper);
    let usds = p.usds.address();

    assert!(matches!(
        custodian.grant_withdrawer_approval(&p.alice, &p.bob, &usds, E18),
        Err(PolicyError::Roles(_))
    ));
    custodian.grant_withdrawer_approval(&keeper, &p.bob, &usds, 10 * E18).unwrap();
    custodian.reduce_withdrawer_approval(&keeper, &p.bob, &usds, 4 * E18).unwrap();
    assert_eq!(p.treasury.withdraw_approval(&p.bob, &usds), 6 * E18);

    custodian.increase_debt(&keeper, &usds, &p.bob, 50 * E18).unwrap();
    custodian.decrease_debt(&keeper, &usds, &p.bob, 20 * E18).unwrap();
    assert_eq!(p.treasury.reserve_debt(&usds, &p.bob), 30 * E18);
    assert_eq!(p.treasury.total_debt(&usds), 30 * E18);
    assert!(matches!(
        custodian.decrease_debt(&keeper, &usds, &p.bob, 31 * E18),
        Err(PolicyError::Math(_))
    ));
}

#[test]
fn test_custodian_revokes_only_deactivated_policies() {
    let p = Protocol::boot();
    let custodian = TreasuryCustodian::new(&p.kernel, Address::derive("TreasuryCustodian"));
    p.activate(custodian.clone());
    let keeper = Address::derive("custodian");
    p.grant(CUSTODIAN_ROLE, keeper);
    let usds = p.usds.address();

    let retired = StaticPolicy::activate(&p.kernel, &p.executor, "retired-policy", Vec::new()).unwrap();
    let retired_address = retired.address();
    custodian
        .grant_withdrawer_approval(&keeper, &retired_address, &usds, 10 * E18)
        .unwrap();
    custodian
        .grant_debtor_approval(&keeper, &retired_address, &usds, 5 * E18)
        .unwrap();

    assert_eq!(
        custodian.revoke_policy_approvals(&keeper, &retired_address, &[usds]),
        Err(PolicyError::PolicyStillActive { policy: retired_address })
    );

    p.kernel
        .execute_action(&p.executor, Actions::DeactivatePolicy, Target::Policy(retired))
        .unwrap();
    custodian
        .revoke_policy_approvals(&keeper, &retired_address, &[usds])
        .unwrap();
    assert_eq!(p.treasury.withdraw_approval(&retired_address, &usds), 0);
    assert_eq!(p.treasury.debt_approval(&retired_address, &usds), 0);
}

// ============================================================================
// TreasuryConfig
// ============================================================================

#[test]
fn test_treasury_config_assets_and_balances() {
    let p = Protocol::boot();
    let config = TreasuryConfig::new(&p.kernel, Address::derive("TreasuryConfig"));
    p.activate(config.clone());
    let manager = Address::derive("treasury-manager");
    p.grant(TREASURY_ADMIN_ROLE, manager);

    let usds = p.usds.address();
    let vault = Address::derive("vault");
    p.usds.mint(&p.treasury.address(), 70 * E18).unwrap();
    p.usds.mint(&vault, 30 * E18).unwrap();

    assert!(matches!(
        config.add_asset(&p.alice, &usds, &[vault]),
        Err(PolicyError::Roles(_))
    ));
    config.add_asset(&manager, &usds, &[vault]).unwrap();
    config.categorize(&manager, &usds, LIQUID).unwrap();
    assert_eq!(p.treasury.get_category_by_group(&usds, &LIQUIDITY_PREFERENCE).unwrap(), LIQUID);

    p.kernel.clock().advance(60);
    let stored = config.store_balances(&manager).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, usds);
    assert_eq!(stored[0].1.value, 100 * E18);
    assert_eq!(stored[0].1.timestamp, START + 60);
    assert_eq!(p.treasury.get_asset_balance(&usds, Variant::Last).unwrap().value, 100 * E18);
}

// ============================================================================
// SupplyConfig
// ============================================================================

#[test]
fn test_supply_config_stores_observations() {
    let p = Protocol::boot();
    let config = SupplyConfig::new(&p.kernel, Address::derive("SupplyConfig"));
    p.activate(config.clone());
    let manager = Address::derive("supply-manager");
    let keeper = Address::derive("heart");
    p.grant(SUPPLY_ADMIN_ROLE, manager);
    p.grant(SUPPLY_KEEPER_ROLE, keeper);

    p.ohm.mint(&p.alice, 900 * E9).unwrap();
    p.ohm.mint(&p.treasury.address(), 100 * E9).unwrap();
    config
        .categorize_supply(&manager, p.treasury.address(), PROTOCOL_OWNED_TREASURY)
        .unwrap();

    assert!(matches!(config.store_observations(&manager), Err(PolicyError::Roles(_))));
    let observations = config.store_observations(&keeper).unwrap();
    assert_eq!(observations.metrics.len(), Metric::ALL.len());
    assert_eq!(observations.categories.len(), p.supply.get_categories().len());

    let treasury_supply = observations
        .categories
        .iter()
        .find(|(category, _)| *category == PROTOCOL_OWNED_TREASURY)
        .map(|(_, cache)| cache.value);
    assert_eq!(treasury_supply, Some(100 * E9));
    assert_eq!(
        p.supply.get_metric(Metric::CirculatingSupply, Variant::Last).unwrap().value,
        900 * E9
    );
    assert_eq!(
        p.supply.get_metric(Metric::TotalSupply, Variant::Last).unwrap().timestamp,
        START
    );
}

// ============================================================================
// BridgeTokenPool
// ============================================================================

struct Bridge {
    p: Protocol,
    pool: Arc<BridgeTokenPool>,
    relayer: Address,
}

fn bridge() -> Bridge {
    let p = Protocol::boot();
    let relayer = Address::derive("relayer");
    let pool = BridgeTokenPool::new(&p.kernel, Address::derive("BridgeTokenPool"), relayer);
    p.activate(pool.clone());
    p.grant(ADMIN_ROLE, p.admin);
    pool.enable(&p.admin).unwrap();

    p.ohm.mint(&p.alice, 100 * E9).unwrap();
    p.ohm.approve(&p.alice, &p.minter.address(), 100 * E9).unwrap();
    Bridge { p, pool, relayer }
}

fn inbound(recipient: Address, amount: u128) -> BridgeMessage {
    BridgeMessage {
        id: Uuid::new_v4(),
        chain: 42161,
        sender: Address::derive("remote"),
        recipient,
        amount,
    }
}

#[test]
fn test_bridge_send_burns_and_tracks_supply() {
    let b = bridge();
    let p = &b.p;
    let total_before = p.supply.get_metric(Metric::TotalSupply, Variant::Current).unwrap().value;

    let message = b.pool.send(&p.alice, 42161, p.bob, 40 * E9).unwrap();
    assert_eq!(message.amount, 40 * E9);
    assert_eq!(message.sender, p.alice);
    assert_eq!(p.ohm.balance_of(&p.alice), 60 * E9);
    assert_eq!(b.pool.bridged_supply(), 40 * E9);
    assert_eq!(p.minter.mint_approval(&b.pool.address()), 40 * E9);
    assert_eq!(p.supply.total_cross_chain_supply(), 40 * E9);
    assert_eq!(
        p.supply.get_metric(Metric::TotalSupply, Variant::Current).unwrap().value,
        total_before
    );
    assert!(matches!(
        b.pool.send(&p.alice, 42161, Address::ZERO, E9),
        Err(PolicyError::InvalidParams { .. })
    ));
}

#[test]
fn test_bridge_receive_mints_against_approval() {
    let b = bridge();
    let p = &b.p;
    b.pool.send(&p.alice, 42161, p.alice, 40 * E9).unwrap();

    assert_eq!(
        b.pool.receive(&p.alice, inbound(p.bob, E9)),
        Err(PolicyError::InvalidRelayer { caller: p.alice })
    );
    b.pool.receive(&b.relayer, inbound(p.bob, 10 * E9)).unwrap();
    assert_eq!(p.ohm.balance_of(&p.bob), 10 * E9);
    assert_eq!(b.pool.bridged_supply(), 30 * E9);
    assert_eq!(p.minter.mint_approval(&b.pool.address()), 30 * E9);
    assert_eq!(p.supply.total_cross_chain_supply(), 30 * E9);
}

#[test]
fn test_bridge_parks_and_retries_failed_messages() {
    let b = bridge();
    let p = &b.p;
    b.pool.send(&p.alice, 42161, p.alice, 30 * E9).unwrap();

    let message = inbound(p.bob, 50 * E9);
    let id = message.id;
    b.pool.receive(&b.relayer, message).unwrap();
    let failed = b.pool.get_failed_message(&id).unwrap();
    assert_eq!(failed.error_code, "POLICY_INVALID_PARAMS");
    assert_eq!(p.ohm.balance_of(&p.bob), 0);
    assert_eq!(p.kernel.events().named("MessageFailed").len(), 1);

    assert!(b.pool.retry_failed_message(&id).is_err());
    assert_eq!(b.pool.failed_messages(), vec![id]);

    b.pool.send(&p.alice, 42161, p.alice, 20 * E9).unwrap();
    b.pool.retry_failed_message(&id).unwrap();
    assert_eq!(p.ohm.balance_of(&p.bob), 50 * E9);
    assert_eq!(b.pool.bridged_supply(), 0);
    assert!(b.pool.get_failed_message(&id).is_none());
    assert_eq!(
        b.pool.retry_failed_message(&id),
        Err(PolicyError::FailedMessageNotFound { id })
    );
}

#[test]
fn test_bridge_disabled_parks_receipts() {
    let b = bridge();
    let p = &b.p;
    b.pool.send(&p.alice, 42161, p.alice, 10 * E9).unwrap();
    b.pool.disable(&p.admin).unwrap();

    assert_eq!(b.pool.send(&p.alice, 42161, p.bob, E9), Err(PolicyError::NotEnabled));
    let message = inbound(p.bob, 5 * E9);
    let id = message.id;
    b.pool.receive(&b.relayer, message).unwrap();
    assert_eq!(b.pool.get_failed_message(&id).unwrap().error_code, "POLICY_NOT_ENABLED");

    b.pool.enable(&p.admin).unwrap();
    b.pool.retry_failed_message(&id).unwrap();
    assert_eq!(p.ohm.balance_of(&p.bob), 5 * E9);
}

#[test]
fn test_bridge_refuses_to_enable_out_of_sync() {
    let b = bridge();
    let p = &b.p;
    b.pool.disable(&p.admin).unwrap();

    let meddler = StaticPolicy::activate(
        &p.kernel,
        &p.executor,
        "meddler",
        vec![Permissions::new(MINTR_KEYCODE, MinterFn::IncreaseMintApproval)],
    )
    .unwrap();
    p.minter
        .increase_mint_approval(&meddler.address(), &b.pool.address(), E9)
        .unwrap();

    assert_eq!(
        b.pool.enable(&p.admin),
        Err(PolicyError::MintApprovalOutOfSync { approval: E9, bridged: 0 })
    );
    assert!(!b.pool.is_enabled());
}

#[test]
fn test_bridge_send_keeps_ohm_when_supply_update_would_fail() {
    let b = bridge();
    let p = &b.p;
    let other_chain = StaticPolicy::activate(
        &p.kernel,
        &p.executor,
        "other-chain",
        vec![Permissions::new(SPPLY_KEYCODE, SupplyFn::IncreaseCrossChainSupply)],
    )
    .unwrap();
    p.supply
        .increase_cross_chain_supply(&other_chain.address(), u128::MAX - 10 * E9)
        .unwrap();

    assert!(matches!(
        b.pool.send(&p.alice, 42161, p.bob, 40 * E9),
        Err(PolicyError::Math(_))
    ));
    assert_eq!(p.ohm.balance_of(&p.alice), 100 * E9);
    assert_eq!(b.pool.bridged_supply(), 0);
    assert_eq!(p.minter.mint_approval(&b.pool.address()), 0);
}

// ============================================================================
// DepositFacility
// ============================================================================

struct Facility {
    p: Protocol,
    facility: Arc<DepositFacility>,
    operator: Address,
}

fn facility() -> Facility {
    let p = Protocol::boot();
    let facility = DepositFacility::new(&p.kernel, Address::derive("DepositFacility"));
    p.activate(facility.clone());
    let operator = Address::derive("deposit-operator");
    p.grant(ADMIN_ROLE, p.admin);
    p.grant(DEPOSIT_OPERATOR_ROLE, operator);
    facility.enable(&p.admin).unwrap();

    p.usds.mint(&p.alice, 1_000 * E18).unwrap();
    p.usds.approve(&p.alice, &facility.address(), 1_000 * E18).unwrap();
    Facility { p, facility, operator }
}

fn request(f: &Facility, amount: u128) -> DepositRequest {
    DepositRequest {
        depositor: f.p.alice,
        asset: f.p.usds.address(),
        amount,
        period_months: 3,
        conversion_price: 20 * E18,
        wrap: false,
    }
}

#[test]
fn test_deposit_moves_funds_into_treasury() {
    let f = facility();
    let p = &f.p;

    assert!(matches!(
        f.facility.deposit(&p.alice, request(&f, 100 * E18)),
        Err(PolicyError::Roles(_))
    ));
    assert!(matches!(
        f.facility.deposit(&f.operator, request(&f, 0)),
        Err(PolicyError::InvalidParams { .. })
    ));

    let id = f.facility.deposit(&f.operator, request(&f, 100 * E18)).unwrap();
    assert_eq!(p.usds.balance_of(&p.treasury.address()), 100 * E18);
    assert_eq!(p.usds.balance_of(&p.alice), 900 * E18);

    let position = p.deposits.get_position(id).unwrap();
    assert_eq!(position.owner, p.alice);
    assert_eq!(position.operator, f.facility.address());
    assert_eq!(position.remaining_deposit, 100 * E18);
    assert_eq!(position.expiry, START + 3 * MONTH);
}

#[test]
fn test_convert_mints_ohm() {
    let f = facility();
    let p = &f.p;
    let first = f.facility.deposit(&f.operator, request(&f, 100 * E18)).unwrap();
    let second = f.facility.deposit(&f.operator, request(&f, 60 * E18)).unwrap();

    assert_eq!(
        f.facility.preview_convert(&p.alice, &[first, second], &[40 * E18, 60 * E18]).unwrap(),
        5 * E9
    );
    assert_eq!(
        f.facility.convert(&p.bob, &[first], &[E18]),
        Err(PolicyError::Deposit(DepositError::NotOwner { id: first, caller: p.bob }))
    );
    assert!(matches!(
        f.facility.convert(&p.alice, &[first, first], &[E18, E18]),
        Err(PolicyError::InvalidParams { .. })
    ));

    let minted = f
        .facility
        .convert(&p.alice, &[first, second], &[40 * E18, 60 * E18])
        .unwrap();
    assert_eq!(minted, 5 * E9);
    assert_eq!(p.ohm.balance_of(&p.alice), 5 * E9);
    assert_eq!(p.deposits.get_position(first).unwrap().remaining_deposit, 60 * E18);
    assert_eq!(p.deposits.get_position(second).unwrap().remaining_deposit, 0);
    assert_eq!(p.minter.mint_approval(&f.facility.address()), 0);
}

#[test]
fn test_convert_rejects_batch_atomically() {
    let f = facility();
    let p = &f.p;
    let first = f.facility.deposit(&f.operator, request(&f, 100 * E18)).unwrap();
    let second = f.facility.deposit(&f.operator, request(&f, 100 * E18)).unwrap();

    // the second amount exceeds its position, so the first is left untouched
    assert!(f
        .facility
        .convert(&p.alice, &[first, second], &[10 * E18, 101 * E18])
        .is_err());
    assert_eq!(p.deposits.get_position(first).unwrap().remaining_deposit, 100 * E18);
    assert_eq!(p.ohm.balance_of(&p.alice), 0);

    p.kernel.clock().warp(START + 3 * MONTH);
    assert!(matches!(
        f.facility.convert(&p.alice, &[first], &[10 * E18]),
        Err(PolicyError::InvalidParams { .. })
    ));

    f.facility.disable(&p.admin).unwrap();
    assert_eq!(
        f.facility.convert(&p.alice, &[first], &[10 * E18]),
        Err(PolicyError::NotEnabled)
    );
}

#[test]
fn test_convert_leaves_positions_when_minter_inactive() {
    let f = facility();
    let p = &f.p;
    let id = f.facility.deposit(&f.operator, request(&f, 100 * E18)).unwrap();

    let guardian = StaticPolicy::activate(
        &p.kernel,
        &p.executor,
        "guardian",
        vec![Permissions::new(MINTR_KEYCODE, MinterFn::Deactivate)],
    )
    .unwrap();
    p.minter.deactivate(&guardian.address()).unwrap();

    assert_eq!(
        f.facility.convert(&p.alice, &[id], &[40 * E18]),
        Err(PolicyError::Minter(MinterError::NotActive))
    );
    assert_eq!(p.deposits.get_position(id).unwrap().remaining_deposit, 100 * E18);
    assert_eq!(p.minter.mint_approval(&f.facility.address()), 0);
    assert_eq!(p.ohm.balance_of(&p.alice), 0);
}

#[test]
fn test_deposit_keeps_funds_when_position_cannot_be_recorded() {
    let f = facility();
    let p = &f.p;
    // still enabled, but the kernel no longer lists the facility as active
    p.kernel
        .execute_action(&p.executor, Actions::DeactivatePolicy, Target::Policy(f.facility.clone()))
        .unwrap();
    assert!(f.facility.is_enabled());

    assert!(matches!(
        f.facility.deposit(&f.operator, request(&f, 100 * E18)),
        Err(PolicyError::Kernel(KernelError::PolicyNotPermitted { .. }))
    ));
    assert_eq!(p.usds.balance_of(&p.alice), 1_000 * E18);
    assert_eq!(p.usds.balance_of(&p.treasury.address()), 0);
    assert!(p.deposits.get_user_position_ids(&p.alice).is_empty());
}
