use std::any::Any;
use std::sync::Arc;

use bophades_kernel::{
    require_version, Actions, Dependency, Kernel, KernelAdapter, KernelError, Module, ModuleFunction,
    Permissions, Policy, Target,
};
use bophades_types::{Address, Clock, Keycode};
use parking_lot::Mutex;

const COUNTER: Keycode = Keycode::from_bytes(*b"CNTER");

#[derive(Clone, Copy)]
enum CounterFn {
    Increment,
    Reset,
}

impl ModuleFunction for CounterFn {
    fn signature(self) -> &'static str {
        match self {
            CounterFn::Increment => "increment(uint256)",
            CounterFn::Reset => "reset()",
        }
    }
}

struct CounterModule {
    address: Address,
    major: u8,
    adapter: KernelAdapter,
    count: Mutex<u64>,
    inits: Mutex<u32>,
}

impl CounterModule {
    fn new(kernel: &Arc<Kernel>, label: &str, major: u8) -> Arc<Self> {
        Arc::new(Self {
            address: Address::derive(label),
            major,
            adapter: KernelAdapter::new(kernel),
            count: Mutex::new(0),
            inits: Mutex::new(0),
        })
    }

    fn increment(&self, caller: &Address, by: u64) -> Result<u64, KernelError> {
        self.permissioned(caller, CounterFn::Increment.selector())?;
        let mut count = self.count.lock();
        *count += by;
        Ok(*count)
    }

    fn reset(&self, caller: &Address) -> Result<(), KernelError> {
        self.permissioned(caller, CounterFn::Reset.selector())?;
        *self.count.lock() = 0;
        Ok(())
    }
}

impl Module for CounterModule {
    fn keycode(&self) -> Keycode {
        COUNTER
    }

    fn version(&self) -> (u8, u8) {
        (self.major, 0)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn init(&self) -> Result<(), KernelError> {
        *self.inits.lock() += 1;
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct CounterPolicy {
    address: Address,
    adapter: KernelAdapter,
    counter: Dependency<CounterModule>,
    extra_dependency: Option<Keycode>,
}

impl CounterPolicy {
    fn new(kernel: &Arc<Kernel>, label: &str) -> Arc<Self> {
        Arc::new(Self {
            address: Address::derive(label),
            adapter: KernelAdapter::new(kernel),
            counter: Dependency::new(COUNTER),
            extra_dependency: None,
        })
    }

    fn with_dependency(kernel: &Arc<Kernel>, label: &str, keycode: Keycode) -> Arc<Self> {
        Arc::new(Self {
            address: Address::derive(label),
            adapter: KernelAdapter::new(kernel),
            counter: Dependency::new(COUNTER),
            extra_dependency: Some(keycode),
        })
    }

    fn bump(&self, by: u64) -> Result<u64, KernelError> {
        self.counter.get()?.increment(&self.address, by)
    }

    fn reset(&self) -> Result<(), KernelError> {
        self.counter.get()?.reset(&self.address)
    }
}

impl Policy for CounterPolicy {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> Result<Vec<Keycode>, KernelError> {
        let kernel = self.adapter.kernel()?;
        let counter = self.counter.bind(&kernel)?;
        require_version(counter.as_ref(), 1)?;
        let mut dependencies = vec![COUNTER];
        if let Some(extra) = self.extra_dependency {
            dependencies.push(extra);
        }
        Ok(dependencies)
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        vec![Permissions::new(COUNTER, CounterFn::Increment)]
    }
}

fn executor() -> Address {
    Address::derive("executor")
}

fn setup() -> (Arc<Kernel>, Arc<CounterModule>) {
    let kernel = Kernel::new(Address::derive("kernel"), executor(), Arc::new(Clock::at(1_000)));
    let module = CounterModule::new(&kernel, "counter-v1", 1);
    kernel
        .execute_action(&executor(), Actions::InstallModule, Target::Module(module.clone()))
        .unwrap();
    (kernel, module)
}

#[test]
fn install_module_registers_keycode() {
    let (kernel, module) = setup();
    assert_eq!(kernel.all_keycodes(), vec![COUNTER]);
    assert_eq!(kernel.get_module_address(&COUNTER), Some(module.address()));
    assert_eq!(kernel.get_keycode_for_module(&module.address()), Some(COUNTER));
    assert_eq!(*module.inits.lock(), 1);
    assert!(kernel.module::<CounterModule>(COUNTER).is_ok());
}

#[test]
fn install_rejects_duplicate_and_invalid_keycodes() {
    let (kernel, _) = setup();
    let duplicate = CounterModule::new(&kernel, "counter-dup", 1);
    let result = kernel.execute_action(&executor(), Actions::InstallModule, Target::Module(duplicate));
    assert!(matches!(result, Err(KernelError::ModuleAlreadyInstalled { .. })));

    struct Lowercase(KernelAdapter);
    impl Module for Lowercase {
        fn keycode(&self) -> Keycode {
            Keycode::from_bytes(*b"bad\0\0")
        }
        fn version(&self) -> (u8, u8) {
            (1, 0)
        }
        fn address(&self) -> Address {
            Address::derive("lowercase")
        }
        fn adapter(&self) -> &KernelAdapter {
            &self.0
        }
        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }
    let bad = Arc::new(Lowercase(KernelAdapter::new(&kernel)));
    let result = kernel.execute_action(&executor(), Actions::InstallModule, Target::Module(bad));
    assert!(matches!(result, Err(KernelError::InvalidKeycode { .. })));
}

#[test]
fn only_executor_can_act() {
    let (kernel, _) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    let result = kernel.execute_action(&Address::derive("mallory"), Actions::ActivatePolicy, Target::Policy(policy));
    assert!(matches!(result, Err(KernelError::NotAuthorized { .. })));
}

#[test]
fn mismatched_target_is_not_a_contract() {
    let (kernel, _) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    let result = kernel.execute_action(&executor(), Actions::InstallModule, Target::Policy(policy));
    assert!(matches!(
        result,
        Err(KernelError::TargetNotAContract { action: Actions::InstallModule, .. })
    ));

    let result = kernel.execute_action(&executor(), Actions::ActivatePolicy, Target::Account(Address::derive("eoa")));
    assert!(matches!(result, Err(KernelError::TargetNotAContract { .. })));
}

#[test]
fn permission_exists_only_while_policy_active() {
    let (kernel, module) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");

    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    assert!(policy.is_active());
    assert!(kernel.module_permissions(COUNTER, &policy.address(), CounterFn::Increment.selector()));
    assert_eq!(policy.bump(2).unwrap(), 2);

    // never requested
    assert!(matches!(policy.reset(), Err(KernelError::PolicyNotPermitted { .. })));
    policy
        .ensure_permitted(&*module, CounterFn::Increment.selector())
        .unwrap();
    assert!(matches!(
        policy.ensure_permitted(&*module, CounterFn::Reset.selector()),
        Err(KernelError::PolicyNotPermitted { .. })
    ));

    kernel
        .execute_action(&executor(), Actions::DeactivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    assert!(!policy.is_active());
    assert!(kernel.grants_for(&policy.address()).is_empty());
    assert!(kernel.module_dependents(&COUNTER).is_empty());
    assert!(matches!(policy.bump(1), Err(KernelError::PolicyNotPermitted { .. })));
    assert!(policy
        .ensure_permitted(&*module, CounterFn::Increment.selector())
        .is_err());
    assert_eq!(*module.count.lock(), 2);

    // grants are re-requested on reactivation
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    assert_eq!(policy.bump(1).unwrap(), 3);
}

#[test]
fn unrelated_caller_and_kernel_are_rejected() {
    let (kernel, module) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy))
        .unwrap();

    assert!(matches!(
        module.increment(&Address::derive("stranger"), 1),
        Err(KernelError::PolicyNotPermitted { .. })
    ));
    assert!(matches!(
        module.increment(&kernel.address(), 1),
        Err(KernelError::PolicyNotPermitted { .. })
    ));
}

#[test]
fn activation_is_atomic_on_missing_dependency() {
    let (kernel, _) = setup();
    let missing = Keycode::new("NOPEE").unwrap();
    let policy = CounterPolicy::with_dependency(&kernel, "needy", missing);

    let result = kernel.execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()));
    assert!(matches!(result, Err(KernelError::ModuleDoesNotExist { keycode }) if keycode == missing));
    assert!(!policy.is_active());
    assert!(kernel.grants_for(&policy.address()).is_empty());
    assert!(kernel.module_dependents(&COUNTER).is_empty());
}

#[test]
fn activation_rejects_wrong_major_version() {
    let kernel = Kernel::new(Address::derive("kernel"), executor(), Arc::new(Clock::at(1)));
    let module = CounterModule::new(&kernel, "counter-v2", 2);
    kernel
        .execute_action(&executor(), Actions::InstallModule, Target::Module(module))
        .unwrap();
    let policy = CounterPolicy::new(&kernel, "policy");
    let result = kernel.execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy));
    assert!(matches!(
        result,
        Err(KernelError::WrongModuleVersion { expected: 1, actual: 2, .. })
    ));
}

#[test]
fn activating_twice_fails() {
    let (kernel, _) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    let result = kernel.execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()));
    assert!(matches!(result, Err(KernelError::PolicyAlreadyActivated { .. })));

    kernel
        .execute_action(&executor(), Actions::DeactivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    let result = kernel.execute_action(&executor(), Actions::DeactivatePolicy, Target::Policy(policy));
    assert!(matches!(result, Err(KernelError::PolicyNotActivated { .. })));
}

#[test]
fn upgrade_supersedes_old_instance_and_reconfigures_dependents() {
    let (kernel, old) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();

    let new = CounterModule::new(&kernel, "counter-v1.1", 1);
    kernel
        .execute_action(&executor(), Actions::UpgradeModule, Target::Module(new.clone()))
        .unwrap();

    assert_eq!(kernel.get_module_address(&COUNTER), Some(new.address()));
    assert_eq!(kernel.get_keycode_for_module(&old.address()), None);
    assert_eq!(*new.inits.lock(), 1);

    // the policy now talks to the new instance
    assert_eq!(policy.bump(5).unwrap(), 5);
    assert_eq!(*new.count.lock(), 5);
    assert_eq!(*old.count.lock(), 0);

    // the superseded instance rejects every permissioned call
    assert!(matches!(
        old.increment(&policy.address(), 1),
        Err(KernelError::PolicyNotPermitted { .. })
    ));
}

#[test]
fn upgrade_rejects_same_instance_and_unknown_keycode() {
    let (kernel, module) = setup();
    let result = kernel.execute_action(&executor(), Actions::UpgradeModule, Target::Module(module));
    assert!(matches!(result, Err(KernelError::InvalidModuleUpgrade { .. })));

    let fresh = Kernel::new(Address::derive("kernel-2"), executor(), Arc::new(Clock::at(1)));
    let orphan = CounterModule::new(&fresh, "orphan", 1);
    let result = fresh.execute_action(&executor(), Actions::UpgradeModule, Target::Module(orphan));
    assert!(matches!(result, Err(KernelError::InvalidModuleUpgrade { .. })));
}

#[test]
fn upgrade_rolls_back_when_dependent_rejects_new_version() {
    let (kernel, old) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();

    let incompatible = CounterModule::new(&kernel, "counter-v2", 2);
    let result = kernel.execute_action(&executor(), Actions::UpgradeModule, Target::Module(incompatible));
    assert!(matches!(result, Err(KernelError::WrongModuleVersion { .. })));

    assert_eq!(kernel.get_module_address(&COUNTER), Some(old.address()));
    assert_eq!(policy.bump(1).unwrap(), 1);
    assert_eq!(*old.count.lock(), 1);
}

#[test]
fn change_executor() {
    let (kernel, _) = setup();
    let next = Address::derive("multisig");
    kernel
        .execute_action(&executor(), Actions::ChangeExecutor, Target::Account(next))
        .unwrap();
    assert_eq!(kernel.executor(), next);

    let result = kernel.execute_action(&executor(), Actions::ChangeExecutor, Target::Account(executor()));
    assert!(matches!(result, Err(KernelError::NotAuthorized { .. })));
}

#[test]
fn migrate_kernel_moves_adapters_and_deactivates_policies() {
    let (kernel, module) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();

    let next = Kernel::new(Address::derive("kernel-next"), executor(), Arc::new(Clock::at(1_000)));
    kernel
        .execute_action(&executor(), Actions::MigrateKernel, Target::Kernel(next.clone()))
        .unwrap();

    assert_eq!(module.adapter().kernel_address(), next.address());
    assert_eq!(policy.adapter().kernel_address(), next.address());
    assert!(!policy.is_active());
    // the new kernel has no modules or grants yet
    assert!(matches!(policy.bump(1), Err(KernelError::PolicyNotPermitted { .. })));

    next.execute_action(&executor(), Actions::InstallModule, Target::Module(module.clone()))
        .unwrap();
    next.execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();
    assert_eq!(policy.bump(1).unwrap(), 1);
}

#[test]
fn actions_and_grants_are_recorded_as_events() {
    let (kernel, _) = setup();
    let policy = CounterPolicy::new(&kernel, "policy");
    kernel
        .execute_action(&executor(), Actions::ActivatePolicy, Target::Policy(policy.clone()))
        .unwrap();

    let actions = kernel.events().named("ActionExecuted");
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[1].data["action"], Actions::ActivatePolicy as u8);
    assert_eq!(actions[1].timestamp, 1_000);

    let grants = kernel.events().named("PermissionsUpdated");
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].data["granted"], true);
    assert_eq!(grants[0].data["keycode"], "CNTER");
}
