//! Kernel core runtime

use std::collections::HashMap;
use std::sync::Arc;

use bophades_types::{Address, Clock, Keycode, Selector};
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::actions::{Actions, Target};
use crate::error::{KernelError, Result};
use crate::events::EventLog;
use crate::module::Module;
use crate::permissions::{Grant, PermissionTable};
use crate::policy::Policy;

struct KernelState {
    executor: Address,
    all_keycodes: Vec<Keycode>,
    module_for_keycode: HashMap<Keycode, Arc<dyn Module>>,
    keycode_for_module: HashMap<Address, Keycode>,
    module_dependents: HashMap<Keycode, Vec<Address>>,
    policy_dependencies: HashMap<Address, Vec<Keycode>>,
    active_policies: Vec<Address>,
    policies: HashMap<Address, Arc<dyn Policy>>,
    permissions: PermissionTable,
}

/// Central registry and dispatcher
pub struct Kernel {
    address: Address,
    clock: Arc<Clock>,
    state: RwLock<KernelState>,
    events: EventLog,
}

impl Kernel {
    pub fn new(address: Address, executor: Address, clock: Arc<Clock>) -> Arc<Self> {
        Self::with_event_capacity(address, executor, clock, None)
    }

    /// Create a kernel whose event log keeps at most `max_events` entries
    pub fn with_event_capacity(
        address: Address,
        executor: Address,
        clock: Arc<Clock>,
        max_events: Option<usize>,
    ) -> Arc<Self> {
        info!(kernel = %address, executor = %executor, "kernel created");
        Arc::new(Self {
            address,
            clock,
            state: RwLock::new(KernelState {
                executor,
                all_keycodes: Vec::new(),
                module_for_keycode: HashMap::new(),
                keycode_for_module: HashMap::new(),
                module_dependents: HashMap::new(),
                policy_dependencies: HashMap::new(),
                active_policies: Vec::new(),
                policies: HashMap::new(),
                permissions: PermissionTable::new(),
            }),
            events: EventLog::new(max_events),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn executor(&self) -> Address {
        self.state.read().executor
    }

    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    /// Current block timestamp
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn emit(&self, emitter: Address, name: &str, data: serde_json::Value) {
        debug!(emitter = %emitter.short(), event = name, %data, "event");
        self.events.record(self.now(), emitter, name, data);
    }

    // =========================================================================
    // Registry queries
    // =========================================================================

    pub fn get_module_for_keycode(&self, keycode: &Keycode) -> Option<Arc<dyn Module>> {
        self.state.read().module_for_keycode.get(keycode).cloned()
    }

    pub fn get_module_address(&self, keycode: &Keycode) -> Option<Address> {
        self.get_module_for_keycode(keycode).map(|module| module.address())
    }

    pub fn get_keycode_for_module(&self, module: &Address) -> Option<Keycode> {
        self.state.read().keycode_for_module.get(module).copied()
    }

    /// The installed module for `keycode`, downcast to its concrete type
    pub fn module<T: Module>(&self, keycode: Keycode) -> Result<Arc<T>> {
        let module = self
            .get_module_for_keycode(&keycode)
            .ok_or(KernelError::ModuleDoesNotExist { keycode })?;
        module
            .as_any()
            .downcast::<T>()
            .map_err(|_| KernelError::ModuleTypeMismatch { keycode })
    }

    pub fn all_keycodes(&self) -> Vec<Keycode> {
        self.state.read().all_keycodes.clone()
    }

    pub fn active_policies(&self) -> Vec<Address> {
        self.state.read().active_policies.clone()
    }

    pub fn is_policy_active(&self, policy: &Address) -> bool {
        self.state.read().active_policies.contains(policy)
    }

    pub fn module_dependents(&self, keycode: &Keycode) -> Vec<Address> {
        self.state
            .read()
            .module_dependents
            .get(keycode)
            .cloned()
            .unwrap_or_default()
    }

    /// Raw lookup of the permission table
    pub fn module_permissions(&self, keycode: Keycode, policy: &Address, selector: Selector) -> bool {
        self.state.read().permissions.is_granted(keycode, selector, policy)
    }

    pub fn grants_for(&self, policy: &Address) -> Vec<Grant> {
        self.state.read().permissions.grants_for(policy)
    }

    /// The single gating function behind `Module::permissioned`.
    ///
    /// Checked at call time: the grant must exist, the caller must be an active
    /// policy, and `module_address` must be the live instance for `keycode`.
    pub fn check_permission(
        &self,
        keycode: Keycode,
        module_address: Address,
        caller: &Address,
        selector: Selector,
    ) -> Result<()> {
        let state = self.state.read();
        let is_live_module = state
            .module_for_keycode
            .get(&keycode)
            .map(|module| module.address() == module_address)
            .unwrap_or(false);
        let granted = state.permissions.is_granted(keycode, selector, caller);
        let active = state.active_policies.contains(caller);

        if *caller == self.address || !is_live_module || !granted || !active {
            debug!(
                %keycode,
                caller = %caller.short(),
                %selector,
                is_live_module,
                granted,
                active,
                "permission denied"
            );
            return Err(KernelError::PolicyNotPermitted { caller: *caller });
        }
        Ok(())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub fn execute_action(&self, caller: &Address, action: Actions, target: Target) -> Result<()> {
        if *caller != self.executor() {
            return Err(KernelError::NotAuthorized { caller: *caller });
        }

        let target_address = target.address();
        match (action, target) {
            (Actions::InstallModule, Target::Module(module)) => self.install_module(module)?,
            (Actions::UpgradeModule, Target::Module(module)) => self.upgrade_module(module)?,
            (Actions::ActivatePolicy, Target::Policy(policy)) => self.activate_policy(policy)?,
            (Actions::DeactivatePolicy, Target::Policy(policy)) => self.deactivate_policy(policy)?,
            (Actions::ChangeExecutor, _) => {
                self.state.write().executor = target_address;
            }
            (Actions::MigrateKernel, Target::Kernel(new_kernel)) => self.migrate_kernel(new_kernel)?,
            (action, _) => {
                return Err(KernelError::TargetNotAContract {
                    action,
                    target: target_address,
                })
            }
        }

        info!(?action, target = %target_address, "action executed");
        self.emit(
            self.address,
            "ActionExecuted",
            json!({ "action": action as u8, "target": target_address }),
        );
        Ok(())
    }

    fn install_module(&self, module: Arc<dyn Module>) -> Result<()> {
        let keycode = module.keycode();
        keycode.validate()?;
        if self.state.read().module_for_keycode.contains_key(&keycode) {
            return Err(KernelError::ModuleAlreadyInstalled { keycode });
        }

        module.init()?;

        let mut state = self.state.write();
        state.keycode_for_module.insert(module.address(), keycode);
        state.module_for_keycode.insert(keycode, module);
        state.all_keycodes.push(keycode);
        Ok(())
    }

    fn upgrade_module(&self, new_module: Arc<dyn Module>) -> Result<()> {
        let keycode = new_module.keycode();
        let old_module = self
            .get_module_for_keycode(&keycode)
            .ok_or(KernelError::InvalidModuleUpgrade { keycode })?;
        if old_module.address() == new_module.address() {
            return Err(KernelError::InvalidModuleUpgrade { keycode });
        }

        new_module.init()?;
        self.bind_module(keycode, &old_module, new_module.clone());

        if let Err(err) = self.reconfigure_policies(keycode) {
            warn!(%keycode, error = %err, "policy reconfiguration failed, rolling back upgrade");
            self.bind_module(keycode, &new_module, old_module);
            if let Err(rollback_err) = self.reconfigure_policies(keycode) {
                warn!(%keycode, error = %rollback_err, "rollback reconfiguration failed");
            }
            return Err(err);
        }
        Ok(())
    }

    fn bind_module(&self, keycode: Keycode, previous: &Arc<dyn Module>, next: Arc<dyn Module>) {
        let mut state = self.state.write();
        state.keycode_for_module.remove(&previous.address());
        state.keycode_for_module.insert(next.address(), keycode);
        state.module_for_keycode.insert(keycode, next);
    }

    fn reconfigure_policies(&self, keycode: Keycode) -> Result<()> {
        let dependents: Vec<Arc<dyn Policy>> = {
            let state = self.state.read();
            state
                .module_dependents
                .get(&keycode)
                .map(|addresses| {
                    addresses
                        .iter()
                        .filter_map(|address| state.policies.get(address).cloned())
                        .collect()
                })
                .unwrap_or_default()
        };
        for policy in dependents {
            policy.configure_dependencies()?;
        }
        Ok(())
    }

    fn activate_policy(&self, policy: Arc<dyn Policy>) -> Result<()> {
        let address = policy.address();
        if self.is_policy_active(&address) {
            return Err(KernelError::PolicyAlreadyActivated { policy: address });
        }

        let dependencies = policy.configure_dependencies()?;
        let requests = policy.request_permissions();
        {
            let state = self.state.read();
            let requested = requests.iter().map(|request| &request.keycode);
            if let Some(missing) = dependencies
                .iter()
                .chain(requested)
                .find(|keycode| !state.module_for_keycode.contains_key(*keycode))
            {
                return Err(KernelError::ModuleDoesNotExist { keycode: *missing });
            }
        }

        {
            let mut state = self.state.write();
            state.active_policies.push(address);
            state.policies.insert(address, policy);
            for keycode in &dependencies {
                let dependents = state.module_dependents.entry(*keycode).or_default();
                if !dependents.contains(&address) {
                    dependents.push(address);
                }
            }
            state.policy_dependencies.insert(address, dependencies);
            for request in &requests {
                state.permissions.grant(request.keycode, request.selector, address);
            }
        }

        for request in &requests {
            self.emit(
                self.address,
                "PermissionsUpdated",
                json!({
                    "keycode": request.keycode,
                    "policy": address,
                    "selector": request.selector,
                    "granted": true,
                }),
            );
        }
        info!(policy = %address, grants = requests.len(), "policy activated");
        Ok(())
    }

    fn deactivate_policy(&self, policy: Arc<dyn Policy>) -> Result<()> {
        let address = policy.address();
        let revoked = {
            let mut state = self.state.write();
            let index = state
                .active_policies
                .iter()
                .position(|active| *active == address)
                .ok_or(KernelError::PolicyNotActivated { policy: address })?;
            state.active_policies.remove(index);
            state.policies.remove(&address);

            if let Some(dependencies) = state.policy_dependencies.remove(&address) {
                for keycode in dependencies {
                    if let Some(dependents) = state.module_dependents.get_mut(&keycode) {
                        dependents.retain(|dependent| *dependent != address);
                    }
                }
            }
            state.permissions.revoke_all(&address)
        };

        for grant in &revoked {
            self.emit(
                self.address,
                "PermissionsUpdated",
                json!({
                    "keycode": grant.keycode,
                    "policy": address,
                    "selector": grant.selector,
                    "granted": false,
                }),
            );
        }
        info!(policy = %address, revoked = revoked.len(), "policy deactivated");
        Ok(())
    }

    fn migrate_kernel(&self, new_kernel: Arc<Kernel>) -> Result<()> {
        let (modules, policies): (Vec<Arc<dyn Module>>, Vec<Arc<dyn Policy>>) = {
            let state = self.state.read();
            let modules = state
                .all_keycodes
                .iter()
                .filter_map(|keycode| state.module_for_keycode.get(keycode).cloned())
                .collect();
            let policies = state
                .active_policies
                .iter()
                .filter_map(|address| state.policies.get(address).cloned())
                .collect();
            (modules, policies)
        };

        // Every adapter must accept the change before any is moved
        let stale = modules
            .iter()
            .map(|module| module.adapter().kernel_address())
            .chain(policies.iter().map(|policy| policy.adapter().kernel_address()))
            .any(|bound| bound != self.address);
        if stale {
            return Err(KernelError::OnlyKernel {
                caller: self.address,
            });
        }

        for module in &modules {
            module.adapter().change_kernel(&self.address, &new_kernel)?;
        }
        for policy in &policies {
            policy.adapter().change_kernel(&self.address, &new_kernel)?;
        }
        info!(
            from = %self.address,
            to = %new_kernel.address(),
            modules = modules.len(),
            policies = policies.len(),
            "kernel migrated"
        );
        Ok(())
    }
}
