//! Test helpers shared by the module crates

use std::sync::Arc;

use bophades_types::{Address, Keycode};

use crate::actions::{Actions, Target};
use crate::adapter::KernelAdapter;
use crate::error::Result;
use crate::kernel::Kernel;
use crate::policy::{Permissions, Policy};

/// A policy that requests a fixed list of permissions and binds nothing
pub struct StaticPolicy {
    address: Address,
    adapter: KernelAdapter,
    permissions: Vec<Permissions>,
}

impl StaticPolicy {
    pub fn new(kernel: &Arc<Kernel>, label: &str, permissions: Vec<Permissions>) -> Arc<Self> {
        Arc::new(Self {
            address: Address::derive(label),
            adapter: KernelAdapter::new(kernel),
            permissions,
        })
    }

    /// Create and activate in one step; `executor` must be the kernel executor
    pub fn activate(
        kernel: &Arc<Kernel>,
        executor: &Address,
        label: &str,
        permissions: Vec<Permissions>,
    ) -> Result<Arc<Self>> {
        let policy = Self::new(kernel, label, permissions);
        kernel.execute_action(executor, Actions::ActivatePolicy, Target::Policy(policy.clone()))?;
        Ok(policy)
    }
}

impl Policy for StaticPolicy {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> Result<Vec<Keycode>> {
        let mut keycodes: Vec<Keycode> = self.permissions.iter().map(|p| p.keycode).collect();
        keycodes.sort();
        keycodes.dedup();
        Ok(keycodes)
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        self.permissions.clone()
    }
}
