//! Enable/disable switch shared by policies that can be paused

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bophades_kernel::Policy;
use bophades_roles::{RolesError, RolesModule};
use bophades_types::{Address, Role};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{PolicyError, Result};

/// May enable a policy, and disable it
pub const ADMIN_ROLE: Role = Role::literal("admin");

/// May disable a policy
pub const EMERGENCY_ROLE: Role = Role::literal("emergency");

/// Enabled flag; policies start disabled
#[derive(Debug, Default)]
pub struct PolicyEnabler {
    enabled: AtomicBool,
}

impl PolicyEnabler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn require_enabled(&self) -> Result<()> {
        if !self.is_enabled() {
            return Err(PolicyError::NotEnabled);
        }
        Ok(())
    }

    fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

/// A policy whose entry points can be switched off by an admin or the emergency role
pub trait Enabled: Policy {
    fn enabler(&self) -> &PolicyEnabler;

    fn roles(&self) -> Result<Arc<RolesModule>>;

    /// Runs before the policy is marked enabled; an error aborts the enable
    fn on_enable(&self) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabler().is_enabled()
    }

    fn enable(&self, caller: &Address) -> Result<()> {
        self.roles()?.require_role(&ADMIN_ROLE, caller)?;
        if self.is_enabled() {
            return Err(PolicyError::NotDisabled);
        }
        self.on_enable()?;
        self.enabler().set(true);
        info!(policy = %self.address().short(), "policy enabled");
        self.adapter().emit(self.address(), "Enabled", json!({}));
        Ok(())
    }

    fn disable(&self, caller: &Address) -> Result<()> {
        let roles = self.roles()?;
        if !roles.has_role(caller, &ADMIN_ROLE) && !roles.has_role(caller, &EMERGENCY_ROLE) {
            return Err(RolesError::RequireRole {
                role: EMERGENCY_ROLE,
                caller: *caller,
            }
            .into());
        }
        if !self.is_enabled() {
            return Err(PolicyError::NotEnabled);
        }
        self.enabler().set(false);
        warn!(policy = %self.address().short(), "policy disabled");
        self.adapter().emit(self.address(), "Disabled", json!({}));
        Ok(())
    }
}
