//! RolesAdmin - the only policy that writes to ROLES

use std::sync::Arc;

use bophades_kernel::{require_version, Dependency, Kernel, KernelAdapter, Permissions, Policy};
use bophades_roles::{RolesFn, RolesModule, ROLES_KEYCODE};
use bophades_types::{Address, Keycode, Role};
use parking_lot::RwLock;
use serde_json::json;
use tracing::info;

use crate::error::{PolicyError, Result};

struct Admins {
    admin: Address,
    pending: Option<Address>,
}

pub struct RolesAdmin {
    address: Address,
    adapter: KernelAdapter,
    roles: Dependency<RolesModule>,
    admins: RwLock<Admins>,
}

impl RolesAdmin {
    pub fn new(kernel: &Arc<Kernel>, address: Address, admin: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            roles: Dependency::new(ROLES_KEYCODE),
            admins: RwLock::new(Admins { admin, pending: None }),
        })
    }

    pub fn admin(&self) -> Address {
        self.admins.read().admin
    }

    pub fn pending_admin(&self) -> Option<Address> {
        self.admins.read().pending
    }

    fn only_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.admin() {
            return Err(PolicyError::OnlyAdmin { caller: *caller });
        }
        Ok(())
    }

    pub fn grant_role(&self, caller: &Address, role: Role, wallet: Address) -> Result<()> {
        self.only_admin(caller)?;
        self.roles.get()?.save_role(&self.address, role, wallet)?;
        Ok(())
    }

    pub fn revoke_role(&self, caller: &Address, role: Role, wallet: Address) -> Result<()> {
        self.only_admin(caller)?;
        self.roles.get()?.remove_role(&self.address, role, wallet)?;
        Ok(())
    }

    /// First step of an admin handover
    pub fn push_new_admin(&self, caller: &Address, new_admin: Address) -> Result<()> {
        self.only_admin(caller)?;
        self.admins.write().pending = Some(new_admin);
        info!(new_admin = %new_admin.short(), "new admin pushed");
        self.adapter
            .emit(self.address, "NewAdminPushed", json!({ "newAdmin": new_admin }));
        Ok(())
    }

    /// Second step: the pending admin accepts
    pub fn pull_new_admin(&self, caller: &Address) -> Result<()> {
        {
            let mut admins = self.admins.write();
            if admins.pending != Some(*caller) {
                return Err(PolicyError::OnlyNewAdmin { caller: *caller });
            }
            admins.admin = *caller;
            admins.pending = None;
        }
        info!(admin = %caller.short(), "new admin pulled");
        self.adapter
            .emit(self.address, "NewAdminPulled", json!({ "newAdmin": caller }));
        Ok(())
    }
}

impl Policy for RolesAdmin {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> bophades_kernel::Result<Vec<Keycode>> {
        let kernel = self.adapter.kernel()?;
        let roles = self.roles.bind(&kernel)?;
        require_version(roles.as_ref(), 1)?;
        Ok(vec![ROLES_KEYCODE])
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        vec![
            Permissions::new(ROLES_KEYCODE, RolesFn::SaveRole),
            Permissions::new(ROLES_KEYCODE, RolesFn::RemoveRole),
        ]
    }
}
