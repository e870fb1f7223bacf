//! ROLES - role registry
//!
//! Policies gate their own entry points with `require_role`; only a policy
//! holding the `saveRole` / `removeRole` permissions (RolesAdmin) may change
//! who holds what.
//!
//! # Invariants
//!
//! 1. Roles are non-empty lowercase `a-z` / `_` tags
//! 2. Granting an existing role or removing a missing one is an error

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use bophades_kernel::{Kernel, KernelAdapter, KernelError, Module, ModuleFunction};
use bophades_types::{Address, Keycode, Role, TypesError};
use parking_lot::RwLock;
use serde_json::json;
use thiserror::Error;
use tracing::info;

pub const ROLES_KEYCODE: Keycode = Keycode::from_bytes(*b"ROLES");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RolesError {
    #[error("Caller {caller} does not have role {role}")]
    RequireRole { role: Role, caller: Address },

    #[error("Invalid role: {role:?}")]
    InvalidRole { role: Role },

    #[error("{wallet} already has role {role}")]
    AddressAlreadyHasRole { wallet: Address, role: Role },

    #[error("{wallet} does not have role {role}")]
    AddressDoesNotHaveRole { wallet: Address, role: Role },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl RolesError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RequireRole { .. } => "ROLES_REQUIRE_ROLE",
            Self::InvalidRole { .. } => "ROLES_INVALID_ROLE",
            Self::AddressAlreadyHasRole { .. } => "ROLES_ADDRESS_ALREADY_HAS_ROLE",
            Self::AddressDoesNotHaveRole { .. } => "ROLES_ADDRESS_DOES_NOT_HAVE_ROLE",
            Self::Kernel(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RolesError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolesFn {
    SaveRole,
    RemoveRole,
}

impl ModuleFunction for RolesFn {
    fn signature(self) -> &'static str {
        match self {
            RolesFn::SaveRole => "saveRole(bytes32,address)",
            RolesFn::RemoveRole => "removeRole(bytes32,address)",
        }
    }
}

pub struct RolesModule {
    address: Address,
    adapter: KernelAdapter,
    holders: RwLock<BTreeSet<(Role, Address)>>,
}

impl RolesModule {
    pub fn new(kernel: &Arc<Kernel>, address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            holders: RwLock::new(BTreeSet::new()),
        })
    }

    pub fn ensure_valid_role(role: &Role) -> Result<()> {
        role.validate()
            .map_err(|_: TypesError| RolesError::InvalidRole { role: *role })
    }

    pub fn save_role(&self, caller: &Address, role: Role, wallet: Address) -> Result<()> {
        self.permissioned(caller, RolesFn::SaveRole.selector())?;
        Self::ensure_valid_role(&role)?;
        if !self.holders.write().insert((role, wallet)) {
            return Err(RolesError::AddressAlreadyHasRole { wallet, role });
        }
        info!(%role, wallet = %wallet.short(), "role granted");
        self.adapter
            .emit(self.address, "RoleGranted", json!({ "role": role, "addr": wallet }));
        Ok(())
    }

    pub fn remove_role(&self, caller: &Address, role: Role, wallet: Address) -> Result<()> {
        self.permissioned(caller, RolesFn::RemoveRole.selector())?;
        if !self.holders.write().remove(&(role, wallet)) {
            return Err(RolesError::AddressDoesNotHaveRole { wallet, role });
        }
        info!(%role, wallet = %wallet.short(), "role revoked");
        self.adapter
            .emit(self.address, "RoleRevoked", json!({ "role": role, "addr": wallet }));
        Ok(())
    }

    pub fn has_role(&self, wallet: &Address, role: &Role) -> bool {
        self.holders.read().contains(&(*role, *wallet))
    }

    pub fn require_role(&self, role: &Role, caller: &Address) -> Result<()> {
        if !self.has_role(caller, role) {
            return Err(RolesError::RequireRole {
                role: *role,
                caller: *caller,
            });
        }
        Ok(())
    }

    /// Every holder of `role`
    pub fn holders(&self, role: &Role) -> Vec<Address> {
        self.holders
            .read()
            .iter()
            .filter(|(held, _)| held == role)
            .map(|(_, wallet)| *wallet)
            .collect()
    }
}

impl Module for RolesModule {
    fn keycode(&self) -> Keycode {
        ROLES_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
