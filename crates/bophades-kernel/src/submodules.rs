//! Submodule framework
//!
//! A parent module owns an ordered registry of child submodules keyed by
//! `SubKeycode`. Submodules are only ever called by their parent.

use std::collections::HashMap;
use std::sync::Arc;

use bophades_types::{Address, Keycode, SubKeycode};
use parking_lot::RwLock;
use serde_json::json;
use tracing::info;

use crate::error::{KernelError, Result};
use crate::module::{Module, ModuleFunction};

/// Child side of the framework
pub trait Submodule: Send + Sync + 'static {
    fn subkeycode(&self) -> SubKeycode;

    /// The keycode of the only module allowed to install this submodule
    fn parent(&self) -> Keycode;

    /// `(major, minor)`
    fn version(&self) -> (u8, u8);

    fn address(&self) -> Address;

    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Fail unless `caller` is the parent module
pub fn only_parent(parent: &Address, caller: &Address) -> Result<()> {
    if parent != caller {
        return Err(KernelError::OnlyParent { caller: *caller });
    }
    Ok(())
}

struct RegistryState<S: ?Sized> {
    order: Vec<SubKeycode>,
    by_code: HashMap<SubKeycode, Arc<S>>,
}

/// Ordered set of installed submodules
pub struct SubmoduleRegistry<S: ?Sized> {
    parent: Keycode,
    state: RwLock<RegistryState<S>>,
}

impl<S: Submodule + ?Sized> SubmoduleRegistry<S> {
    pub fn new(parent: Keycode) -> Self {
        Self {
            parent,
            state: RwLock::new(RegistryState {
                order: Vec::new(),
                by_code: HashMap::new(),
            }),
        }
    }

    fn validate(&self, submodule: &S) -> Result<SubKeycode> {
        let subkeycode = submodule.subkeycode();
        subkeycode.validate_for(&self.parent)?;
        if submodule.parent() != self.parent {
            return Err(KernelError::InvalidSubmodule {
                subkeycode,
                parent: self.parent,
            });
        }
        Ok(subkeycode)
    }

    pub fn install(&self, submodule: Arc<S>) -> Result<()> {
        let subkeycode = self.validate(&submodule)?;
        if self.state.read().by_code.contains_key(&subkeycode) {
            return Err(KernelError::SubmoduleAlreadyInstalled { subkeycode });
        }
        submodule.init()?;

        let mut state = self.state.write();
        state.order.push(subkeycode);
        state.by_code.insert(subkeycode, submodule);
        Ok(())
    }

    /// Replace an installed submodule with a different instance, returning the old one
    pub fn upgrade(&self, submodule: Arc<S>) -> Result<Arc<S>> {
        let subkeycode = self.validate(&submodule)?;
        let existing = self.get(&subkeycode)?;
        if existing.address() == submodule.address() {
            return Err(KernelError::InvalidSubmoduleUpgrade { subkeycode });
        }
        submodule.init()?;

        self.state.write().by_code.insert(subkeycode, submodule);
        Ok(existing)
    }

    pub fn uninstall(&self, subkeycode: &SubKeycode) -> Result<Arc<S>> {
        let mut state = self.state.write();
        let removed = state
            .by_code
            .remove(subkeycode)
            .ok_or(KernelError::SubmoduleNotInstalled {
                subkeycode: *subkeycode,
            })?;
        state.order.retain(|code| code != subkeycode);
        Ok(removed)
    }

    pub fn get(&self, subkeycode: &SubKeycode) -> Result<Arc<S>> {
        self.state
            .read()
            .by_code
            .get(subkeycode)
            .cloned()
            .ok_or(KernelError::SubmoduleNotInstalled {
                subkeycode: *subkeycode,
            })
    }

    /// Installed submodules in install order
    pub fn all(&self) -> Vec<Arc<S>> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|code| state.by_code.get(code).cloned())
            .collect()
    }

    pub fn subkeycodes(&self) -> Vec<SubKeycode> {
        self.state.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Permissioned submodule management shared by every parent module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleFn {
    InstallSubmodule,
    UpgradeSubmodule,
    UninstallSubmodule,
    ExecOnSubmodule,
}

impl ModuleFunction for SubmoduleFn {
    fn signature(self) -> &'static str {
        match self {
            SubmoduleFn::InstallSubmodule => "installSubmodule(address)",
            SubmoduleFn::UpgradeSubmodule => "upgradeSubmodule(address)",
            SubmoduleFn::UninstallSubmodule => "uninstallSubmodule(bytes20)",
            SubmoduleFn::ExecOnSubmodule => "execOnSubmodule(bytes20,bytes)",
        }
    }
}

/// Parent side of the framework
pub trait ModuleWithSubmodules: Module {
    type Sub: Submodule + ?Sized;

    fn submodules(&self) -> &SubmoduleRegistry<Self::Sub>;

    fn install_submodule(&self, caller: &Address, submodule: Arc<Self::Sub>) -> Result<()> {
        self.permissioned(caller, SubmoduleFn::InstallSubmodule.selector())?;
        let subkeycode = submodule.subkeycode();
        self.submodules().install(submodule)?;
        info!(parent = %self.keycode(), %subkeycode, "submodule installed");
        self.adapter().emit(
            self.address(),
            "SubmoduleInstalled",
            json!({ "subkeycode": subkeycode }),
        );
        Ok(())
    }

    fn upgrade_submodule(&self, caller: &Address, submodule: Arc<Self::Sub>) -> Result<()> {
        self.permissioned(caller, SubmoduleFn::UpgradeSubmodule.selector())?;
        let subkeycode = submodule.subkeycode();
        let new_address = submodule.address();
        let old = self.submodules().upgrade(submodule)?;
        info!(parent = %self.keycode(), %subkeycode, "submodule upgraded");
        self.adapter().emit(
            self.address(),
            "SubmoduleUpgraded",
            json!({ "subkeycode": subkeycode, "old": old.address(), "new": new_address }),
        );
        Ok(())
    }

    fn uninstall_submodule(&self, caller: &Address, subkeycode: &SubKeycode) -> Result<()> {
        self.permissioned(caller, SubmoduleFn::UninstallSubmodule.selector())?;
        self.submodules().uninstall(subkeycode)?;
        info!(parent = %self.keycode(), %subkeycode, "submodule uninstalled");
        self.adapter().emit(
            self.address(),
            "SubmoduleUninstalled",
            json!({ "subkeycode": subkeycode }),
        );
        Ok(())
    }

    fn get_submodules(&self) -> Vec<SubKeycode> {
        self.submodules().subkeycodes()
    }
}
