//! Policy base trait and dependency binding

use std::fmt;
use std::sync::Arc;

use bophades_types::{Address, Keycode, Selector};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::adapter::KernelAdapter;
use crate::error::{KernelError, Result};
use crate::kernel::Kernel;
use crate::module::{Module, ModuleFunction};

/// A single `(module, operation)` capability requested by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub keycode: Keycode,
    pub selector: Selector,
}

impl Permissions {
    pub fn new(keycode: Keycode, function: impl ModuleFunction) -> Self {
        Self {
            keycode,
            selector: function.selector(),
        }
    }
}

/// A versioned unit of business logic.
///
/// Policies mutate modules only through the permissions the kernel granted
/// them on activation.
pub trait Policy: Send + Sync + 'static {
    fn address(&self) -> Address;

    fn adapter(&self) -> &KernelAdapter;

    /// Bind module references and return the keycodes this policy depends on
    fn configure_dependencies(&self) -> Result<Vec<Keycode>>;

    fn request_permissions(&self) -> Vec<Permissions>;

    /// Whether the bound kernel lists this policy as active
    fn is_active(&self) -> bool {
        self.adapter()
            .kernel()
            .map(|kernel| kernel.is_policy_active(&self.address()))
            .unwrap_or(false)
    }

    /// Fail unless `module` would accept a call to `selector` from this policy right now
    fn ensure_permitted(&self, module: &dyn Module, selector: Selector) -> Result<()> {
        let kernel = self.adapter().kernel()?;
        kernel.check_permission(module.keycode(), module.address(), &self.address(), selector)
    }
}

/// Fail unless `module` reports the expected major version
pub fn require_version<M: Module + ?Sized>(module: &M, expected_major: u8) -> Result<()> {
    let (major, _) = module.version();
    if major != expected_major {
        return Err(KernelError::WrongModuleVersion {
            keycode: module.keycode(),
            expected: expected_major,
            actual: major,
        });
    }
    Ok(())
}

/// A typed module reference, bound during `configure_dependencies`
pub struct Dependency<T> {
    keycode: Keycode,
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: Module> Dependency<T> {
    pub fn new(keycode: Keycode) -> Self {
        Self {
            keycode,
            slot: RwLock::new(None),
        }
    }

    pub fn keycode(&self) -> Keycode {
        self.keycode
    }

    /// Resolve the module currently installed under the keycode and store it
    pub fn bind(&self, kernel: &Kernel) -> Result<Arc<T>> {
        let module = kernel.module::<T>(self.keycode)?;
        *self.slot.write() = Some(module.clone());
        Ok(module)
    }

    pub fn get(&self) -> Result<Arc<T>> {
        self.slot
            .read()
            .clone()
            .ok_or(KernelError::ModuleDoesNotExist {
                keycode: self.keycode,
            })
    }
}

impl<T> fmt::Debug for Dependency<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency({}, bound: {})", self.keycode, self.slot.read().is_some())
    }
}
