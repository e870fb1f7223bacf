//! Kernel actions and their targets

use std::fmt;
use std::sync::Arc;

use bophades_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::module::Module;
use crate::policy::Policy;

/// Kernel action identifiers.
///
/// The numeric values are a stable wire contract; never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Actions {
    InstallModule = 0,
    UpgradeModule = 1,
    ActivatePolicy = 2,
    DeactivatePolicy = 3,
    ChangeExecutor = 4,
    MigrateKernel = 5,
}

impl TryFrom<u8> for Actions {
    type Error = KernelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Actions::InstallModule),
            1 => Ok(Actions::UpgradeModule),
            2 => Ok(Actions::ActivatePolicy),
            3 => Ok(Actions::DeactivatePolicy),
            4 => Ok(Actions::ChangeExecutor),
            5 => Ok(Actions::MigrateKernel),
            action => Err(KernelError::UnknownAction { action }),
        }
    }
}

/// The contract (or account) an action applies to
#[derive(Clone)]
pub enum Target {
    Module(Arc<dyn Module>),
    Policy(Arc<dyn Policy>),
    Kernel(Arc<Kernel>),
    /// A plain account with no code
    Account(Address),
}

impl Target {
    pub fn address(&self) -> Address {
        match self {
            Target::Module(module) => module.address(),
            Target::Policy(policy) => policy.address(),
            Target::Kernel(kernel) => kernel.address(),
            Target::Account(address) => *address,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Module(m) => write!(f, "Module({}, {})", m.keycode(), m.address()),
            Target::Policy(p) => write!(f, "Policy({})", p.address()),
            Target::Kernel(k) => write!(f, "Kernel({})", k.address()),
            Target::Account(a) => write!(f, "Account({})", a),
        }
    }
}
