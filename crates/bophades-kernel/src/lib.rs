//! Bophades Kernel - module/policy capability registry
//!
//! The kernel is the sole authority for wiring. It tracks installed modules by
//! keycode, active policies, and the `(keycode, selector, policy)` permission
//! table that every module consults before mutating state.
//!
//! ```text
//! caller → Policy → Module::permissioned → Kernel::check_permission → state
//! ```
//!
//! # Invariants
//!
//! 1. A permissioned call succeeds iff the grant exists, the policy is active,
//!    and the module is the instance currently installed under its keycode
//! 2. Grants never survive policy deactivation
//! 3. Every kernel action is all-or-nothing
//! 4. Modules never call policies; submodules are only called by their parent

pub mod actions;
pub mod adapter;
pub mod error;
pub mod events;
pub mod guard;
pub mod kernel;
pub mod module;
pub mod permissions;
pub mod policy;
pub mod submodules;

pub use actions::{Actions, Target};
pub use adapter::KernelAdapter;
pub use error::{KernelError, Result};
pub use events::{EventLog, KernelEvent};
pub use guard::{ReentrancyGuard, ReentrancyLock};
pub use kernel::Kernel;
pub use module::{Module, ModuleFunction};
pub use permissions::{Grant, PermissionTable};
pub use policy::{require_version, Dependency, Permissions, Policy};
pub use submodules::{only_parent, ModuleWithSubmodules, Submodule, SubmoduleFn, SubmoduleRegistry};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
