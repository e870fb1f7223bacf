//! Kernel handle held by every module and policy

use std::sync::{Arc, Weak};

use bophades_types::Address;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{KernelError, Result};
use crate::kernel::Kernel;

/// A non-owning reference to the kernel a component is bound to.
///
/// Only the current kernel may re-point the adapter (during migration).
pub struct KernelAdapter {
    kernel: RwLock<Weak<Kernel>>,
    kernel_address: RwLock<Address>,
}

impl KernelAdapter {
    pub fn new(kernel: &Arc<Kernel>) -> Self {
        Self {
            kernel: RwLock::new(Arc::downgrade(kernel)),
            kernel_address: RwLock::new(kernel.address()),
        }
    }

    pub fn kernel(&self) -> Result<Arc<Kernel>> {
        self.kernel.read().upgrade().ok_or(KernelError::KernelUnavailable)
    }

    pub fn kernel_address(&self) -> Address {
        *self.kernel_address.read()
    }

    /// Re-point to `new_kernel`; `caller` must be the current kernel
    pub fn change_kernel(&self, caller: &Address, new_kernel: &Arc<Kernel>) -> Result<()> {
        if *caller != self.kernel_address() {
            return Err(KernelError::OnlyKernel { caller: *caller });
        }
        *self.kernel.write() = Arc::downgrade(new_kernel);
        *self.kernel_address.write() = new_kernel.address();
        info!(from = %caller, to = %new_kernel.address(), "kernel changed");
        Ok(())
    }

    /// Current block timestamp of the bound kernel
    pub fn now(&self) -> Result<u64> {
        Ok(self.kernel()?.now())
    }

    /// Emit a structured event through the bound kernel
    pub fn emit(&self, emitter: Address, name: &str, data: serde_json::Value) {
        match self.kernel() {
            Ok(kernel) => kernel.emit(emitter, name, data),
            Err(_) => debug!(emitter = %emitter, event = name, "event dropped, kernel unavailable"),
        }
    }
}
