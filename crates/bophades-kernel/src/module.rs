//! Module base trait
//!
//! A module is a versioned unit of state owned by the kernel. Every mutating
//! function starts with `self.permissioned(caller, selector)?`.

use std::any::Any;
use std::sync::Arc;

use bophades_types::{Address, Keycode, Selector};

use crate::adapter::KernelAdapter;
use crate::error::Result;

pub trait Module: Send + Sync + 'static {
    fn keycode(&self) -> Keycode;

    /// `(major, minor)`
    fn version(&self) -> (u8, u8);

    fn address(&self) -> Address;

    fn adapter(&self) -> &KernelAdapter;

    /// Called by the kernel on install and upgrade
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Downcast support for `Kernel::module::<T>()`
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Gate a mutating call on the kernel's permission table
    fn permissioned(&self, caller: &Address, selector: Selector) -> Result<()> {
        let kernel = self.adapter().kernel()?;
        kernel.check_permission(self.keycode(), self.address(), caller, selector)
    }
}

/// A module operation with a stable signature
pub trait ModuleFunction: Copy {
    fn signature(self) -> &'static str;

    fn selector(self) -> Selector {
        Selector::from_signature(self.signature())
    }
}
