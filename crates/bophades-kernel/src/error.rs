//! Kernel, module, policy and submodule errors

use bophades_types::{Address, Keycode, SubKeycode, TypesError};
use thiserror::Error;

use crate::actions::Actions;

pub type Result<T> = std::result::Result<T, KernelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    // ========================================================================
    // Kernel
    // ========================================================================
    #[error("Caller {caller} is not the executor")]
    NotAuthorized { caller: Address },

    #[error("Target {target} is not a valid contract for {action:?}")]
    TargetNotAContract { action: Actions, target: Address },

    #[error("Invalid keycode: {keycode}")]
    InvalidKeycode { keycode: String },

    #[error("Module already installed for keycode {keycode}")]
    ModuleAlreadyInstalled { keycode: Keycode },

    #[error("Invalid module upgrade for keycode {keycode}")]
    InvalidModuleUpgrade { keycode: Keycode },

    #[error("Policy {policy} already activated")]
    PolicyAlreadyActivated { policy: Address },

    #[error("Policy {policy} not activated")]
    PolicyNotActivated { policy: Address },

    #[error("Unknown kernel action {action}")]
    UnknownAction { action: u8 },

    // ========================================================================
    // Adapter / Module
    // ========================================================================
    #[error("Caller {caller} is not the kernel")]
    OnlyKernel { caller: Address },

    #[error("Kernel is no longer available")]
    KernelUnavailable,

    #[error("Policy {caller} is not permitted")]
    PolicyNotPermitted { caller: Address },

    #[error("Module for keycode {keycode} is not of the expected type")]
    ModuleTypeMismatch { keycode: Keycode },

    // ========================================================================
    // Policy
    // ========================================================================
    #[error("Module does not exist for keycode {keycode}")]
    ModuleDoesNotExist { keycode: Keycode },

    #[error("Wrong module version for {keycode}: expected major {expected}, found {actual}")]
    WrongModuleVersion {
        keycode: Keycode,
        expected: u8,
        actual: u8,
    },

    // ========================================================================
    // Submodules
    // ========================================================================
    #[error("Invalid subkeycode: {subkeycode}")]
    InvalidSubKeycode { subkeycode: String },

    #[error("Submodule {subkeycode} does not belong to {parent}")]
    InvalidSubmodule { subkeycode: SubKeycode, parent: Keycode },

    #[error("Submodule already installed: {subkeycode}")]
    SubmoduleAlreadyInstalled { subkeycode: SubKeycode },

    #[error("Submodule not installed: {subkeycode}")]
    SubmoduleNotInstalled { subkeycode: SubKeycode },

    #[error("Invalid submodule upgrade: {subkeycode}")]
    InvalidSubmoduleUpgrade { subkeycode: SubKeycode },

    #[error("Caller {caller} is not the parent module")]
    OnlyParent { caller: Address },

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("Reentrant call")]
    Reentrancy,
}

impl KernelError {
    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthorized { .. } => "KERNEL_NOT_AUTHORIZED",
            Self::TargetNotAContract { .. } => "KERNEL_TARGET_NOT_A_CONTRACT",
            Self::InvalidKeycode { .. } => "KERNEL_INVALID_KEYCODE",
            Self::ModuleAlreadyInstalled { .. } => "KERNEL_MODULE_ALREADY_INSTALLED",
            Self::InvalidModuleUpgrade { .. } => "KERNEL_INVALID_MODULE_UPGRADE",
            Self::PolicyAlreadyActivated { .. } => "KERNEL_POLICY_ALREADY_ACTIVATED",
            Self::PolicyNotActivated { .. } => "KERNEL_POLICY_NOT_ACTIVATED",
            Self::UnknownAction { .. } => "KERNEL_UNKNOWN_ACTION",
            Self::OnlyKernel { .. } => "KERNEL_ADAPTER_ONLY_KERNEL",
            Self::KernelUnavailable => "KERNEL_UNAVAILABLE",
            Self::PolicyNotPermitted { .. } => "MODULE_POLICY_NOT_PERMITTED",
            Self::ModuleTypeMismatch { .. } => "MODULE_TYPE_MISMATCH",
            Self::ModuleDoesNotExist { .. } => "POLICY_MODULE_DOES_NOT_EXIST",
            Self::WrongModuleVersion { .. } => "POLICY_WRONG_MODULE_VERSION",
            Self::InvalidSubKeycode { .. } => "MODULE_INVALID_SUBKEYCODE",
            Self::InvalidSubmodule { .. } => "MODULE_INVALID_SUBMODULE",
            Self::SubmoduleAlreadyInstalled { .. } => "MODULE_SUBMODULE_ALREADY_INSTALLED",
            Self::SubmoduleNotInstalled { .. } => "MODULE_SUBMODULE_NOT_INSTALLED",
            Self::InvalidSubmoduleUpgrade { .. } => "MODULE_INVALID_SUBMODULE_UPGRADE",
            Self::OnlyParent { .. } => "SUBMODULE_ONLY_PARENT",
            Self::Reentrancy => "REENTRANCY",
        }
    }

    /// Authorization failures, as opposed to state or parameter failures
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized { .. }
                | Self::OnlyKernel { .. }
                | Self::PolicyNotPermitted { .. }
                | Self::OnlyParent { .. }
        )
    }
}

impl From<TypesError> for KernelError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::InvalidSubKeycode { value } => Self::InvalidSubKeycode { subkeycode: value },
            TypesError::InvalidKeycode { value } => Self::InvalidKeycode { keycode: value },
            other => Self::InvalidKeycode {
                keycode: other.to_string(),
            },
        }
    }
}
