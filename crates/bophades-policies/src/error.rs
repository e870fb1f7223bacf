use bophades_deposits::DepositError;
use bophades_kernel::KernelError;
use bophades_ledger::LedgerError;
use bophades_minter::MinterError;
use bophades_roles::RolesError;
use bophades_supply::SupplyError;
use bophades_treasury::TreasuryError;
use bophades_types::{Address, TypesError};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by policies, wrapping the module errors they surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    // ========================================================================
    // Enabler
    // ========================================================================
    #[error("Policy is not enabled")]
    NotEnabled,

    #[error("Policy is not disabled")]
    NotDisabled,

    // ========================================================================
    // Policy-specific
    // ========================================================================
    #[error("Caller {caller} is not the admin")]
    OnlyAdmin { caller: Address },

    #[error("Caller {caller} is not the pending admin")]
    OnlyNewAdmin { caller: Address },

    #[error("Policy {policy} is still active")]
    PolicyStillActive { policy: Address },

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Caller {caller} is not the relayer")]
    InvalidRelayer { caller: Address },

    #[error("Mint approval {approval} does not match bridged supply {bridged}")]
    MintApprovalOutOfSync { approval: u128, bridged: u128 },

    #[error("No failed message {id}")]
    FailedMessageNotFound { id: Uuid },

    // ========================================================================
    // Modules
    // ========================================================================
    #[error(transparent)]
    Roles(#[from] RolesError),

    #[error(transparent)]
    Minter(#[from] MinterError),

    #[error(transparent)]
    Supply(#[from] SupplyError),

    #[error(transparent)]
    Treasury(#[from] TreasuryError),

    #[error(transparent)]
    Deposit(#[from] DepositError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] TypesError),
}

impl PolicyError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotEnabled => "POLICY_NOT_ENABLED",
            Self::NotDisabled => "POLICY_NOT_DISABLED",
            Self::OnlyAdmin { .. } => "POLICY_ONLY_ADMIN",
            Self::OnlyNewAdmin { .. } => "POLICY_ONLY_NEW_ADMIN",
            Self::PolicyStillActive { .. } => "POLICY_STILL_ACTIVE",
            Self::InvalidParams { .. } => "POLICY_INVALID_PARAMS",
            Self::InvalidRelayer { .. } => "BRIDGE_INVALID_RELAYER",
            Self::MintApprovalOutOfSync { .. } => "BRIDGE_MINT_APPROVAL_OUT_OF_SYNC",
            Self::FailedMessageNotFound { .. } => "BRIDGE_FAILED_MESSAGE_NOT_FOUND",
            Self::Roles(err) => err.error_code(),
            Self::Minter(err) => err.error_code(),
            Self::Supply(err) => err.error_code(),
            Self::Treasury(err) => err.error_code(),
            Self::Deposit(err) => err.error_code(),
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Math(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
