use bophades_kernel::KernelError;
use bophades_ledger::LedgerError;
use bophades_types::{Address, TypesError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepositError {
    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Invalid position id: {id}")]
    InvalidPositionId { id: u64 },

    #[error("{caller} does not own position {id}")]
    NotOwner { id: u64, caller: Address },

    #[error("{caller} is not the operator of position {id}")]
    NotOperator { id: u64, caller: Address },

    #[error("Position {id} is already wrapped")]
    AlreadyWrapped { id: u64 },

    #[error("Position {id} is not wrapped")]
    NotWrapped { id: u64 },

    #[error("Position {id} is not convertible")]
    NotConvertible { id: u64 },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] TypesError),
}

impl DepositError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "DEPOS_INVALID_PARAMS",
            Self::InvalidPositionId { .. } => "DEPOS_INVALID_POSITION_ID",
            Self::NotOwner { .. } => "DEPOS_NOT_OWNER",
            Self::NotOperator { .. } => "DEPOS_NOT_OPERATOR",
            Self::AlreadyWrapped { .. } => "DEPOS_ALREADY_WRAPPED",
            Self::NotWrapped { .. } => "DEPOS_NOT_WRAPPED",
            Self::NotConvertible { .. } => "DEPOS_NOT_CONVERTIBLE",
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Math(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DepositError>;
