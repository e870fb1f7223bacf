use bophades_kernel::KernelError;
use bophades_ledger::LedgerError;
use bophades_types::{Address, Category, Selector, SubKeycode, TypesError};
use thiserror::Error;

/// Errors raised by SPPLY
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Category already approved: {category}")]
    CategoryAlreadyApproved { category: Category },

    #[error("Category not approved: {category}")]
    CategoryNotApproved { category: Category },

    #[error("Category {category} still has locations")]
    CategoryInUse { category: Category },

    #[error("Selector {selector} is not a supply submodule function")]
    InvalidSelector { selector: Selector },

    #[error("Location {location} is already in category {category}")]
    LocationAlreadyCategorized { location: Address, category: Category },

    #[error("Location {location} is not categorized")]
    LocationNotCategorized { location: Address },

    #[error("Submodule {submodule} failed on {operation}: {reason}")]
    SubmoduleFailed {
        submodule: SubKeycode,
        operation: String,
        reason: String,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] TypesError),
}

impl SupplyError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "SPPLY_INVALID_PARAMS",
            Self::CategoryAlreadyApproved { .. } => "SPPLY_CATEGORY_ALREADY_APPROVED",
            Self::CategoryNotApproved { .. } => "SPPLY_CATEGORY_NOT_APPROVED",
            Self::CategoryInUse { .. } => "SPPLY_CATEGORY_IN_USE",
            Self::InvalidSelector { .. } => "SPPLY_INVALID_SELECTOR",
            Self::LocationAlreadyCategorized { .. } => "SPPLY_LOCATION_ALREADY_CATEGORIZED",
            Self::LocationNotCategorized { .. } => "SPPLY_LOCATION_NOT_CATEGORIZED",
            Self::SubmoduleFailed { .. } => "SPPLY_SUBMODULE_FAILED",
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Math(err) => err.error_code(),
        }
    }
}

/// Errors raised inside a supply submodule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmoduleError {
    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Command {command} is not supported by {submodule}")]
    UnsupportedCommand { submodule: SubKeycode, command: String },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] TypesError),
}

impl SubmoduleError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "SUBMODULE_INVALID_PARAMS",
            Self::UnsupportedCommand { .. } => "SUBMODULE_UNSUPPORTED_COMMAND",
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Math(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupplyError>;

pub type SubmoduleResult<T> = std::result::Result<T, SubmoduleError>;
