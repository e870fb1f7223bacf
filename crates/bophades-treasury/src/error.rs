use bophades_kernel::KernelError;
use bophades_ledger::LedgerError;
use bophades_types::{Address, Category, CategoryGroup, TypesError};
use thiserror::Error;

/// Errors raised by TRSRY
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    // ========================================================================
    // Reserves and debt
    // ========================================================================
    #[error("Treasury is not active")]
    NotActive,

    #[error("{withdrawer} may withdraw {approved} of {token}, requested {requested}")]
    WithdrawNotApproved {
        withdrawer: Address,
        token: Address,
        approved: u128,
        requested: u128,
    },

    #[error("{debtor} may borrow {approved} of {token}, requested {requested}")]
    DebtNotApproved {
        debtor: Address,
        token: Address,
        approved: u128,
        requested: u128,
    },

    #[error("{debtor} has no outstanding {token} debt")]
    NoDebtOutstanding { debtor: Address, token: Address },

    #[error("Repayment of {amount} exceeds outstanding debt {debt}")]
    RepaymentExceedsDebt { debt: u128, amount: u128 },

    // ========================================================================
    // Assets
    // ========================================================================
    #[error("Asset already approved: {asset}")]
    AssetAlreadyApproved { asset: Address },

    #[error("Asset not approved: {asset}")]
    AssetNotApproved { asset: Address },

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    // ========================================================================
    // Taxonomy
    // ========================================================================
    #[error("Category group already exists: {group}")]
    CategoryGroupExists { group: CategoryGroup },

    #[error("Category group does not exist: {group}")]
    CategoryGroupDoesNotExist { group: CategoryGroup },

    #[error("Category already exists: {category}")]
    CategoryExists { category: Category },

    #[error("Category does not exist: {category}")]
    CategoryDoesNotExist { category: Category },

    #[error("Asset {asset} is not in category {category}")]
    AssetNotInCategory { asset: Address, category: Category },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] TypesError),
}

impl TreasuryError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotActive => "TRSRY_NOT_ACTIVE",
            Self::WithdrawNotApproved { .. } => "TRSRY_WITHDRAW_NOT_APPROVED",
            Self::DebtNotApproved { .. } => "TRSRY_DEBT_NOT_APPROVED",
            Self::NoDebtOutstanding { .. } => "TRSRY_NO_DEBT_OUTSTANDING",
            Self::RepaymentExceedsDebt { .. } => "TRSRY_REPAYMENT_EXCEEDS_DEBT",
            Self::AssetAlreadyApproved { .. } => "TRSRY_ASSET_ALREADY_APPROVED",
            Self::AssetNotApproved { .. } => "TRSRY_ASSET_NOT_APPROVED",
            Self::InvalidParams { .. } => "TRSRY_INVALID_PARAMS",
            Self::CategoryGroupExists { .. } => "TRSRY_CATEGORY_GROUP_EXISTS",
            Self::CategoryGroupDoesNotExist { .. } => "TRSRY_CATEGORY_GROUP_DOES_NOT_EXIST",
            Self::CategoryExists { .. } => "TRSRY_CATEGORY_EXISTS",
            Self::CategoryDoesNotExist { .. } => "TRSRY_CATEGORY_DOES_NOT_EXIST",
            Self::AssetNotInCategory { .. } => "TRSRY_ASSET_NOT_IN_CATEGORY",
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Math(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TreasuryError>;
