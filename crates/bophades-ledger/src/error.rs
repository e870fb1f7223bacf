use bophades_types::Address;
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: have {available}, need {required}")]
    InsufficientBalance {
        account: Address,
        available: u128,
        required: u128,
    },

    #[error("Insufficient allowance from {owner} to {spender}: have {available}, need {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: u128,
        required: u128,
    },

    #[error("Zero address")]
    ZeroAddress,

    #[error("Supply overflow")]
    Overflow,

    #[error("Token {token_id} already minted")]
    TokenAlreadyMinted { token_id: u64 },

    #[error("Token {token_id} not minted")]
    TokenNotMinted { token_id: u64 },

    #[error("{caller} is not owner or approved for token {token_id}")]
    NotOwnerOrApproved { token_id: u64, caller: Address },

    #[error("Token {token_id} is not owned by {from}")]
    WrongFrom { token_id: u64, from: Address },

    #[error("Unknown token: {address}")]
    UnknownToken { address: Address },
}

impl LedgerError {
    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::ZeroAddress => "ZERO_ADDRESS",
            Self::Overflow => "OVERFLOW",
            Self::TokenAlreadyMinted { .. } => "TOKEN_ALREADY_MINTED",
            Self::TokenNotMinted { .. } => "TOKEN_NOT_MINTED",
            Self::NotOwnerOrApproved { .. } => "NOT_OWNER_OR_APPROVED",
            Self::WrongFrom { .. } => "WRONG_FROM",
            Self::UnknownToken { .. } => "UNKNOWN_TOKEN",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
