use bophades_kernel::KernelError;
use bophades_ledger::LedgerError;
use bophades_policies::PolicyError;
use bophades_supply::SupplyError;
use bophades_treasury::TreasuryError;
use bophades_types::TypesError;
use thiserror::Error;

/// Errors raised while loading configuration or booting a protocol
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown token symbol: {symbol}")]
    UnknownToken { symbol: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Supply(#[from] SupplyError),

    #[error(transparent)]
    Treasury(#[from] TreasuryError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Types(#[from] TypesError),
}

impl StateError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "STATE_CONFIG",
            Self::InvalidConfig { .. } => "STATE_INVALID_CONFIG",
            Self::UnknownToken { .. } => "STATE_UNKNOWN_TOKEN",
            Self::Policy(err) => err.error_code(),
            Self::Supply(err) => err.error_code(),
            Self::Treasury(err) => err.error_code(),
            Self::Kernel(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Types(err) => err.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
