//! Centralized error types for the Cosign workspace.

use alloy_primitives::Address;
use thiserror::Error;

use crate::types::TxId;

/// Rejected owner list / threshold at construction time. No wallet is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("owner list is empty")]
    EmptyOwners,

    #[error("duplicate owner {0}")]
    DuplicateOwner(Address),

    #[error("threshold {threshold} outside [1, {owners}]")]
    ThresholdOutOfRange { threshold: u32, owners: usize },
}

/// Dispatch failure reported by the execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("destination reverted")]
    Reverted,

    #[error("execution halted: {0}")]
    Halted(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Failures of the wallet's public operations.
///
/// Every variant except `ExternalCallFailure` leaves the wallet untouched.
/// `ExternalCallFailure` keeps the triggering confirmation but rolls back
/// everything the dispatch attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("{0} is not an owner")]
    Unauthorized(Address),

    #[error("transaction {0} does not exist")]
    NotFound(TxId),

    #[error("transaction {id} already confirmed by {owner}")]
    DuplicateConfirmation { id: TxId, owner: Address },

    #[error("transaction {id} not confirmed by {owner}")]
    NotConfirmed { id: TxId, owner: Address },

    #[error("transaction {0} already executed")]
    AlreadyExecuted(TxId),

    #[error("transaction {id} has {confirmations} of {required} confirmations")]
    InsufficientConfirmations {
        id: TxId,
        confirmations: u32,
        required: u32,
    },

    #[error("dispatch of transaction {id} failed: {reason}")]
    ExternalCallFailure { id: TxId, reason: DispatchError },
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Top-level error enum. Variants map to subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CosignError {
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("EVM error: {0}")]
    Evm(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CosignError {
    fn from(e: ConfigError) -> Self {
        CosignError::Wallet(WalletError::Configuration(e))
    }
}

pub type CosignResult<T> = Result<T, CosignError>;
