//! Domain types for the Cosign wallet core.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Dense ledger index. Ids are assigned `0, 1, 2, ...` in submission order.
pub type TxId = u64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction input: owner list (order is preserved) and quorum threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub owners: Vec<Address>,
    pub threshold: u32,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A proposed outgoing action tracked by the ledger.
///
/// `destination`, `value` and `payload` never change after submission.
/// `confirmation_count` mirrors the confirmation matrix for this id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub destination: Address,
    pub value: U256,
    /// `Bytes` (ref-counted) so dispatch can share it without copying.
    pub payload: Bytes,
    pub executed: bool,
    pub confirmation_count: u32,
}

impl Transaction {
    /// Position in the `Pending -> Eligible -> Executed` state machine.
    pub fn status(&self, threshold: u32) -> TxStatus {
        if self.executed {
            TxStatus::Executed
        } else if self.confirmation_count >= threshold {
            TxStatus::Eligible
        } else {
            TxStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Eligible,
    Executed,
}

/// Selects transactions by execution state. Both flags set selects all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxFilter {
    pub pending: bool,
    pub executed: bool,
}

impl TxFilter {
    pub const ALL: TxFilter = TxFilter {
        pending: true,
        executed: true,
    };
    pub const PENDING: TxFilter = TxFilter {
        pending: true,
        executed: false,
    };
    pub const EXECUTED: TxFilter = TxFilter {
        pending: false,
        executed: true,
    };

    #[inline]
    pub fn matches(&self, tx: &Transaction) -> bool {
        (self.pending && !tx.executed) || (self.executed && tx.executed)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// The external call released once a transaction reaches quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub id: TxId,
    pub destination: Address,
    pub value: U256,
    pub payload: Bytes,
}

impl From<&Transaction> for DispatchRequest {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            destination: tx.destination,
            value: tx.value,
            payload: tx.payload.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Append-only record of committed state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    Submission { id: TxId },
    Confirmation { owner: Address, id: TxId },
    Revocation { owner: Address, id: TxId },
    Execution { id: TxId },
    ExecutionFailure { id: TxId },
}

impl WalletEvent {
    pub fn tx_id(&self) -> TxId {
        match self {
            WalletEvent::Submission { id }
            | WalletEvent::Confirmation { id, .. }
            | WalletEvent::Revocation { id, .. }
            | WalletEvent::Execution { id }
            | WalletEvent::ExecutionFailure { id } => *id,
        }
    }
}
