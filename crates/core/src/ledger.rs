//! Append-only transaction arena. `id == index`.

use alloy_primitives::{Address, Bytes, U256};

use crate::error::{WalletError, WalletResult};
use crate::guard::Authorized;
use crate::types::{Transaction, TxFilter, TxId};

#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    txs: Vec<Transaction>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an unexecuted, unconfirmed transaction and returns its id.
    pub fn append(
        &mut self,
        by: &Authorized,
        destination: Address,
        value: U256,
        payload: Bytes,
    ) -> TxId {
        let id = self.txs.len() as TxId;
        self.txs.push(Transaction {
            id,
            destination,
            value,
            payload,
            executed: false,
            confirmation_count: 0,
        });
        tracing::debug!(id, proposer = %by.caller(), destination = %destination, "submitted");
        id
    }

    pub fn get(&self, id: TxId) -> WalletResult<&Transaction> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.txs.get(i))
            .ok_or(WalletError::NotFound(id))
    }

    /// Only the mutable bookkeeping fields are reachable through this handle.
    pub(crate) fn entry_mut(&mut self, id: TxId) -> WalletResult<EntryMut<'_>> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.txs.get_mut(i))
            .map(|tx| EntryMut { tx })
            .ok_or(WalletError::NotFound(id))
    }

    pub fn count(&self) -> u64 {
        self.txs.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.iter()
    }

    pub fn ids(&self, filter: TxFilter) -> Vec<TxId> {
        self.txs
            .iter()
            .filter(|tx| filter.matches(tx))
            .map(|tx| tx.id)
            .collect()
    }

    pub fn count_matching(&self, filter: TxFilter) -> u64 {
        self.txs.iter().filter(|tx| filter.matches(tx)).count() as u64
    }
}

/// Mutable view over a ledger entry that cannot touch
/// `destination`, `value` or `payload`.
pub(crate) struct EntryMut<'a> {
    tx: &'a mut Transaction,
}

impl EntryMut<'_> {
    pub(crate) fn get(&self) -> &Transaction {
        self.tx
    }

    pub(crate) fn set_executed(&mut self, executed: bool) {
        self.tx.executed = executed;
    }

    pub(crate) fn increment_confirmations(&mut self) -> u32 {
        self.tx.confirmation_count += 1;
        self.tx.confirmation_count
    }

    pub(crate) fn decrement_confirmations(&mut self) -> u32 {
        self.tx.confirmation_count -= 1;
        self.tx.confirmation_count
    }
}
