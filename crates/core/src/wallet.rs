//! The wallet aggregate: one owner registry, one ledger, one confirmation
//! matrix and one event log, exclusively owned and never shared.

use alloy_primitives::{Address, Bytes, U256};
use std::collections::BTreeSet;

use crate::error::{WalletError, WalletResult};
use crate::execution::{Dispatcher, ExecutionOutcome};
use crate::guard::AccessGuard;
use crate::ledger::TransactionLedger;
use crate::matrix::ConfirmationMatrix;
use crate::registry::OwnerRegistry;
use crate::types::{Transaction, TxFilter, TxId, TxStatus, WalletConfig, WalletEvent};

/// Outcome of a successful `confirm_transaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub confirmations: u32,
    pub execution: ExecutionOutcome,
}

#[derive(Debug, Clone)]
pub struct Wallet {
    pub(crate) registry: OwnerRegistry,
    pub(crate) ledger: TransactionLedger,
    pub(crate) matrix: ConfirmationMatrix,
    pub(crate) events: Vec<WalletEvent>,
    /// Ids whose dispatch is currently on the call stack.
    pub(crate) in_flight: BTreeSet<TxId>,
}

impl Wallet {
    pub fn new(owners: &[Address], threshold: u32) -> WalletResult<Self> {
        let registry = OwnerRegistry::new(owners, threshold)?;
        tracing::debug!(owners = owners.len(), threshold, "wallet created");
        Ok(Self {
            registry,
            ledger: TransactionLedger::new(),
            matrix: ConfirmationMatrix::new(),
            events: Vec::new(),
            in_flight: BTreeSet::new(),
        })
    }

    pub fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        Self::new(&config.owners, config.threshold)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn is_owner(&self, id: &Address) -> bool {
        self.registry.is_owner(id)
    }

    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    pub fn required(&self) -> u32 {
        self.registry.required()
    }

    pub fn registry(&self) -> &OwnerRegistry {
        &self.registry
    }

    pub fn transaction_count(&self) -> u64 {
        self.ledger.count()
    }

    pub fn transaction(&self, id: TxId) -> WalletResult<&Transaction> {
        self.ledger.get(id)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.ledger.iter()
    }

    pub fn transaction_ids(&self, filter: TxFilter) -> Vec<TxId> {
        self.ledger.ids(filter)
    }

    pub fn count_matching(&self, filter: TxFilter) -> u64 {
        self.ledger.count_matching(filter)
    }

    pub fn status(&self, id: TxId) -> WalletResult<TxStatus> {
        Ok(self.ledger.get(id)?.status(self.registry.required()))
    }

    pub fn is_confirmed_by(&self, id: TxId, owner: &Address) -> bool {
        self.matrix.is_confirmed_by(id, owner)
    }

    pub fn confirmation_count(&self, id: TxId) -> WalletResult<u32> {
        Ok(self.ledger.get(id)?.confirmation_count)
    }

    /// Owners that currently confirm `id`, in registry order.
    pub fn confirmations(&self, id: TxId) -> WalletResult<Vec<Address>> {
        self.ledger.get(id)?;
        Ok(self.matrix.confirmers(&self.registry, id))
    }

    pub fn events(&self) -> &[WalletEvent] {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn submit_transaction(
        &mut self,
        caller: Address,
        destination: Address,
        value: U256,
        payload: Bytes,
    ) -> WalletResult<TxId> {
        let by = AccessGuard::check(&self.registry, caller)?;
        let id = self.ledger.append(&by, destination, value, payload);
        self.events.push(WalletEvent::Submission { id });
        Ok(id)
    }

    /// Records `caller`'s approval and executes `id` if that reaches quorum.
    ///
    /// If the dispatch fails the confirmation stays recorded and
    /// `ExternalCallFailure` is returned.
    pub fn confirm_transaction(
        &mut self,
        caller: Address,
        id: TxId,
        dispatcher: &mut dyn Dispatcher,
    ) -> WalletResult<Confirmed> {
        let by = AccessGuard::check(&self.registry, caller)?;
        let confirmations = self.matrix.confirm(&mut self.ledger, &by, id)?;
        self.events.push(WalletEvent::Confirmation { owner: caller, id });

        let execution = self.try_execute(id, dispatcher)?;
        Ok(Confirmed {
            confirmations,
            execution,
        })
    }

    pub fn revoke_confirmation(&mut self, caller: Address, id: TxId) -> WalletResult<u32> {
        let by = AccessGuard::check(&self.registry, caller)?;
        let confirmations = self.matrix.revoke(&mut self.ledger, &by, id)?;
        self.events.push(WalletEvent::Revocation { owner: caller, id });
        Ok(confirmations)
    }

    /// Recomputes every confirmation count from the matrix and compares it
    /// with the ledger's incremental count.
    pub fn counts_consistent(&self) -> bool {
        self.ledger
            .iter()
            .all(|tx| self.matrix.tally(tx.id) == tx.confirmation_count)
    }
}

impl TryFrom<&WalletConfig> for Wallet {
    type Error = WalletError;

    fn try_from(config: &WalletConfig) -> Result<Self, Self::Error> {
        Wallet::from_config(config)
    }
}
