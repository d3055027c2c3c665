//! Quorum check and one-shot dispatch.
//!
//! Ordering inside a dispatch attempt:
//!   1. mark the transaction `executed` and put its id in flight
//!   2. hand control to the [`Dispatcher`], which may re-enter the wallet
//!   3. on failure clear `executed` on this id only and report
//!      `ExternalCallFailure`
//!
//! Any re-entrant `confirm`/`revoke`/`execute` on the same id during step 2
//! sees `executed == true` and is rejected with `AlreadyExecuted`. Re-entrant
//! calls on other ids are complete operations of their own and are kept when
//! the outer dispatch fails; a nested execution that succeeded stays executed.

use crate::error::{DispatchError, WalletError, WalletResult};
use crate::guard::AccessGuard;
use crate::types::{DispatchRequest, TxId, WalletEvent};
use crate::wallet::Wallet;
use alloy_primitives::Address;

/// The execution environment's side of a dispatch.
///
/// `wallet` is the dispatching wallet itself, handed over so that code
/// reachable through the destination can call back into it.
pub trait Dispatcher {
    fn dispatch(
        &mut self,
        wallet: &mut Wallet,
        request: &DispatchRequest,
    ) -> Result<(), DispatchError>;
}

impl<F> Dispatcher for F
where
    F: FnMut(&mut Wallet, &DispatchRequest) -> Result<(), DispatchError>,
{
    fn dispatch(
        &mut self,
        wallet: &mut Wallet,
        request: &DispatchRequest,
    ) -> Result<(), DispatchError> {
        self(wallet, request)
    }
}

/// Accepts every dispatch without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl Dispatcher for NoopDispatcher {
    fn dispatch(&mut self, _: &mut Wallet, _: &DispatchRequest) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Fails every dispatch.
#[derive(Debug, Clone, Default)]
pub struct RejectingDispatcher {
    pub reason: String,
}

impl Dispatcher for RejectingDispatcher {
    fn dispatch(&mut self, _: &mut Wallet, _: &DispatchRequest) -> Result<(), DispatchError> {
        Err(DispatchError::Rejected(self.reason.clone()))
    }
}

/// Result of a quorum check that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Dispatch ran and succeeded; the transaction is now terminal.
    Executed,
    /// Quorum not reached yet. Not an error.
    BelowThreshold { confirmations: u32, required: u32 },
    /// Already executed or in flight; nothing was done.
    Skipped,
}

impl ExecutionOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed)
    }
}

impl Wallet {
    /// Executes `id` if it has reached quorum. Runs after every successful confirm.
    pub(crate) fn try_execute(
        &mut self,
        id: TxId,
        dispatcher: &mut dyn Dispatcher,
    ) -> WalletResult<ExecutionOutcome> {
        let tx = self.ledger.get(id)?;
        if tx.executed || self.in_flight.contains(&id) {
            return Ok(ExecutionOutcome::Skipped);
        }

        let required = self.registry.required();
        if tx.confirmation_count < required {
            return Ok(ExecutionOutcome::BelowThreshold {
                confirmations: tx.confirmation_count,
                required,
            });
        }

        self.dispatch_eligible(id, dispatcher)?;
        Ok(ExecutionOutcome::Executed)
    }

    /// Explicit execution entry point, used to retry after a failed dispatch.
    ///
    /// Unlike the automatic path this reports every precondition as an error.
    pub fn execute_transaction(
        &mut self,
        caller: Address,
        id: TxId,
        dispatcher: &mut dyn Dispatcher,
    ) -> WalletResult<()> {
        AccessGuard::check(&self.registry, caller)?;

        let tx = self.ledger.get(id)?;
        if tx.executed || self.in_flight.contains(&id) {
            return Err(WalletError::AlreadyExecuted(id));
        }

        let required = self.registry.required();
        if tx.confirmation_count < required {
            return Err(WalletError::InsufficientConfirmations {
                id,
                confirmations: tx.confirmation_count,
                required,
            });
        }

        tracing::debug!(id, caller = %caller, "explicit execution");
        self.dispatch_eligible(id, dispatcher)
    }

    /// Effects first, then the external call, then commit or roll back.
    fn dispatch_eligible(&mut self, id: TxId, dispatcher: &mut dyn Dispatcher) -> WalletResult<()> {
        let request = {
            let mut entry = self.ledger.entry_mut(id)?;
            entry.set_executed(true);
            DispatchRequest::from(entry.get())
        };
        self.in_flight.insert(id);

        tracing::debug!(
            id,
            destination = %request.destination,
            value = %request.value,
            payload_len = request.payload.len(),
            "dispatching"
        );

        let result = dispatcher.dispatch(self, &request);
        self.in_flight.remove(&id);

        match result {
            Ok(()) => {
                self.events.push(WalletEvent::Execution { id });
                tracing::info!(id, "transaction executed");
                Ok(())
            }
            Err(reason) => {
                self.ledger.entry_mut(id)?.set_executed(false);
                self.events.push(WalletEvent::ExecutionFailure { id });
                tracing::warn!(id, error = %reason, "dispatch failed, rolled back");
                Err(WalletError::ExternalCallFailure { id, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, U256};

    fn owner(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn wallet() -> Wallet {
        let mut w = Wallet::new(&[owner(1), owner(2), owner(3)], 2).unwrap();
        w.submit_transaction(owner(1), owner(9), U256::from(1), Bytes::new())
            .unwrap();
        w
    }

    #[test]
    fn below_threshold_is_not_an_error() {
        let mut w = wallet();
        let outcome = w.try_execute(0, &mut NoopDispatcher).unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::BelowThreshold {
                confirmations: 0,
                required: 2
            }
        );
        assert!(!w.transaction(0).unwrap().executed);
    }

    #[test]
    fn executed_transaction_is_skipped() {
        let mut w = wallet();
        w.confirm_transaction(owner(1), 0, &mut NoopDispatcher).unwrap();
        w.confirm_transaction(owner(2), 0, &mut NoopDispatcher).unwrap();
        assert_eq!(w.try_execute(0, &mut NoopDispatcher), Ok(ExecutionOutcome::Skipped));
    }

    #[test]
    fn explicit_execute_requires_quorum() {
        let mut w = wallet();
        w.confirm_transaction(owner(1), 0, &mut NoopDispatcher).unwrap();
        assert_eq!(
            w.execute_transaction(owner(3), 0, &mut NoopDispatcher),
            Err(WalletError::InsufficientConfirmations {
                id: 0,
                confirmations: 1,
                required: 2
            })
        );
    }

    #[test]
    fn explicit_execute_checks_owner_first() {
        let mut w = wallet();
        assert_eq!(
            w.execute_transaction(owner(7), 0, &mut NoopDispatcher),
            Err(WalletError::Unauthorized(owner(7)))
        );
        assert_eq!(
            w.execute_transaction(owner(1), 4, &mut NoopDispatcher),
            Err(WalletError::NotFound(4))
        );
    }

    #[test]
    fn dispatcher_sees_executed_flag_set() {
        let mut w = wallet();
        w.confirm_transaction(owner(1), 0, &mut NoopDispatcher).unwrap();

        let mut seen = None;
        let mut probe = |wallet: &mut Wallet, req: &DispatchRequest| -> Result<(), DispatchError> {
            seen = Some(wallet.transaction(req.id).unwrap().executed);
            Ok(())
        };
        w.confirm_transaction(owner(2), 0, &mut probe).unwrap();
        assert_eq!(seen, Some(true));
    }

    #[test]
    fn rejecting_dispatcher_rolls_back() {
        let mut w = wallet();
        w.confirm_transaction(owner(1), 0, &mut NoopDispatcher).unwrap();
        let mut reject = RejectingDispatcher {
            reason: "no funds".into(),
        };

        let err = w.confirm_transaction(owner(2), 0, &mut reject).unwrap_err();
        assert_eq!(
            err,
            WalletError::ExternalCallFailure {
                id: 0,
                reason: DispatchError::Rejected("no funds".into())
            }
        );
        let tx = w.transaction(0).unwrap();
        assert!(!tx.executed);
        assert_eq!(tx.confirmation_count, 2);
        assert_eq!(w.events().last(), Some(&WalletEvent::ExecutionFailure { id: 0 }));
    }
}
