//! Sparse `(transaction, owner) -> approved` relation.
//!
//! Absent pairs read as `false`. Each mutation updates the matching
//! transaction's `confirmation_count` in the same step, so the count always
//! equals the number of `true` entries for that id. All checks run before
//! any write: a failed call changes nothing.

use alloy_primitives::Address;
use std::collections::HashSet;

use crate::error::{WalletError, WalletResult};
use crate::guard::Authorized;
use crate::ledger::TransactionLedger;
use crate::registry::OwnerRegistry;
use crate::types::TxId;

#[derive(Debug, Clone, Default)]
pub struct ConfirmationMatrix {
    approved: HashSet<(TxId, Address)>,
}

impl ConfirmationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `by`'s approval of `id`. Returns the new confirmation count.
    pub fn confirm(
        &mut self,
        ledger: &mut TransactionLedger,
        by: &Authorized,
        id: TxId,
    ) -> WalletResult<u32> {
        let owner = by.caller();
        let mut entry = ledger.entry_mut(id)?;
        if entry.get().executed {
            return Err(WalletError::AlreadyExecuted(id));
        }
        if self.approved.contains(&(id, owner)) {
            return Err(WalletError::DuplicateConfirmation { id, owner });
        }

        self.approved.insert((id, owner));
        let confirmations = entry.increment_confirmations();
        tracing::debug!(id, owner = %owner, confirmations, "confirmed");
        Ok(confirmations)
    }

    /// Withdraws `by`'s approval of `id`. Returns the new confirmation count.
    pub fn revoke(
        &mut self,
        ledger: &mut TransactionLedger,
        by: &Authorized,
        id: TxId,
    ) -> WalletResult<u32> {
        let owner = by.caller();
        let mut entry = ledger.entry_mut(id)?;
        if entry.get().executed {
            return Err(WalletError::AlreadyExecuted(id));
        }
        if !self.approved.remove(&(id, owner)) {
            return Err(WalletError::NotConfirmed { id, owner });
        }

        let confirmations = entry.decrement_confirmations();
        tracing::debug!(id, owner = %owner, confirmations, "revoked");
        Ok(confirmations)
    }

    #[inline]
    pub fn is_confirmed_by(&self, id: TxId, owner: &Address) -> bool {
        self.approved.contains(&(id, *owner))
    }

    /// Confirming owners of `id`, in registry order.
    pub fn confirmers(&self, registry: &OwnerRegistry, id: TxId) -> Vec<Address> {
        registry
            .owners()
            .iter()
            .filter(|owner| self.is_confirmed_by(id, owner))
            .copied()
            .collect()
    }

    /// Recounts `true` entries for `id`. Used to check the incremental count.
    pub fn tally(&self, id: TxId) -> u32 {
        self.approved.iter().filter(|(tx, _)| *tx == id).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::AccessGuard;
    use alloy_primitives::{Bytes, U256};

    struct Fixture {
        registry: OwnerRegistry,
        ledger: TransactionLedger,
        matrix: ConfirmationMatrix,
    }

    fn owner(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn fixture() -> Fixture {
        let registry = OwnerRegistry::new(&[owner(1), owner(2), owner(3)], 2).unwrap();
        let mut ledger = TransactionLedger::new();
        let by = AccessGuard::check(&registry, owner(1)).unwrap();
        ledger.append(&by, owner(9), U256::from(1), Bytes::new());
        Fixture {
            registry,
            ledger,
            matrix: ConfirmationMatrix::new(),
        }
    }

    fn auth(f: &Fixture, n: u8) -> Authorized {
        AccessGuard::check(&f.registry, owner(n)).unwrap()
    }

    #[test]
    fn confirm_increments_count() {
        let mut f = fixture();
        let a = auth(&f, 1);
        let b = auth(&f, 2);

        assert_eq!(f.matrix.confirm(&mut f.ledger, &a, 0), Ok(1));
        assert_eq!(f.matrix.confirm(&mut f.ledger, &b, 0), Ok(2));
        assert_eq!(f.ledger.get(0).unwrap().confirmation_count, 2);
        assert_eq!(f.matrix.tally(0), 2);
        assert!(f.matrix.is_confirmed_by(0, &owner(1)));
        assert!(!f.matrix.is_confirmed_by(0, &owner(3)));
    }

    #[test]
    fn duplicate_confirm_changes_nothing() {
        let mut f = fixture();
        let a = auth(&f, 1);
        f.matrix.confirm(&mut f.ledger, &a, 0).unwrap();

        assert_eq!(
            f.matrix.confirm(&mut f.ledger, &a, 0),
            Err(WalletError::DuplicateConfirmation { id: 0, owner: owner(1) })
        );
        assert_eq!(f.ledger.get(0).unwrap().confirmation_count, 1);
        assert_eq!(f.matrix.tally(0), 1);
    }

    #[test]
    fn confirm_then_revoke_restores_count() {
        let mut f = fixture();
        let a = auth(&f, 1);
        let b = auth(&f, 2);
        f.matrix.confirm(&mut f.ledger, &b, 0).unwrap();

        f.matrix.confirm(&mut f.ledger, &a, 0).unwrap();
        assert_eq!(f.matrix.revoke(&mut f.ledger, &a, 0), Ok(1));
        assert_eq!(f.ledger.get(0).unwrap().confirmation_count, 1);
        assert!(!f.matrix.is_confirmed_by(0, &owner(1)));

        // The entry went back to false, so a fresh confirm is accepted.
        assert_eq!(f.matrix.confirm(&mut f.ledger, &a, 0), Ok(2));
    }

    #[test]
    fn revoke_without_confirm_fails() {
        let mut f = fixture();
        let c = auth(&f, 3);
        assert_eq!(
            f.matrix.revoke(&mut f.ledger, &c, 0),
            Err(WalletError::NotConfirmed { id: 0, owner: owner(3) })
        );
        assert_eq!(f.ledger.get(0).unwrap().confirmation_count, 0);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut f = fixture();
        let a = auth(&f, 1);
        assert_eq!(f.matrix.confirm(&mut f.ledger, &a, 5), Err(WalletError::NotFound(5)));
        assert_eq!(f.matrix.revoke(&mut f.ledger, &a, 5), Err(WalletError::NotFound(5)));
        assert_eq!(f.matrix.tally(5), 0);
    }

    #[test]
    fn executed_transaction_is_frozen() {
        let mut f = fixture();
        let a = auth(&f, 1);
        let b = auth(&f, 2);
        f.matrix.confirm(&mut f.ledger, &a, 0).unwrap();
        f.ledger.entry_mut(0).unwrap().set_executed(true);

        assert_eq!(f.matrix.confirm(&mut f.ledger, &b, 0), Err(WalletError::AlreadyExecuted(0)));
        assert_eq!(f.matrix.revoke(&mut f.ledger, &a, 0), Err(WalletError::AlreadyExecuted(0)));
        assert!(f.matrix.is_confirmed_by(0, &owner(1)));
        assert_eq!(f.ledger.get(0).unwrap().confirmation_count, 1);
    }

    #[test]
    fn confirmers_follow_registry_order() {
        let mut f = fixture();
        let a = auth(&f, 1);
        let c = auth(&f, 3);
        f.matrix.confirm(&mut f.ledger, &c, 0).unwrap();
        f.matrix.confirm(&mut f.ledger, &a, 0).unwrap();
        assert_eq!(f.matrix.confirmers(&f.registry, 0), vec![owner(1), owner(3)]);
    }
}
