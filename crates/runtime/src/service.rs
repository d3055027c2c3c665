//! Shared wallet handle for concurrent clients.
//!
//! One `tokio::sync::RwLock` per wallet. Every mutating call holds the write
//! lock for its whole body, dispatch and rollback included, so readers never
//! observe a half-applied operation.

use alloy_primitives::{Address, Bytes, U256};
use cosign_core::{
    Confirmed, Dispatcher, Transaction, TxFilter, TxId, TxStatus, Wallet, WalletEvent,
    WalletResult,
};
use std::sync::Arc;
use tokio::sync::RwLock;

struct Inner<D> {
    wallet: Wallet,
    dispatcher: D,
}

/// Cheap to clone; all clones share one wallet.
pub struct WalletService<D> {
    inner: Arc<RwLock<Inner<D>>>,
}

impl<D> Clone for WalletService<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Dispatcher> WalletService<D> {
    pub fn new(wallet: Wallet, dispatcher: D) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { wallet, dispatcher })),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations (write lock)
    // -----------------------------------------------------------------------

    pub async fn submit_transaction(
        &self,
        caller: Address,
        destination: Address,
        value: U256,
        payload: Bytes,
    ) -> WalletResult<TxId> {
        let mut guard = self.inner.write().await;
        guard
            .wallet
            .submit_transaction(caller, destination, value, payload)
    }

    pub async fn confirm_transaction(&self, caller: Address, id: TxId) -> WalletResult<Confirmed> {
        let mut guard = self.inner.write().await;
        let Inner { wallet, dispatcher } = &mut *guard;
        wallet.confirm_transaction(caller, id, dispatcher)
    }

    pub async fn revoke_confirmation(&self, caller: Address, id: TxId) -> WalletResult<u32> {
        let mut guard = self.inner.write().await;
        guard.wallet.revoke_confirmation(caller, id)
    }

    pub async fn execute_transaction(&self, caller: Address, id: TxId) -> WalletResult<()> {
        let mut guard = self.inner.write().await;
        let Inner { wallet, dispatcher } = &mut *guard;
        wallet.execute_transaction(caller, id, dispatcher)
    }

    /// Mutable access to the execution environment, e.g. to fund the wallet.
    pub async fn with_dispatcher<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard.dispatcher)
    }

    // -----------------------------------------------------------------------
    // Reads (shared lock)
    // -----------------------------------------------------------------------

    pub async fn is_owner(&self, id: Address) -> bool {
        self.inner.read().await.wallet.is_owner(&id)
    }

    pub async fn owners(&self) -> Vec<Address> {
        self.inner.read().await.wallet.owners().to_vec()
    }

    pub async fn required(&self) -> u32 {
        self.inner.read().await.wallet.required()
    }

    pub async fn transaction_count(&self) -> u64 {
        self.inner.read().await.wallet.transaction_count()
    }

    pub async fn transaction(&self, id: TxId) -> WalletResult<Transaction> {
        self.inner.read().await.wallet.transaction(id).cloned()
    }

    pub async fn status(&self, id: TxId) -> WalletResult<TxStatus> {
        self.inner.read().await.wallet.status(id)
    }

    pub async fn transaction_ids(&self, filter: TxFilter) -> Vec<TxId> {
        self.inner.read().await.wallet.transaction_ids(filter)
    }

    pub async fn is_confirmed_by(&self, id: TxId, owner: Address) -> bool {
        self.inner.read().await.wallet.is_confirmed_by(id, &owner)
    }

    pub async fn confirmations(&self, id: TxId) -> WalletResult<Vec<Address>> {
        self.inner.read().await.wallet.confirmations(id)
    }

    pub async fn events(&self) -> Vec<WalletEvent> {
        self.inner.read().await.wallet.events().to_vec()
    }

    /// Runs `f` against a consistent view of wallet and environment.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Wallet, &D) -> R) -> R {
        let guard = self.inner.read().await;
        f(&guard.wallet, &guard.dispatcher)
    }

    /// Point-in-time copy of the wallet.
    pub async fn snapshot(&self) -> Wallet {
        self.inner.read().await.wallet.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_core::{DispatchError, DispatchRequest, WalletError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OWNERS: [Address; 3] = [
        Address::new([0x01; 20]),
        Address::new([0x02; 20]),
        Address::new([0x03; 20]),
    ];
    const PAYEE: Address = Address::new([0x99; 20]);

    /// Counts dispatches through a shared counter.
    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl Dispatcher for Counting {
        fn dispatch(&mut self, _: &mut Wallet, _: &DispatchRequest) -> Result<(), DispatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service() -> (WalletService<Counting>, Arc<AtomicUsize>) {
        let counter = Counting::default();
        let hits = Arc::clone(&counter.0);
        let wallet = Wallet::new(&OWNERS, 2).unwrap();
        (WalletService::new(wallet, counter), hits)
    }

    #[tokio::test]
    async fn reads_reflect_writes() {
        let (svc, _) = service();
        assert_eq!(svc.owners().await, OWNERS.to_vec());
        assert_eq!(svc.required().await, 2);
        assert!(svc.is_owner(OWNERS[1]).await);
        assert!(!svc.is_owner(PAYEE).await);

        let id = svc
            .submit_transaction(OWNERS[0], PAYEE, U256::from(1), Bytes::new())
            .await
            .unwrap();
        assert_eq!(svc.transaction_count().await, 1);
        assert_eq!(svc.status(id).await, Ok(TxStatus::Pending));
        assert_eq!(svc.transaction(7).await, Err(WalletError::NotFound(7)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_confirms_dispatch_once() {
        let (svc, hits) = service();
        let id = svc
            .submit_transaction(OWNERS[0], PAYEE, U256::from(1), Bytes::new())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for owner in OWNERS {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.confirm_transaction(owner, id).await
            }));
        }

        let mut executed = 0;
        let mut rejected = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(c) if c.execution.executed() => executed += 1,
                Ok(_) => {}
                Err(WalletError::AlreadyExecuted(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(executed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let tx = svc.transaction(id).await.unwrap();
        assert!(tx.executed);
        assert_eq!(tx.confirmation_count, 2);
        assert!(svc.inspect(|w, _| w.counts_consistent()).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_get_distinct_ids() {
        let (svc, _) = service();
        let mut handles = Vec::new();
        for i in 0..32u64 {
            let svc = svc.clone();
            let owner = OWNERS[(i % 3) as usize];
            handles.push(tokio::spawn(async move {
                svc.submit_transaction(owner, PAYEE, U256::from(i), Bytes::new())
                    .await
            }));
        }

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..32).collect::<Vec<_>>());
        assert_eq!(svc.transaction_count().await, 32);
    }

    #[tokio::test]
    async fn explicit_execute_and_revoke() {
        let (svc, hits) = service();
        svc.submit_transaction(OWNERS[0], PAYEE, U256::ZERO, Bytes::new())
            .await
            .unwrap();
        svc.confirm_transaction(OWNERS[0], 0).await.unwrap();
        assert_eq!(svc.revoke_confirmation(OWNERS[0], 0).await, Ok(0));
        assert!(matches!(
            svc.execute_transaction(OWNERS[1], 0).await,
            Err(WalletError::InsufficientConfirmations { .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(svc.events().await.len(), 3);
    }
}
