//! Data sinks for wallet state.
//!
//! Row schemas:
//! - [`TransactionRow`] — one per ledger entry, denormalized with status and confirmers
//! - [`WalletEvent`](cosign_core::WalletEvent) — written as-is, one per line
//! - [`DispatchReceipt`](crate::evm::DispatchReceipt) — one per EVM dispatch attempt

pub mod json_stream;

use cosign_core::{TxStatus, Wallet};
use serde::Serialize;

/// One row per transaction — fully denormalized.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: u64,
    pub destination: String,
    pub value: String,
    pub payload: String,
    pub executed: bool,
    pub confirmation_count: u32,
    pub required: u32,
    pub status: TxStatus,
    pub confirmed_by: Vec<String>,
}

impl TransactionRow {
    /// Flatten every ledger entry of `wallet` into rows.
    pub fn from_wallet(wallet: &Wallet) -> Vec<TransactionRow> {
        let required = wallet.required();
        wallet
            .transactions()
            .map(|tx| TransactionRow {
                id: tx.id,
                destination: format!("{}", tx.destination),
                value: tx.value.to_string(),
                payload: format!("0x{}", hex::encode(&tx.payload)),
                executed: tx.executed,
                confirmation_count: tx.confirmation_count,
                required,
                status: tx.status(required),
                confirmed_by: wallet
                    .confirmations(tx.id)
                    .unwrap_or_default()
                    .iter()
                    .map(|owner| format!("{owner}"))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use cosign_core::NoopDispatcher;

    #[test]
    fn rows_carry_status_and_confirmers() {
        let a = Address::new([0x01; 20]);
        let b = Address::new([0x02; 20]);
        let mut wallet = Wallet::new(&[a, b], 2).unwrap();
        wallet
            .submit_transaction(a, b, U256::from(12), Bytes::from_static(&[0xab]))
            .unwrap();
        wallet.confirm_transaction(b, 0, &mut NoopDispatcher).unwrap();

        let rows = TransactionRow::from_wallet(&wallet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "12");
        assert_eq!(rows[0].payload, "0xab");
        assert_eq!(rows[0].status, TxStatus::Pending);
        assert_eq!(rows[0].confirmed_by, vec![format!("{b}")]);
    }
}
