//! Wallet status report.
//!
//! Summarizes owners, threshold and the ledger grouped by status, and
//! renders it as a boxed text block.

use alloy_primitives::{Address, U256};
use cosign_core::{TxStatus, Wallet};

use crate::sink::TransactionRow;

#[derive(Debug)]
pub struct Report {
    pub owners: Vec<Address>,
    pub required: u32,
    pub total_txs: u64,
    pub pending: usize,
    pub eligible: usize,
    pub executed: usize,
    pub events: usize,
    /// Wallet account balance, when the environment can report one.
    pub balance: Option<U256>,
    pub rows: Vec<TransactionRow>,
}

impl Report {
    pub fn build(wallet: &Wallet, balance: Option<U256>) -> Self {
        let rows = TransactionRow::from_wallet(wallet);
        let count = |status: TxStatus| rows.iter().filter(|r| r.status == status).count();

        Report {
            owners: wallet.owners().to_vec(),
            required: wallet.required(),
            total_txs: wallet.transaction_count(),
            pending: count(TxStatus::Pending),
            eligible: count(TxStatus::Eligible),
            executed: count(TxStatus::Executed),
            events: wallet.events().len(),
            balance,
            rows,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                     COSIGN WALLET REPORT                     ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!(
            "║  Quorum:             {:>38} ║\n",
            format!("{} of {}", self.required, self.owners.len())
        ));
        if let Some(balance) = self.balance {
            out.push_str(&format!("║  Balance:            {:>38} ║\n", balance));
        }
        out.push_str(&format!("║  Transactions:       {:>38} ║\n", self.total_txs));
        out.push_str(&format!("║  Pending:            {:>38} ║\n", self.pending));
        out.push_str(&format!("║  Eligible:           {:>38} ║\n", self.eligible));
        out.push_str(&format!("║  Executed:           {:>38} ║\n", self.executed));
        out.push_str(&format!("║  Events:             {:>38} ║\n", self.events));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str("║  OWNERS                                                      ║\n");
        for (i, owner) in self.owners.iter().enumerate() {
            out.push_str(&format!("║  {}. {}\n", i + 1, owner));
        }
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.rows.is_empty() {
            out.push_str("║  No transactions submitted.                                  ║\n");
        } else {
            out.push_str("║  TRANSACTIONS                                                ║\n");
            for row in &self.rows {
                out.push_str("║                                                              ║\n");
                out.push_str(&format!(
                    "║  #{} [{:?}] {}/{} confirmations\n",
                    row.id, row.status, row.confirmation_count, row.required
                ));
                out.push_str(&format!(
                    "║     To: {}  |  Value: {}  |  Data: {}\n",
                    row.destination, row.value, row.payload
                ));
                if !row.confirmed_by.is_empty() {
                    out.push_str(&format!(
                        "║     Confirmed by: {}\n",
                        row.confirmed_by.join(", ")
                    ));
                }
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
