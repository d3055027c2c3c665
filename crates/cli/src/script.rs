//! Wallet file and operation script formats, and the replay loop.

use alloy_primitives::{Address, Bytes, U256};
use cosign_core::error::{CosignError, CosignResult};
use cosign_core::{TxId, Wallet, WalletConfig, WalletResult};
use cosign_runtime::{EvmDispatcher, WalletService};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Wallet configuration plus the EVM environment it runs in.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletFile {
    #[serde(flatten)]
    pub config: WalletConfig,
    /// The wallet's own address inside the EVM.
    #[serde(default = "default_account")]
    pub account: Address,
    #[serde(default)]
    pub balance: U256,
    /// Runtime bytecode to install before replay, keyed by address.
    #[serde(default)]
    pub contracts: BTreeMap<Address, Bytes>,
    /// Per-dispatch gas budget; the EVM default when absent.
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

fn default_account() -> Address {
    Address::repeat_byte(0xc0)
}

/// One scripted call against the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Submit {
        caller: Address,
        destination: Address,
        #[serde(default)]
        value: U256,
        #[serde(default)]
        payload: Bytes,
    },
    Confirm {
        caller: Address,
        id: TxId,
    },
    Revoke {
        caller: Address,
        id: TxId,
    },
    Execute {
        caller: Address,
        id: TxId,
    },
    Fund {
        amount: U256,
    },
}

/// Counts of what happened during a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub steps: usize,
    pub failed: usize,
}

pub fn load_wallet_file(path: &Path) -> CosignResult<WalletFile> {
    let raw = std::fs::read_to_string(path)?;
    parse_wallet_file(&raw)
}

pub fn parse_wallet_file(raw: &str) -> CosignResult<WalletFile> {
    serde_json::from_str(raw)
        .map_err(|e| CosignError::InvalidInput(format!("wallet file: {e}")))
}

pub fn load_script(path: &Path) -> CosignResult<Vec<Step>> {
    let raw = std::fs::read_to_string(path)?;
    parse_script(&raw)
}

pub fn parse_script(raw: &str) -> CosignResult<Vec<Step>> {
    serde_json::from_str(raw).map_err(|e| CosignError::InvalidInput(format!("script: {e}")))
}

/// Builds the wallet and its EVM from a wallet file.
pub fn build_service(file: &WalletFile) -> CosignResult<WalletService<EvmDispatcher>> {
    let wallet = Wallet::from_config(&file.config)?;

    let mut evm = EvmDispatcher::new(file.account);
    if let Some(gas_limit) = file.gas_limit {
        evm = evm.with_gas_limit(gas_limit);
    }
    evm.fund(file.balance);
    for (address, code) in &file.contracts {
        evm.install_code(*address, code.clone())?;
    }

    tracing::info!(
        owners = file.config.owners.len(),
        threshold = file.config.threshold,
        account = %file.account,
        balance = %file.balance,
        contracts = file.contracts.len(),
        gas_limit = evm.gas_limit(),
        "wallet ready"
    );
    Ok(WalletService::new(wallet, evm))
}

/// Applies every step in order. Failed steps are logged and skipped.
pub async fn replay(svc: &WalletService<EvmDispatcher>, steps: &[Step]) -> ReplayStats {
    let mut stats = ReplayStats::default();

    for (n, step) in steps.iter().enumerate() {
        stats.steps += 1;
        let result: WalletResult<String> = match step {
            Step::Submit {
                caller,
                destination,
                value,
                payload,
            } => svc
                .submit_transaction(*caller, *destination, *value, payload.clone())
                .await
                .map(|id| format!("submitted id={id}")),
            Step::Confirm { caller, id } => svc
                .confirm_transaction(*caller, *id)
                .await
                .map(|c| format!("confirmations={} execution={:?}", c.confirmations, c.execution)),
            Step::Revoke { caller, id } => svc
                .revoke_confirmation(*caller, *id)
                .await
                .map(|count| format!("confirmations={count}")),
            Step::Execute { caller, id } => svc
                .execute_transaction(*caller, *id)
                .await
                .map(|()| "executed".to_string()),
            Step::Fund { amount } => {
                let amount = *amount;
                let balance = svc
                    .with_dispatcher(|evm| {
                        evm.fund(amount);
                        evm.balance(&evm.account())
                    })
                    .await;
                Ok(format!("balance={balance}"))
            }
        };

        match result {
            Ok(summary) => tracing::info!(step = n, %summary, "ok"),
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(step = n, error = %e, "step failed");
            }
        }
    }

    stats
}
