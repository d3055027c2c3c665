//! EVM dispatcher using `revm`.
//!
//! Executes each released transaction as a call from the wallet's own
//! account against an in-memory `CacheDB<EmptyDB>`, committing state only
//! when the call succeeds.

use alloy_primitives::{Address, Bytes, U256};
use cosign_core::error::{CosignError, CosignResult};
use cosign_core::{DispatchError, DispatchRequest, Dispatcher, TxId, Wallet};
use revm::context::{Context, TxEnv};
use revm::database::{CacheDB, EmptyDB};
use revm::database_interface::DatabaseCommit;
use revm::inspector::Inspector;
use revm::interpreter::interpreter::EthInterpreter;
use revm::state::{AccountInfo, Bytecode};
use serde::Serialize;
use smallvec::SmallVec;

/// In-memory chain state. Clone-able, network-free.
pub type WalletDb = CacheDB<EmptyDB>;

/// Default gas limit for one dispatch.
const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

/// Records the target of every call frame, outermost first.
#[derive(Debug, Default)]
pub struct CallTraceInspector {
    pub targets: SmallVec<[Address; 8]>,
    depth: usize,
    max_depth: usize,
}

impl CallTraceInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl<CTX> Inspector<CTX, EthInterpreter> for CallTraceInspector {
    fn call(
        &mut self,
        _context: &mut CTX,
        inputs: &mut revm::interpreter::CallInputs,
    ) -> Option<revm::interpreter::CallOutcome> {
        self.targets.push(inputs.target_address);
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        None
    }

    fn call_end(
        &mut self,
        _context: &mut CTX,
        _inputs: &revm::interpreter::CallInputs,
        _outcome: &mut revm::interpreter::CallOutcome,
    ) {
        self.depth = self.depth.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What one dispatch attempt did inside the EVM.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub id: TxId,
    pub destination: Address,
    pub value: U256,
    pub success: bool,
    pub gas_used: u64,
    pub calls: Vec<Address>,
    pub max_depth: usize,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Dispatches wallet transactions into a local EVM.
///
/// Nonce, base fee and block gas limit checks are off; the balance check
/// stays on so an underfunded wallet fails its dispatch.
pub struct EvmDispatcher {
    account: Address,
    db: WalletDb,
    gas_limit: u64,
    receipts: Vec<DispatchReceipt>,
}

impl EvmDispatcher {
    /// `account` is the wallet's own address inside the EVM.
    pub fn new(account: Address) -> Self {
        Self {
            account,
            db: CacheDB::new(EmptyDB::new()),
            gas_limit: DEFAULT_GAS_LIMIT,
            receipts: Vec::new(),
        }
    }

    /// Gas budget for each dispatched call.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn receipts(&self) -> &[DispatchReceipt] {
        &self.receipts
    }

    pub fn balance(&self, address: &Address) -> U256 {
        self.db
            .cache
            .accounts
            .get(address)
            .map(|acc| acc.info.balance)
            .unwrap_or_default()
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        let mut info = self.account_info(&address);
        info.balance = balance;
        self.db.insert_account_info(address, info);
    }

    /// Credits the wallet account. Funding is the environment's job, not the core's.
    pub fn fund(&mut self, amount: U256) {
        let balance = self.balance(&self.account).saturating_add(amount);
        self.set_balance(self.account, balance);
        tracing::debug!(account = %self.account, amount = %amount, balance = %balance, "funded");
    }

    /// Installs runtime bytecode at `address`. Malformed EIP-7702
    /// delegation code (`0xef01` prefix) is rejected.
    pub fn install_code(&mut self, address: Address, code: Bytes) -> CosignResult<()> {
        let bytecode = Bytecode::new_raw_checked(code)
            .map_err(|e| CosignError::Evm(format!("invalid bytecode for {address}: {e:?}")))?;
        let mut info = self.account_info(&address);
        info.code_hash = bytecode.hash_slow();
        info.code = Some(bytecode);
        self.db.insert_account_info(address, info);
        Ok(())
    }

    fn account_info(&self, address: &Address) -> AccountInfo {
        self.db
            .cache
            .accounts
            .get(address)
            .map(|acc| acc.info.clone())
            .unwrap_or_default()
    }

    /// Runs one call and commits its state on success.
    pub fn execute(&mut self, request: &DispatchRequest) -> DispatchReceipt {
        self.run(request).0
    }

    fn run(&mut self, request: &DispatchRequest) -> (DispatchReceipt, Result<(), DispatchError>) {
        use revm::handler::{ExecuteEvm, MainBuilder, MainContext};
        use revm::inspector::InspectEvm;

        let mut receipt = DispatchReceipt {
            id: request.id,
            destination: request.destination,
            value: request.value,
            success: false,
            gas_used: 0,
            calls: Vec::new(),
            max_depth: 0,
            error: None,
        };

        let tx_env = match TxEnv::builder()
            .caller(self.account)
            .kind(revm::primitives::TxKind::Call(request.destination))
            .data(request.payload.clone())
            .value(request.value)
            .gas_limit(self.gas_limit)
            .build()
        {
            Ok(tx_env) => tx_env,
            Err(e) => {
                let err = DispatchError::Rejected(format!("failed to build TxEnv: {e:?}"));
                receipt.error = Some(err.to_string());
                return (receipt, Err(err));
            }
        };

        // Reference overlay: writes land in a per-call layer and only reach
        // `self.db` through the explicit commit below.
        let mut ctx = Context::mainnet()
            .with_db(CacheDB::new(&self.db))
            .with_tx(TxEnv::default());

        ctx.cfg.disable_nonce_check = true;
        ctx.cfg.disable_block_gas_limit = true;
        ctx.cfg.disable_base_fee = true;
        ctx.cfg.disable_eip3607 = true;

        let mut evm = ctx.build_mainnet_with_inspector(CallTraceInspector::new());
        let result = evm.inspect_one_tx(tx_env);
        let state = evm.finalize();
        receipt.calls = evm.inspector.targets.to_vec();
        receipt.max_depth = evm.inspector.max_depth();
        drop(evm);

        let outcome = match result {
            Ok(res) => {
                receipt.gas_used = res.gas_used();
                if res.is_success() {
                    receipt.success = true;
                    self.db.commit(state);
                    Ok(())
                } else if res.is_halt() {
                    Err(DispatchError::Halted(format!("{res:?}")))
                } else {
                    Err(DispatchError::Reverted)
                }
            }
            Err(e) => Err(DispatchError::Rejected(format!("{e:?}"))),
        };
        if let Err(e) = &outcome {
            receipt.error = Some(e.to_string());
        }

        tracing::debug!(
            id = receipt.id,
            success = receipt.success,
            gas_used = receipt.gas_used,
            calls = receipt.calls.len(),
            "evm dispatch"
        );
        (receipt, outcome)
    }
}

impl Dispatcher for EvmDispatcher {
    fn dispatch(
        &mut self,
        _wallet: &mut Wallet,
        request: &DispatchRequest,
    ) -> Result<(), DispatchError> {
        let (receipt, outcome) = self.run(request);
        self.receipts.push(receipt);
        outcome
    }
}
