//! Multi-owner authorization core: owners, ledger, confirmations, execution.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod execution;
pub mod guard;
pub mod ledger;
pub mod matrix;
pub mod registry;
pub mod types;
pub mod wallet;

pub use error::{ConfigError, CosignError, CosignResult, DispatchError, WalletError, WalletResult};
pub use execution::{Dispatcher, ExecutionOutcome, NoopDispatcher, RejectingDispatcher};
pub use guard::{AccessGuard, Authorized};
pub use registry::{validate_config, OwnerRegistry};
pub use types::{
    DispatchRequest, Transaction, TxFilter, TxId, TxStatus, WalletConfig, WalletEvent,
};
pub use wallet::{Confirmed, Wallet};
