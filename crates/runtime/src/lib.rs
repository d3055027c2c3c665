//! Execution environment around the wallet core: EVM dispatch, the shared
//! single-writer service, reports and data sinks.

pub mod evm;
pub mod report;
pub mod service;
pub mod sink;

pub use evm::{CallTraceInspector, DispatchReceipt, EvmDispatcher, WalletDb};
pub use report::Report;
pub use service::WalletService;
