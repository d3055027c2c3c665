//! Owner check in front of every mutating entry point.
//!
//! [`AccessGuard::check`] is the only way to obtain an [`Authorized`] token,
//! and the ledger and confirmation matrix take one for every mutation, so a
//! write that skipped the check does not compile.

use alloy_primitives::Address;

use crate::error::{WalletError, WalletResult};
use crate::registry::OwnerRegistry;

/// Proof that `caller` passed the owner check against a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    caller: Address,
}

impl Authorized {
    #[inline]
    pub fn caller(&self) -> Address {
        self.caller
    }
}

/// Stateless owner policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    /// Fails with [`WalletError::Unauthorized`] unless `caller` is an owner.
    pub fn check(registry: &OwnerRegistry, caller: Address) -> WalletResult<Authorized> {
        if registry.is_owner(&caller) {
            Ok(Authorized { caller })
        } else {
            tracing::debug!(caller = %caller, "rejected non-owner");
            Err(WalletError::Unauthorized(caller))
        }
    }
}
