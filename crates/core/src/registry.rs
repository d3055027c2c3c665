//! Immutable owner set and quorum threshold.

use alloy_primitives::Address;
use smallvec::SmallVec;
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::types::WalletConfig;

/// Checks an owner list and threshold without building anything.
///
/// Accepts iff the list is non-empty, has no duplicates, and
/// `1 <= threshold <= owners.len()`. No other minimum is imposed.
pub fn validate_config(owners: &[Address], threshold: u32) -> Result<(), ConfigError> {
    if owners.is_empty() {
        return Err(ConfigError::EmptyOwners);
    }

    let mut seen = HashSet::with_capacity(owners.len());
    for owner in owners {
        if !seen.insert(owner) {
            return Err(ConfigError::DuplicateOwner(*owner));
        }
    }

    if threshold == 0 || threshold as usize > owners.len() {
        return Err(ConfigError::ThresholdOutOfRange {
            threshold,
            owners: owners.len(),
        });
    }

    Ok(())
}

/// Owner set fixed at construction.
///
/// `owners` keeps construction order for `owners()`; `index` answers
/// membership in O(1). `SmallVec<[Address; 8]>` keeps typical owner sets inline.
#[derive(Debug, Clone)]
pub struct OwnerRegistry {
    owners: SmallVec<[Address; 8]>,
    index: HashSet<Address>,
    threshold: u32,
}

impl OwnerRegistry {
    pub fn new(owners: &[Address], threshold: u32) -> Result<Self, ConfigError> {
        validate_config(owners, threshold)?;
        Ok(Self {
            owners: SmallVec::from_slice(owners),
            index: owners.iter().copied().collect(),
            threshold,
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, ConfigError> {
        Self::new(&config.owners, config.threshold)
    }

    #[inline]
    pub fn is_owner(&self, id: &Address) -> bool {
        self.index.contains(id)
    }

    /// Owners in construction order.
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Quorum threshold.
    #[inline]
    pub fn required(&self) -> u32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn config(&self) -> WalletConfig {
        WalletConfig {
            owners: self.owners.to_vec(),
            threshold: self.threshold,
        }
    }
}
