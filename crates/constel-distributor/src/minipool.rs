//! Minipool records.
//!
//! Each record copies the fee split in force when the minipool was created.
//! Later fee changes never reach existing records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use constel_types::{Amount, Identity};

use crate::splits::FeeSplit;
use crate::{DistributorError, Result};

/// A running minipool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinipoolRecord {
    pub minipool: Identity,
    pub sub_operator: Identity,
    /// Pool funds deployed into the minipool.
    pub bond: Amount,
    /// Fee split snapshot.
    pub fees: FeeSplit,
    pub created_at: u64,
}

/// Minipool records keyed by minipool identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinipoolRegistry {
    records: BTreeMap<Identity, MinipoolRecord>,
}

impl MinipoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, minipool: &Identity) -> Option<&MinipoolRecord> {
        self.records.get(minipool)
    }

    pub fn contains(&self, minipool: &Identity) -> bool {
        self.records.contains_key(minipool)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MinipoolRecord> {
        self.records.values()
    }

    /// # Errors
    ///
    /// - [`DistributorError::DuplicateMinipool`] if the id is taken
    pub fn insert(&mut self, record: MinipoolRecord) -> Result<()> {
        if self.contains(&record.minipool) {
            return Err(DistributorError::DuplicateMinipool(record.minipool));
        }
        self.records.insert(record.minipool, record);
        Ok(())
    }

    /// Remove a record. Each record can be removed exactly once.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::UnknownMinipool`] if there is no such record
    pub fn remove(&mut self, minipool: &Identity) -> Result<MinipoolRecord> {
        self.records
            .remove(minipool)
            .ok_or(DistributorError::UnknownMinipool(*minipool))
    }
}
