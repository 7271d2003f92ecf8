//! In-memory mirror of which oracle holds which indexes.
//!
//! Entries are only ever added by the bootstrapper, one identity at a time,
//! after the ledger acknowledged its registration. Once bootstrap finishes the
//! registry is frozen behind an `Arc` and read concurrently by dispatch, so it
//! carries no lock of its own.

use std::collections::{BTreeSet, HashMap};

use crate::error::RegistryError;
use crate::models::{IndexAssignment, OracleIdentity};

#[derive(Debug, Default, Clone)]
pub struct AccountRegistry {
    entries: HashMap<OracleIdentity, IndexAssignment>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly registered oracle. An identity already present is
    /// rejected and its existing assignment is left untouched.
    pub fn register(
        &mut self,
        oracle: OracleIdentity,
        assignment: IndexAssignment,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&oracle) {
            return Err(RegistryError::DuplicateRegistration(oracle));
        }
        self.entries.insert(oracle, assignment);
        Ok(())
    }

    /// Every oracle whose assignment contains `index`. Full scan; the pool is small.
    pub fn lookup_by_index(&self, index: u8) -> BTreeSet<OracleIdentity> {
        self.entries
            .iter()
            .filter(|(_, assignment)| assignment.contains(index))
            .map(|(oracle, _)| oracle.clone())
            .collect()
    }

    pub fn get(&self, oracle: &OracleIdentity) -> Option<&IndexAssignment> {
        self.entries.get(oracle)
    }

    pub fn contains(&self, oracle: &OracleIdentity) -> bool {
        self.entries.contains_key(oracle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OracleIdentity, &IndexAssignment)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
