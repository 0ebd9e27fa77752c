//! Replay guard: the append-only set of encashed cheque identities

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ChequeId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayGuard {
    encashed: BTreeSet<ChequeId>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail if `id` has already been honored
    pub fn check(&self, id: &ChequeId) -> Result<()> {
        if self.encashed.contains(id) {
            return Err(Error::AlreadyEncashed(id.to_hex()));
        }
        Ok(())
    }

    /// Record `id` as honored. There is no way to remove it again.
    pub fn record(&mut self, id: ChequeId) -> Result<()> {
        self.check(&id)?;
        self.encashed.insert(id);
        Ok(())
    }

    pub fn contains(&self, id: &ChequeId) -> bool {
        self.encashed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.encashed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encashed.is_empty()
    }
}
