//! Batch distribution
//!
//! Pays a list of allocations from one sender, one ledger call per row.
//! Each row is its own atomic transfer: a failed row is reported and the
//! batch moves on, earlier rows stay applied.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::Event;
use crate::lock::LockTerms;
use crate::token::Token;
use crate::types::{Address, Amount, Timestamp};

/// One payout row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub recipient: Address,
    #[serde(with = "crate::types::amount_string")]
    pub amount: Amount,
    /// Send under a lock instead of as a plain transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockTerms>,
}

impl Allocation {
    pub fn unlocked(recipient: Address, amount: Amount) -> Self {
        Self {
            recipient,
            amount,
            lock: None,
        }
    }

    pub fn locked(recipient: Address, amount: Amount, terms: LockTerms) -> Self {
        Self {
            recipient,
            amount,
            lock: Some(terms),
        }
    }
}

/// Outcome of a single row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    pub index: usize,
    pub allocation: Allocation,
    /// Error message if the row was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RowOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    pub rows: Vec<RowOutcome>,
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl DistributionReport {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    /// Sum of the amounts actually paid out
    pub fn total_paid(&self) -> Amount {
        self.rows
            .iter()
            .filter(|r| r.is_ok())
            .fold(0, |acc, r| acc.saturating_add(r.allocation.amount))
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows.iter().filter(|r| !r.is_ok())
    }
}

/// Pay every allocation from `sender`
pub fn distribute(
    token: &mut Token,
    sender: Address,
    allocations: &[Allocation],
    now: Timestamp,
) -> DistributionReport {
    let mut report = DistributionReport::default();

    for (index, allocation) in allocations.iter().enumerate() {
        let result = match allocation.lock {
            Some(terms) => {
                token.transfer_locked(sender, allocation.recipient, allocation.amount, terms, now)
            }
            None => token.transfer(sender, allocation.recipient, allocation.amount, now),
        };

        let error = match result {
            Ok(events) => {
                report.events.extend(events);
                None
            }
            Err(e) => {
                warn!("Row {} to {} rejected: {}", index, allocation.recipient, e);
                Some(e.to_string())
            }
        };
        report.rows.push(RowOutcome {
            index,
            allocation: *allocation,
            error,
        });
    }

    info!(
        "Distributed {} of {} rows from {}",
        report.succeeded(),
        report.rows.len(),
        sender
    );
    report
}
