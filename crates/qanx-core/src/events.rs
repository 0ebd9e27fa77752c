//! Events emitted by successful state transitions

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    LockApplied {
        account: Address,
        total_locked: Amount,
        hard_lock_until: Timestamp,
        soft_lock_until: Timestamp,
        allowed_hops: u64,
    },
    LockRemoved {
        account: Address,
    },
    ChequeSignerChanged {
        previous: Address,
        new: Address,
    },
}

impl Event {
    /// Event name as it appears in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::LockApplied { .. } => "LockApplied",
            Event::LockRemoved { .. } => "LockRemoved",
            Event::ChequeSignerChanged { .. } => "ChequeSignerChanged",
        }
    }
}
