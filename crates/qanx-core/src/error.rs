//! Error types for the QANX ledger

use thiserror::Error;

use crate::types::{Address, Amount, Timestamp};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Validation
    /// Recipient is the zero address or the cheque pool
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Address),

    /// Sender or allowance owner is the zero address
    #[error("Invalid sender: {0}")]
    InvalidSender(Address),

    /// Spender is the zero address
    #[error("Invalid spender: {0}")]
    InvalidSpender(Address),

    /// Proposed cheque signer is the zero address
    #[error("Invalid cheque signer: {0}")]
    InvalidSigner(Address),

    /// Amount exceeds the spendable balance
    #[error("Insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: Amount, requested: Amount },

    /// Amount exceeds the spender's allowance
    #[error("Insufficient allowance: {available} available, {requested} requested")]
    InsufficientAllowance { available: Amount, requested: Amount },

    /// Hard lock does not lie in the future
    #[error("Hard lock {hard_lock_until} is not after {now}")]
    InvalidHardLock {
        hard_lock_until: Timestamp,
        now: Timestamp,
    },

    /// Soft lock ends before the hard lock
    #[error("Soft lock {soft_lock_until} is before hard lock {hard_lock_until}")]
    InvalidLockOrder {
        hard_lock_until: Timestamp,
        soft_lock_until: Timestamp,
    },

    // Policy conflicts
    /// Recipient holds an active lock under other terms
    #[error("Recipient {0} already has an active lock with different terms")]
    ConflictingLockPolicy(Address),

    /// Forward breaks the hop or date rules of the inbound lock
    #[error("Forward terms are looser than the inbound lock: {0}")]
    InvalidHopTerms(String),

    /// Inbound lock cannot be forwarded again
    #[error("No hops remaining on the lock of {0}")]
    NoHopsRemaining(Address),

    /// Nothing has vested since the last unlock
    #[error("No unlockable tokens for {0}")]
    NoUnlockableTokens(Address),

    // Authorization
    /// Cheque signature is malformed, high-S or from another signer
    #[error("Invalid signature")]
    InvalidSignature,

    /// Caller is not the active cheque signer
    #[error("Unauthorized: {0} is not the active cheque signer")]
    Unauthorized(Address),

    // Replay
    /// Cheque identity was already recorded
    #[error("Cheque already encashed: {0}")]
    AlreadyEncashed(String),

    // Representation
    /// Amount does not fit or overflows
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// Hop count is negative or above the maximum
    #[error("Hop count out of range: {0}")]
    HopsOutOfRange(i128),

    // Plumbing
    /// Address string or ABI word is malformed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Signing key is malformed
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Invalid token configuration or snapshot metadata
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
