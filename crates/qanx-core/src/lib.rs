//! QANX Core - Token ledger with vesting locks, hop-limited forwarding and
//! signer-authorized cheques
//!
//! This crate provides the accounting and cryptographic core of the QANX
//! token: balances and allowances, per-account linear vesting locks that can
//! be re-forwarded a bounded number of times under same-or-stricter terms,
//! and one-time cheques signed off-chain by a delegable signer.

pub mod cheque;
pub mod config;
pub mod crypto;
pub mod distribution;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lock;
pub mod replay;
pub mod signer;
pub mod token;
pub mod types;

pub use cheque::{Cheque, ChequeDomain, SignedCheque};
pub use config::TokenConfig;
pub use crypto::CompactSignature;
pub use distribution::{Allocation, DistributionReport};
pub use error::{Error, Result};
pub use events::Event;
pub use ledger::{Account, Ledger};
pub use lock::{Lock, LockTerms};
pub use replay::ReplayGuard;
pub use signer::SignerRegistry;
pub use token::Token;
pub use types::{Address, Amount, ChequeId, Timestamp};

/// Default token name
pub const TOKEN_NAME: &str = "QANX Token";

/// Default token symbol
pub const TOKEN_SYMBOL: &str = "QANX";

/// Base-unit scale: one token is 10^DECIMALS base units
pub const DECIMALS: u8 = 18;

/// Default total supply in base units (3 333 333 000 tokens)
pub const TOTAL_SUPPLY: Amount = 3_333_333_000 * 10u128.pow(DECIMALS as u32);

/// Upper bound for the hop count carried by a lock
pub const MAX_HOPS: u64 = 255;

/// Allowance value treated as unlimited and never decremented
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;
