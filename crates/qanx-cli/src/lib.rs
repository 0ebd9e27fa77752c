//! QANX command-line tooling
//!
//! Offline cheque signing, key handling and a local ledger operator that
//! keeps token state in a JSON snapshot.

pub mod allocations;
pub mod error;
pub mod keys;
pub mod storage;
pub mod time;

pub use error::{CliError, Result};
pub use storage::StateStore;
