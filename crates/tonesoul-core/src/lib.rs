//! ToneSoul Core - audit ledger, ids, and error handling

pub mod error;
pub mod ledger;
pub mod types;

pub use error::{Error, Result};
pub use ledger::{digest_input, Ledger, TraceStatus, TraceStep, TrustLevel};
pub use types::*;
