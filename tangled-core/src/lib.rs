// src/lib.rs

//! # Tangled Core
//!
//! The message DAG ("tangle"), its branch-based conflict resolution,
//! tip selection, balance ledger, and persistence.
//!
//! ## Example
//!
//! ```rust
//! use tangled_core::tangle::Tangle;
//!
//! let tangle = Tangle::new(10_000, 3600);
//! let genesis_receiver = "TmANJZAiiZTjBiLZt2QDKoYVtLn8yHGPdXdydymbPVJDZ";
//! assert_eq!(tangle.get_balance(genesis_receiver), 25000);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod invalid_pool;
pub mod message;
pub mod state;
pub mod storage;
pub mod tangle;
pub mod tip_selection;
pub mod types;

pub use tangled_crypto;

pub use crate::errors::{CoreError, Result};
pub use crate::message::{Message, ParentAnalysis, Payload, Validity};
pub use crate::tangle::Tangle;
pub use crate::types::{Address, Hash, Timestamp};

/// Minimum amount a transaction may move
pub const MIN_SEND_AMT: i64 = 1;

/// Seconds a tip may sit unapproved before it is purged
pub const MAX_TIP_AGE: i64 = 86_400;

/// Maximum number of parents a message may declare
pub const MAX_PARENTS: usize = 8;

/// Minimum number of non-weak parents a message must declare
pub const MIN_STRONG_PARENTS: usize = 1;

/// Approximate maximum serialized size of a message, in bytes
pub const MAX_MSG_SIZE: usize = 4096;

/// Window, in seconds, within which a parent's timestamp must fall
/// relative to its child
pub const MAX_PARENT_AGE: i64 = 3600;

/// Extra weight a challenging branch must carry over the main branch
/// before it is swapped in
pub const MAIN_THRESHOLD: f64 = 0.5;

/// Approval weight at which a branch is considered final
pub const FINALITY_SCORE: f64 = 4.0;

/// Default bound on the invalid-message pool
pub const DEFAULT_INVALID_POOL_SIZE: usize = 10_000;

/// Default age, in seconds, after which an untouched invalid-pool entry
/// is purged
pub const DEFAULT_INVALID_POOL_PURGE_TIME: i64 = 3600;

/// Recursion depth for [`Message::is_valid`]'s parent-ancestry walk
pub const PARENT_ANALYSIS_DEPTH: u32 = 2;
