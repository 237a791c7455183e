//! Storage engines for rowkv
//!
//! This crate connects typed records to a transactional backend:
//! - Engine / Transaction: the contract every backend implements
//! - KvEngine: adapter over the ordered key-value store in `rowkv-storage`
//! - RowkvConfig: settings loaded from `rowkv.toml`
//!
//! The query layer depends only on the traits, so any backend that
//! implements them can be swapped in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod kv;
pub mod traits;

pub use config::{MaxSeed, RowkvConfig, CONFIG_FILE_NAME};
pub use kv::{KvBucket, KvEngine, KvTransaction, SCHEMA_BUCKET};
pub use traits::{Engine, Transaction};
