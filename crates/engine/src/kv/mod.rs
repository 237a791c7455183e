//! Key-value adapter
//!
//! Maps records onto an ordered transactional key-value store:
//! - keys: row key layout and path validation
//! - schema: the hidden per-bucket `__schema` sub-bucket
//! - bucket: regrouping scanned keys into records
//! - engine: `KvEngine` / `KvTransaction`

mod bucket;
mod engine;
pub mod keys;
mod schema;

pub use bucket::KvBucket;
pub use engine::{KvEngine, KvTransaction};
pub use schema::SCHEMA_BUCKET;
