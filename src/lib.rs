//! rowkv - typed record storage over ordered transactional key-value stores
//!
//! rowkv stores records (ordered lists of named, typed fields) in buckets,
//! tracks a schema per bucket, and reads buckets back through composable
//! query pipelines.
//!
//! # Quick Start
//!
//! ```
//! use rowkv::{select, Bucket, Engine, FieldBuffer, KvEngine, MaxInt64, Pipeline, RecordExt, Transaction};
//!
//! let engine = KvEngine::default();
//!
//! let mut tx = engine.begin(true)?;
//! for (name, age) in [("Alice", 30), ("Bob", 41)] {
//!     let mut record = FieldBuffer::new();
//!     record.add_string("Name", name)?;
//!     record.add_int64("Age", age)?;
//!     tx.insert(&mut record, &["users"])?;
//! }
//! tx.commit()?;
//!
//! let pipeline = Pipeline::new().pipe(MaxInt64::new("Age"));
//! let mut result = select(&engine, &pipeline, &["users"])?;
//! let oldest = result.next()?.expect("one record");
//! assert_eq!(oldest.get_int64("max(Age)")?, 41);
//! # Ok::<(), rowkv::Error>(())
//! ```
//!
//! `KvEngine::default()` keeps everything in memory; `KvEngine::open(dir)`
//! keeps a commit log in `dir` and restores it on the next open.
//!
//! # Architecture
//!
//! - `rowkv-core`: fields, schemas, records, buckets, errors
//! - `rowkv-storage`: ordered transactional byte store, in memory or
//!   backed by a commit log
//! - `rowkv-engine`: the engine contract and its key-value adapter
//! - `rowkv-query`: pipes, pipelines and `select`

pub use rowkv_core::{
    decode_int64, encode_int64, Bucket, Error, Field, FieldBuffer, FieldDescriptor, FieldType,
    FieldValue, Record, RecordBuffer, RecordExt, Result, Schema,
};
pub use rowkv_engine::{
    Engine, KvBucket, KvEngine, KvTransaction, MaxSeed, RowkvConfig, Transaction,
    CONFIG_FILE_NAME, SCHEMA_BUCKET,
};
pub use rowkv_query::{select, Limit, MaxInt64, Pipe, Pipeline};
pub use rowkv_storage::Store;
