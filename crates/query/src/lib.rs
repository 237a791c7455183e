//! Query pipelines for rowkv
//!
//! This crate runs composable stages over buckets:
//! - Pipe / Pipeline: bucket-to-bucket stages and their ordered runner
//! - select: run a pipeline over a stored bucket in a read-only transaction
//! - Limit: keep the first `n` records
//! - MaxInt64: maximum of an integer field
//!
//! Everything here depends only on the `Engine` / `Transaction` traits and
//! the `Bucket` / `Record` contracts, never on a concrete backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod limit;
pub mod max;
pub mod pipe;
pub mod select;

pub use limit::Limit;
pub use max::MaxInt64;
pub use pipe::{Pipe, Pipeline};
pub use select::select;
