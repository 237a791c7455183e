//! Read-only query execution

use rowkv_core::{Bucket, Result};
use rowkv_engine::{Engine, Transaction};
use tracing::debug;

use crate::pipe::Pipeline;

/// Run `pipeline` over the bucket at `path` inside a read-only transaction.
///
/// The transaction is committed before returning and rolled back on any
/// error. The returned bucket does not borrow the transaction: backends
/// hand out buckets that own their snapshot, so it can be consumed after
/// this call.
///
/// # Errors
///
/// Any error from starting the transaction, opening the bucket, a pipeline
/// stage, or the commit.
pub fn select<E: Engine>(engine: &E, pipeline: &Pipeline, path: &[&str]) -> Result<Box<dyn Bucket>> {
    let mut tx = engine.begin(false)?;
    let bucket = tx.bucket(path)?;
    debug!(target: "rowkv::query", ?path, stages = pipeline.len(), "select");
    let result = pipeline.run(Box::new(bucket))?;
    tx.commit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Limit;
    use rowkv_core::{Error, FieldBuffer, RecordExt};
    use rowkv_engine::KvEngine;

    fn seed(engine: &KvEngine, values: &[i64]) {
        let mut tx = engine.begin(true).unwrap();
        for v in values {
            let mut record = FieldBuffer::new();
            record.add_int64("n", *v).unwrap();
            tx.insert(&mut record, &["nums"]).unwrap();
        }
        tx.commit().unwrap();
    }

    #[test]
    fn test_select_without_pipes_returns_bucket() {
        let engine = KvEngine::default();
        seed(&engine, &[4, 5]);

        let mut out = select(&engine, &Pipeline::new(), &["nums"]).unwrap();
        assert_eq!(out.next().unwrap().unwrap().get_int64("n").unwrap(), 4);
        assert_eq!(out.next().unwrap().unwrap().get_int64("n").unwrap(), 5);
        assert!(out.next().unwrap().is_none());
    }

    #[test]
    fn test_select_releases_transaction() {
        let engine = KvEngine::default();
        seed(&engine, &[1]);
        let _out = select(&engine, &Pipeline::new().pipe(Limit::new(1)), &["nums"]).unwrap();
        assert!(engine.store().try_begin_write().is_some());
    }

    #[test]
    fn test_select_invalid_path() {
        let engine = KvEngine::default();
        assert!(matches!(
            select(&engine, &Pipeline::new(), &[]),
            Err(Error::InvalidPath(_))
        ));
    }
}
