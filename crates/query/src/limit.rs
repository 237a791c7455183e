//! `Limit`: keep the first records of a bucket

use rowkv_core::{Bucket, Error, RecordBuffer, Result};

use crate::pipe::Pipe;

/// Buffers at most `n` records from its input, preserving order.
///
/// The input is never read past the `n`-th record. The output reports the
/// input's schema even when fewer records (or none) are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    n: usize,
}

impl Limit {
    /// Keep at most `n` records.
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Pipe for Limit {
    fn apply(&self, mut input: Box<dyn Bucket>) -> Result<Box<dyn Bucket>> {
        let mut output = match input.schema() {
            Ok(schema) => RecordBuffer::with_schema(schema),
            Err(Error::EmptyInput) => RecordBuffer::new(),
            Err(e) => return Err(e),
        };

        for _ in 0..self.n {
            match input.next()? {
                Some(record) => output.add(record),
                None => break,
            }
        }
        Ok(Box::new(output))
    }

    fn name(&self) -> &str {
        "limit"
    }
}
