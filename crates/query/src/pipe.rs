//! Pipes and pipelines
//!
//! A [`Pipe`] turns one bucket into another. A [`Pipeline`] threads a bucket
//! through an ordered list of pipes and stops at the first error.

use rowkv_core::{Bucket, Result};
use tracing::debug;

/// One stage of a [`Pipeline`].
///
/// Implemented by the stage structs of this crate and by any closure
/// `Fn(Box<dyn Bucket>) -> Result<Box<dyn Bucket>>`.
pub trait Pipe {
    /// Transform `input` into a new bucket.
    ///
    /// # Errors
    ///
    /// Any error from reading the input or from the stage's own checks.
    fn apply(&self, input: Box<dyn Bucket>) -> Result<Box<dyn Bucket>>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "pipe"
    }
}

impl<F> Pipe for F
where
    F: Fn(Box<dyn Bucket>) -> Result<Box<dyn Bucket>>,
{
    fn apply(&self, input: Box<dyn Bucket>) -> Result<Box<dyn Bucket>> {
        self(input)
    }
}

/// Ordered list of pipes.
///
/// # Example
///
/// ```
/// use rowkv_core::{Bucket, FieldBuffer, RecordBuffer};
/// use rowkv_query::{Limit, Pipeline};
///
/// let mut input = RecordBuffer::new();
/// for i in 0..5 {
///     let mut record = FieldBuffer::new();
///     record.add_int64("n", i).unwrap();
///     input.add(Box::new(record));
/// }
///
/// let pipeline = Pipeline::new().pipe(Limit::new(2));
/// let mut output = pipeline.run(Box::new(input)).unwrap();
/// assert!(output.next().unwrap().is_some());
/// assert!(output.next().unwrap().is_some());
/// assert!(output.next().unwrap().is_none());
/// ```
#[derive(Default)]
pub struct Pipeline {
    pipes: Vec<Box<dyn Pipe>>,
}

impl Pipeline {
    /// An empty pipeline; running it returns its input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn pipe(mut self, pipe: impl Pipe + 'static) -> Self {
        self.pipes.push(Box::new(pipe));
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    /// True when the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Thread `bucket` through every stage in order.
    ///
    /// # Errors
    ///
    /// The first error returned by a stage; later stages do not run.
    pub fn run(&self, bucket: Box<dyn Bucket>) -> Result<Box<dyn Bucket>> {
        let mut bucket = bucket;
        for (i, pipe) in self.pipes.iter().enumerate() {
            debug!(target: "rowkv::query", stage = i, pipe = pipe.name(), "running pipe");
            bucket = pipe.apply(bucket)?;
        }
        Ok(bucket)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.pipes.iter().map(|p| p.name()))
            .finish()
    }
}
