//! Depot processing library
//!
//! Processors transform stored content on the fly before it is streamed to a
//! client: a request names one processor and supplies its remaining path
//! segments as positional string arguments. Processing is synchronous and
//! single-pass; the output replaces the original body.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("processing failed: {0}")]
    Failed(String),
}

/// A named transform over stored content.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, data: Bytes, args: &[String]) -> Result<Bytes, ProcessError>;
}

/// Adapter turning a plain function into a [`Processor`].
struct FnProcessor<F>(F);

#[async_trait]
impl<F> Processor for FnProcessor<F>
where
    F: Fn(Bytes, &[String]) -> Result<Bytes, ProcessError> + Send + Sync,
{
    async fn process(&self, data: Bytes, args: &[String]) -> Result<Bytes, ProcessError> {
        (self.0)(data, args)
    }
}

/// Name-to-processor mapping, built at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, processor: Arc<dyn Processor>) -> Self {
        self.processors.insert(name.into(), processor);
        self
    }

    /// Register a plain function as a processor.
    pub fn register_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Bytes, &[String]) -> Result<Bytes, ProcessError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnProcessor(f)))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Processor>> {
        self.processors.get(name)
    }
}
