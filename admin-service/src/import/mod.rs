//! CSV bulk import of meter readings, run as source → transforms → sink.

use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use time::Date;

pub mod sink;
pub mod source;
pub mod transform;

pub use sink::StoreReadingSink;
pub use source::ReadingCsvFileSource;
pub use transform::ReadingValidation;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

/// One parsed CSV row, before the meter number is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRow {
    /// 1-based line in the file, header included.
    pub line: u64,
    pub meter_number: String,
    pub reading_date: Date,
    pub current_reading: Decimal,
    pub previous_reading: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    /// A single bad row; the run skips it and carries on.
    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },
    #[error("source error: {0}")]
    Source(String),
    #[error("sink error: {0}")]
    Sink(String),
}

impl ImportError {
    pub fn row(line: u64, reason: impl Into<String>) -> Self {
        ImportError::Row {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, ImportError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, ImportError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<ImportSummary, ImportError>
    where
        S: Stream<Item = Result<Envelope<T>, ImportError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T>>>,
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + 'static,
    K: Sink<T> + 'static,
{
    pub async fn run(self) -> Result<ImportSummary, ImportError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}
