use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use uuid::Uuid;
use water_client::domain::NewReading;

use super::{Envelope, ImportError, ImportSummary, ReadingRow, Sink};
use crate::billing;
use crate::store::{Store, StoreError};

/// Writes imported readings through the [`Store`] in batches.
///
/// Meter numbers are resolved once per run. A row without a previous value
/// chains from the last row of the same meter earlier in the file, then
/// from the latest stored reading, then from zero. An explicit previous
/// value below that baseline skips the row.
pub struct StoreReadingSink {
    store: Arc<dyn Store>,
    recorded_by: Option<Uuid>,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl StoreReadingSink {
    pub fn new(store: Arc<dyn Store>, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            store,
            recorded_by: None,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
        }
    }

    pub fn recorded_by(mut self, user_id: Uuid) -> Self {
        self.recorded_by = Some(user_id);
        self
    }

    async fn flush_batch(&self, batch: &[NewReading]) -> Result<u64, ImportError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut attempt: u32 = 0;
        loop {
            match self.store.create_readings(batch).await {
                Ok(written) => {
                    metrics::counter!("reading_import_rows_total").increment(written);
                    return Ok(written);
                }
                Err(StoreError::Backend(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "reading batch write failed, retrying with backoff");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, rows = batch.len(), "reading batch write failed, giving up");
                    metrics::counter!("reading_import_sink_errors_total").increment(1);
                    return Err(ImportError::Sink(e.to_string()));
                }
            }
        }
    }
}

/// Per-run lookups so each meter hits the store once.
#[derive(Default)]
struct RunState {
    meters: HashMap<String, Option<Uuid>>,
    last_value: HashMap<Uuid, Decimal>,
}

impl StoreReadingSink {
    async fn meter_id(&self, state: &mut RunState, meter_number: &str) -> Result<Option<Uuid>, StoreError> {
        if let Some(id) = state.meters.get(meter_number) {
            return Ok(*id);
        }
        let id = self.store.meter_by_number(meter_number).await?.map(|m| m.id);
        state.meters.insert(meter_number.to_string(), id);
        Ok(id)
    }

    async fn latest_value(&self, state: &mut RunState, meter_id: Uuid) -> Result<Option<Decimal>, StoreError> {
        if let Some(v) = state.last_value.get(&meter_id) {
            return Ok(Some(*v));
        }
        Ok(self.store.latest_reading(meter_id).await?.map(|r| r.current_reading))
    }

    /// `Ok(None)` when the row is skipped.
    async fn resolve(&self, state: &mut RunState, row: ReadingRow) -> Result<Option<NewReading>, ImportError> {
        let lookup = |e: StoreError| ImportError::Sink(format!("meter lookup failed: {e}"));

        let Some(meter_id) = self.meter_id(state, &row.meter_number).await.map_err(lookup)? else {
            tracing::warn!(line = row.line, meter = %row.meter_number, "skipping row for unknown meter");
            return Ok(None);
        };

        let latest = self.latest_value(state, meter_id).await.map_err(lookup)?;
        let checked = billing::previous_reading(latest, row.previous_reading)
            .and_then(|previous| billing::consumption(previous, row.current_reading).map(|c| (previous, c)));
        let (previous, consumption) = match checked {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(line = row.line, meter = %row.meter_number, error = %e, "skipping row");
                return Ok(None);
            }
        };

        state.last_value.insert(meter_id, row.current_reading);
        Ok(Some(NewReading {
            meter_id,
            reading_date: row.reading_date,
            previous_reading: previous,
            current_reading: row.current_reading,
            consumption,
            recorded_by: self.recorded_by,
            notes: row.notes,
        }))
    }
}

#[async_trait::async_trait]
impl Sink<ReadingRow> for StoreReadingSink {
    async fn run<S>(&self, mut input: S) -> Result<ImportSummary, ImportError>
    where
        S: Stream<Item = Result<Envelope<ReadingRow>, ImportError>> + Send + Unpin + 'static,
    {
        let mut summary = ImportSummary::default();
        let mut state = RunState::default();
        let mut buffer: Vec<NewReading> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(ImportError::Row { line, reason }) => {
                    tracing::warn!(line, %reason, "skipping row");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.resolve(&mut state, env.payload).await? {
                Some(reading) => buffer.push(reading),
                None => {
                    summary.skipped += 1;
                    continue;
                }
            }

            if buffer.len() >= self.batch_size {
                summary.imported += self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        summary.imported += self.flush_batch(&buffer).await?;
        if summary.skipped > 0 {
            metrics::counter!("reading_import_rows_skipped_total").increment(summary.skipped);
        }

        Ok(summary)
    }
}
