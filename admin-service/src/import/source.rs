use std::{fs::File, path::PathBuf, time::SystemTime};

use csv::StringRecord;
use rust_decimal::Decimal;
use time::{format_description::FormatItem, macros::format_description, Date};

use super::{Envelope, EnvelopeStream, ImportError, ReadingRow, Source};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Streams [`ReadingRow`]s out of a CSV file.
///
/// Header columns, matched by name:
/// - meter_number
/// - reading_date (YYYY-MM-DD)
/// - current_reading
/// - previous_reading (optional)
/// - notes (optional)
///
/// Unparseable rows come through as [`ImportError::Row`] and the stream
/// continues; an unreadable file or header ends it.
pub struct ReadingCsvFileSource {
    path: PathBuf,
}

impl ReadingCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn optional(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid {column} '{raw}': {e}"))
}

pub(crate) fn record_to_row(line: u64, record: &StringRecord, headers: &StringRecord) -> Result<ReadingRow, ImportError> {
    let get = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
    };
    let required = |name: &str| -> Result<&str, ImportError> {
        get(name)
            .and_then(optional)
            .ok_or_else(|| ImportError::row(line, format!("missing {name}")))
    };

    let meter_number = required("meter_number")?.to_string();

    let date_str = required("reading_date")?;
    let reading_date = Date::parse(date_str, DATE_FORMAT)
        .map_err(|e| ImportError::row(line, format!("invalid reading_date '{date_str}': {e}")))?;

    let current_reading =
        parse_decimal("current_reading", required("current_reading")?).map_err(|e| ImportError::row(line, e))?;

    let previous_reading = match get("previous_reading").and_then(optional) {
        Some(raw) => Some(parse_decimal("previous_reading", raw).map_err(|e| ImportError::row(line, e))?),
        None => None,
    };

    Ok(ReadingRow {
        line,
        meter_number,
        reading_date,
        current_reading,
        previous_reading,
        notes: get("notes").and_then(optional).map(str::to_string),
    })
}

#[async_trait::async_trait]
impl Source<ReadingRow> for ReadingCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<ReadingRow> {
        // Blocking reader inside one task; import files are operator-sized.
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(ImportError::Source(format!("failed to open {}: {e}", path.display())));
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(ImportError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let item = match result {
                    Ok(record) => {
                        let line = record.position().map(|p| p.line()).unwrap_or(0);
                        record_to_row(line, &record, &headers).map(|payload| Envelope {
                            payload,
                            received_at: SystemTime::now(),
                        })
                    }
                    Err(e) => {
                        let line = e.position().map(|p| p.line()).unwrap_or(0);
                        Err(ImportError::row(line, format!("unreadable record: {e}")))
                    }
                };

                if item.is_err() {
                    metrics::counter!("reading_import_parse_errors_total").increment(1);
                }
                yield item;
            }
        };

        Box::pin(s)
    }
}
