use rust_decimal::Decimal;
use time::{macros::date, Date};

use super::{Envelope, ImportError, ReadingRow, Transform};
use crate::billing;

const EARLIEST_READING: Date = date!(2000 - 01 - 01);

/// Pure validation of a parsed row.
///
/// Rules:
/// - the reading must not be negative.
/// - when the row names its previous value, consumption must not be negative.
/// - the date must fall between 2000-01-01 and `latest`.
pub fn validate_reading(env: Envelope<ReadingRow>, latest: Date) -> Result<Envelope<ReadingRow>, ImportError> {
    let row = &env.payload;

    let previous = row.previous_reading.unwrap_or(Decimal::ZERO);
    billing::consumption(previous, row.current_reading).map_err(|e| ImportError::row(row.line, e.to_string()))?;

    if row.reading_date < EARLIEST_READING || row.reading_date > latest {
        return Err(ImportError::row(
            row.line,
            format!("reading_date {} out of allowed range", row.reading_date),
        ));
    }

    Ok(env)
}

/// Rejects rows that can never become a valid reading, whatever is stored.
#[derive(Clone)]
pub struct ReadingValidation {
    latest: Date,
}

impl ReadingValidation {
    /// Readings dated after `latest` are rejected.
    pub fn new(latest: Date) -> Self {
        Self { latest }
    }
}

#[async_trait::async_trait]
impl Transform<ReadingRow, ReadingRow> for ReadingValidation {
    async fn apply(&self, input: Envelope<ReadingRow>) -> Result<Envelope<ReadingRow>, ImportError> {
        match validate_reading(input, self.latest) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("reading_import_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn env(previous: Option<i64>, current: i64, reading_date: Date) -> Envelope<ReadingRow> {
        Envelope {
            payload: ReadingRow {
                line: 4,
                meter_number: "M-1".into(),
                reading_date,
                current_reading: Decimal::from(current),
                previous_reading: previous.map(Decimal::from),
                notes: None,
            },
            received_at: SystemTime::now(),
        }
    }

    const LATEST: Date = date!(2024 - 12 - 31);

    #[test]
    fn accepts_forward_reading() {
        assert!(validate_reading(env(Some(10), 12, date!(2024 - 01 - 15)), LATEST).is_ok());
        assert!(validate_reading(env(None, 0, date!(2024 - 01 - 15)), LATEST).is_ok());
    }

    #[test]
    fn rejects_backwards_or_negative_reading() {
        assert!(matches!(
            validate_reading(env(Some(10), 9, date!(2024 - 01 - 15)), LATEST),
            Err(ImportError::Row { line: 4, .. })
        ));
        assert!(validate_reading(env(None, -1, date!(2024 - 01 - 15)), LATEST).is_err());
    }

    #[test]
    fn rejects_dates_outside_window() {
        assert!(validate_reading(env(None, 5, date!(1999 - 12 - 31)), LATEST).is_err());
        assert!(validate_reading(env(None, 5, date!(2025 - 01 - 01)), LATEST).is_err());
        assert!(validate_reading(env(None, 5, LATEST), LATEST).is_ok());
    }
}
