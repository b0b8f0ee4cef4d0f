use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeterReading {
    pub id: Uuid,
    pub meter_id: Uuid,
    pub reading_date: Date,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub consumption: Decimal,
    pub recorded_by: Option<Uuid>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReadingWithMeter {
    #[sqlx(flatten)]
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub reading: MeterReading,
    pub meter_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
}

/// A reading ready to persist; consumption has already been derived.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub meter_id: Uuid,
    pub reading_date: Date,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub consumption: Decimal,
    pub recorded_by: Option<Uuid>,
    pub notes: Option<String>,
}
