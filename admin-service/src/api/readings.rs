use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;
use uuid::Uuid;
use water_client::domain::{MeterReading, NewReading, ReadingWithMeter};

use super::{today, AppState};
use crate::activity;
use crate::auth::AuthUser;
use crate::billing;
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct ReadingQuery {
    pub meter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecordReadingRequest {
    pub meter_id: Uuid,
    /// Defaults to today.
    pub reading_date: Option<Date>,
    /// Defaults to the meter's latest recorded value, or zero for a new meter.
    /// May not be below the latest recorded value.
    pub previous_reading: Option<Decimal>,
    pub current_reading: Decimal,
    pub notes: Option<String>,
}

pub async fn list_readings(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<ReadingQuery>,
) -> Result<Json<Vec<ReadingWithMeter>>> {
    Ok(Json(state.store.readings(q.meter_id).await?))
}

pub async fn record_reading(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RecordReadingRequest>,
) -> Result<(StatusCode, Json<MeterReading>)> {
    let meter = state
        .store
        .meter(req.meter_id)
        .await?
        .ok_or_else(|| AppError::Validation("meter does not exist".to_string()))?;

    let latest = state.store.latest_reading(meter.id).await?.map(|r| r.current_reading);
    let previous = billing::previous_reading(latest, req.previous_reading)?;
    let consumption = billing::consumption(previous, req.current_reading)?;

    let reading = state
        .store
        .create_reading(NewReading {
            meter_id: meter.id,
            reading_date: req.reading_date.unwrap_or_else(today),
            previous_reading: previous,
            current_reading: req.current_reading,
            consumption,
            recorded_by: Some(auth.id),
            notes: req.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "meter_reading",
        Some(reading.id),
        Some(format!("{}: {} -> {} ({})", meter.meter_number, previous, req.current_reading, consumption)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(reading)))
}
