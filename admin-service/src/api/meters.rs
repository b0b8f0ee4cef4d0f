use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use water_client::domain::{Meter, MeterUpdate, MeterWithCustomer, NewMeter};

use super::AppState;
use crate::activity;
use crate::auth::AuthUser;
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct MeterQuery {
    pub customer_id: Option<Uuid>,
}

pub async fn list_meters(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<MeterQuery>,
) -> Result<Json<Vec<MeterWithCustomer>>> {
    Ok(Json(state.store.meters(q.customer_id).await?))
}

pub async fn get_meter(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Meter>> {
    let meter = state.store.meter(id).await?.ok_or(AppError::NotFound("meter"))?;
    Ok(Json(meter))
}

pub async fn create_meter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(new): Json<NewMeter>,
) -> Result<(StatusCode, Json<Meter>)> {
    if new.meter_number.trim().is_empty() {
        return Err(AppError::Validation("meter_number is required".to_string()));
    }
    if state.store.customer(new.customer_id).await?.is_none() {
        return Err(AppError::Validation("customer does not exist".to_string()));
    }

    let meter = state.store.create_meter(new).await.map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("a meter with this number already exists".to_string()),
        other => other,
    })?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "meter",
        Some(meter.id),
        Some(meter.meter_number.clone()),
    )
    .await;

    Ok((StatusCode::CREATED, Json(meter)))
}

pub async fn update_meter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<MeterUpdate>,
) -> Result<Json<Meter>> {
    let meter = state
        .store
        .update_meter(id, update)
        .await?
        .ok_or(AppError::NotFound("meter"))?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "update",
        "meter",
        Some(id),
        Some(format!("{} is {}", meter.meter_number, meter.status)),
    )
    .await;

    Ok(Json(meter))
}

pub async fn delete_meter(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !state.store.delete_meter(id).await? {
        return Err(AppError::NotFound("meter"));
    }

    activity::record(state.store.as_ref(), Some(auth.id), "delete", "meter", Some(id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
