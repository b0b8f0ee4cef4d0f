use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;
use water_client::domain::{Bill, BillStatus, BillWithCustomer, NewBill, PaymentWithBill};

use super::{today, AppState};
use crate::activity;
use crate::auth::AuthUser;
use crate::billing;
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct BillQuery {
    pub status: Option<BillStatus>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBillRequest {
    pub customer_id: Uuid,
    pub meter_id: Option<Uuid>,
    /// Reading whose consumption is billed; alternative to `consumption`.
    pub reading_id: Option<Uuid>,
    pub period_start: Date,
    pub period_end: Date,
    pub consumption: Option<Decimal>,
    /// Defaults to `billing.default_rate`.
    pub rate: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: BillWithCustomer,
    pub balance: Decimal,
    pub payments: Vec<PaymentWithBill>,
}

/// Report pending bills past their due date as overdue.
fn with_effective_status(mut row: BillWithCustomer, today: Date) -> BillWithCustomer {
    row.bill.status = billing::effective_status(row.bill.status, row.bill.due_date, today);
    row
}

pub async fn list_bills(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<BillQuery>,
) -> Result<Json<Vec<BillWithCustomer>>> {
    let today = today();
    let rows = state.store.bills(q.status, q.customer_id, today).await?;
    Ok(Json(rows.into_iter().map(|r| with_effective_status(r, today)).collect()))
}

pub async fn get_bill(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<BillDetail>> {
    let bill = state.store.bill(id).await?.ok_or(AppError::NotFound("bill"))?;
    let payments = state.store.payments(Some(id)).await?;
    let bill = with_effective_status(bill, today());

    Ok(Json(BillDetail {
        balance: bill.balance(),
        bill,
        payments,
    }))
}

pub async fn generate_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<GenerateBillRequest>,
) -> Result<(StatusCode, Json<Bill>)> {
    billing::validate_period(req.period_start, req.period_end)?;

    let customer = state
        .store
        .customer(req.customer_id)
        .await?
        .ok_or_else(|| AppError::Validation("customer does not exist".to_string()))?;

    let reading = match req.reading_id {
        Some(id) => Some(
            state
                .store
                .reading(id)
                .await?
                .ok_or_else(|| AppError::Validation("reading does not exist".to_string()))?,
        ),
        None => None,
    };

    let meter_id = match (req.meter_id, &reading) {
        (Some(m), Some(r)) if m != r.meter_id => {
            return Err(AppError::Validation("reading belongs to a different meter".to_string()));
        }
        (Some(m), _) => Some(m),
        (None, Some(r)) => Some(r.meter_id),
        (None, None) => None,
    };

    if let Some(meter_id) = meter_id {
        let meter = state
            .store
            .meter(meter_id)
            .await?
            .ok_or_else(|| AppError::Validation("meter does not exist".to_string()))?;
        if meter.customer_id != customer.id {
            return Err(AppError::Validation("meter belongs to a different customer".to_string()));
        }
    }

    let consumption = req
        .consumption
        .or_else(|| reading.as_ref().map(|r| r.consumption))
        .ok_or_else(|| AppError::Validation("either consumption or reading_id is required".to_string()))?;
    let rate = req.rate.unwrap_or(state.billing.default_rate);
    let amount = billing::bill_amount(consumption, rate)?;

    let new = NewBill {
        bill_number: billing::bill_number(customer.id, meter_id, req.period_start, req.period_end),
        customer_id: customer.id,
        meter_id,
        reading_id: req.reading_id,
        period_start: req.period_start,
        period_end: req.period_end,
        consumption,
        rate,
        amount,
        due_date: billing::due_date(req.period_end, state.billing.due_days),
    };

    let bill = state.store.create_bill(new).await.map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict("a bill for this customer, meter and period already exists".to_string())
        }
        other => other,
    })?;

    metrics::counter!("bills_generated_total").increment(1);
    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "bill",
        Some(bill.id),
        Some(format!("{} for {}: {}", bill.bill_number, customer.account_number, bill.amount)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(bill)))
}

pub async fn cancel_bill(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Bill>> {
    let row = state.store.bill(id).await?.ok_or(AppError::NotFound("bill"))?;

    match row.bill.status {
        BillStatus::Cancelled => return Ok(Json(row.bill)),
        BillStatus::Paid => return Err(AppError::Validation("a paid bill cannot be cancelled".to_string())),
        BillStatus::Pending | BillStatus::Overdue => {}
    }
    if row.amount_paid > Decimal::ZERO {
        return Err(AppError::Validation(
            "bill has payments recorded against it and cannot be cancelled".to_string(),
        ));
    }

    let bill = state
        .store
        .set_bill_status(id, BillStatus::Cancelled)
        .await?
        .ok_or(AppError::NotFound("bill"))?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "cancel",
        "bill",
        Some(id),
        Some(bill.bill_number.clone()),
    )
    .await;

    Ok(Json(bill))
}

pub async fn delete_bill(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !state.store.delete_bill(id).await? {
        return Err(AppError::NotFound("bill"));
    }

    activity::record(state.store.as_ref(), Some(auth.id), "delete", "bill", Some(id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
