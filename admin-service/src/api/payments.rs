use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;
use water_client::domain::{Bill, BillStatus, NewPayment, Payment, PaymentMethod, PaymentWithBill};

use super::{today, AppState};
use crate::activity;
use crate::auth::AuthUser;
use crate::billing;
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub bill_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    /// Defaults to today; future dates are rejected.
    pub paid_on: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub bill: Bill,
    /// The payment cleared the remaining balance.
    pub settled: bool,
}

pub async fn list_payments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<PaymentQuery>,
) -> Result<Json<Vec<PaymentWithBill>>> {
    Ok(Json(state.store.payments(q.bill_id).await?))
}

pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>)> {
    if state.store.bill(req.bill_id).await?.is_none() {
        return Err(AppError::NotFound("bill"));
    }

    let paid_on = req.paid_on.unwrap_or_else(today);
    if paid_on > today() {
        return Err(AppError::Validation("paid_on must not be in the future".to_string()));
    }
    let settled = state
        .store
        .record_payment(NewPayment {
            payment_number: billing::payment_number(req.bill_id, paid_on, Uuid::new_v4()),
            bill_id: req.bill_id,
            amount: req.amount,
            method: req.method,
            reference: req.reference.filter(|r| !r.trim().is_empty()),
            paid_on,
            received_by: Some(auth.id),
        })
        .await?;

    let receipt = PaymentReceipt {
        settled: settled.bill.status == BillStatus::Paid,
        payment: settled.payment,
        bill: settled.bill,
    };

    metrics::counter!("payments_recorded_total").increment(1);
    tracing::info!(
        bill = %receipt.bill.bill_number,
        amount = %receipt.payment.amount,
        settled = receipt.settled,
        "payment recorded"
    );
    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "payment",
        Some(receipt.payment.id),
        Some(format!(
            "{} against {}: {} ({})",
            receipt.payment.payment_number,
            receipt.bill.bill_number,
            receipt.payment.amount,
            receipt.payment.method
        )),
    )
    .await;

    Ok((StatusCode::CREATED, Json(receipt)))
}
