use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BillStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

text_enum!(BillStatus, "bill status", {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

impl BillStatus {
    /// Whether money can still be received against a bill in this state.
    pub fn is_open(&self) -> bool {
        matches!(self, BillStatus::Pending | BillStatus::Overdue)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bill {
    pub id: Uuid,
    pub bill_number: String,
    pub customer_id: Uuid,
    pub meter_id: Option<Uuid>,
    pub reading_id: Option<Uuid>,
    pub period_start: Date,
    pub period_end: Date,
    pub consumption: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub due_date: Date,
    #[sqlx(try_from = "String")]
    pub status: BillStatus,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub paid_at: Option<OffsetDateTime>,
}

/// Bill row joined with its customer and the amount received so far.
#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BillWithCustomer {
    #[sqlx(flatten)]
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub bill: Bill,
    pub customer_name: String,
    pub account_number: String,
    pub amount_paid: Decimal,
}

impl BillWithCustomer {
    pub fn balance(&self) -> Decimal {
        self.bill.amount - self.amount_paid
    }
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub bill_number: String,
    pub customer_id: Uuid,
    pub meter_id: Option<Uuid>,
    pub reading_id: Option<Uuid>,
    pub period_start: Date,
    pub period_end: Date,
    pub consumption: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub due_date: Date,
}
