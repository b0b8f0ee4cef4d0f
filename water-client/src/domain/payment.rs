use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    MobileMoney,
    Cheque,
}

text_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    BankTransfer => "bank_transfer",
    Card => "card",
    MobileMoney => "mobile_money",
    Cheque => "cheque",
});

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub bill_id: Uuid,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_on: Date,
    pub received_by: Option<Uuid>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PaymentWithBill {
    #[sqlx(flatten)]
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payment: Payment,
    pub bill_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_number: String,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_on: Date,
    pub received_by: Option<Uuid>,
}
