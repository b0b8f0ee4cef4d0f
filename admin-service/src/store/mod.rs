//! Storage seam between the HTTP layer and the database.
//!
//! Handlers talk to `dyn Store`; [`PgStore`] is the production
//! implementation over `water_client::db`, and the in-memory store backs
//! the unit tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use time::Date;
use uuid::Uuid;
use water_client::db::payment_queries::SettledPayment;
use water_client::domain::{
    ActivityEntry, Bill, BillStatus, BillWithCustomer, Customer, CustomerDependents, CustomerUpdate,
    DashboardStats, Meter, MeterReading, MeterUpdate, MeterWithCustomer, MonthlyRevenue, NewActivity,
    NewBill, NewCustomer, NewMeter, NewPayment, NewReading, NewUser, PaymentWithBill, ReadingWithMeter,
    User,
};

use crate::billing::BillingError;

pub use postgres::PgStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    Rejected(#[from] BillingError),
    #[error("storage backend error: {0}")]
    Backend(anyhow::Error),
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn users(&self) -> Result<Vec<User>, StoreError>;
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;

    async fn customers(&self, search: Option<&str>) -> Result<Vec<Customer>, StoreError>;
    async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;
    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, StoreError>;
    async fn update_customer(&self, id: Uuid, update: CustomerUpdate) -> Result<Option<Customer>, StoreError>;
    async fn customer_dependents(&self, id: Uuid) -> Result<CustomerDependents, StoreError>;
    async fn delete_customer(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn meters(&self, customer_id: Option<Uuid>) -> Result<Vec<MeterWithCustomer>, StoreError>;
    async fn meter(&self, id: Uuid) -> Result<Option<Meter>, StoreError>;
    async fn meter_by_number(&self, meter_number: &str) -> Result<Option<Meter>, StoreError>;
    async fn create_meter(&self, new: NewMeter) -> Result<Meter, StoreError>;
    async fn update_meter(&self, id: Uuid, update: MeterUpdate) -> Result<Option<Meter>, StoreError>;
    async fn delete_meter(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn readings(&self, meter_id: Option<Uuid>) -> Result<Vec<ReadingWithMeter>, StoreError>;
    async fn reading(&self, id: Uuid) -> Result<Option<MeterReading>, StoreError>;
    async fn latest_reading(&self, meter_id: Uuid) -> Result<Option<MeterReading>, StoreError>;
    async fn create_reading(&self, new: NewReading) -> Result<MeterReading, StoreError>;
    async fn create_readings(&self, batch: &[NewReading]) -> Result<u64, StoreError>;

    async fn bills(
        &self,
        status: Option<BillStatus>,
        customer_id: Option<Uuid>,
        today: Date,
    ) -> Result<Vec<BillWithCustomer>, StoreError>;
    async fn bill(&self, id: Uuid) -> Result<Option<BillWithCustomer>, StoreError>;
    async fn create_bill(&self, new: NewBill) -> Result<Bill, StoreError>;
    async fn set_bill_status(&self, id: Uuid, status: BillStatus) -> Result<Option<Bill>, StoreError>;
    async fn delete_bill(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn mark_overdue(&self, today: Date) -> Result<u64, StoreError>;

    async fn payments(&self, bill_id: Option<Uuid>) -> Result<Vec<PaymentWithBill>, StoreError>;
    /// Record a payment under [`crate::billing::apply_payment`], settling the
    /// bill when its balance reaches zero. Atomic with respect to other
    /// payments on the same bill.
    async fn record_payment(&self, new: NewPayment) -> Result<SettledPayment, StoreError>;

    async fn log_activity(&self, new: NewActivity) -> Result<(), StoreError>;
    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError>;

    async fn dashboard(&self, today: Date, month_start: Date) -> Result<DashboardStats, StoreError>;
    async fn monthly_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenue>, StoreError>;
}
