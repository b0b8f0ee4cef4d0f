use sqlx::PgPool;
use time::Date;
use uuid::Uuid;
use water_client::db::payment_queries::SettledPayment;
use water_client::db::{
    activity_queries, bill_queries, customer_queries, dashboard_queries, meter_queries, payment_queries,
    reading_queries, user_queries,
};
use water_client::domain::{
    ActivityEntry, Bill, BillStatus, BillWithCustomer, Customer, CustomerDependents, CustomerUpdate,
    DashboardStats, Meter, MeterReading, MeterUpdate, MeterWithCustomer, MonthlyRevenue, NewActivity,
    NewBill, NewCustomer, NewMeter, NewPayment, NewReading, NewUser, PaymentWithBill, ReadingWithMeter,
    User,
};

use super::{Store, StoreError};
use crate::billing;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map query-layer failures onto the store's error kinds. Constraint
/// violations become client errors; everything else stays a backend error.
fn classify(err: anyhow::Error) -> StoreError {
    if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
        match sqlx_err {
            sqlx::Error::RowNotFound => return StoreError::NotFound("record"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                return StoreError::Conflict(db.constraint().unwrap_or("unique key").to_string());
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_check_violation() => {
                return StoreError::InvalidReference(db.constraint().unwrap_or("constraint").to_string());
            }
            _ => {}
        }
    }
    StoreError::Backend(err)
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        user_queries::get_user_by_email(&self.pool, email).await.map_err(classify)
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        user_queries::get_user(&self.pool, id).await.map_err(classify)
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        user_queries::list_users(&self.pool).await.map_err(classify)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        user_queries::insert_user(&self.pool, &new).await.map_err(classify)
    }

    async fn customers(&self, search: Option<&str>) -> Result<Vec<Customer>, StoreError> {
        customer_queries::list_customers(&self.pool, search).await.map_err(classify)
    }

    async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        customer_queries::get_customer(&self.pool, id).await.map_err(classify)
    }

    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, StoreError> {
        customer_queries::insert_customer(&self.pool, &new).await.map_err(classify)
    }

    async fn update_customer(&self, id: Uuid, update: CustomerUpdate) -> Result<Option<Customer>, StoreError> {
        customer_queries::update_customer(&self.pool, id, &update).await.map_err(classify)
    }

    async fn customer_dependents(&self, id: Uuid) -> Result<CustomerDependents, StoreError> {
        customer_queries::customer_dependents(&self.pool, id).await.map_err(classify)
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, StoreError> {
        customer_queries::delete_customer(&self.pool, id).await.map_err(classify)
    }

    async fn meters(&self, customer_id: Option<Uuid>) -> Result<Vec<MeterWithCustomer>, StoreError> {
        meter_queries::list_meters(&self.pool, customer_id).await.map_err(classify)
    }

    async fn meter(&self, id: Uuid) -> Result<Option<Meter>, StoreError> {
        meter_queries::get_meter(&self.pool, id).await.map_err(classify)
    }

    async fn meter_by_number(&self, meter_number: &str) -> Result<Option<Meter>, StoreError> {
        meter_queries::find_meter_by_number(&self.pool, meter_number).await.map_err(classify)
    }

    async fn create_meter(&self, new: NewMeter) -> Result<Meter, StoreError> {
        meter_queries::insert_meter(&self.pool, &new).await.map_err(classify)
    }

    async fn update_meter(&self, id: Uuid, update: MeterUpdate) -> Result<Option<Meter>, StoreError> {
        meter_queries::update_meter(&self.pool, id, &update).await.map_err(classify)
    }

    async fn delete_meter(&self, id: Uuid) -> Result<bool, StoreError> {
        meter_queries::delete_meter(&self.pool, id).await.map_err(classify)
    }

    async fn readings(&self, meter_id: Option<Uuid>) -> Result<Vec<ReadingWithMeter>, StoreError> {
        reading_queries::list_readings(&self.pool, meter_id).await.map_err(classify)
    }

    async fn reading(&self, id: Uuid) -> Result<Option<MeterReading>, StoreError> {
        reading_queries::get_reading(&self.pool, id).await.map_err(classify)
    }

    async fn latest_reading(&self, meter_id: Uuid) -> Result<Option<MeterReading>, StoreError> {
        reading_queries::latest_reading(&self.pool, meter_id).await.map_err(classify)
    }

    async fn create_reading(&self, new: NewReading) -> Result<MeterReading, StoreError> {
        reading_queries::insert_reading(&self.pool, &new).await.map_err(classify)
    }

    async fn create_readings(&self, batch: &[NewReading]) -> Result<u64, StoreError> {
        reading_queries::insert_readings(&self.pool, batch).await.map_err(classify)
    }

    async fn bills(
        &self,
        status: Option<BillStatus>,
        customer_id: Option<Uuid>,
        today: Date,
    ) -> Result<Vec<BillWithCustomer>, StoreError> {
        bill_queries::list_bills(&self.pool, status, customer_id, today)
            .await
            .map_err(classify)
    }

    async fn bill(&self, id: Uuid) -> Result<Option<BillWithCustomer>, StoreError> {
        bill_queries::get_bill(&self.pool, id).await.map_err(classify)
    }

    async fn create_bill(&self, new: NewBill) -> Result<Bill, StoreError> {
        bill_queries::insert_bill(&self.pool, &new).await.map_err(classify)
    }

    async fn set_bill_status(&self, id: Uuid, status: BillStatus) -> Result<Option<Bill>, StoreError> {
        bill_queries::set_bill_status(&self.pool, id, status).await.map_err(classify)
    }

    async fn delete_bill(&self, id: Uuid) -> Result<bool, StoreError> {
        bill_queries::delete_bill(&self.pool, id).await.map_err(classify)
    }

    async fn mark_overdue(&self, today: Date) -> Result<u64, StoreError> {
        bill_queries::mark_overdue(&self.pool, today).await.map_err(classify)
    }

    async fn payments(&self, bill_id: Option<Uuid>) -> Result<Vec<PaymentWithBill>, StoreError> {
        payment_queries::list_payments(&self.pool, bill_id).await.map_err(classify)
    }

    async fn record_payment(&self, new: NewPayment) -> Result<SettledPayment, StoreError> {
        let amount = new.amount;
        let outcome = payment_queries::settle_payment(&self.pool, &new, |bill, already_paid| {
            billing::apply_payment(bill.status, bill.amount, already_paid, amount)
        })
        .await
        .map_err(classify)?;

        outcome.map_err(StoreError::Rejected)
    }

    async fn log_activity(&self, new: NewActivity) -> Result<(), StoreError> {
        activity_queries::insert_activity(&self.pool, &new).await.map_err(classify)
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError> {
        activity_queries::recent_activity(&self.pool, limit).await.map_err(classify)
    }

    async fn dashboard(&self, today: Date, month_start: Date) -> Result<DashboardStats, StoreError> {
        dashboard_queries::dashboard_stats(&self.pool, today, month_start)
            .await
            .map_err(classify)
    }

    async fn monthly_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenue>, StoreError> {
        dashboard_queries::monthly_revenue(&self.pool, year).await.map_err(classify)
    }
}
