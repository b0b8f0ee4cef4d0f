use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;
use water_client::db::payment_queries::SettledPayment;
use water_client::domain::{
    ActivityEntry, Bill, BillStatus, BillWithCustomer, Customer, CustomerDependents, CustomerUpdate,
    DashboardStats, Meter, MeterReading, MeterStatus, MeterUpdate, MeterWithCustomer, MonthlyRevenue,
    NewActivity, NewBill, NewCustomer, NewMeter, NewPayment, NewReading, NewUser, Payment, PaymentWithBill,
    ReadingWithMeter, User,
};

use super::{Store, StoreError};
use crate::billing;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    customers: Vec<Customer>,
    meters: Vec<Meter>,
    readings: Vec<MeterReading>,
    bills: Vec<Bill>,
    payments: Vec<Payment>,
    activity: Vec<ActivityEntry>,
}

impl Tables {
    fn paid_for(&self, bill_id: Uuid) -> Decimal {
        self.payments
            .iter()
            .filter(|p| p.bill_id == bill_id)
            .map(|p| p.amount)
            .sum()
    }

    fn bill_with_customer(&self, bill: &Bill) -> Option<BillWithCustomer> {
        let customer = self.customers.iter().find(|c| c.id == bill.customer_id)?;
        Some(BillWithCustomer {
            bill: bill.clone(),
            customer_name: customer.full_name.clone(),
            account_number: customer.account_number.clone(),
            amount_paid: self.paid_for(bill.id),
        })
    }

    fn latest_reading(&self, meter_id: Uuid) -> Option<&MeterReading> {
        self.readings
            .iter()
            .filter(|r| r.meter_id == meter_id)
            .max_by_key(|r| (r.reading_date, r.created_at))
    }

    fn insert_reading(&mut self, new: &NewReading) -> Result<MeterReading, StoreError> {
        if !self.meters.iter().any(|m| m.id == new.meter_id) {
            return Err(StoreError::InvalidReference("meter_readings_meter_id_fkey".to_string()));
        }
        let reading = MeterReading {
            id: Uuid::new_v4(),
            meter_id: new.meter_id,
            reading_date: new.reading_date,
            previous_reading: new.previous_reading,
            current_reading: new.current_reading,
            consumption: new.consumption,
            recorded_by: new.recorded_by,
            notes: new.notes.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.readings.push(reading.clone());
        Ok(reading)
    }

    fn remove_bills(&mut self, keep: impl Fn(&Bill) -> bool) {
        let removed: Vec<Uuid> = self.bills.iter().filter(|b| !keep(b)).map(|b| b.id).collect();
        self.bills.retain(|b| keep(b));
        self.payments.retain(|p| !removed.contains(&p.bill_id));
    }
}

/// In-memory [`Store`] with the same constraint and cascade behavior as
/// the PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_activity: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent activity insert fail.
    pub fn fail_activity_writes(&self) {
        self.fail_activity.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        let email = email.trim();
        Ok(t.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        let t = self.tables.lock().await;
        let mut users = t.users.clone();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.lock().await;
        let email = new.email.trim().to_lowercase();
        if t.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email,
            full_name: new.full_name.trim().to_string(),
            password_hash: new.password_hash,
            role: new.role,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn customers(&self, search: Option<&str>) -> Result<Vec<Customer>, StoreError> {
        let t = self.tables.lock().await;
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        let mut rows: Vec<Customer> = t
            .customers
            .iter()
            .filter(|c| match &needle {
                None => true,
                Some(n) => {
                    c.full_name.to_lowercase().contains(n)
                        || c.account_number.to_lowercase().contains(n)
                        || c.email.as_deref().is_some_and(|e| e.to_lowercase().contains(n))
                }
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.full_name, &a.account_number).cmp(&(&b.full_name, &b.account_number)));
        Ok(rows)
    }

    async fn customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, StoreError> {
        let mut t = self.tables.lock().await;
        let account_number = new.account_number.trim().to_string();
        if t.customers.iter().any(|c| c.account_number == account_number) {
            return Err(StoreError::Conflict("customers_account_number_key".to_string()));
        }
        let customer = Customer {
            id: Uuid::new_v4(),
            account_number,
            full_name: new.full_name.trim().to_string(),
            email: new.email,
            phone: new.phone,
            address: new.address,
            status: new.status,
            created_at: OffsetDateTime::now_utc(),
        };
        t.customers.push(customer.clone());
        Ok(customer)
    }

    async fn update_customer(&self, id: Uuid, update: CustomerUpdate) -> Result<Option<Customer>, StoreError> {
        let mut t = self.tables.lock().await;
        Ok(t.customers.iter_mut().find(|c| c.id == id).map(|c| {
            update.apply(c);
            c.clone()
        }))
    }

    async fn customer_dependents(&self, id: Uuid) -> Result<CustomerDependents, StoreError> {
        let t = self.tables.lock().await;
        Ok(CustomerDependents {
            meters: t.meters.iter().filter(|m| m.customer_id == id).count() as i64,
            bills: t.bills.iter().filter(|b| b.customer_id == id).count() as i64,
        })
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.customers.len();
        t.customers.retain(|c| c.id != id);
        if t.customers.len() == before {
            return Ok(false);
        }
        let meter_ids: Vec<Uuid> = t.meters.iter().filter(|m| m.customer_id == id).map(|m| m.id).collect();
        t.meters.retain(|m| m.customer_id != id);
        t.readings.retain(|r| !meter_ids.contains(&r.meter_id));
        t.remove_bills(|b| b.customer_id != id);
        Ok(true)
    }

    async fn meters(&self, customer_id: Option<Uuid>) -> Result<Vec<MeterWithCustomer>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<MeterWithCustomer> = t
            .meters
            .iter()
            .filter(|m| customer_id.map_or(true, |id| m.customer_id == id))
            .filter_map(|m| {
                let c = t.customers.iter().find(|c| c.id == m.customer_id)?;
                Some(MeterWithCustomer {
                    meter: m.clone(),
                    customer_name: c.full_name.clone(),
                    account_number: c.account_number.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.meter.meter_number.cmp(&b.meter.meter_number));
        Ok(rows)
    }

    async fn meter(&self, id: Uuid) -> Result<Option<Meter>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.meters.iter().find(|m| m.id == id).cloned())
    }

    async fn meter_by_number(&self, meter_number: &str) -> Result<Option<Meter>, StoreError> {
        let t = self.tables.lock().await;
        let meter_number = meter_number.trim();
        Ok(t.meters.iter().find(|m| m.meter_number == meter_number).cloned())
    }

    async fn create_meter(&self, new: NewMeter) -> Result<Meter, StoreError> {
        let mut t = self.tables.lock().await;
        let meter_number = new.meter_number.trim().to_string();
        if t.meters.iter().any(|m| m.meter_number == meter_number) {
            return Err(StoreError::Conflict("meters_meter_number_key".to_string()));
        }
        if !t.customers.iter().any(|c| c.id == new.customer_id) {
            return Err(StoreError::InvalidReference("meters_customer_id_fkey".to_string()));
        }
        let meter = Meter {
            id: Uuid::new_v4(),
            meter_number,
            customer_id: new.customer_id,
            location: new.location,
            installation_date: new.installation_date,
            status: new.status,
            created_at: OffsetDateTime::now_utc(),
        };
        t.meters.push(meter.clone());
        Ok(meter)
    }

    async fn update_meter(&self, id: Uuid, update: MeterUpdate) -> Result<Option<Meter>, StoreError> {
        let mut t = self.tables.lock().await;
        Ok(t.meters.iter_mut().find(|m| m.id == id).map(|m| {
            update.apply(m);
            m.clone()
        }))
    }

    async fn delete_meter(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.meters.len();
        t.meters.retain(|m| m.id != id);
        if t.meters.len() == before {
            return Ok(false);
        }
        t.readings.retain(|r| r.meter_id != id);
        for bill in t.bills.iter_mut().filter(|b| b.meter_id == Some(id)) {
            bill.meter_id = None;
        }
        Ok(true)
    }

    async fn readings(&self, meter_id: Option<Uuid>) -> Result<Vec<ReadingWithMeter>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ReadingWithMeter> = t
            .readings
            .iter()
            .filter(|r| meter_id.map_or(true, |id| r.meter_id == id))
            .filter_map(|r| {
                let m = t.meters.iter().find(|m| m.id == r.meter_id)?;
                let c = t.customers.iter().find(|c| c.id == m.customer_id)?;
                Some(ReadingWithMeter {
                    reading: r.clone(),
                    meter_number: m.meter_number.clone(),
                    customer_id: c.id,
                    customer_name: c.full_name.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.reading.reading_date, b.reading.created_at).cmp(&(a.reading.reading_date, a.reading.created_at))
        });
        Ok(rows)
    }

    async fn reading(&self, id: Uuid) -> Result<Option<MeterReading>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.readings.iter().find(|r| r.id == id).cloned())
    }

    async fn latest_reading(&self, meter_id: Uuid) -> Result<Option<MeterReading>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.latest_reading(meter_id).cloned())
    }

    async fn create_reading(&self, new: NewReading) -> Result<MeterReading, StoreError> {
        let mut t = self.tables.lock().await;
        t.insert_reading(&new)
    }

    async fn create_readings(&self, batch: &[NewReading]) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        // All or nothing, like a single INSERT statement.
        if let Some(bad) = batch.iter().find(|r| !t.meters.iter().any(|m| m.id == r.meter_id)) {
            return Err(StoreError::InvalidReference(format!("meter {}", bad.meter_id)));
        }
        for new in batch {
            t.insert_reading(new)?;
        }
        Ok(batch.len() as u64)
    }

    async fn bills(
        &self,
        status: Option<BillStatus>,
        customer_id: Option<Uuid>,
        today: Date,
    ) -> Result<Vec<BillWithCustomer>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<BillWithCustomer> = t
            .bills
            .iter()
            .filter(|b| customer_id.map_or(true, |id| b.customer_id == id))
            .filter(|b| status.map_or(true, |s| billing::effective_status(b.status, b.due_date, today) == s))
            .filter_map(|b| t.bill_with_customer(b))
            .collect();
        rows.sort_by(|a, b| b.bill.created_at.cmp(&a.bill.created_at));
        Ok(rows)
    }

    async fn bill(&self, id: Uuid) -> Result<Option<BillWithCustomer>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.bills.iter().find(|b| b.id == id).and_then(|b| t.bill_with_customer(b)))
    }

    async fn create_bill(&self, new: NewBill) -> Result<Bill, StoreError> {
        let mut t = self.tables.lock().await;
        if t.bills.iter().any(|b| b.bill_number == new.bill_number) {
            return Err(StoreError::Conflict("bills_bill_number_key".to_string()));
        }
        if !t.customers.iter().any(|c| c.id == new.customer_id) {
            return Err(StoreError::InvalidReference("bills_customer_id_fkey".to_string()));
        }
        let bill = Bill {
            id: Uuid::new_v4(),
            bill_number: new.bill_number,
            customer_id: new.customer_id,
            meter_id: new.meter_id,
            reading_id: new.reading_id,
            period_start: new.period_start,
            period_end: new.period_end,
            consumption: new.consumption,
            rate: new.rate,
            amount: new.amount,
            due_date: new.due_date,
            status: BillStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            paid_at: None,
        };
        t.bills.push(bill.clone());
        Ok(bill)
    }

    async fn set_bill_status(&self, id: Uuid, status: BillStatus) -> Result<Option<Bill>, StoreError> {
        let mut t = self.tables.lock().await;
        Ok(t.bills.iter_mut().find(|b| b.id == id).map(|b| {
            b.status = status;
            b.paid_at = match status {
                BillStatus::Paid => b.paid_at.or_else(|| Some(OffsetDateTime::now_utc())),
                _ => None,
            };
            b.clone()
        }))
    }

    async fn delete_bill(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.bills.len();
        t.remove_bills(|b| b.id != id);
        Ok(t.bills.len() != before)
    }

    async fn mark_overdue(&self, today: Date) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        let mut flipped = 0;
        for bill in t
            .bills
            .iter_mut()
            .filter(|b| b.status == BillStatus::Pending && b.due_date < today)
        {
            bill.status = BillStatus::Overdue;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn payments(&self, bill_id: Option<Uuid>) -> Result<Vec<PaymentWithBill>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<PaymentWithBill> = t
            .payments
            .iter()
            .filter(|p| bill_id.map_or(true, |id| p.bill_id == id))
            .filter_map(|p| {
                let b = t.bills.iter().find(|b| b.id == p.bill_id)?;
                let c = t.customers.iter().find(|c| c.id == b.customer_id)?;
                Some(PaymentWithBill {
                    payment: p.clone(),
                    bill_number: b.bill_number.clone(),
                    customer_id: c.id,
                    customer_name: c.full_name.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| (b.payment.paid_on, b.payment.created_at).cmp(&(a.payment.paid_on, a.payment.created_at)));
        Ok(rows)
    }

    async fn record_payment(&self, new: NewPayment) -> Result<SettledPayment, StoreError> {
        let mut t = self.tables.lock().await;
        let already_paid = t.paid_for(new.bill_id);
        let bill = t
            .bills
            .iter()
            .find(|b| b.id == new.bill_id)
            .cloned()
            .ok_or(StoreError::NotFound("record"))?;

        let settles = billing::apply_payment(bill.status, bill.amount, already_paid, new.amount)?;
        if t.payments.iter().any(|p| p.payment_number == new.payment_number) {
            return Err(StoreError::Conflict("payments_payment_number_key".to_string()));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            payment_number: new.payment_number,
            bill_id: new.bill_id,
            amount: new.amount,
            method: new.method,
            reference: new.reference,
            paid_on: new.paid_on,
            received_by: new.received_by,
            created_at: OffsetDateTime::now_utc(),
        };
        t.payments.push(payment.clone());

        let bill = match t.bills.iter_mut().find(|b| b.id == new.bill_id) {
            Some(stored) if settles => {
                stored.status = BillStatus::Paid;
                stored.paid_at = Some(OffsetDateTime::now_utc());
                stored.clone()
            }
            _ => bill,
        };

        Ok(SettledPayment { payment, bill })
    }

    async fn log_activity(&self, new: NewActivity) -> Result<(), StoreError> {
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("activity_log unavailable")));
        }
        let mut t = self.tables.lock().await;
        let user_name = new
            .user_id
            .and_then(|id| t.users.iter().find(|u| u.id == id))
            .map(|u| u.full_name.clone());
        t.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            user_name,
            action: new.action,
            entity: new.entity,
            entity_id: new.entity_id,
            details: new.details,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError> {
        let t = self.tables.lock().await;
        // Insertion order is creation order.
        Ok(t.activity
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn dashboard(&self, today: Date, month_start: Date) -> Result<DashboardStats, StoreError> {
        let recent_activity = self.recent_activity(10).await?;
        let t = self.tables.lock().await;

        let outstanding_amount: Decimal = t
            .bills
            .iter()
            .filter(|b| b.status.is_open())
            .map(|b| b.amount - t.paid_for(b.id))
            .sum();

        Ok(DashboardStats {
            total_customers: t.customers.len() as i64,
            active_meters: t.meters.iter().filter(|m| m.status == MeterStatus::Active).count() as i64,
            pending_bills: t
                .bills
                .iter()
                .filter(|b| billing::effective_status(b.status, b.due_date, today) == BillStatus::Pending)
                .count() as i64,
            overdue_bills: t
                .bills
                .iter()
                .filter(|b| billing::effective_status(b.status, b.due_date, today) == BillStatus::Overdue)
                .count() as i64,
            outstanding_amount,
            total_revenue: t.payments.iter().map(|p| p.amount).sum(),
            revenue_this_month: t
                .payments
                .iter()
                .filter(|p| p.paid_on >= month_start && p.paid_on <= today)
                .map(|p| p.amount)
                .sum(),
            readings_this_month: t.readings.iter().filter(|r| r.reading_date >= month_start).count() as i64,
            recent_activity,
        })
    }

    async fn monthly_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenue>, StoreError> {
        let t = self.tables.lock().await;
        Ok((1..=12u8)
            .map(|month| MonthlyRevenue {
                month: i32::from(month),
                billed: t
                    .bills
                    .iter()
                    .filter(|b| b.status != BillStatus::Cancelled)
                    .filter(|b| b.period_end.year() == year && u8::from(b.period_end.month()) == month)
                    .map(|b| b.amount)
                    .sum(),
                collected: t
                    .payments
                    .iter()
                    .filter(|p| p.paid_on.year() == year && u8::from(p.paid_on.month()) == month)
                    .map(|p| p.amount)
                    .sum(),
            })
            .collect())
    }
}
