use anyhow::Result;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use crate::domain::{Bill, BillStatus, BillWithCustomer, NewBill};

/// List bills newest first.
///
/// The status filter is applied against the *effective* status: a pending
/// bill whose due date is before `today` matches `overdue`, not `pending`.
pub async fn list_bills(
    pool: &PgPool,
    status: Option<BillStatus>,
    customer_id: Option<Uuid>,
    today: Date,
) -> Result<Vec<BillWithCustomer>> {
    let rows = sqlx::query_as::<_, BillWithCustomer>(
        r#"
        SELECT
            b.id,
            b.bill_number,
            b.customer_id,
            b.meter_id,
            b.reading_id,
            b.period_start,
            b.period_end,
            b.consumption,
            b.rate,
            b.amount,
            b.due_date,
            b.status,
            b.created_at,
            b.paid_at,
            c.full_name AS customer_name,
            c.account_number,
            COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.bill_id = b.id), 0) AS amount_paid
        FROM bills b
        JOIN customers c ON c.id = b.customer_id
        WHERE ($1::text IS NULL
               OR ($1 = 'overdue' AND (b.status = 'overdue' OR (b.status = 'pending' AND b.due_date < $3)))
               OR ($1 = 'pending' AND b.status = 'pending' AND b.due_date >= $3)
               OR ($1 NOT IN ('overdue', 'pending') AND b.status = $1))
          AND ($2::uuid IS NULL OR b.customer_id = $2)
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(customer_id)
    .bind(today)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_bill(pool: &PgPool, id: Uuid) -> Result<Option<BillWithCustomer>> {
    let row = sqlx::query_as::<_, BillWithCustomer>(
        r#"
        SELECT
            b.id,
            b.bill_number,
            b.customer_id,
            b.meter_id,
            b.reading_id,
            b.period_start,
            b.period_end,
            b.consumption,
            b.rate,
            b.amount,
            b.due_date,
            b.status,
            b.created_at,
            b.paid_at,
            c.full_name AS customer_name,
            c.account_number,
            COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.bill_id = b.id), 0) AS amount_paid
        FROM bills b
        JOIN customers c ON c.id = b.customer_id
        WHERE b.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn insert_bill(pool: &PgPool, new: &NewBill) -> Result<Bill> {
    let row = sqlx::query_as::<_, Bill>(
        r#"
        INSERT INTO bills
            (id, bill_number, customer_id, meter_id, reading_id, period_start, period_end,
             consumption, rate, amount, due_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending')
        RETURNING id, bill_number, customer_id, meter_id, reading_id, period_start, period_end,
                  consumption, rate, amount, due_date, status, created_at, paid_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.bill_number)
    .bind(new.customer_id)
    .bind(new.meter_id)
    .bind(new.reading_id)
    .bind(new.period_start)
    .bind(new.period_end)
    .bind(new.consumption)
    .bind(new.rate)
    .bind(new.amount)
    .bind(new.due_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Set a bill's stored status. `paid_at` is stamped when moving to `paid`
/// and cleared otherwise.
pub async fn set_bill_status(pool: &PgPool, id: Uuid, status: BillStatus) -> Result<Option<Bill>> {
    let row = sqlx::query_as::<_, Bill>(
        r#"
        UPDATE bills
        SET status  = $2,
            paid_at = CASE WHEN $2 = 'paid' THEN COALESCE(paid_at, NOW()) ELSE NULL END
        WHERE id = $1
        RETURNING id, bill_number, customer_id, meter_id, reading_id, period_start, period_end,
                  consumption, rate, amount, due_date, status, created_at, paid_at
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_bill(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bills WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist `overdue` for every pending bill whose due date has passed.
pub async fn mark_overdue(pool: &PgPool, today: Date) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE bills
        SET status = 'overdue'
        WHERE status = 'pending'
          AND due_date < $1
        "#,
    )
    .bind(today)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
