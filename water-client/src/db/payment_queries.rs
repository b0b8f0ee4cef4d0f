use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::{Bill, NewPayment, Payment, PaymentWithBill};

/// Outcome of a payment written by [`settle_payment`].
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payment: Payment,
    pub bill: Bill,
}

pub async fn list_payments(pool: &PgPool, bill_id: Option<Uuid>) -> Result<Vec<PaymentWithBill>> {
    let rows = sqlx::query_as::<_, PaymentWithBill>(
        r#"
        SELECT
            p.id,
            p.payment_number,
            p.bill_id,
            p.amount,
            p.method,
            p.reference,
            p.paid_on,
            p.received_by,
            p.created_at,
            b.bill_number,
            b.customer_id,
            c.full_name AS customer_name
        FROM payments p
        JOIN bills b     ON b.id = p.bill_id
        JOIN customers c ON c.id = b.customer_id
        WHERE $1::uuid IS NULL OR p.bill_id = $1
        ORDER BY p.paid_on DESC, p.created_at DESC
        "#,
    )
    .bind(bill_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sum received against a bill; runs on a pool or inside a transaction.
pub async fn total_paid<'e, X>(executor: X, bill_id: Uuid) -> Result<Decimal>
where
    X: PgExecutor<'e>,
{
    let (total,): (Decimal,) =
        sqlx::query_as("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE bill_id = $1")
            .bind(bill_id)
            .fetch_one(executor)
            .await?;

    Ok(total)
}

/// Record a payment against a bill atomically.
///
/// The bill row is locked for the duration of the transaction. `check`
/// receives the locked bill and the amount already received against it and
/// decides whether the payment is acceptable, returning `true` when it
/// settles the bill. A rejection from `check` rolls back and is handed back
/// as the inner error; database failures surface as the outer error. A bill
/// that does not exist fails with `sqlx::Error::RowNotFound`.
pub async fn settle_payment<F, E>(
    pool: &PgPool,
    new: &NewPayment,
    check: F,
) -> Result<std::result::Result<SettledPayment, E>>
where
    F: FnOnce(&Bill, Decimal) -> std::result::Result<bool, E>,
{
    let mut tx = pool.begin().await?;

    let bill = sqlx::query_as::<_, Bill>(
        r#"
        SELECT id, bill_number, customer_id, meter_id, reading_id, period_start, period_end,
               consumption, rate, amount, due_date, status, created_at, paid_at
        FROM bills
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(new.bill_id)
    .fetch_one(&mut *tx)
    .await?;

    let already_paid = total_paid(&mut *tx, new.bill_id).await?;

    let settles = match check(&bill, already_paid) {
        Ok(settles) => settles,
        Err(e) => {
            tx.rollback().await?;
            return Ok(Err(e));
        }
    };

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (id, payment_number, bill_id, amount, method, reference, paid_on, received_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, payment_number, bill_id, amount, method, reference, paid_on, received_by, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.payment_number)
    .bind(new.bill_id)
    .bind(new.amount)
    .bind(new.method.as_str())
    .bind(&new.reference)
    .bind(new.paid_on)
    .bind(new.received_by)
    .fetch_one(&mut *tx)
    .await?;

    let bill = if settles {
        sqlx::query_as::<_, Bill>(
            r#"
            UPDATE bills
            SET status = 'paid', paid_at = NOW()
            WHERE id = $1
            RETURNING id, bill_number, customer_id, meter_id, reading_id, period_start, period_end,
                      consumption, rate, amount, due_date, status, created_at, paid_at
            "#,
        )
        .bind(new.bill_id)
        .fetch_one(&mut *tx)
        .await?
    } else {
        bill
    };

    tx.commit().await?;

    Ok(Ok(SettledPayment { payment, bill }))
}
