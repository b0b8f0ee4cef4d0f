use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Meter, MeterUpdate, MeterWithCustomer, NewMeter};

/// List meters with their owner's name, optionally for a single customer.
pub async fn list_meters(pool: &PgPool, customer_id: Option<Uuid>) -> Result<Vec<MeterWithCustomer>> {
    let rows = sqlx::query_as::<_, MeterWithCustomer>(
        r#"
        SELECT
            m.id,
            m.meter_number,
            m.customer_id,
            m.location,
            m.installation_date,
            m.status,
            m.created_at,
            c.full_name AS customer_name,
            c.account_number
        FROM meters m
        JOIN customers c ON c.id = m.customer_id
        WHERE $1::uuid IS NULL OR m.customer_id = $1
        ORDER BY m.meter_number
        "#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_meter(pool: &PgPool, id: Uuid) -> Result<Option<Meter>> {
    let row = sqlx::query_as::<_, Meter>(
        r#"
        SELECT id, meter_number, customer_id, location, installation_date, status, created_at
        FROM meters
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_meter_by_number(pool: &PgPool, meter_number: &str) -> Result<Option<Meter>> {
    let row = sqlx::query_as::<_, Meter>(
        r#"
        SELECT id, meter_number, customer_id, location, installation_date, status, created_at
        FROM meters
        WHERE meter_number = $1
        "#,
    )
    .bind(meter_number.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn insert_meter(pool: &PgPool, new: &NewMeter) -> Result<Meter> {
    let row = sqlx::query_as::<_, Meter>(
        r#"
        INSERT INTO meters (id, meter_number, customer_id, location, installation_date, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, meter_number, customer_id, location, installation_date, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.meter_number.trim())
    .bind(new.customer_id)
    .bind(&new.location)
    .bind(new.installation_date)
    .bind(new.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn update_meter(pool: &PgPool, id: Uuid, update: &MeterUpdate) -> Result<Option<Meter>> {
    let row = sqlx::query_as::<_, Meter>(
        r#"
        UPDATE meters
        SET location          = COALESCE($2, location),
            installation_date = COALESCE($3, installation_date),
            status            = COALESCE($4, status)
        WHERE id = $1
        RETURNING id, meter_number, customer_id, location, installation_date, status, created_at
        "#,
    )
    .bind(id)
    .bind(&update.location)
    .bind(update.installation_date)
    .bind(update.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_meter(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM meters WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
