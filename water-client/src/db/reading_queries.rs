use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{MeterReading, NewReading, ReadingWithMeter};

/// List readings newest first, joined with meter number and customer.
pub async fn list_readings(pool: &PgPool, meter_id: Option<Uuid>) -> Result<Vec<ReadingWithMeter>> {
    let rows = sqlx::query_as::<_, ReadingWithMeter>(
        r#"
        SELECT
            r.id,
            r.meter_id,
            r.reading_date,
            r.previous_reading,
            r.current_reading,
            r.consumption,
            r.recorded_by,
            r.notes,
            r.created_at,
            m.meter_number,
            m.customer_id,
            c.full_name AS customer_name
        FROM meter_readings r
        JOIN meters m    ON m.id = r.meter_id
        JOIN customers c ON c.id = m.customer_id
        WHERE $1::uuid IS NULL OR r.meter_id = $1
        ORDER BY r.reading_date DESC, r.created_at DESC
        "#,
    )
    .bind(meter_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_reading(pool: &PgPool, id: Uuid) -> Result<Option<MeterReading>> {
    let row = sqlx::query_as::<_, MeterReading>(
        r#"
        SELECT id, meter_id, reading_date, previous_reading, current_reading,
               consumption, recorded_by, notes, created_at
        FROM meter_readings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// The most recent reading for a meter, by reading date then insertion time.
pub async fn latest_reading(pool: &PgPool, meter_id: Uuid) -> Result<Option<MeterReading>> {
    let row = sqlx::query_as::<_, MeterReading>(
        r#"
        SELECT id, meter_id, reading_date, previous_reading, current_reading,
               consumption, recorded_by, notes, created_at
        FROM meter_readings
        WHERE meter_id = $1
        ORDER BY reading_date DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(meter_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn insert_reading(pool: &PgPool, new: &NewReading) -> Result<MeterReading> {
    let row = sqlx::query_as::<_, MeterReading>(
        r#"
        INSERT INTO meter_readings
            (id, meter_id, reading_date, previous_reading, current_reading, consumption, recorded_by, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, meter_id, reading_date, previous_reading, current_reading,
                  consumption, recorded_by, notes, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.meter_id)
    .bind(new.reading_date)
    .bind(new.previous_reading)
    .bind(new.current_reading)
    .bind(new.consumption)
    .bind(new.recorded_by)
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Insert many readings in one statement. Returns the number of rows written.
pub async fn insert_readings(pool: &PgPool, batch: &[NewReading]) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO meter_readings (id, meter_id, reading_date, previous_reading, current_reading, consumption, recorded_by, notes) ",
    );

    builder.push_values(batch, |mut b, r| {
        b.push_bind(Uuid::new_v4())
            .push_bind(r.meter_id)
            .push_bind(r.reading_date)
            .push_bind(r.previous_reading)
            .push_bind(r.current_reading)
            .push_bind(r.consumption)
            .push_bind(r.recorded_by)
            .push_bind(r.notes.clone());
    });

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}
