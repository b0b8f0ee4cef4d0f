use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Customer, CustomerDependents, CustomerUpdate, NewCustomer};

/// List customers by name, optionally filtered by a case-insensitive match
/// on name, account number or email.
pub async fn list_customers(pool: &PgPool, search: Option<&str>) -> Result<Vec<Customer>> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let rows = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, account_number, full_name, email, phone, address, status, created_at
        FROM customers
        WHERE $1::text IS NULL
           OR full_name ILIKE $1
           OR account_number ILIKE $1
           OR email ILIKE $1
        ORDER BY full_name, account_number
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<Option<Customer>> {
    let row = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, account_number, full_name, email, phone, address, status, created_at
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn insert_customer(pool: &PgPool, new: &NewCustomer) -> Result<Customer> {
    let row = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (id, account_number, full_name, email, phone, address, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, account_number, full_name, email, phone, address, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.account_number.trim())
    .bind(new.full_name.trim())
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.address)
    .bind(new.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Apply a partial update. Returns `None` when the customer does not exist.
pub async fn update_customer(pool: &PgPool, id: Uuid, update: &CustomerUpdate) -> Result<Option<Customer>> {
    let row = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET full_name = COALESCE($2, full_name),
            email     = COALESCE($3, email),
            phone     = COALESCE($4, phone),
            address   = COALESCE($5, address),
            status    = COALESCE($6, status)
        WHERE id = $1
        RETURNING id, account_number, full_name, email, phone, address, status, created_at
        "#,
    )
    .bind(id)
    .bind(&update.full_name)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(&update.address)
    .bind(update.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Delete a customer. Meters, readings, bills and payments cascade at the
/// schema level.
pub async fn delete_customer(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn customer_dependents(pool: &PgPool, id: Uuid) -> Result<CustomerDependents> {
    let row = sqlx::query_as::<_, CustomerDependents>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM meters WHERE customer_id = $1) AS meters,
            (SELECT COUNT(*) FROM bills  WHERE customer_id = $1) AS bills
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
