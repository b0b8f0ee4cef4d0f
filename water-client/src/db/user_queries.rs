use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewUser, User};

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, full_name, password_hash, role, active, created_at
        FROM users
        WHERE LOWER(email) = LOWER($1)
        "#,
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, full_name, password_hash, role, active, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, full_name, password_hash, role, active, created_at
        FROM users
        ORDER BY full_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn insert_user(pool: &PgPool, new: &NewUser) -> Result<User> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, full_name, password_hash, role, active)
        VALUES ($1, LOWER($2), $3, $4, $5, TRUE)
        RETURNING id, email, full_name, password_hash, role, active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.email.trim())
    .bind(new.full_name.trim())
    .bind(&new.password_hash)
    .bind(new.role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}
