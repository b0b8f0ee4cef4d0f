use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActivityEntry, NewActivity};

pub async fn insert_activity(pool: &PgPool, new: &NewActivity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (id, user_id, action, entity, entity_id, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(&new.action)
    .bind(&new.entity)
    .bind(new.entity_id)
    .bind(&new.details)
    .execute(pool)
    .await?;

    Ok(())
}

/// Newest activity first, with the acting user's name when known.
pub async fn recent_activity(pool: &PgPool, limit: i64) -> Result<Vec<ActivityEntry>> {
    let rows = sqlx::query_as::<_, ActivityEntry>(
        r#"
        SELECT
            a.id,
            a.user_id,
            u.full_name AS user_name,
            a.action,
            a.entity,
            a.entity_id,
            a.details,
            a.created_at
        FROM activity_log a
        LEFT JOIN users u ON u.id = a.user_id
        ORDER BY a.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
