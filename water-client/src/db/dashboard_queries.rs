use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use time::Date;

use crate::db::activity_queries;
use crate::domain::{DashboardStats, MonthlyRevenue};

const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Debug, sqlx::FromRow)]
struct DashboardCounts {
    total_customers: i64,
    active_meters: i64,
    pending_bills: i64,
    overdue_bills: i64,
    outstanding_amount: Decimal,
    total_revenue: Decimal,
    revenue_this_month: Decimal,
    readings_this_month: i64,
}

/// Headline numbers for the dashboard. Pending bills past due count as
/// overdue; cancelled bills are ignored.
pub async fn dashboard_stats(pool: &PgPool, today: Date, month_start: Date) -> Result<DashboardStats> {
    let counts = sqlx::query_as::<_, DashboardCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM customers) AS total_customers,
            (SELECT COUNT(*) FROM meters WHERE status = 'active') AS active_meters,
            (SELECT COUNT(*) FROM bills
              WHERE status = 'pending' AND due_date >= $1) AS pending_bills,
            (SELECT COUNT(*) FROM bills
              WHERE status = 'overdue' OR (status = 'pending' AND due_date < $1)) AS overdue_bills,
            (SELECT COALESCE(SUM(b.amount - COALESCE(p.paid, 0)), 0)
               FROM bills b
               LEFT JOIN (SELECT bill_id, SUM(amount) AS paid FROM payments GROUP BY bill_id) p
                 ON p.bill_id = b.id
              WHERE b.status IN ('pending', 'overdue')) AS outstanding_amount,
            (SELECT COALESCE(SUM(amount), 0) FROM payments) AS total_revenue,
            (SELECT COALESCE(SUM(amount), 0) FROM payments
              WHERE paid_on >= $2 AND paid_on <= $1) AS revenue_this_month,
            (SELECT COUNT(*) FROM meter_readings
              WHERE reading_date >= $2) AS readings_this_month
        "#,
    )
    .bind(today)
    .bind(month_start)
    .fetch_one(pool)
    .await?;

    let recent_activity = activity_queries::recent_activity(pool, RECENT_ACTIVITY_LIMIT).await?;

    Ok(DashboardStats {
        total_customers: counts.total_customers,
        active_meters: counts.active_meters,
        pending_bills: counts.pending_bills,
        overdue_bills: counts.overdue_bills,
        outstanding_amount: counts.outstanding_amount,
        total_revenue: counts.total_revenue,
        revenue_this_month: counts.revenue_this_month,
        readings_this_month: counts.readings_this_month,
        recent_activity,
    })
}

/// Billed (by period end) and collected (by payment date) totals for each
/// month of `year`. Always returns twelve rows.
pub async fn monthly_revenue(pool: &PgPool, year: i32) -> Result<Vec<MonthlyRevenue>> {
    let rows = sqlx::query_as::<_, MonthlyRevenue>(
        r#"
        SELECT
            m.month::int4 AS month,
            COALESCE((
                SELECT SUM(b.amount) FROM bills b
                WHERE b.status <> 'cancelled'
                  AND EXTRACT(YEAR FROM b.period_end)::int4 = $1
                  AND EXTRACT(MONTH FROM b.period_end)::int4 = m.month
            ), 0) AS billed,
            COALESCE((
                SELECT SUM(p.amount) FROM payments p
                WHERE EXTRACT(YEAR FROM p.paid_on)::int4 = $1
                  AND EXTRACT(MONTH FROM p.paid_on)::int4 = m.month
            ), 0) AS collected
        FROM generate_series(1, 12) AS m(month)
        ORDER BY m.month
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
