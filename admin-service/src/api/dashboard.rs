use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use water_client::domain::{ActivityEntry, DashboardStats, MonthlyRevenue};

use super::{today, AppState};
use crate::activity;
use crate::auth::AuthUser;
use crate::error::{AppError, Result};

pub async fn dashboard(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<DashboardStats>> {
    let today = today();
    let month_start = today
        .replace_day(1)
        .map_err(|e| AppError::Internal(format!("month start: {e}")))?;
    Ok(Json(state.store.dashboard(today, month_start).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RevenueReport {
    pub year: i32,
    pub months: Vec<MonthlyRevenue>,
    pub total_billed: Decimal,
    pub total_collected: Decimal,
}

impl RevenueReport {
    fn new(year: i32, months: Vec<MonthlyRevenue>) -> Self {
        let total_billed = months.iter().map(|m| m.billed).sum();
        let total_collected = months.iter().map(|m| m.collected).sum();
        Self {
            year,
            months,
            total_billed,
            total_collected,
        }
    }
}

/// Billed against collected per calendar month; defaults to the current year.
pub async fn revenue_report(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<RevenueQuery>,
) -> Result<Json<RevenueReport>> {
    let year = q.year.unwrap_or_else(|| today().year());
    if !(1900..=9999).contains(&year) {
        return Err(AppError::Validation(format!("year {year} is out of range")));
    }
    let months = state.store.monthly_revenue(year).await?;
    Ok(Json(RevenueReport::new(year, months)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

pub async fn activity(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>> {
    Ok(Json(activity::recent(state.store.as_ref(), q.limit).await?))
}
