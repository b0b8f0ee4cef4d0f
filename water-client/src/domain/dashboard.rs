use rust_decimal::Decimal;

use super::ActivityEntry;

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DashboardStats {
    pub total_customers: i64,
    pub active_meters: i64,
    pub pending_bills: i64,
    pub overdue_bills: i64,
    pub outstanding_amount: Decimal,
    pub total_revenue: Decimal,
    pub revenue_this_month: Decimal,
    pub readings_this_month: i64,
    pub recent_activity: Vec<ActivityEntry>,
}

/// Billed and collected totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlyRevenue {
    pub month: i32,
    pub billed: Decimal,
    pub collected: Decimal,
}
