pub mod activity_queries;
pub mod bill_queries;
pub mod customer_queries;
pub mod dashboard_queries;
pub mod meter_queries;
pub mod payment_queries;
pub mod reading_queries;
pub mod user_queries;
