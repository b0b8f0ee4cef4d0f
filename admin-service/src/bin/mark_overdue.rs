use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use water_admin_service::{
    activity,
    config::AppConfig,
    observability,
    store::{PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgStore::new(pool);

    let today = OffsetDateTime::now_utc().date();
    let updated = store.mark_overdue(today).await?;
    tracing::info!(%today, updated, "marked pending bills past due as overdue");

    if updated > 0 {
        activity::record(&store, None, "mark_overdue", "bill", None, Some(format!("{updated} bill(s)"))).await;
    }

    Ok(())
}
