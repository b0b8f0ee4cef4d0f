use anyhow::{bail, Result};
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc, time::Duration};
use time::OffsetDateTime;
use water_admin_service::{
    activity,
    config::AppConfig,
    import::{Pipeline, ReadingCsvFileSource, ReadingRow, ReadingValidation, StoreReadingSink},
    observability,
    store::{PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_readings <csv_file_path>");
    }
    let file_path = &args[1];

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let import_cfg = &cfg.import;
    let sink = StoreReadingSink::new(
        store.clone(),
        import_cfg.batch_size,
        import_cfg.max_retries,
        Duration::from_millis(import_cfg.retry_backoff_ms),
    );

    let pipeline: Pipeline<_, ReadingRow, _> = Pipeline {
        source: ReadingCsvFileSource::new(file_path),
        transforms: vec![Arc::new(ReadingValidation::new(OffsetDateTime::now_utc().date()))],
        sink,
    };

    let summary = pipeline.run().await?;
    tracing::info!(
        file = %file_path,
        imported = summary.imported,
        skipped = summary.skipped,
        "reading import finished"
    );

    activity::record(
        store.as_ref(),
        None,
        "import",
        "meter_reading",
        None,
        Some(format!("{file_path}: {} imported, {} skipped", summary.imported, summary.skipped)),
    )
    .await;

    Ok(())
}
