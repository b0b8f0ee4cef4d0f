use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use water_admin_service::{
    api::{self, AppState},
    auth::TokenIssuer,
    config::AppConfig,
    metrics_server, observability,
    store::PgStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Schema is applied out-of-band from `sql/schema/*.sql`.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        TokenIssuer::new(&cfg.auth.jwt_secret, cfg.auth.token_ttl_minutes),
        cfg.billing.clone(),
    );
    let cors = api::cors_layer(cfg.http.cors_allowed_origin.as_deref())?;
    let app = api::router(state, cors);

    let listener = tokio::net::TcpListener::bind(&cfg.http.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", cfg.http.bind_addr))?;
    tracing::info!(addr = %cfg.http.bind_addr, "admin API listening");

    api::serve(listener, app).await?;
    tracing::info!("admin API stopped");

    Ok(())
}
