use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use time::{Date, OffsetDateTime};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenIssuer;
use crate::config::BillingConfig;
use crate::store::Store;

mod bills;
mod customers;
mod dashboard;
mod meters;
mod payments;
mod readings;
mod session;
mod users;


/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub billing: BillingConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, billing: BillingConfig) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            billing,
        }
    }
}

/// Calendar date used for due-date and overdue decisions.
pub(crate) fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(session::login))
        .route("/auth/me", get(session::me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/customers", get(customers::list_customers).post(customers::create_customer))
        .route(
            "/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/meters", get(meters::list_meters).post(meters::create_meter))
        .route(
            "/meters/:id",
            get(meters::get_meter)
                .put(meters::update_meter)
                .delete(meters::delete_meter),
        )
        .route("/readings", get(readings::list_readings).post(readings::record_reading))
        .route("/bills", get(bills::list_bills).post(bills::generate_bill))
        .route("/bills/:id", get(bills::get_bill).delete(bills::delete_bill))
        .route("/bills/:id/cancel", post(bills::cancel_bill))
        .route("/payments", get(payments::list_payments).post(payments::record_payment))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/reports/revenue", get(dashboard::revenue_report))
        .route("/activity", get(dashboard::activity))
}

pub fn cors_layer(allowed_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Ok(match allowed_origin {
        Some(origin) => layer.allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("invalid http.cors_allowed_origin '{origin}': {e}"))?,
        ),
        None => layer.allow_origin(Any),
    })
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}
