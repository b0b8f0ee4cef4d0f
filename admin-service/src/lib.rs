pub mod activity;
pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod import;
pub mod metrics_server;
pub mod observability;
pub mod store;

pub use api::AppState;
pub use import::{Envelope, Pipeline};
