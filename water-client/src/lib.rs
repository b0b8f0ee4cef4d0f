//! Typed access to the water utility's administrative database.
//!
//! `domain` holds the row types, `db` the one-query-per-function access
//! layer over a `sqlx::PgPool`.

pub mod db;
pub mod domain;
