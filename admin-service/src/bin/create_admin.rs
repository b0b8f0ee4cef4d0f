use anyhow::{bail, Result};
use sqlx::postgres::PgPoolOptions;
use std::env;
use water_admin_service::{
    activity, auth,
    config::AppConfig,
    observability,
    store::{PgStore, Store, StoreError},
};
use water_client::domain::{NewUser, UserRole};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: create_admin <email> <full name>  (password from WATER_ADMIN_PASSWORD)");
    }
    let email = args[1].trim().to_lowercase();
    let full_name = args[2..].join(" ");
    let password = env::var("WATER_ADMIN_PASSWORD")
        .map_err(|_| anyhow::anyhow!("WATER_ADMIN_PASSWORD must be set"))?;

    auth::validate_email(&email)?;
    auth::validate_password(&password)?;
    if full_name.trim().is_empty() {
        bail!("full name must not be empty");
    }

    let cfg = AppConfig::load()?;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgStore::new(pool);

    let user = match store
        .create_user(NewUser {
            email: email.clone(),
            full_name: full_name.trim().to_string(),
            password_hash: auth::hash_password(&password)?,
            role: UserRole::Admin,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => bail!("a user with email {email} already exists"),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, email = %user.email, "administrator created");
    activity::record(&store, None, "create", "user", Some(user.id), Some(format!("{} (admin)", user.email))).await;

    Ok(())
}
