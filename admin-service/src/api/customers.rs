use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use water_client::domain::{Customer, CustomerUpdate, NewCustomer};

use super::AppState;
use crate::activity;
use crate::auth::{self, AuthUser};
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

fn validate_contact(email: Option<&str>) -> Result<()> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => auth::validate_email(email),
        None => Ok(()),
    }
}

pub async fn list_customers(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<CustomerQuery>,
) -> Result<Json<Vec<Customer>>> {
    Ok(Json(state.store.customers(q.search.as_deref()).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>> {
    let customer = state.store.customer(id).await?.ok_or(AppError::NotFound("customer"))?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(new): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>)> {
    if new.account_number.trim().is_empty() || new.full_name.trim().is_empty() {
        return Err(AppError::Validation("account_number and full_name are required".to_string()));
    }
    validate_contact(new.email.as_deref())?;

    let customer = state.store.create_customer(new).await.map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("a customer with this account number already exists".to_string()),
        other => other,
    })?;

    activity::record(
        state.store.as_ref(),
        Some(auth.id),
        "create",
        "customer",
        Some(customer.id),
        Some(format!("{} ({})", customer.full_name, customer.account_number)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<CustomerUpdate>,
) -> Result<Json<Customer>> {
    if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("full_name must not be empty".to_string()));
    }
    validate_contact(update.email.as_deref())?;

    let customer = state
        .store
        .update_customer(id, update)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    activity::record(state.store.as_ref(), Some(auth.id), "update", "customer", Some(id), None).await;
    Ok(Json(customer))
}

/// Deleting a customer takes its meters, readings, bills and payments with
/// it. That is allowed, but it is logged loudly.
pub async fn delete_customer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let customer = state.store.customer(id).await?.ok_or(AppError::NotFound("customer"))?;
    let dependents = state.store.customer_dependents(id).await?;

    let details = if dependents.is_empty() {
        format!("{} ({})", customer.full_name, customer.account_number)
    } else {
        tracing::warn!(
            customer_id = %id,
            meters = dependents.meters,
            bills = dependents.bills,
            "deleting customer cascades to dependent records"
        );
        format!(
            "{} ({}); cascaded {} meter(s) and {} bill(s)",
            customer.full_name, customer.account_number, dependents.meters, dependents.bills
        )
    };

    if !state.store.delete_customer(id).await? {
        return Err(AppError::NotFound("customer"));
    }

    activity::record(state.store.as_ref(), Some(auth.id), "delete", "customer", Some(id), Some(details)).await;
    Ok(StatusCode::NO_CONTENT)
}
