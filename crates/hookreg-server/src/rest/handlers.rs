use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use hookreg_core::{
    FieldError, Target,
    document::{Record, Table, string_field},
};
use hookreg_storage::DocumentStore;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::resources::{Lookup, Reply, UpdateTarget};
use crate::service::{RegistryService, surface_fault};

use super::types::CreateSubscriptionRequest;
use super::{AppState, Requester};

async fn requester_account_id<S: DocumentStore>(
    service: &RegistryService<S>,
    username: &str,
) -> Result<String, ApiError> {
    service
        .lookup_account_id(username)
        .await
        .map_err(|e| surface_fault("lookup_account_id", Table::Accounts, e))?
        .ok_or_else(|| ApiError::UnknownUsername(username.to_string()))
}

async fn require_registration<S: DocumentStore>(
    service: &RegistryService<S>,
    id: &str,
) -> Result<(), ApiError> {
    let exists = service
        .registration_id_exists(id)
        .await
        .map_err(|e| surface_fault("registration_id_exists", Table::Registrations, e))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("registration '{id}'")))
    }
}

/// Only admins may grant or revoke the admin role.
async fn guard_role_change<S: DocumentStore>(
    service: &RegistryService<S>,
    username: &str,
    updates: &Record,
) -> Result<(), ApiError> {
    if updates.contains_key("is_admin") {
        service.validate_access(username, &Target::None).await?;
    }
    Ok(())
}

pub async fn create_account<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Json(account): Json<Record>,
) -> Result<Reply, ApiError> {
    state.service.validate_access(&username, &Target::None).await?;

    let Some(new_username) = string_field(&account, "username") else {
        return Err(ApiError::InvalidRequest(
            "account requires a username".to_string(),
        ));
    };
    let taken = state
        .service
        .lookup_account_id(new_username)
        .await
        .map_err(|e| surface_fault("create_account", Table::Accounts, e))?;
    if taken.is_some() {
        return Err(ApiError::InvalidRequest(format!(
            "username '{new_username}' is already taken"
        )));
    }

    state.service.insert(Table::Accounts, account).await
}

pub async fn get_account<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    state
        .service
        .validate_access(&username, &Target::account(id.as_str()))
        .await?;
    state.service.query(Table::Accounts, Lookup::Id(id)).await
}

pub async fn update_account<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
    Json(updates): Json<Record>,
) -> Result<Reply, ApiError> {
    state
        .service
        .validate_access(&username, &Target::account(id.as_str()))
        .await?;
    guard_role_change(&state.service, &username, &updates).await?;
    state
        .service
        .update(Table::Accounts, UpdateTarget::Id(id), &updates)
        .await
}

pub async fn update_own_account<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Json(updates): Json<Record>,
) -> Result<Reply, ApiError> {
    guard_role_change(&state.service, &username, &updates).await?;
    state
        .service
        .update(Table::Accounts, UpdateTarget::Username(username), &updates)
        .await
}

pub async fn delete_account<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    state
        .service
        .validate_access(&username, &Target::account(id.as_str()))
        .await?;
    state.service.delete_account(&id).await
}

pub async fn create_registration<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Json(mut registration): Json<Record>,
) -> Result<Reply, ApiError> {
    let account_id = requester_account_id(&state.service, &username).await?;
    registration.insert("account_id".to_string(), Value::String(account_id));
    state
        .service
        .insert(Table::Registrations, registration)
        .await
}

pub async fn get_registration<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    require_registration(&state.service, &id).await?;
    state
        .service
        .validate_access(&username, &Target::registration(id.as_str()))
        .await?;
    state
        .service
        .query(Table::Registrations, Lookup::Id(id))
        .await
}

pub async fn update_registration<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
    Json(updates): Json<Record>,
) -> Result<Reply, ApiError> {
    require_registration(&state.service, &id).await?;
    state
        .service
        .validate_access(&username, &Target::registration(id.as_str()))
        .await?;
    state
        .service
        .update(Table::Registrations, UpdateTarget::Id(id), &updates)
        .await
}

pub async fn delete_registration<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    require_registration(&state.service, &id).await?;
    state
        .service
        .validate_access(&username, &Target::registration(id.as_str()))
        .await?;
    state.service.delete_registration(&id).await
}

pub async fn create_subscription<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Reply, ApiError> {
    require_registration(&state.service, &req.registration_id).await?;
    let account_id = requester_account_id(&state.service, &username).await?;

    let subscription = Record::from_iter([
        ("account_id".to_string(), Value::String(account_id)),
        (
            "registration_id".to_string(),
            Value::String(req.registration_id),
        ),
    ]);
    state
        .service
        .insert(Table::Subscriptions, subscription)
        .await
}

pub async fn get_subscription<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    state
        .service
        .validate_access(&username, &Target::subscription(id.as_str()))
        .await?;
    state
        .service
        .query(Table::Subscriptions, Lookup::Id(id))
        .await
}

pub async fn delete_subscription<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(id): Path<String>,
) -> Result<Reply, ApiError> {
    state
        .service
        .validate_access(&username, &Target::subscription(id.as_str()))
        .await?;
    state.service.delete(Table::Subscriptions, &id).await
}

pub async fn delete_non_admin_accounts<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
) -> Result<Reply, ApiError> {
    state.service.validate_access(&username, &Target::None).await?;
    state.service.delete_accounts_except_admins().await
}

pub async fn delete_table<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Requester(username): Requester,
    Path(table): Path<String>,
) -> Result<Reply, ApiError> {
    state.service.validate_access(&username, &Target::None).await?;
    let table: Table = table
        .parse()
        .map_err(|e: FieldError| ApiError::InvalidRequest(e.to_string()))?;
    state.service.delete_all(table).await
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
