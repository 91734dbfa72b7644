mod handlers;
mod types;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use hookreg_core::Status;
use hookreg_storage::DocumentStore;

use crate::error::ApiError;
use crate::resources::Reply;
use crate::service::RegistryService;

use types::ErrorResponse;

/// Header carrying the username the gateway authenticated.
pub const USERNAME_HEADER: &str = "x-username";

const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB

pub struct AppState<S: DocumentStore> {
    pub service: Arc<RegistryService<S>>,
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(pub String);

impl<St: Send + Sync> FromRequestParts<St> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Requester(v.to_string()))
            .ok_or(ApiError::MissingIdentity)
    }
}

fn status_code(status: Status) -> StatusCode {
    StatusCode::from_u16(status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status_code(self.status()), Json(body)).into_response()
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (status_code(self.status), Json(self.payload)).into_response()
    }
}

pub fn create_router<S: DocumentStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/v1/accounts", post(handlers::create_account))
        .route(
            "/v1/accounts/{id}",
            get(handlers::get_account)
                .patch(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route("/v1/account", patch(handlers::update_own_account))
        .route("/v1/registrations", post(handlers::create_registration))
        .route(
            "/v1/registrations/{id}",
            get(handlers::get_registration)
                .patch(handlers::update_registration)
                .delete(handlers::delete_registration),
        )
        .route("/v1/subscriptions", post(handlers::create_subscription))
        .route(
            "/v1/subscriptions/{id}",
            get(handlers::get_subscription).delete(handlers::delete_subscription),
        )
        .route(
            "/v1/admin/accounts",
            delete(handlers::delete_non_admin_accounts),
        )
        .route("/v1/admin/{table}", delete(handlers::delete_table))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .with_state(state)
}
