use hookreg_core::{Status, Target};
use hookreg_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("'{username}' is not authorized to access {target}")]
    Unauthorized { username: String, target: Target },

    #[error("request carries no authenticated username")]
    MissingIdentity,

    #[error("no account found for username '{0}'")]
    UnknownUsername(String),

    #[error("no record matched the update")]
    NothingUpdated,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Unauthorized { .. } | ApiError::MissingIdentity => Status::Unauthorized,
            ApiError::UnknownUsername(_)
            | ApiError::NothingUpdated
            | ApiError::InvalidRequest(_)
            | ApiError::Store(StoreError::InvalidArgument(_)) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Store(StoreError::Runtime(_) | StoreError::Connectivity(_)) => {
                Status::InternalServerError
            }
        }
    }

    /// The store fault behind this error, kept for upstream inspection.
    pub fn fault(&self) -> Option<&StoreError> {
        match self {
            ApiError::Store(e) => Some(e),
            _ => None,
        }
    }
}
