use std::fmt;
use std::sync::Arc;

use hookreg_storage::{DocumentStore, StoreError};

use crate::error::ApiError;

/// Entry point for authorization decisions and resource operations.
///
/// The behavior is split across `lookups`, `access` and `resources`, each
/// adding an `impl` block to this type.
pub struct RegistryService<S: DocumentStore> {
    pub(crate) store: Arc<S>,
}

impl<S: DocumentStore> RegistryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Logs a store fault once and turns it into the error surfaced to callers.
pub(crate) fn surface_fault(
    operation: &'static str,
    scope: impl fmt::Display,
    fault: StoreError,
) -> ApiError {
    let err = ApiError::Store(fault);
    if err.status().code() >= 500 {
        tracing::error!(operation, scope = %scope, error = %err, "store operation failed");
    } else {
        tracing::warn!(operation, scope = %scope, error = %err, "store rejected arguments");
    }
    err
}
