use hookreg_core::document::{FieldError, Filter, Record, Table};

/// The three fault classes a document store can raise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The operation was well formed but the store rejected or failed it.
    #[error("store runtime error: {0}")]
    Runtime(String),

    /// The store could not be reached or the session is broken.
    #[error("store connectivity error: {0}")]
    Connectivity(String),

    /// The caller passed an argument of the wrong shape.
    #[error("invalid store argument: {0}")]
    InvalidArgument(String),
}

impl From<FieldError> for StoreError {
    fn from(e: FieldError) -> Self {
        StoreError::InvalidArgument(e.to_string())
    }
}

pub trait DocumentStore: Send + Sync {
    /// Fetches one record by id. `None` when absent.
    fn get(
        &self,
        table: Table,
        id: &str,
    ) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;

    fn query(
        &self,
        table: Table,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    /// Stores a new record and returns it as persisted, including its id.
    fn insert(
        &self,
        table: Table,
        record: Record,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// Merges `updates` into the record with the given id and returns the
    /// merged record, or `None` when no record has that id.
    fn update(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;

    /// Returns the number of records removed.
    fn delete(&self, table: Table, id: &str)
    -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn delete_all(&self, table: Table) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn delete_specific(
        &self,
        table: Table,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Checks the arguments every backend shares before touching storage.
pub(crate) fn check_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidArgument(
            "record id must not be empty".to_string(),
        ));
    }
    Ok(())
}
