use hookreg_core::document::{Filter, Record, Table};
use sqlx::types::Json;

use crate::traits::StoreError;

/// SQLSTATE class 22 covers data exceptions such as malformed JSON input.
const DATA_EXCEPTION_CLASS: &str = "22";

pub(crate) fn to_store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connectivity(e.to_string()),
        sqlx::Error::Encode(_)
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. } => StoreError::InvalidArgument(e.to_string()),
        sqlx::Error::Database(ref db_err)
            if db_err
                .code()
                .is_some_and(|code| code.starts_with(DATA_EXCEPTION_CLASS)) =>
        {
            StoreError::InvalidArgument(e.to_string())
        }
        other => StoreError::Runtime(other.to_string()),
    }
}

pub async fn get_document<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    id: &str,
) -> Result<Option<Record>, StoreError> {
    let query = format!("SELECT doc FROM {table} WHERE id = $1");
    let row: Option<(Json<Record>,)> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(to_store_error)?;
    Ok(row.map(|(Json(doc),)| doc))
}

pub async fn query_documents<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    filter: &Filter,
) -> Result<Vec<Record>, StoreError> {
    let query = format!("SELECT doc FROM {table} WHERE doc @> $1 ORDER BY created_at, id");
    let rows: Vec<(Json<Record>,)> = sqlx::query_as(&query)
        .bind(Json(filter.to_document()))
        .fetch_all(executor)
        .await
        .map_err(to_store_error)?;
    Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
}

pub async fn insert_document<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    id: &str,
    record: &Record,
) -> Result<Record, StoreError> {
    let query = format!("INSERT INTO {table} (id, doc) VALUES ($1, $2) RETURNING doc");
    let row: (Json<Record>,) = sqlx::query_as(&query)
        .bind(id)
        .bind(Json(record))
        .fetch_one(executor)
        .await
        .map_err(to_store_error)?;
    Ok(row.0.0)
}

pub async fn merge_document<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    id: &str,
    updates: &Record,
) -> Result<Option<Record>, StoreError> {
    let query = format!("UPDATE {table} SET doc = doc || $2 WHERE id = $1 RETURNING doc");
    let row: Option<(Json<Record>,)> = sqlx::query_as(&query)
        .bind(id)
        .bind(Json(updates))
        .fetch_optional(executor)
        .await
        .map_err(to_store_error)?;
    Ok(row.map(|(Json(doc),)| doc))
}

pub async fn delete_document<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    id: &str,
) -> Result<u64, StoreError> {
    let query = format!("DELETE FROM {table} WHERE id = $1");
    let result = sqlx::query(&query)
        .bind(id)
        .execute(executor)
        .await
        .map_err(to_store_error)?;
    Ok(result.rows_affected())
}

pub async fn delete_matching_documents<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    table: Table,
    filter: &Filter,
) -> Result<u64, StoreError> {
    let query = format!("DELETE FROM {table} WHERE doc @> $1");
    let result = sqlx::query(&query)
        .bind(Json(filter.to_document()))
        .execute(executor)
        .await
        .map_err(to_store_error)?;
    Ok(result.rows_affected())
}
