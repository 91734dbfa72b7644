pub mod migrations;
mod queries;

use hookreg_core::document::{Filter, Record, Table, string_field};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::traits::{DocumentStore, StoreError, check_id};

/// Document store backed by one JSONB table per collection.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(queries::to_store_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DocumentStore for PostgresStore {
    async fn get(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError> {
        check_id(id)?;
        queries::get_document(&self.pool, table, id).await
    }

    async fn query(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        filter.validate(table)?;
        queries::query_documents(&self.pool, table, filter).await
    }

    async fn insert(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        table.validate_record(&record)?;

        let id = match string_field(&record, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        check_id(&id)?;

        queries::insert_document(&self.pool, table, &id, &record).await
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Option<Record>, StoreError> {
        check_id(id)?;
        table.validate_updates(updates)?;
        queries::merge_document(&self.pool, table, id, updates).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<u64, StoreError> {
        check_id(id)?;
        queries::delete_document(&self.pool, table, id).await
    }

    async fn delete_all(&self, table: Table) -> Result<u64, StoreError> {
        queries::delete_matching_documents(&self.pool, table, &Filter::new()).await
    }

    async fn delete_specific(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate(table)?;
        queries::delete_matching_documents(&self.pool, table, filter).await
    }
}
