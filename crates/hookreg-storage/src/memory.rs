use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hookreg_core::document::{Filter, Record, Table, string_field};
use serde_json::Value;
use uuid::Uuid;

use crate::traits::{DocumentStore, StoreError, check_id};

#[derive(Debug, Default)]
struct InnerState {
    tables: HashMap<Table, Vec<Record>>,
}

impl InnerState {
    fn rows(&self, table: Table) -> &[Record] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Record> {
        self.tables.entry(table).or_default()
    }
}

/// Document store kept entirely in process memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InnerState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Runtime("in-memory store lock poisoned".to_string()))
    }
}

fn has_id(record: &Record, id: &str) -> bool {
    string_field(record, "id") == Some(id)
}

/// Finds a record other than `id` that already holds `username`.
fn username_holder<'a>(rows: &'a [Record], username: &str, id: &str) -> Option<&'a str> {
    rows.iter()
        .filter(|r| !has_id(r, id))
        .find(|r| string_field(r, "username") == Some(username))
        .and_then(|r| string_field(r, "id"))
}

fn check_username_free(
    rows: &[Record],
    table: Table,
    record: &Record,
    id: &str,
) -> Result<(), StoreError> {
    let Some(username) = string_field(record, "username") else {
        return Ok(());
    };
    match username_holder(rows, username, id) {
        Some(holder) => Err(StoreError::Runtime(format!(
            "duplicate username '{username}' in {table}, held by '{holder}'"
        ))),
        None => Ok(()),
    }
}

fn remove_matching(rows: &mut Vec<Record>, keep: impl Fn(&Record) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(keep);
    (before - rows.len()) as u64
}

impl DocumentStore for InMemoryStore {
    async fn get(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError> {
        check_id(id)?;
        let state = self.lock()?;
        Ok(state.rows(table).iter().find(|r| has_id(r, id)).cloned())
    }

    async fn query(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        filter.validate(table)?;
        let state = self.lock()?;
        Ok(state
            .rows(table)
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn insert(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        table.validate_record(&record)?;
        let mut state = self.lock()?;

        let id = match string_field(&record, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        check_id(&id)?;

        let rows = state.rows_mut(table);
        if rows.iter().any(|r| has_id(r, &id)) {
            return Err(StoreError::Runtime(format!(
                "duplicate primary key '{id}' in {table}"
            )));
        }
        check_username_free(rows, table, &record, &id)?;
        rows.push(record.clone());

        Ok(record)
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Option<Record>, StoreError> {
        check_id(id)?;
        table.validate_updates(updates)?;
        let mut state = self.lock()?;

        let rows = state.rows_mut(table);
        if !rows.iter().any(|r| has_id(r, id)) {
            return Ok(None);
        }
        check_username_free(rows, table, updates, id)?;
        let Some(row) = rows.iter_mut().find(|r| has_id(r, id)) else {
            return Ok(None);
        };
        for (field, value) in updates {
            row.insert(field.clone(), value.clone());
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: Table, id: &str) -> Result<u64, StoreError> {
        check_id(id)?;
        let mut state = self.lock()?;
        Ok(remove_matching(state.rows_mut(table), |r| !has_id(r, id)))
    }

    async fn delete_all(&self, table: Table) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        Ok(remove_matching(state.rows_mut(table), |_| false))
    }

    async fn delete_specific(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate(table)?;
        let mut state = self.lock()?;
        Ok(remove_matching(state.rows_mut(table), |r| !filter.matches(r)))
    }
}
