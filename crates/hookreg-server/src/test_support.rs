use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use hookreg_core::document::{Filter, Record, Table};
use hookreg_storage::{DocumentStore, InMemoryStore, StoreError};
use serde_json::{Value, json};

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

/// Accounts `admin`, `alice` and `bob`; each of alice and bob owns one
/// registration and subscribes to the other's.
pub async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let rows = [
        (
            Table::Accounts,
            json!({"id": "acct-admin", "username": "admin", "is_admin": true}),
        ),
        (
            Table::Accounts,
            json!({"id": "acct-alice", "username": "alice", "is_admin": false}),
        ),
        (
            Table::Accounts,
            json!({"id": "acct-bob", "username": "bob", "is_admin": false}),
        ),
        (
            Table::Registrations,
            json!({"id": "reg-alice", "account_id": "acct-alice", "event": "deploy"}),
        ),
        (
            Table::Registrations,
            json!({"id": "reg-bob", "account_id": "acct-bob", "event": "build"}),
        ),
        (
            Table::Subscriptions,
            json!({"id": "sub-bob", "account_id": "acct-bob", "registration_id": "reg-alice"}),
        ),
        (
            Table::Subscriptions,
            json!({"id": "sub-alice", "account_id": "acct-alice", "registration_id": "reg-bob"}),
        ),
    ];
    for (table, row) in rows {
        store.insert(table, record(row)).await.unwrap();
    }
    store
}

/// Fails every operation with the same fault.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    fault: StoreError,
}

impl FaultyStore {
    pub fn new(fault: StoreError) -> Self {
        Self { fault }
    }
}

impl DocumentStore for FaultyStore {
    async fn get(&self, _table: Table, _id: &str) -> Result<Option<Record>, StoreError> {
        Err(self.fault.clone())
    }

    async fn query(&self, _table: Table, _filter: &Filter) -> Result<Vec<Record>, StoreError> {
        Err(self.fault.clone())
    }

    async fn insert(&self, _table: Table, _record: Record) -> Result<Record, StoreError> {
        Err(self.fault.clone())
    }

    async fn update(
        &self,
        _table: Table,
        _id: &str,
        _updates: &Record,
    ) -> Result<Option<Record>, StoreError> {
        Err(self.fault.clone())
    }

    async fn delete(&self, _table: Table, _id: &str) -> Result<u64, StoreError> {
        Err(self.fault.clone())
    }

    async fn delete_all(&self, _table: Table) -> Result<u64, StoreError> {
        Err(self.fault.clone())
    }

    async fn delete_specific(&self, _table: Table, _filter: &Filter) -> Result<u64, StoreError> {
        Err(self.fault.clone())
    }
}

/// Wraps an in-memory store and remembers every filtered read.
#[derive(Debug)]
pub struct RecordingStore {
    inner: InMemoryStore,
    queries: Mutex<Vec<(Table, Filter)>>,
    deletes: Mutex<Vec<(Table, Filter)>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn last_query(&self) -> Option<(Table, Filter)> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn specific_deletes(&self) -> Vec<(Table, Filter)> {
        self.deletes.lock().unwrap().clone()
    }
}

impl DocumentStore for RecordingStore {
    async fn get(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.get(table, id).await
    }

    async fn query(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        self.queries.lock().unwrap().push((table, filter.clone()));
        self.inner.query(table, filter).await
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, StoreError> {
        self.inner.insert(table, record).await
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Option<Record>, StoreError> {
        self.inner.update(table, id, updates).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<u64, StoreError> {
        self.inner.delete(table, id).await
    }

    async fn delete_all(&self, table: Table) -> Result<u64, StoreError> {
        self.inner.delete_all(table).await
    }

    async fn delete_specific(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.deletes.lock().unwrap().push((table, filter.clone()));
        self.inner.delete_specific(table, filter).await
    }
}

/// Wraps an in-memory store and fails only the `fail_on`-th filtered delete
/// (counting from 1).
#[derive(Debug)]
pub struct FlakyDeleteStore {
    inner: InMemoryStore,
    fail_on: usize,
    fault: StoreError,
    deletes: AtomicUsize,
}

impl FlakyDeleteStore {
    pub fn new(inner: InMemoryStore, fail_on: usize, fault: StoreError) -> Self {
        Self {
            inner,
            fail_on,
            fault,
            deletes: AtomicUsize::new(0),
        }
    }
}

impl DocumentStore for FlakyDeleteStore {
    async fn get(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.get(table, id).await
    }

    async fn query(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        self.inner.query(table, filter).await
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, StoreError> {
        self.inner.insert(table, record).await
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Option<Record>, StoreError> {
        self.inner.update(table, id, updates).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<u64, StoreError> {
        self.inner.delete(table, id).await
    }

    async fn delete_all(&self, table: Table) -> Result<u64, StoreError> {
        self.inner.delete_all(table).await
    }

    async fn delete_specific(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let call = self.deletes.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(self.fault.clone());
        }
        self.inner.delete_specific(table, filter).await
    }
}
