use std::time::{SystemTime, UNIX_EPOCH};

use hookreg_core::{
    Status,
    document::{Filter, Record, Table, string_field},
};
use hookreg_storage::DocumentStore;
use serde_json::{Value, json};

use crate::audit;
use crate::error::ApiError;
use crate::service::{RegistryService, surface_fault};

/// Successful outcome of a resource operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub payload: Value,
}

impl Reply {
    pub fn ok(payload: Value) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn created(payload: Value) -> Self {
        Self {
            status: Status::Created,
            payload,
        }
    }
}

/// How `query` selects records.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Id(String),
    Filter(Filter),
}

/// How `update` finds the record to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateTarget {
    Id(String),
    /// The account owned by this username. Only valid on the accounts table.
    Username(String),
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl<S: DocumentStore> RegistryService<S> {
    /// Fetches by id, or every record matching a filter. Absence is an empty
    /// payload, never an error.
    pub async fn query(&self, table: Table, lookup: Lookup) -> Result<Reply, ApiError> {
        let payload = match lookup {
            Lookup::Id(id) => {
                let record = self
                    .store
                    .get(table, &id)
                    .await
                    .map_err(|e| surface_fault("query", table, e))?;
                Value::Object(record.unwrap_or_default())
            }
            Lookup::Filter(filter) => {
                let records = self
                    .store
                    .query(table, &filter)
                    .await
                    .map_err(|e| surface_fault("query", table, e))?;
                Value::Array(records.into_iter().map(Value::Object).collect())
            }
        };
        Ok(Reply::ok(payload))
    }

    /// Merges `updates` into one record. Updating a record that does not
    /// exist is a bad request.
    pub async fn update(
        &self,
        table: Table,
        target: UpdateTarget,
        updates: &Record,
    ) -> Result<Reply, ApiError> {
        let id = match target {
            UpdateTarget::Id(id) => id,
            UpdateTarget::Username(username) => {
                if table != Table::Accounts {
                    return Err(ApiError::InvalidRequest(format!(
                        "updates by username apply to {} only, not {table}",
                        Table::Accounts
                    )));
                }
                self.lookup_account_id(&username)
                    .await
                    .map_err(|e| surface_fault("update", table, e))?
                    .ok_or(ApiError::UnknownUsername(username))?
            }
        };
        if table == Table::Accounts {
            self.check_username_free(&id, updates).await?;
        }

        let merged = self
            .store
            .update(table, &id, updates)
            .await
            .map_err(|e| surface_fault("update", table, e))?
            .ok_or(ApiError::NothingUpdated)?;

        audit::audit_record_updated(table, &id, updates.len());
        Ok(Reply::ok(Value::Object(merged)))
    }

    /// Stores a new record. `epoch` is stamped when absent and accounts
    /// default to non-admin.
    pub async fn insert(&self, table: Table, mut fields: Record) -> Result<Reply, ApiError> {
        fields
            .entry("epoch")
            .or_insert_with(|| json!(epoch_seconds()));
        if table == Table::Accounts {
            fields.entry("is_admin").or_insert(Value::Bool(false));
        }

        let stored = self
            .store
            .insert(table, fields)
            .await
            .map_err(|e| surface_fault("insert", table, e))?;

        audit::audit_record_inserted(table, string_field(&stored, "id").unwrap_or_default());
        Ok(Reply::created(Value::Object(stored)))
    }

    pub async fn delete(&self, table: Table, id: &str) -> Result<Reply, ApiError> {
        let deleted = self
            .store
            .delete(table, id)
            .await
            .map_err(|e| surface_fault("delete", table, e))?;

        audit::audit_records_deleted(table, id, deleted);
        Ok(Reply::ok(json!({ "deleted": deleted })))
    }

    pub async fn delete_all(&self, table: Table) -> Result<Reply, ApiError> {
        let deleted = self
            .store
            .delete_all(table)
            .await
            .map_err(|e| surface_fault("delete_all", table, e))?;

        audit::audit_records_deleted(table, "all", deleted);
        Ok(Reply::ok(json!({ "deleted": deleted })))
    }

    pub async fn delete_specific(&self, table: Table, filter: &Filter) -> Result<Reply, ApiError> {
        let deleted = self.delete_matching("delete_specific", table, filter).await?;
        Ok(Reply::ok(json!({ "deleted": deleted })))
    }

    pub async fn delete_accounts_except_admins(&self) -> Result<Reply, ApiError> {
        let filter = Filter::new().with("is_admin", false);
        self.delete_specific(Table::Accounts, &filter).await
    }

    /// Removes a registration together with every subscription to it.
    ///
    /// Subscriptions go first so a failure part way leaves the registration
    /// in place and the call can be retried.
    pub async fn delete_registration(&self, registration_id: &str) -> Result<Reply, ApiError> {
        let operation = "delete_registration";
        let subscriptions = self
            .delete_matching(
                operation,
                Table::Subscriptions,
                &Filter::new().with("registration_id", registration_id),
            )
            .await?;
        let registrations = self
            .delete_matching(
                operation,
                Table::Registrations,
                &Filter::by_id(registration_id),
            )
            .await?;

        Ok(Reply::ok(json!({
            "deleted": registrations,
            "subscriptions_deleted": subscriptions,
        })))
    }

    /// Removes an account and every record that refers to it. Dependents go
    /// before the records they point at.
    pub async fn delete_account(&self, account_id: &str) -> Result<Reply, ApiError> {
        let operation = "delete_account";
        let owned_by = Filter::new().with("account_id", account_id);

        let owned_registrations = self
            .store
            .query(Table::Registrations, &owned_by)
            .await
            .map_err(|e| surface_fault(operation, Table::Registrations, e))?;

        let mut subscriptions = self
            .delete_matching(operation, Table::Subscriptions, &owned_by)
            .await?;
        for registration_id in owned_registrations
            .iter()
            .filter_map(|r| string_field(r, "id"))
        {
            subscriptions += self
                .delete_matching(
                    operation,
                    Table::Subscriptions,
                    &Filter::new().with("registration_id", registration_id),
                )
                .await?;
        }
        let registrations = self
            .delete_matching(operation, Table::Registrations, &owned_by)
            .await?;

        let deleted = self
            .store
            .delete(Table::Accounts, account_id)
            .await
            .map_err(|e| surface_fault(operation, Table::Accounts, e))?;
        audit::audit_records_deleted(Table::Accounts, account_id, deleted);

        Ok(Reply::ok(json!({
            "deleted": deleted,
            "registrations_deleted": registrations,
            "subscriptions_deleted": subscriptions,
        })))
    }

    /// Makes sure `username` exists with the admin role, creating or
    /// promoting the account as needed. Returns whether anything changed.
    pub async fn ensure_admin(&self, username: &str) -> Result<bool, ApiError> {
        let operation = "ensure_admin";
        if self
            .is_admin(username)
            .await
            .map_err(|e| surface_fault(operation, Table::Accounts, e))?
        {
            return Ok(false);
        }

        let existing = self
            .lookup_account_id(username)
            .await
            .map_err(|e| surface_fault(operation, Table::Accounts, e))?;
        let promote = Record::from_iter([("is_admin".to_string(), Value::Bool(true))]);
        match existing {
            Some(id) => {
                self.update(Table::Accounts, UpdateTarget::Id(id), &promote)
                    .await?;
            }
            None => {
                let mut account = promote;
                account.insert("username".to_string(), Value::from(username));
                self.insert(Table::Accounts, account).await?;
            }
        }
        Ok(true)
    }

    /// Usernames identify accounts, so no two accounts may share one.
    async fn check_username_free(
        &self,
        account_id: &str,
        updates: &Record,
    ) -> Result<(), ApiError> {
        let Some(username) = string_field(updates, "username") else {
            return Ok(());
        };
        let holder = self
            .lookup_account_id(username)
            .await
            .map_err(|e| surface_fault("update", Table::Accounts, e))?;
        match holder {
            Some(holder) if holder != account_id => Err(ApiError::InvalidRequest(format!(
                "username '{username}' is already taken"
            ))),
            _ => Ok(()),
        }
    }

    async fn delete_matching(
        &self,
        operation: &'static str,
        table: Table,
        filter: &Filter,
    ) -> Result<u64, ApiError> {
        let deleted = self
            .store
            .delete_specific(table, filter)
            .await
            .map_err(|e| surface_fault(operation, table, e))?;

        audit::audit_records_deleted(table, &filter.to_string(), deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hookreg_storage::{InMemoryStore, StoreError};

    use super::*;
    use crate::audit::capture::capture_events;
    use crate::test_support::{
        FaultyStore, FlakyDeleteStore, RecordingStore, record, seeded_store,
    };

    async fn service() -> RegistryService<InMemoryStore> {
        RegistryService::new(Arc::new(seeded_store().await))
    }

    fn faulty(fault: StoreError) -> RegistryService<FaultyStore> {
        RegistryService::new(Arc::new(FaultyStore::new(fault)))
    }

    fn runtime_fault() -> StoreError {
        StoreError::Runtime("query failed".to_string())
    }

    fn connectivity_fault() -> StoreError {
        StoreError::Connectivity("connection refused".to_string())
    }

    fn argument_fault() -> StoreError {
        StoreError::InvalidArgument("id must be a string".to_string())
    }

    fn assert_fault(result: Result<Reply, ApiError>, status: Status, fault: &StoreError) {
        let err = result.expect_err("operation should fail");
        assert_eq!(err.status(), status, "got: {err}");
        assert_eq!(err.fault(), Some(fault));
    }

    /// Runs one call against a store failing with each fault class and
    /// checks the resulting status.
    macro_rules! assert_fault_mapping {
        (|$service:ident| $call:expr) => {{
            for (fault, status) in [
                (runtime_fault(), Status::InternalServerError),
                (connectivity_fault(), Status::InternalServerError),
                (argument_fault(), Status::BadRequest),
            ] {
                let $service = faulty(fault.clone());
                assert_fault($call.await, status, &fault);
            }
        }};
    }

    #[tokio::test]
    async fn query_by_id_returns_record() {
        let service = service().await;

        let reply = service
            .query(Table::Registrations, Lookup::Id("reg-alice".to_string()))
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload["account_id"], json!("acct-alice"));
    }

    #[tokio::test]
    async fn query_missing_id_is_ok_and_empty() {
        let service = service().await;

        let reply = service
            .query(Table::Registrations, Lookup::Id("123".to_string()))
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload, json!({}));
    }

    #[tokio::test]
    async fn query_by_filter_returns_all_matches() {
        let service = service().await;

        let reply = service
            .query(
                Table::Subscriptions,
                Lookup::Filter(Filter::new().with("account_id", "acct-bob")),
            )
            .await
            .unwrap();

        assert_eq!(reply.payload.as_array().map(Vec::len), Some(1));
        assert_eq!(reply.payload[0]["id"], json!("sub-bob"));
    }

    #[tokio::test]
    async fn query_with_no_matches_is_ok_and_empty() {
        let service = service().await;

        let reply = service
            .query(
                Table::Subscriptions,
                Lookup::Filter(Filter::new().with("account_id", "nobody")),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload, json!([]));
    }

    #[tokio::test]
    async fn query_faults_are_mapped() {
        assert_fault_mapping!(|service| service
            .query(Table::Registrations, Lookup::Id("123".to_string())));
    }

    #[tokio::test]
    async fn update_missing_record_is_bad_request() {
        let service = service().await;

        let err = service
            .update(
                Table::Registrations,
                UpdateTarget::Id("123".to_string()),
                &Record::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::BadRequest);
        assert!(matches!(err, ApiError::NothingUpdated));
        assert_eq!(err.fault(), None);
    }

    #[tokio::test]
    async fn update_by_id_with_empty_updates_is_ok() {
        let service = service().await;

        let reply = service
            .update(
                Table::Registrations,
                UpdateTarget::Id("reg-alice".to_string()),
                &Record::new(),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload["event"], json!("deploy"));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let service = service().await;

        let reply = service
            .update(
                Table::Registrations,
                UpdateTarget::Id("reg-alice".to_string()),
                &record(json!({"description": "release pipeline"})),
            )
            .await
            .unwrap();

        assert_eq!(reply.payload["description"], json!("release pipeline"));
        assert_eq!(reply.payload["event"], json!("deploy"));
    }

    #[tokio::test]
    async fn update_by_username_resolves_account() {
        let service = service().await;

        let reply = service
            .update(
                Table::Accounts,
                UpdateTarget::Username("alice".to_string()),
                &record(json!({"endpoint": "https://alice.example/hooks"})),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload["id"], json!("acct-alice"));
        assert_eq!(
            reply.payload["endpoint"],
            json!("https://alice.example/hooks")
        );
    }

    #[tokio::test]
    async fn update_by_unknown_username_is_bad_request() {
        let service = service().await;

        let err = service
            .update(
                Table::Accounts,
                UpdateTarget::Username("nobody".to_string()),
                &Record::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn update_by_username_outside_accounts_is_bad_request() {
        let service = service().await;

        let err = service
            .update(
                Table::Registrations,
                UpdateTarget::Username("alice".to_string()),
                &Record::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(err.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn update_cannot_reassign_owner() {
        let service = service().await;

        let err = service
            .update(
                Table::Registrations,
                UpdateTarget::Id("reg-alice".to_string()),
                &record(json!({"account_id": "acct-bob"})),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::BadRequest);
        assert!(matches!(err.fault(), Some(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn update_faults_are_mapped() {
        assert_fault_mapping!(|service| service.update(
            Table::Registrations,
            UpdateTarget::Id("123".to_string()),
            &Record::new()
        ));
    }

    #[tokio::test]
    async fn insert_returns_created_with_generated_id() {
        let service = service().await;

        let reply = service
            .insert(
                Table::Subscriptions,
                record(json!({"account_id": "acct-alice", "registration_id": "reg-alice"})),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Created);
        assert!(reply.payload["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(reply.payload["epoch"].is_u64());
    }

    #[tokio::test]
    async fn insert_then_query_round_trips_on_every_table() {
        let service = service().await;
        let rows = [
            (Table::Accounts, json!({"username": "carol"})),
            (
                Table::Registrations,
                json!({"account_id": "acct-alice", "event": "merge", "description": "d"}),
            ),
            (
                Table::Subscriptions,
                json!({"account_id": "acct-bob", "registration_id": "reg-bob"}),
            ),
        ];

        for (table, row) in rows {
            let created = service.insert(table, record(row.clone())).await.unwrap();
            let id = created.payload["id"].as_str().unwrap().to_string();

            let fetched = service.query(table, Lookup::Id(id)).await.unwrap();

            for (field, value) in row.as_object().unwrap() {
                assert_eq!(&fetched.payload[field], value, "{table}.{field}");
            }
        }
    }

    #[tokio::test]
    async fn inserted_accounts_default_to_non_admin() {
        let service = service().await;

        let reply = service
            .insert(Table::Accounts, record(json!({"username": "carol"})))
            .await
            .unwrap();

        assert_eq!(reply.payload["is_admin"], json!(false));
    }

    #[tokio::test]
    async fn insert_faults_are_mapped() {
        assert_fault_mapping!(|service| service
            .insert(Table::Subscriptions, record(json!({"account_id": "1"}))));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let service = service().await;

        let reply = service.delete(Table::Subscriptions, "sub-bob").await.unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload, json!({"deleted": 1}));
        let gone = service
            .query(Table::Subscriptions, Lookup::Id("sub-bob".to_string()))
            .await
            .unwrap();
        assert_eq!(gone.payload, json!({}));
    }

    #[tokio::test]
    async fn delete_faults_are_mapped() {
        assert_fault_mapping!(|service| service.delete(Table::Subscriptions, "123"));
    }

    #[tokio::test]
    async fn delete_all_succeeds_on_empty_table() {
        let service = service().await;

        service.delete_all(Table::Registrations).await.unwrap();
        let reply = service.delete_all(Table::Registrations).await.unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload, json!({"deleted": 0}));
    }

    #[tokio::test]
    async fn delete_all_faults_are_mapped() {
        assert_fault_mapping!(|service| service.delete_all(Table::Registrations));
    }

    #[tokio::test]
    async fn delete_specific_with_unknown_field_is_bad_request() {
        let service = service().await;

        let err = service
            .delete_specific(Table::Accounts, &Filter::new().with("colour", "red"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn delete_accounts_except_admins_keeps_admins() {
        let service = service().await;

        let reply = service.delete_accounts_except_admins().await.unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload, json!({"deleted": 2}));
        let left = service
            .query(Table::Accounts, Lookup::Filter(Filter::new()))
            .await
            .unwrap();
        assert_eq!(left.payload.as_array().map(Vec::len), Some(1));
        assert_eq!(left.payload[0]["username"], json!("admin"));
    }

    #[tokio::test]
    async fn delete_accounts_except_admins_faults_are_mapped() {
        assert_fault_mapping!(|service| service.delete_accounts_except_admins());
    }

    #[tokio::test]
    async fn delete_registration_cascades_to_its_subscriptions() {
        let service = service().await;

        let reply = service.delete_registration("reg-alice").await.unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(
            reply.payload,
            json!({"deleted": 1, "subscriptions_deleted": 1})
        );

        let subs = service
            .query(Table::Subscriptions, Lookup::Filter(Filter::new()))
            .await
            .unwrap();
        let remaining: Vec<&str> = subs
            .payload
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["id"].as_str())
            .collect();
        assert_eq!(remaining, vec!["sub-alice"]);
    }

    #[tokio::test]
    async fn delete_registration_issues_filtered_deletes() {
        let store = Arc::new(RecordingStore::new(seeded_store().await));
        let service = RegistryService::new(Arc::clone(&store));

        service.delete_registration("123").await.unwrap();

        assert_eq!(
            store.specific_deletes(),
            vec![
                (
                    Table::Subscriptions,
                    Filter::new().with("registration_id", "123")
                ),
                (Table::Registrations, Filter::by_id("123")),
            ]
        );
    }

    #[tokio::test]
    async fn interrupted_registration_delete_can_be_retried() {
        let fault = StoreError::Connectivity("connection reset".to_string());
        let store = Arc::new(FlakyDeleteStore::new(seeded_store().await, 2, fault.clone()));
        let service = RegistryService::new(Arc::clone(&store));

        let err = service.delete_registration("reg-alice").await.unwrap_err();
        assert_eq!(err.fault(), Some(&fault));

        assert!(service.registration_id_exists("reg-alice").await.unwrap());
        let subs = service
            .query(
                Table::Subscriptions,
                Lookup::Filter(Filter::new().with("registration_id", "reg-alice")),
            )
            .await
            .unwrap();
        assert_eq!(subs.payload, json!([]));

        let retried = service.delete_registration("reg-alice").await.unwrap();
        assert_eq!(
            retried.payload,
            json!({"deleted": 1, "subscriptions_deleted": 0})
        );
        assert!(!service.registration_id_exists("reg-alice").await.unwrap());
    }

    #[tokio::test]
    async fn delete_account_removes_everything_pointing_at_it() {
        let service = service().await;

        let reply = service.delete_account("acct-alice").await.unwrap();

        assert_eq!(reply.status, Status::Ok);
        assert_eq!(
            reply.payload,
            json!({"deleted": 1, "registrations_deleted": 1, "subscriptions_deleted": 2})
        );
        for (table, field) in [
            (Table::Registrations, "account_id"),
            (Table::Subscriptions, "account_id"),
        ] {
            let left = service
                .query(table, Lookup::Filter(Filter::new().with(field, "acct-alice")))
                .await
                .unwrap();
            assert_eq!(left.payload, json!([]), "{table}.{field}");
        }
        let subscribers = service
            .query(
                Table::Subscriptions,
                Lookup::Filter(Filter::new().with("registration_id", "reg-alice")),
            )
            .await
            .unwrap();
        assert_eq!(subscribers.payload, json!([]));

        let bobs = service
            .query(Table::Registrations, Lookup::Id("reg-bob".to_string()))
            .await
            .unwrap();
        assert_eq!(bobs.payload["account_id"], json!("acct-bob"));
    }

    #[tokio::test]
    async fn delete_account_removes_dependents_before_the_account() {
        let store = Arc::new(RecordingStore::new(seeded_store().await));
        let service = RegistryService::new(Arc::clone(&store));

        service.delete_account("acct-alice").await.unwrap();

        assert_eq!(
            store.specific_deletes(),
            vec![
                (
                    Table::Subscriptions,
                    Filter::new().with("account_id", "acct-alice")
                ),
                (
                    Table::Subscriptions,
                    Filter::new().with("registration_id", "reg-alice")
                ),
                (
                    Table::Registrations,
                    Filter::new().with("account_id", "acct-alice")
                ),
            ]
        );
    }

    #[tokio::test]
    async fn delete_account_faults_are_mapped() {
        assert_fault_mapping!(|service| service.delete_account("acct-alice"));
    }

    #[tokio::test]
    async fn update_cannot_take_another_accounts_username() {
        let service = service().await;

        let err = service
            .update(
                Table::Accounts,
                UpdateTarget::Username("alice".to_string()),
                &record(json!({"username": "bob"})),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(
            service.lookup_account_id("bob").await.unwrap().as_deref(),
            Some("acct-bob")
        );
    }

    #[tokio::test]
    async fn update_may_rename_to_a_free_username() {
        let service = service().await;

        let reply = service
            .update(
                Table::Accounts,
                UpdateTarget::Id("acct-alice".to_string()),
                &record(json!({"username": "alicia"})),
            )
            .await
            .unwrap();

        assert_eq!(reply.payload["username"], json!("alicia"));
    }

    #[tokio::test]
    async fn delete_registration_faults_are_mapped() {
        assert_fault_mapping!(|service| service.delete_registration("123"));
    }

    #[tokio::test]
    async fn ensure_admin_creates_missing_account() {
        let service = service().await;

        assert!(service.ensure_admin("root").await.unwrap());

        assert!(service.is_admin("root").await.unwrap());
    }

    #[tokio::test]
    async fn ensure_admin_promotes_existing_account() {
        let service = service().await;

        assert!(service.ensure_admin("alice").await.unwrap());

        assert!(service.is_admin("alice").await.unwrap());
        let accounts = service
            .query(
                Table::Accounts,
                Lookup::Filter(Filter::new().with("username", "alice")),
            )
            .await
            .unwrap();
        assert_eq!(accounts.payload.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn ensure_admin_is_a_no_op_for_admins() {
        let service = service().await;
        assert!(!service.ensure_admin("admin").await.unwrap());
    }

    #[test]
    fn each_fault_is_logged_once() {
        let events = capture_events(|| async {
            let service = faulty(runtime_fault());
            let _ = service.delete_registration("123").await;
        });

        let failures: Vec<_> = events
            .iter()
            .filter(|e| e.has_field("message", "store operation failed"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].has_field("operation", "delete_registration"));
    }
}
