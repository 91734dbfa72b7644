use hookreg_core::document::{Filter, Table, string_field};
use hookreg_storage::{DocumentStore, StoreError};

use crate::service::RegistryService;

impl<S: DocumentStore> RegistryService<S> {
    /// Resolves a username to its account id.
    pub async fn lookup_account_id(&self, username: &str) -> Result<Option<String>, StoreError> {
        let filter = Filter::new().with("username", username);
        let accounts = self.store.query(Table::Accounts, &filter).await?;
        Ok(accounts
            .first()
            .and_then(|account| string_field(account, "id"))
            .map(str::to_string))
    }

    pub async fn lookup_registration_id(
        &self,
        account_id: &str,
        registration_id: &str,
    ) -> Result<bool, StoreError> {
        let filter = Filter::new()
            .with("account_id", account_id)
            .with("id", registration_id);
        Ok(!self.store.query(Table::Registrations, &filter).await?.is_empty())
    }

    pub async fn lookup_subscription_id(
        &self,
        account_id: &str,
        subscription_id: &str,
    ) -> Result<bool, StoreError> {
        let filter = Filter::new()
            .with("account_id", account_id)
            .with("id", subscription_id);
        Ok(!self.store.query(Table::Subscriptions, &filter).await?.is_empty())
    }

    /// Existence only, regardless of who owns the registration.
    pub async fn registration_id_exists(&self, registration_id: &str) -> Result<bool, StoreError> {
        let filter = Filter::by_id(registration_id);
        Ok(!self.store.query(Table::Registrations, &filter).await?.is_empty())
    }

    pub async fn is_admin(&self, username: &str) -> Result<bool, StoreError> {
        let filter = Filter::new()
            .with("username", username)
            .with("is_admin", true);
        Ok(!self.store.query(Table::Accounts, &filter).await?.is_empty())
    }
}
