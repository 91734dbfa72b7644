use hookreg_core::Target;
use hookreg_storage::{DocumentStore, StoreError};

use crate::audit;
use crate::error::ApiError;
use crate::service::{RegistryService, surface_fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    GrantedAdmin,
    GrantedOwner,
    DeniedUnknownUser,
    DeniedNotOwner,
    DeniedNoTarget,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::GrantedAdmin | AccessDecision::GrantedOwner)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AccessDecision::GrantedAdmin => "admin",
            AccessDecision::GrantedOwner => "owner",
            AccessDecision::DeniedUnknownUser => "unknown user",
            AccessDecision::DeniedNotOwner => "not owner",
            AccessDecision::DeniedNoTarget => "admin only",
        }
    }
}

impl<S: DocumentStore> RegistryService<S> {
    /// Authorizes `username` against `target`.
    ///
    /// Admins pass unconditionally. Everyone else must own the registration
    /// or subscription, or be the account named by `Target::Account`.
    /// `Target::None` is reserved for admins.
    pub async fn validate_access(&self, username: &str, target: &Target) -> Result<(), ApiError> {
        let decision = self
            .decide_access(username, target)
            .await
            .map_err(|e| surface_fault("validate_access", target, e))?;

        if decision.is_granted() {
            audit::audit_access_granted(username, target, decision.reason());
            Ok(())
        } else {
            audit::audit_access_denied(username, target, decision.reason());
            Err(ApiError::Unauthorized {
                username: username.to_string(),
                target: target.clone(),
            })
        }
    }

    pub async fn decide_access(
        &self,
        username: &str,
        target: &Target,
    ) -> Result<AccessDecision, StoreError> {
        if self.is_admin(username).await? {
            return Ok(AccessDecision::GrantedAdmin);
        }

        let Some(account_id) = self.lookup_account_id(username).await? else {
            return Ok(AccessDecision::DeniedUnknownUser);
        };

        let owns = match target {
            Target::Registration(id) => self.lookup_registration_id(&account_id, id).await?,
            Target::Subscription(id) => self.lookup_subscription_id(&account_id, id).await?,
            Target::Account(id) => *id == account_id,
            Target::None => return Ok(AccessDecision::DeniedNoTarget),
        };

        Ok(if owns {
            AccessDecision::GrantedOwner
        } else {
            AccessDecision::DeniedNotOwner
        })
    }
}
