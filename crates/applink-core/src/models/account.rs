//! Account entity — one tenant-platform connection.
//!
//! An account binds a single remote user's credentials to the
//! application. All mutation goes through the transition methods below;
//! each one checks its preconditions before touching any field, so a
//! failed call leaves the account exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LifecycleError, LifecycleResult};
use crate::events::{DomainEvent, EventEmitter};

use super::auth_token::{AuthToken, RenewedAuthToken, Scope};
use super::domain_url::DomainUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    New,
    Active,
    Blocked,
    Deleted,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::New => "New",
            AccountStatus::Active => "Active",
            AccountStatus::Blocked => "Blocked",
            AccountStatus::Deleted => "Deleted",
        }
    }
}

/// Fields required to create a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub tenant_user_id: i64,
    pub is_tenant_user_admin: bool,
    pub member_id: String,
    pub domain_url: DomainUrl,
    pub auth_token: AuthToken,
    pub application_version: u32,
    pub application_scope: Scope,
}

/// Plain-data image of an account for the persistence layer.
///
/// Snapshots never carry buffered events; restoring from a snapshot
/// yields an entity with an empty event buffer.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub tenant_user_id: i64,
    pub is_tenant_user_admin: bool,
    pub member_id: String,
    pub domain_url: DomainUrl,
    pub status: AccountStatus,
    pub auth_token: AuthToken,
    pub application_token: Option<String>,
    pub application_version: u32,
    pub application_scope: Scope,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Account {
    id: Uuid,
    tenant_user_id: i64,
    is_tenant_user_admin: bool,
    member_id: String,
    domain_url: DomainUrl,
    status: AccountStatus,
    auth_token: AuthToken,
    application_token: Option<String>,
    application_version: u32,
    application_scope: Scope,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Account {
    /// Create an account in status `New` and record `AccountCreated`.
    pub fn new(input: NewAccount) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut account = Self {
            id,
            tenant_user_id: input.tenant_user_id,
            is_tenant_user_admin: input.is_tenant_user_admin,
            member_id: input.member_id,
            domain_url: input.domain_url,
            status: AccountStatus::New,
            auth_token: input.auth_token,
            application_token: None,
            application_version: input.application_version,
            application_scope: input.application_scope,
            comment: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        account.events.push(DomainEvent::AccountCreated {
            account_id: id,
            member_id: account.member_id.clone(),
            occurred_at: now,
        });
        account
    }

    /// Restore an account from its persisted image.
    pub fn from_snapshot(snapshot: AccountSnapshot) -> Self {
        Self {
            id: snapshot.id,
            tenant_user_id: snapshot.tenant_user_id,
            is_tenant_user_admin: snapshot.is_tenant_user_admin,
            member_id: snapshot.member_id,
            domain_url: snapshot.domain_url,
            status: snapshot.status,
            auth_token: snapshot.auth_token,
            application_token: snapshot.application_token,
            application_version: snapshot.application_version,
            application_scope: snapshot.application_scope,
            comment: snapshot.comment,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            tenant_user_id: self.tenant_user_id,
            is_tenant_user_admin: self.is_tenant_user_admin,
            member_id: self.member_id.clone(),
            domain_url: self.domain_url.clone(),
            status: self.status,
            auth_token: self.auth_token.clone(),
            application_token: self.application_token.clone(),
            application_version: self.application_version,
            application_scope: self.application_scope.clone(),
            comment: self.comment.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // -- accessors ------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_user_id(&self) -> i64 {
        self.tenant_user_id
    }

    pub fn is_tenant_user_admin(&self) -> bool {
        self.is_tenant_user_admin
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn domain_url(&self) -> &DomainUrl {
        &self.domain_url
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn auth_token(&self) -> &AuthToken {
        &self.auth_token
    }

    pub fn application_token(&self) -> Option<&str> {
        self.application_token.as_deref()
    }

    pub fn application_version(&self) -> u32 {
        self.application_version
    }

    pub fn application_scope(&self) -> &Scope {
        &self.application_scope
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Pure predicate: does `token` equal the stored application token?
    pub fn is_application_token_valid(&self, token: &str) -> bool {
        self.application_token.as_deref() == Some(token)
    }

    // -- transitions ----------------------------------------------------

    /// `New` → `Active`: the remote platform confirmed the install and
    /// delivered the cycle's application token.
    pub fn application_installed(&mut self, token: &str) -> LifecycleResult<()> {
        if self.status != AccountStatus::New {
            return Err(self.invalid_transition("application_installed"));
        }
        if token.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: format!("application token is empty for account {}", self.id),
            });
        }
        self.status = AccountStatus::Active;
        self.application_token = Some(token.to_string());
        self.touch();
        self.events.push(DomainEvent::AccountApplicationInstalled {
            account_id: self.id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// `Active` → `Deleted` (soft delete; the record is retained).
    ///
    /// With `Some(token)` the token must equal the stored one. `None`
    /// is the tolerant variant used by batch handlers that uninstall
    /// every account of a member without per-account tokens.
    pub fn application_uninstalled(&mut self, token: Option<&str>) -> LifecycleResult<()> {
        if self.status != AccountStatus::Active {
            return Err(self.invalid_transition("application_uninstalled"));
        }
        if let Some(provided) = token {
            let stored = self.application_token.as_deref().unwrap_or_default();
            if stored != provided {
                return Err(LifecycleError::TokenMismatch {
                    entity: "account",
                    id: self.id,
                    stored: stored.to_string(),
                    provided: provided.to_string(),
                });
            }
        }
        self.status = AccountStatus::Deleted;
        self.touch();
        self.events.push(DomainEvent::AccountApplicationUninstalled {
            account_id: self.id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// Replace the credential triple with a renewed one.
    pub fn renew_auth_token(&mut self, renewed: &RenewedAuthToken) -> LifecycleResult<()> {
        if renewed.member_id != self.member_id {
            return Err(LifecycleError::MemberMismatch {
                account_id: self.id,
                expected: self.member_id.clone(),
                provided: renewed.member_id.clone(),
            });
        }
        self.auth_token = renewed.auth_token.clone();
        self.touch();
        Ok(())
    }

    /// Move the account to a new tenant domain.
    ///
    /// Forbidden while blocked or deleted.
    pub fn change_domain_url(&mut self, new_domain_url: DomainUrl) -> LifecycleResult<()> {
        if matches!(self.status, AccountStatus::Blocked | AccountStatus::Deleted) {
            return Err(self.invalid_transition("change_domain_url"));
        }
        let old = std::mem::replace(&mut self.domain_url, new_domain_url);
        self.touch();
        self.events.push(DomainEvent::AccountDomainUrlChanged {
            account_id: self.id,
            old_domain_url: old.to_string(),
            new_domain_url: self.domain_url.to_string(),
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// Record an application upgrade. Versions are strictly increasing.
    pub fn update_application_version(
        &mut self,
        version: u32,
        new_scope: Option<Scope>,
    ) -> LifecycleResult<()> {
        if self.status != AccountStatus::Active {
            return Err(self.invalid_transition("update_application_version"));
        }
        if version <= self.application_version {
            return Err(LifecycleError::VersionDowngrade {
                account_id: self.id,
                current: self.application_version,
                attempted: version,
            });
        }
        let previous = self.application_version;
        self.application_version = version;
        if let Some(scope) = new_scope {
            self.application_scope = scope;
        }
        self.touch();
        self.events.push(DomainEvent::AccountApplicationVersionUpdated {
            account_id: self.id,
            previous_version: previous,
            new_version: version,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// `Blocked` → `Active`.
    pub fn mark_as_active(&mut self, comment: Option<String>) -> LifecycleResult<()> {
        if self.status != AccountStatus::Blocked {
            return Err(self.invalid_transition("mark_as_active"));
        }
        self.status = AccountStatus::Active;
        self.comment = comment;
        self.touch();
        self.events.push(DomainEvent::AccountUnblocked {
            account_id: self.id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// Any non-deleted status → `Blocked`.
    pub fn mark_as_blocked(&mut self, comment: Option<String>) -> LifecycleResult<()> {
        if self.status == AccountStatus::Deleted {
            return Err(self.invalid_transition("mark_as_blocked"));
        }
        self.status = AccountStatus::Blocked;
        self.comment = comment;
        self.touch();
        self.events.push(DomainEvent::AccountBlocked {
            account_id: self.id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// Reconciliation setter used when the platform re-announces the
    /// install out-of-band with a fresh token.
    pub fn set_application_token(&mut self, token: &str) -> LifecycleResult<()> {
        if self.status == AccountStatus::Deleted {
            return Err(self.invalid_transition("set_application_token"));
        }
        if token.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: format!("application token is empty for account {}", self.id),
            });
        }
        self.application_token = Some(token.to_string());
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid_transition(&self, operation: &'static str) -> LifecycleError {
        LifecycleError::InvalidStateTransition {
            entity: "account",
            id: self.id,
            from: self.status.as_str(),
            operation,
        }
    }
}

impl EventEmitter for Account {
    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
