//! SurrealDB implementation of [`AccountRepository`].
//!
//! `save` only stages a snapshot in the shared unit-of-work buffer;
//! nothing reaches the database until the flusher commits the batch.
//! All reads query committed state directly.

use applink_core::error::LifecycleResult;
use applink_core::models::account::{Account, AccountSnapshot, AccountStatus};
use applink_core::models::auth_token::{AuthToken, Scope};
use applink_core::models::domain_url::DomainUrl;
use applink_core::repository::AccountRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::unit_of_work::{PendingWrites, lock_pending};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
pub(crate) struct AccountRow {
    member_id: String,
    tenant_user_id: i64,
    is_tenant_user_admin: bool,
    domain_url: String,
    status: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: DateTime<Utc>,
    application_token: Option<String>,
    application_version: u32,
    application_scope: Vec<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    member_id: String,
    tenant_user_id: i64,
    is_tenant_user_admin: bool,
    domain_url: String,
    status: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: DateTime<Utc>,
    application_token: Option<String>,
    application_version: u32,
    application_scope: Vec<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AccountStatus, DbError> {
    match s {
        "New" => Ok(AccountStatus::New),
        "Active" => Ok(AccountStatus::Active),
        "Blocked" => Ok(AccountStatus::Blocked),
        "Deleted" => Ok(AccountStatus::Deleted),
        other => Err(DbError::Decode {
            entity: "account",
            reason: format!("unknown account status: {other}"),
        }),
    }
}

impl AccountRow {
    pub(crate) fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            member_id: snapshot.member_id.clone(),
            tenant_user_id: snapshot.tenant_user_id,
            is_tenant_user_admin: snapshot.is_tenant_user_admin,
            domain_url: snapshot.domain_url.as_str().to_string(),
            status: snapshot.status.as_str().to_string(),
            access_token: snapshot.auth_token.access_token().to_string(),
            refresh_token: snapshot.auth_token.refresh_token().to_string(),
            token_expires_at: snapshot.auth_token.expires_at(),
            application_token: snapshot.application_token.clone(),
            application_version: snapshot.application_version,
            application_scope: snapshot.application_scope.codes().to_vec(),
            comment: snapshot.comment.clone(),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    fn into_snapshot(self, id: Uuid) -> Result<AccountSnapshot, DbError> {
        let decode = |reason: String| DbError::Decode {
            entity: "account",
            reason,
        };
        Ok(AccountSnapshot {
            id,
            tenant_user_id: self.tenant_user_id,
            is_tenant_user_admin: self.is_tenant_user_admin,
            member_id: self.member_id,
            domain_url: DomainUrl::parse(&self.domain_url).map_err(|e| decode(e.to_string()))?,
            status: parse_status(&self.status)?,
            auth_token: AuthToken::new(
                self.access_token,
                self.refresh_token,
                self.token_expires_at,
            )
            .map_err(|e| decode(e.to_string()))?,
            application_token: self.application_token,
            application_version: self.application_version,
            application_scope: Scope::new(self.application_scope)
                .map_err(|e| decode(e.to_string()))?,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AccountRowWithId {
    fn try_into_snapshot(self) -> Result<AccountSnapshot, DbError> {
        let id = Uuid::parse_str(&self.record_id).map_err(|e| DbError::Decode {
            entity: "account",
            reason: format!("invalid UUID: {e}"),
        })?;
        let row = AccountRow {
            member_id: self.member_id,
            tenant_user_id: self.tenant_user_id,
            is_tenant_user_admin: self.is_tenant_user_admin,
            domain_url: self.domain_url,
            status: self.status,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_expires_at: self.token_expires_at,
            application_token: self.application_token,
            application_version: self.application_version,
            application_scope: self.application_scope,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_snapshot(id)
    }
}

/// SurrealDB implementation of the Account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
    pending: PendingWrites,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub(crate) fn new(db: Surreal<C>, pending: PendingWrites) -> Self {
        Self { db, pending }
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn save(&self, account: &Account) -> LifecycleResult<()> {
        let snapshot = account.snapshot();
        let mut pending = lock_pending(&self.pending)?;
        // Last write wins within a batch.
        pending.accounts.retain(|staged| staged.id != snapshot.id);
        pending.accounts.push(snapshot);
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> LifecycleResult<Account> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "account",
            id: id_str,
        })?;

        Ok(Account::from_snapshot(row.into_snapshot(id)?))
    }

    async fn find_by_member_id(
        &self,
        member_id: &str,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> LifecycleResult<Vec<Account>> {
        let mut conds = vec!["member_id = $member_id"];
        if status.is_some() {
            conds.push("status = $status");
        }
        if is_admin.is_some() {
            conds.push("is_tenant_user_admin = $is_admin");
        }
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM account WHERE {}",
            conds.join(" AND ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("member_id", member_id.to_string()));
        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(is_admin) = is_admin {
            builder = builder.bind(("is_admin", is_admin));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(Account::from_snapshot(row.try_into_snapshot()?))
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn find_by_domain(
        &self,
        domain_url: &DomainUrl,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> LifecycleResult<Vec<Account>> {
        let mut conds = vec!["domain_url = $domain_url"];
        if status.is_some() {
            conds.push("status = $status");
        }
        if is_admin.is_some() {
            conds.push("is_tenant_user_admin = $is_admin");
        }
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM account WHERE {}",
            conds.join(" AND ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("domain_url", domain_url.as_str().to_string()));
        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(is_admin) = is_admin {
            builder = builder.bind(("is_admin", is_admin));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(Account::from_snapshot(row.try_into_snapshot()?))
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn find_by_application_token(&self, token: &str) -> LifecycleResult<Vec<Account>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE application_token = $app_token",
            )
            .bind(("app_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(Account::from_snapshot(row.try_into_snapshot()?))
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> LifecycleResult<()> {
        self.db
            .query("DELETE type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
