//! Deferred-write unit of work over SurrealDB.
//!
//! Repository `save` calls stage entity snapshots in a shared buffer
//! without touching the database. [`SurrealFlusher::flush`] drains the
//! buffer and commits the whole batch inside a single transaction, so
//! every write staged since the previous checkpoint lands atomically.
//! Reads always go straight to the database and never see staged state.

use std::sync::{Arc, Mutex, MutexGuard};

use applink_core::error::{LifecycleError, LifecycleResult};
use applink_core::models::account::AccountSnapshot;
use applink_core::models::installation::InstallationSnapshot;
use applink_core::repository::Flusher;
use surrealdb::{Connection, Surreal};
use tracing::debug;

use crate::error::DbError;
use crate::repository::account::{AccountRow, SurrealAccountRepository};
use crate::repository::installation::{InstallationRow, SurrealInstallationRepository};

/// Writes staged since the last flush checkpoint.
#[derive(Default)]
pub(crate) struct Pending {
    pub(crate) accounts: Vec<AccountSnapshot>,
    pub(crate) installations: Vec<InstallationSnapshot>,
}

pub(crate) type PendingWrites = Arc<Mutex<Pending>>;

pub(crate) fn lock_pending(pending: &PendingWrites) -> LifecycleResult<MutexGuard<'_, Pending>> {
    pending
        .lock()
        .map_err(|_| LifecycleError::Database("pending write buffer lock poisoned".into()))
}

/// Factory tying repositories and the flusher to one staging buffer.
pub struct SurrealUnitOfWork<C: Connection> {
    db: Surreal<C>,
    pending: PendingWrites,
}

impl<C: Connection> SurrealUnitOfWork<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            pending: PendingWrites::default(),
        }
    }

    pub fn account_repository(&self) -> SurrealAccountRepository<C> {
        SurrealAccountRepository::new(self.db.clone(), Arc::clone(&self.pending))
    }

    pub fn installation_repository(&self) -> SurrealInstallationRepository<C> {
        SurrealInstallationRepository::new(self.db.clone(), Arc::clone(&self.pending))
    }

    pub fn flusher(&self) -> SurrealFlusher<C> {
        SurrealFlusher {
            db: self.db.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

/// Commits the staged batch in a single transaction.
#[derive(Clone)]
pub struct SurrealFlusher<C: Connection> {
    db: Surreal<C>,
    pending: PendingWrites,
}

impl<C: Connection> Flusher for SurrealFlusher<C> {
    async fn flush(&self) -> LifecycleResult<()> {
        let (accounts, installations) = {
            let mut pending = lock_pending(&self.pending)?;
            (
                std::mem::take(&mut pending.accounts),
                std::mem::take(&mut pending.installations),
            )
        };

        if accounts.is_empty() && installations.is_empty() {
            return Ok(());
        }

        debug!(
            accounts = accounts.len(),
            installations = installations.len(),
            "flushing staged writes"
        );

        let mut sql = String::from("BEGIN TRANSACTION;");
        for i in 0..accounts.len() {
            sql.push_str(&format!(
                " UPSERT type::record('account', $a{i}_id) CONTENT $a{i};"
            ));
        }
        for i in 0..installations.len() {
            sql.push_str(&format!(
                " UPSERT type::record('installation', $i{i}_id) CONTENT $i{i};"
            ));
        }
        sql.push_str(" COMMIT TRANSACTION;");

        let mut builder = self.db.query(sql);
        for (i, snapshot) in accounts.iter().enumerate() {
            builder = builder
                .bind((format!("a{i}_id"), snapshot.id.to_string()))
                .bind((format!("a{i}"), AccountRow::from_snapshot(snapshot)));
        }
        for (i, snapshot) in installations.iter().enumerate() {
            builder = builder
                .bind((format!("i{i}_id"), snapshot.id.to_string()))
                .bind((format!("i{i}"), InstallationRow::from_snapshot(snapshot)));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))
            .map_err(LifecycleError::from)?;

        Ok(())
    }
}
