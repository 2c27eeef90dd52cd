//! SurrealDB implementation of [`InstallationRepository`].

use applink_core::error::LifecycleResult;
use applink_core::models::installation::{
    ApplicationStatus, Installation, InstallationSnapshot, InstallationStatus, LicenseFamily,
};
use applink_core::repository::InstallationRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::unit_of_work::{PendingWrites, lock_pending};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
pub(crate) struct InstallationRow {
    account_id: String,
    status: String,
    application_status: String,
    license_family: String,
    users_count: Option<u32>,
    contact_person_id: Option<String>,
    partner_contact_person_id: Option<String>,
    partner_id: Option<String>,
    external_id: Option<String>,
    application_token: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct InstallationRowWithId {
    record_id: String,
    account_id: String,
    status: String,
    application_status: String,
    license_family: String,
    users_count: Option<u32>,
    contact_person_id: Option<String>,
    partner_contact_person_id: Option<String>,
    partner_id: Option<String>,
    external_id: Option<String>,
    application_token: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<InstallationStatus, DbError> {
    match s {
        "New" => Ok(InstallationStatus::New),
        "Active" => Ok(InstallationStatus::Active),
        "Deleted" => Ok(InstallationStatus::Deleted),
        other => Err(DbError::Decode {
            entity: "installation",
            reason: format!("unknown installation status: {other}"),
        }),
    }
}

fn application_status_str(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Free => "Free",
        ApplicationStatus::Demo => "Demo",
        ApplicationStatus::Trial => "Trial",
        ApplicationStatus::Paid => "Paid",
        ApplicationStatus::Local => "Local",
        ApplicationStatus::Subscription => "Subscription",
    }
}

fn parse_application_status(s: &str) -> Result<ApplicationStatus, DbError> {
    match s {
        "Free" => Ok(ApplicationStatus::Free),
        "Demo" => Ok(ApplicationStatus::Demo),
        "Trial" => Ok(ApplicationStatus::Trial),
        "Paid" => Ok(ApplicationStatus::Paid),
        "Local" => Ok(ApplicationStatus::Local),
        "Subscription" => Ok(ApplicationStatus::Subscription),
        other => Err(DbError::Decode {
            entity: "installation",
            reason: format!("unknown application status: {other}"),
        }),
    }
}

fn parse_uuid_field(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode {
        entity: "installation",
        reason: format!("invalid {field} UUID: {e}"),
    })
}

fn parse_optional_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid_field(&v, field)).transpose()
}

impl InstallationRow {
    pub(crate) fn from_snapshot(snapshot: &InstallationSnapshot) -> Self {
        Self {
            account_id: snapshot.account_id.to_string(),
            status: snapshot.status.as_str().to_string(),
            application_status: application_status_str(snapshot.application_status).to_string(),
            license_family: snapshot.license_family.as_str().to_string(),
            users_count: snapshot.users_count,
            contact_person_id: snapshot.contact_person_id.map(|id| id.to_string()),
            partner_contact_person_id: snapshot
                .partner_contact_person_id
                .map(|id| id.to_string()),
            partner_id: snapshot.partner_id.map(|id| id.to_string()),
            external_id: snapshot.external_id.clone(),
            application_token: snapshot.application_token.clone(),
            comment: snapshot.comment.clone(),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    fn into_snapshot(self, id: Uuid) -> Result<InstallationSnapshot, DbError> {
        Ok(InstallationSnapshot {
            id,
            account_id: parse_uuid_field(&self.account_id, "account_id")?,
            status: parse_status(&self.status)?,
            application_status: parse_application_status(&self.application_status)?,
            license_family: LicenseFamily::parse(&self.license_family).map_err(|e| {
                DbError::Decode {
                    entity: "installation",
                    reason: e.to_string(),
                }
            })?,
            users_count: self.users_count,
            contact_person_id: parse_optional_uuid(self.contact_person_id, "contact_person_id")?,
            partner_contact_person_id: parse_optional_uuid(
                self.partner_contact_person_id,
                "partner_contact_person_id",
            )?,
            partner_id: parse_optional_uuid(self.partner_id, "partner_id")?,
            external_id: self.external_id,
            application_token: self.application_token,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl InstallationRowWithId {
    fn try_into_snapshot(self) -> Result<InstallationSnapshot, DbError> {
        let id = parse_uuid_field(&self.record_id, "record")?;
        let row = InstallationRow {
            account_id: self.account_id,
            status: self.status,
            application_status: self.application_status,
            license_family: self.license_family,
            users_count: self.users_count,
            contact_person_id: self.contact_person_id,
            partner_contact_person_id: self.partner_contact_person_id,
            partner_id: self.partner_id,
            external_id: self.external_id,
            application_token: self.application_token,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_snapshot(id)
    }
}

/// SurrealDB implementation of the Installation repository.
#[derive(Clone)]
pub struct SurrealInstallationRepository<C: Connection> {
    db: Surreal<C>,
    pending: PendingWrites,
}

impl<C: Connection> SurrealInstallationRepository<C> {
    pub(crate) fn new(db: Surreal<C>, pending: PendingWrites) -> Self {
        Self { db, pending }
    }
}

impl<C: Connection> InstallationRepository for SurrealInstallationRepository<C> {
    async fn save(&self, installation: &Installation) -> LifecycleResult<()> {
        let snapshot = installation.snapshot();
        let mut pending = lock_pending(&self.pending)?;
        // Last write wins within a batch.
        pending
            .installations
            .retain(|staged| staged.id != snapshot.id);
        pending.installations.push(snapshot);
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> LifecycleResult<Installation> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('installation', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstallationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "installation",
            id: id_str,
        })?;

        Ok(Installation::from_snapshot(row.into_snapshot(id)?))
    }

    async fn find_by_account_id(&self, account_id: Uuid) -> LifecycleResult<Installation> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM installation \
                 WHERE account_id = $account_id",
            )
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstallationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "installation",
            id: format!("account_id={account_id}"),
        })?;

        Ok(Installation::from_snapshot(row.try_into_snapshot()?))
    }

    async fn find_by_external_id(&self, external_id: &str) -> LifecycleResult<Installation> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM installation \
                 WHERE external_id = $external_id",
            )
            .bind(("external_id", external_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstallationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "installation",
            id: format!("external_id={external_id}"),
        })?;

        Ok(Installation::from_snapshot(row.try_into_snapshot()?))
    }

    async fn find_by_application_token(&self, token: &str) -> LifecycleResult<Vec<Installation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM installation \
                 WHERE application_token = $app_token",
            )
            .bind(("app_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstallationRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| Ok(Installation::from_snapshot(row.try_into_snapshot()?)))
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> LifecycleResult<()> {
        self.db
            .query("DELETE type::record('installation', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
