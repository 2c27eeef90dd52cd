//! Installation entity — the application's provisioning state on one
//! tenant portal.
//!
//! An installation references its account by id only (a lookup key,
//! never an in-memory link), so the two aggregates stay independent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LifecycleError, LifecycleResult};
use crate::events::{DomainEvent, EventEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallationStatus {
    New,
    Active,
    Deleted,
}

impl InstallationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallationStatus::New => "New",
            InstallationStatus::Active => "Active",
            InstallationStatus::Deleted => "Deleted",
        }
    }
}

/// Platform-reported application status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Free,
    Demo,
    Trial,
    Paid,
    Local,
    Subscription,
}

impl ApplicationStatus {
    /// Single-letter wire code as reported by the platform.
    pub fn code(self) -> &'static str {
        match self {
            ApplicationStatus::Free => "F",
            ApplicationStatus::Demo => "D",
            ApplicationStatus::Trial => "T",
            ApplicationStatus::Paid => "P",
            ApplicationStatus::Local => "L",
            ApplicationStatus::Subscription => "S",
        }
    }

    pub fn from_code(code: &str) -> LifecycleResult<Self> {
        match code {
            "F" => Ok(ApplicationStatus::Free),
            "D" => Ok(ApplicationStatus::Demo),
            "T" => Ok(ApplicationStatus::Trial),
            "P" => Ok(ApplicationStatus::Paid),
            "L" => Ok(ApplicationStatus::Local),
            "S" => Ok(ApplicationStatus::Subscription),
            other => Err(LifecycleError::Validation {
                message: format!("unknown application status code '{other}'"),
            }),
        }
    }
}

/// Portal license family the tenant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseFamily {
    Free,
    Basic,
    Standard,
    Professional,
    Enterprise,
}

impl LicenseFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseFamily::Free => "Free",
            LicenseFamily::Basic => "Basic",
            LicenseFamily::Standard => "Standard",
            LicenseFamily::Professional => "Professional",
            LicenseFamily::Enterprise => "Enterprise",
        }
    }

    pub fn parse(value: &str) -> LifecycleResult<Self> {
        match value {
            "Free" => Ok(LicenseFamily::Free),
            "Basic" => Ok(LicenseFamily::Basic),
            "Standard" => Ok(LicenseFamily::Standard),
            "Professional" => Ok(LicenseFamily::Professional),
            "Enterprise" => Ok(LicenseFamily::Enterprise),
            other => Err(LifecycleError::Validation {
                message: format!("unknown license family '{other}'"),
            }),
        }
    }
}

/// Fields required to create a new installation.
#[derive(Debug, Clone)]
pub struct NewInstallation {
    pub account_id: Uuid,
    pub application_status: ApplicationStatus,
    pub license_family: LicenseFamily,
    pub users_count: Option<u32>,
    pub contact_person_id: Option<Uuid>,
    pub partner_contact_person_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub external_id: Option<String>,
}

/// Plain-data image of an installation for the persistence layer.
#[derive(Debug, Clone)]
pub struct InstallationSnapshot {
    pub id: Uuid,
    pub account_id: Uuid,
    pub status: InstallationStatus,
    pub application_status: ApplicationStatus,
    pub license_family: LicenseFamily,
    pub users_count: Option<u32>,
    pub contact_person_id: Option<Uuid>,
    pub partner_contact_person_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub application_token: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Installation {
    id: Uuid,
    account_id: Uuid,
    status: InstallationStatus,
    application_status: ApplicationStatus,
    license_family: LicenseFamily,
    users_count: Option<u32>,
    contact_person_id: Option<Uuid>,
    partner_contact_person_id: Option<Uuid>,
    partner_id: Option<Uuid>,
    external_id: Option<String>,
    application_token: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Installation {
    /// Create an installation in status `New` and record
    /// `InstallationCreated`.
    pub fn new(input: NewInstallation) -> LifecycleResult<Self> {
        if let Some(count) = input.users_count {
            if count == 0 {
                return Err(LifecycleError::Validation {
                    message: "users count must be positive".into(),
                });
            }
        }
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut installation = Self {
            id,
            account_id: input.account_id,
            status: InstallationStatus::New,
            application_status: input.application_status,
            license_family: input.license_family,
            users_count: input.users_count,
            contact_person_id: input.contact_person_id,
            partner_contact_person_id: input.partner_contact_person_id,
            partner_id: input.partner_id,
            external_id: input.external_id,
            application_token: None,
            comment: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        installation.events.push(DomainEvent::InstallationCreated {
            installation_id: id,
            account_id: input.account_id,
            occurred_at: now,
        });
        Ok(installation)
    }

    /// Restore an installation from its persisted image.
    pub fn from_snapshot(snapshot: InstallationSnapshot) -> Self {
        Self {
            id: snapshot.id,
            account_id: snapshot.account_id,
            status: snapshot.status,
            application_status: snapshot.application_status,
            license_family: snapshot.license_family,
            users_count: snapshot.users_count,
            contact_person_id: snapshot.contact_person_id,
            partner_contact_person_id: snapshot.partner_contact_person_id,
            partner_id: snapshot.partner_id,
            external_id: snapshot.external_id,
            application_token: snapshot.application_token,
            comment: snapshot.comment,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> InstallationSnapshot {
        InstallationSnapshot {
            id: self.id,
            account_id: self.account_id,
            status: self.status,
            application_status: self.application_status,
            license_family: self.license_family,
            users_count: self.users_count,
            contact_person_id: self.contact_person_id,
            partner_contact_person_id: self.partner_contact_person_id,
            partner_id: self.partner_id,
            external_id: self.external_id.clone(),
            application_token: self.application_token.clone(),
            comment: self.comment.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // -- accessors ------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn status(&self) -> InstallationStatus {
        self.status
    }

    pub fn application_status(&self) -> ApplicationStatus {
        self.application_status
    }

    pub fn license_family(&self) -> LicenseFamily {
        self.license_family
    }

    pub fn users_count(&self) -> Option<u32> {
        self.users_count
    }

    pub fn contact_person_id(&self) -> Option<Uuid> {
        self.contact_person_id
    }

    pub fn partner_contact_person_id(&self) -> Option<Uuid> {
        self.partner_contact_person_id
    }

    pub fn partner_id(&self) -> Option<Uuid> {
        self.partner_id
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn application_token(&self) -> Option<&str> {
        self.application_token.as_deref()
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

    // -- transitions ----------------------------------------------------

    /// `New` → `Active`: provisioning finished on the platform side.
    pub fn application_installed(&mut self, token: Option<&str>) -> LifecycleResult<()> {
        if self.status != InstallationStatus::New {
            return Err(self.invalid_transition("application_installed"));
        }
        self.status = InstallationStatus::Active;
        if let Some(token) = token {
            self.application_token = Some(token.to_string());
        }
        self.touch();
        self.events.push(DomainEvent::InstallationFinished {
            installation_id: self.id,
            account_id: self.account_id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// `Active` → `Deleted` (soft delete; the record is retained).
    ///
    /// A provided token must equal the stored one when both exist.
    pub fn application_uninstalled(&mut self, token: Option<&str>) -> LifecycleResult<()> {
        if self.status != InstallationStatus::Active {
            return Err(self.invalid_transition("application_uninstalled"));
        }
        if let (Some(provided), Some(stored)) = (token, self.application_token.as_deref()) {
            if provided != stored {
                return Err(LifecycleError::TokenMismatch {
                    entity: "installation",
                    id: self.id,
                    stored: stored.to_string(),
                    provided: provided.to_string(),
                });
            }
        }
        self.status = InstallationStatus::Deleted;
        self.touch();
        self.events.push(DomainEvent::InstallationUninstalled {
            installation_id: self.id,
            account_id: self.account_id,
            occurred_at: self.updated_at,
        });
        Ok(())
    }

    /// Overwrite the platform-reported application status.
    pub fn change_application_status(&mut self, status: ApplicationStatus) -> LifecycleResult<()> {
        if self.status == InstallationStatus::Deleted {
            return Err(self.invalid_transition("change_application_status"));
        }
        self.application_status = status;
        self.touch();
        Ok(())
    }

    /// Store the platform-confirmed application token.
    pub fn set_application_token(&mut self, token: &str) -> LifecycleResult<()> {
        if self.status == InstallationStatus::Deleted {
            return Err(self.invalid_transition("set_application_token"));
        }
        if token.trim().is_empty() {
            return Err(LifecycleError::Validation {
                message: format!("application token is empty for installation {}", self.id),
            });
        }
        self.application_token = Some(token.to_string());
        self.touch();
        Ok(())
    }

    /// Change the portal license family.
    ///
    /// Setting the current value is a no-op: no `updated_at` bump, so
    /// repeated platform notifications do not register as mutations.
    pub fn change_license_family(&mut self, family: LicenseFamily) -> LifecycleResult<()> {
        if self.status == InstallationStatus::Deleted {
            return Err(self.invalid_transition("change_license_family"));
        }
        if self.license_family == family {
            return Ok(());
        }
        self.license_family = family;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid_transition(&self, operation: &'static str) -> LifecycleError {
        LifecycleError::InvalidStateTransition {
            entity: "installation",
            id: self.id,
            from: self.status.as_str(),
            operation,
        }
    }
}

impl EventEmitter for Installation {
    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
