//! Validated, immutable command objects.
//!
//! Every inbound request is translated into exactly one command before
//! any handler logic runs. Validation happens at construction — a
//! command is never partially built, so handlers can trust every field.

use applink_core::error::LifecycleError;
use applink_core::models::account::NewAccount;
use applink_core::models::auth_token::{AuthToken, RenewedAuthToken, Scope};
use applink_core::models::domain_url::DomainUrl;
use applink_core::models::installation::{
    ApplicationStatus, LicenseFamily, NewInstallation,
};
use uuid::Uuid;

use crate::error::CommandError;

fn require(field: &'static str, value: &str) -> Result<String, CommandError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandError::EmptyField { field });
    }
    Ok(value.to_string())
}

fn parse_domain(raw: &str) -> Result<DomainUrl, CommandError> {
    DomainUrl::parse(raw).map_err(|err| match err {
        LifecycleError::Validation { message } => CommandError::InvalidDomain { message },
        other => CommandError::InvalidDomain {
            message: other.to_string(),
        },
    })
}

/// Account creation fields shared by the install-family commands.
#[derive(Debug, Clone)]
pub struct AccountPayload {
    pub domain_url: DomainUrl,
    pub member_id: String,
    pub tenant_user_id: i64,
    pub is_tenant_user_admin: bool,
    pub auth_token: AuthToken,
    pub application_version: u32,
    pub application_scope: Scope,
}

impl AccountPayload {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain_url: &str,
        member_id: &str,
        tenant_user_id: i64,
        is_tenant_user_admin: bool,
        auth_token: AuthToken,
        application_version: u32,
        application_scope: Scope,
    ) -> Result<Self, CommandError> {
        if application_version == 0 {
            return Err(CommandError::NonPositive {
                field: "application_version",
            });
        }
        Ok(Self {
            domain_url: parse_domain(domain_url)?,
            member_id: require("member_id", member_id)?,
            tenant_user_id,
            is_tenant_user_admin,
            auth_token,
            application_version,
            application_scope,
        })
    }

    pub(crate) fn into_new_account(self) -> NewAccount {
        NewAccount {
            tenant_user_id: self.tenant_user_id,
            is_tenant_user_admin: self.is_tenant_user_admin,
            member_id: self.member_id,
            domain_url: self.domain_url,
            auth_token: self.auth_token,
            application_version: self.application_version,
            application_scope: self.application_scope,
        }
    }
}

/// Installation creation fields shared by the install-family commands.
#[derive(Debug, Clone)]
pub struct InstallationPayload {
    pub application_status: ApplicationStatus,
    pub license_family: LicenseFamily,
    pub users_count: Option<u32>,
    pub contact_person_id: Option<Uuid>,
    pub partner_contact_person_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub external_id: Option<String>,
}

impl InstallationPayload {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        application_status: ApplicationStatus,
        license_family: LicenseFamily,
        users_count: Option<u32>,
        contact_person_id: Option<Uuid>,
        partner_contact_person_id: Option<Uuid>,
        partner_id: Option<Uuid>,
        external_id: Option<&str>,
    ) -> Result<Self, CommandError> {
        if users_count == Some(0) {
            return Err(CommandError::NonPositive {
                field: "users_count",
            });
        }
        let external_id = match external_id {
            Some(value) => Some(require("external_id", value)?),
            None => None,
        };
        Ok(Self {
            application_status,
            license_family,
            users_count,
            contact_person_id,
            partner_contact_person_id,
            partner_id,
            external_id,
        })
    }

    pub(crate) fn into_new_installation(self, account_id: Uuid) -> NewInstallation {
        NewInstallation {
            account_id,
            application_status: self.application_status,
            license_family: self.license_family,
            users_count: self.users_count,
            contact_person_id: self.contact_person_id,
            partner_contact_person_id: self.partner_contact_person_id,
            partner_id: self.partner_id,
            external_id: self.external_id,
        }
    }
}

/// Create a `New` account + installation pair awaiting platform
/// confirmation.
#[derive(Debug, Clone)]
pub struct InstallStartCommand {
    pub account: AccountPayload,
    pub installation: InstallationPayload,
}

impl InstallStartCommand {
    pub fn new(account: AccountPayload, installation: InstallationPayload) -> Self {
        Self {
            account,
            installation,
        }
    }
}

/// Activate the pending pair once the platform delivers the
/// application token.
#[derive(Debug, Clone)]
pub struct InstallFinishCommand {
    pub member_id: String,
    pub application_token: String,
}

impl InstallFinishCommand {
    pub fn new(member_id: &str, application_token: &str) -> Result<Self, CommandError> {
        Ok(Self {
            member_id: require("member_id", member_id)?,
            application_token: require("application_token", application_token)?,
        })
    }
}

/// Combined install: deactivate any live pair for the member, then
/// create and activate a fresh one.
#[derive(Debug, Clone)]
pub struct InstallCommand {
    pub account: AccountPayload,
    pub installation: InstallationPayload,
    pub application_token: String,
}

impl InstallCommand {
    pub fn new(
        account: AccountPayload,
        installation: InstallationPayload,
        application_token: &str,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            account,
            installation,
            application_token: require("application_token", application_token)?,
        })
    }
}

/// Replace an existing live pair with a new one.
#[derive(Debug, Clone)]
pub struct ReinstallCommand {
    pub account: AccountPayload,
    pub installation: InstallationPayload,
    pub application_token: String,
}

impl ReinstallCommand {
    pub fn new(
        account: AccountPayload,
        installation: InstallationPayload,
        application_token: &str,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            account,
            installation,
            application_token: require("application_token", application_token)?,
        })
    }
}

/// Out-of-band platform confirmation of a completed install.
#[derive(Debug, Clone)]
pub struct OnAppInstallCommand {
    pub member_id: String,
    pub application_status: ApplicationStatus,
    pub application_token: String,
}

impl OnAppInstallCommand {
    pub fn new(
        member_id: &str,
        application_status: ApplicationStatus,
        application_token: &str,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            member_id: require("member_id", member_id)?,
            application_status,
            application_token: require("application_token", application_token)?,
        })
    }
}

/// Replace an account's credential triple.
#[derive(Debug, Clone)]
pub struct RenewAuthTokenCommand {
    pub renewed: RenewedAuthToken,
    /// Disambiguates among multiple active accounts of one member.
    pub tenant_user_id: Option<i64>,
}

impl RenewAuthTokenCommand {
    pub fn new(renewed: RenewedAuthToken, tenant_user_id: Option<i64>) -> Self {
        Self {
            renewed,
            tenant_user_id,
        }
    }
}

/// Record an application version upgrade for one account.
#[derive(Debug, Clone)]
pub struct UpdateVersionCommand {
    pub member_id: String,
    pub tenant_user_id: i64,
    pub version: u32,
    pub new_scope: Option<Scope>,
}

impl UpdateVersionCommand {
    pub fn new(
        member_id: &str,
        tenant_user_id: i64,
        version: u32,
        new_scope: Option<Scope>,
    ) -> Result<Self, CommandError> {
        if version == 0 {
            return Err(CommandError::NonPositive { field: "version" });
        }
        Ok(Self {
            member_id: require("member_id", member_id)?,
            tenant_user_id,
            version,
            new_scope,
        })
    }
}

/// Migrate every account on a tenant domain to a new domain.
#[derive(Debug, Clone)]
pub struct ChangeDomainUrlCommand {
    pub old_domain_url: DomainUrl,
    pub new_domain_url: DomainUrl,
}

impl ChangeDomainUrlCommand {
    pub fn new(old_domain_url: &str, new_domain_url: &str) -> Result<Self, CommandError> {
        Ok(Self {
            old_domain_url: parse_domain(old_domain_url)?,
            new_domain_url: parse_domain(new_domain_url)?,
        })
    }
}

/// Uninstall notification from the platform.
#[derive(Debug, Clone)]
pub struct UninstallCommand {
    pub domain_url: DomainUrl,
    pub member_id: String,
    pub application_token: String,
}

impl UninstallCommand {
    pub fn new(
        domain_url: &str,
        member_id: &str,
        application_token: &str,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            domain_url: parse_domain(domain_url)?,
            member_id: require("member_id", member_id)?,
            application_token: require("application_token", application_token)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn token() -> AuthToken {
        AuthToken::new("access", "refresh", Utc::now()).unwrap()
    }

    #[test]
    fn account_payload_rejects_blank_member_id() {
        let result = AccountPayload::new(
            "portal.example.com",
            "  ",
            1,
            true,
            token(),
            1,
            Scope::default(),
        );
        assert!(matches!(
            result,
            Err(CommandError::EmptyField { field: "member_id" })
        ));
    }

    #[test]
    fn account_payload_rejects_zero_version() {
        let result = AccountPayload::new(
            "portal.example.com",
            "member-a",
            1,
            true,
            token(),
            0,
            Scope::default(),
        );
        assert!(matches!(result, Err(CommandError::NonPositive { .. })));
    }

    #[test]
    fn account_payload_rejects_bad_domain() {
        let result = AccountPayload::new(
            "invalid_domain.com",
            "member-a",
            1,
            true,
            token(),
            1,
            Scope::default(),
        );
        assert!(matches!(result, Err(CommandError::InvalidDomain { .. })));
    }

    #[test]
    fn installation_payload_rejects_zero_users_count() {
        let result = InstallationPayload::new(
            ApplicationStatus::Free,
            LicenseFamily::Free,
            Some(0),
            None,
            None,
            None,
            None,
        );
        assert!(matches!(result, Err(CommandError::NonPositive { .. })));
    }

    #[test]
    fn uninstall_command_rejects_blank_token() {
        let result = UninstallCommand::new("portal.example.com", "member-a", "");
        assert!(matches!(result, Err(CommandError::EmptyField { .. })));
    }
}
