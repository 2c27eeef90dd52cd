//! Lifecycle service — one use case per method.
//!
//! Generic over the collaborator traits so the orchestration layer has
//! no dependency on the database crate. Each method is one logical
//! transaction: load, transition, save, flush, then forward the drained
//! domain events. Where a method flushes more than once, each flush is
//! a deliberate checkpoint — a crash in between leaves the earlier
//! batch committed and the caller is expected to replay the request.

use applink_core::error::{LifecycleError, LifecycleResult};
use applink_core::events::EventEmitter;
use applink_core::models::account::{Account, AccountStatus};
use applink_core::models::installation::{Installation, InstallationStatus};
use applink_core::repository::{
    AccountRepository, EventDispatcher, Flusher, InstallationRepository,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{
    ChangeDomainUrlCommand, InstallCommand, InstallFinishCommand, InstallStartCommand,
    OnAppInstallCommand, ReinstallCommand, RenewAuthTokenCommand, UninstallCommand,
    UpdateVersionCommand,
};

/// Identifiers of a freshly created account + installation pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOutput {
    pub account_id: Uuid,
    pub installation_id: Uuid,
}

pub struct LifecycleService<A, I, F, D> {
    accounts: A,
    installations: I,
    flusher: F,
    dispatcher: D,
}

impl<A, I, F, D> LifecycleService<A, I, F, D>
where
    A: AccountRepository,
    I: InstallationRepository,
    F: Flusher,
    D: EventDispatcher,
{
    pub fn new(accounts: A, installations: I, flusher: F, dispatcher: D) -> Self {
        Self {
            accounts,
            installations,
            flusher,
            dispatcher,
        }
    }

    /// Create a `New` account + installation pair awaiting the
    /// platform's install confirmation.
    pub async fn install_start(&self, cmd: InstallStartCommand) -> LifecycleResult<InstallOutput> {
        info!(member_id = %cmd.account.member_id, "install start");

        let mut account = Account::new(cmd.account.into_new_account());
        self.accounts.save(&account).await?;

        let mut installation =
            Installation::new(cmd.installation.into_new_installation(account.id()))?;
        self.installations.save(&installation).await?;

        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;
        self.dispatch_events(&mut installation).await;

        info!(
            account_id = %account.id(),
            installation_id = %installation.id(),
            "install start finished"
        );
        Ok(InstallOutput {
            account_id: account.id(),
            installation_id: installation.id(),
        })
    }

    /// Activate the pending pair with the platform-issued application
    /// token.
    pub async fn install_finish(&self, cmd: InstallFinishCommand) -> LifecycleResult<()> {
        info!(member_id = %cmd.member_id, "install finish");

        // 1. Exactly one pending account for the member.
        let mut matches = self
            .accounts
            .find_by_member_id(&cmd.member_id, Some(AccountStatus::New), None)
            .await?;
        let mut account = match matches.len() {
            0 => {
                return Err(LifecycleError::NotFound {
                    entity: "account",
                    key: format!("member_id={}, status=New", cmd.member_id),
                });
            }
            1 => matches.remove(0),
            count => {
                return Err(LifecycleError::MultipleAccountsFound {
                    member_id: cmd.member_id.clone(),
                    count,
                });
            }
        };

        // 2. Activate account, then its installation.
        account.application_installed(&cmd.application_token)?;
        let mut installation = self.installations.find_by_account_id(account.id()).await?;
        installation.application_installed(Some(&cmd.application_token))?;

        // 3. Persist the pair in one flush; account events first.
        self.accounts.save(&account).await?;
        self.installations.save(&installation).await?;
        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;
        self.dispatch_events(&mut installation).await;

        info!(account_id = %account.id(), "install finish done");
        Ok(())
    }

    /// Combined install: deactivate any live pair for the member
    /// first, then create and activate a fresh pair.
    ///
    /// The deactivation batch is flushed before anything new is
    /// created so two live installations for one tenant never coexist,
    /// even transiently.
    pub async fn install(&self, cmd: InstallCommand) -> LifecycleResult<InstallOutput> {
        let member_id = cmd.account.member_id.clone();
        info!(member_id = %member_id, "install");

        // 1. Discover live accounts and their installations.
        let mut live_accounts = self.live_accounts(&member_id).await?;
        let mut live_installations = self.live_installations(&live_accounts).await?;

        // 2. Deactivate and flush the old batch first.
        if !live_accounts.is_empty() || !live_installations.is_empty() {
            self.deactivate_batch(&mut live_accounts, &mut live_installations)
                .await?;
        }

        // 3. Create the new account and activate it.
        let mut account = Account::new(cmd.account.into_new_account());
        account.application_installed(&cmd.application_token)?;
        self.accounts.save(&account).await?;

        // 4. Create the new installation referencing the new account.
        let mut installation =
            Installation::new(cmd.installation.into_new_installation(account.id()))?;
        installation.application_installed(Some(&cmd.application_token))?;
        self.installations.save(&installation).await?;

        // 5. Flush the new pair; account events precede installation
        //    events.
        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;
        self.dispatch_events(&mut installation).await;

        info!(
            account_id = %account.id(),
            installation_id = %installation.id(),
            "install finished"
        );
        Ok(InstallOutput {
            account_id: account.id(),
            installation_id: installation.id(),
        })
    }

    /// Replace an existing live pair with a new one.
    ///
    /// More than one live installation for the member is a consistency
    /// violation and fails before any mutation.
    pub async fn reinstall(&self, cmd: ReinstallCommand) -> LifecycleResult<InstallOutput> {
        let member_id = cmd.account.member_id.clone();
        info!(member_id = %member_id, "reinstall");

        // 1. At most one live installation may exist.
        let mut live_accounts = self.live_accounts(&member_id).await?;
        let mut live_installations = self.live_installations(&live_accounts).await?;
        if live_installations.len() > 1 {
            return Err(LifecycleError::MultipleInstallationsFound {
                member_id,
                count: live_installations.len(),
            });
        }

        // 2. Deactivate the old pair and checkpoint it. A crash after
        //    this flush leaves the old pair gone; replaying the
        //    request then takes the empty path and still converges.
        if !live_accounts.is_empty() || !live_installations.is_empty() {
            self.deactivate_batch(&mut live_accounts, &mut live_installations)
                .await?;
        }

        // 3.-5. Same creation sequence as the combined install.
        let mut account = Account::new(cmd.account.into_new_account());
        account.application_installed(&cmd.application_token)?;
        self.accounts.save(&account).await?;

        let mut installation =
            Installation::new(cmd.installation.into_new_installation(account.id()))?;
        installation.application_installed(Some(&cmd.application_token))?;
        self.installations.save(&installation).await?;

        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;
        self.dispatch_events(&mut installation).await;

        info!(
            account_id = %account.id(),
            installation_id = %installation.id(),
            "reinstall finished"
        );
        Ok(InstallOutput {
            account_id: account.id(),
            installation_id: installation.id(),
        })
    }

    /// Reconcile platform-confirmed install state delivered
    /// out-of-band.
    ///
    /// `NotFound` here is the documented missed-event case: the
    /// platform confirms an install this system never started.
    pub async fn on_application_install(&self, cmd: OnAppInstallCommand) -> LifecycleResult<()> {
        info!(member_id = %cmd.member_id, "on application install");

        // 1. Exactly one active account for the member.
        let mut matches = self
            .accounts
            .find_by_member_id(&cmd.member_id, Some(AccountStatus::Active), None)
            .await?;
        let mut account = match matches.len() {
            0 => {
                return Err(LifecycleError::NotFound {
                    entity: "account",
                    key: format!("member_id={}, status=Active", cmd.member_id),
                });
            }
            1 => matches.remove(0),
            count => {
                return Err(LifecycleError::MultipleAccountsFound {
                    member_id: cmd.member_id.clone(),
                    count,
                });
            }
        };

        // 2. Its installation must be active as well.
        let mut installation = self.installations.find_by_account_id(account.id()).await?;
        if installation.status() != InstallationStatus::Active {
            return Err(LifecycleError::NotFound {
                entity: "installation",
                key: format!("account_id={}, status=Active", account.id()),
            });
        }

        // 3. Apply the platform-confirmed status and token to both.
        installation.change_application_status(cmd.application_status)?;
        installation.set_application_token(&cmd.application_token)?;
        account.set_application_token(&cmd.application_token)?;

        self.accounts.save(&account).await?;
        self.installations.save(&installation).await?;
        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;
        self.dispatch_events(&mut installation).await;

        info!(installation_id = %installation.id(), "on application install finished");
        Ok(())
    }

    /// Replace an account's credential triple.
    pub async fn renew_auth_token(&self, cmd: RenewAuthTokenCommand) -> LifecycleResult<()> {
        let member_id = cmd.renewed.member_id.clone();
        info!(member_id = %member_id, "renew auth token");

        let mut matches = self
            .accounts
            .find_by_member_id(&member_id, Some(AccountStatus::Active), None)
            .await?;
        if let Some(tenant_user_id) = cmd.tenant_user_id {
            matches.retain(|account| account.tenant_user_id() == tenant_user_id);
        }

        let mut account = match matches.len() {
            0 => {
                return Err(LifecycleError::NotFound {
                    entity: "account",
                    key: format!(
                        "member_id={}, status=Active, tenant_user_id={:?}",
                        member_id, cmd.tenant_user_id
                    ),
                });
            }
            1 => matches.remove(0),
            count => {
                return Err(LifecycleError::MultipleAccountsFound { member_id, count });
            }
        };

        account.renew_auth_token(&cmd.renewed)?;
        self.accounts.save(&account).await?;
        self.flusher.flush().await?;

        info!(account_id = %account.id(), "auth token renewed");
        Ok(())
    }

    /// Record an application version upgrade.
    pub async fn update_application_version(
        &self,
        cmd: UpdateVersionCommand,
    ) -> LifecycleResult<()> {
        info!(
            member_id = %cmd.member_id,
            version = cmd.version,
            "update application version"
        );

        let mut matches = self
            .accounts
            .find_by_member_id(&cmd.member_id, Some(AccountStatus::Active), None)
            .await?;
        matches.retain(|account| account.tenant_user_id() == cmd.tenant_user_id);

        let mut account = match matches.len() {
            0 => {
                return Err(LifecycleError::NotFound {
                    entity: "account",
                    key: format!(
                        "member_id={}, status=Active, tenant_user_id={}",
                        cmd.member_id, cmd.tenant_user_id
                    ),
                });
            }
            1 => matches.remove(0),
            count => {
                return Err(LifecycleError::MultipleAccountsFound {
                    member_id: cmd.member_id.clone(),
                    count,
                });
            }
        };

        account.update_application_version(cmd.version, cmd.new_scope)?;
        self.accounts.save(&account).await?;
        self.flusher.flush().await?;
        self.dispatch_events(&mut account).await;

        info!(account_id = %account.id(), "application version updated");
        Ok(())
    }

    /// Migrate every non-terminal account on the old domain to the new
    /// one. Zero matches is a benign no-op.
    pub async fn change_domain_url(&self, cmd: ChangeDomainUrlCommand) -> LifecycleResult<()> {
        info!(
            old_domain_url = %cmd.old_domain_url,
            new_domain_url = %cmd.new_domain_url,
            "change domain url"
        );

        // Deleted accounts are historical records and stay on the old
        // domain; Blocked accounts still fail the entity invariant and
        // abort the migration.
        let mut accounts = Vec::new();
        for status in [AccountStatus::New, AccountStatus::Active, AccountStatus::Blocked] {
            accounts.extend(
                self.accounts
                    .find_by_domain(&cmd.old_domain_url, Some(status), None)
                    .await?,
            );
        }
        if accounts.is_empty() {
            info!(old_domain_url = %cmd.old_domain_url, "no accounts on domain, nothing to do");
            return Ok(());
        }

        for account in &mut accounts {
            account.change_domain_url(cmd.new_domain_url.clone())?;
            self.accounts.save(account).await?;
        }
        self.flusher.flush().await?;
        for account in &mut accounts {
            self.dispatch_events(account).await;
        }

        info!(migrated = accounts.len(), "domain url changed");
        Ok(())
    }

    /// Uninstall notification. The application token is the
    /// authoritative key; a token matching no installation is a benign
    /// no-op. Every account sharing the member id is uninstalled with
    /// the tolerant variant — one bad account never aborts the batch.
    pub async fn uninstall(&self, cmd: UninstallCommand) -> LifecycleResult<()> {
        info!(
            member_id = %cmd.member_id,
            domain_url = %cmd.domain_url,
            "uninstall"
        );

        // 1. Look up the installation by token.
        let mut found = self
            .installations
            .find_by_application_token(&cmd.application_token)
            .await?;
        let mut installation = match found.len() {
            0 => {
                info!(member_id = %cmd.member_id, "uninstall matched no installation, ignoring");
                return Ok(());
            }
            1 => found.remove(0),
            count => {
                return Err(LifecycleError::MultipleInstallationsFound {
                    member_id: cmd.member_id.clone(),
                    count,
                });
            }
        };

        // 2. Uninstall the installation, token checked.
        installation.application_uninstalled(Some(&cmd.application_token))?;
        self.installations.save(&installation).await?;

        // 3. Uninstall every account of the member, each attempt
        //    independent.
        let mut accounts = self
            .accounts
            .find_by_member_id(&cmd.member_id, None, None)
            .await?;
        for account in &mut accounts {
            match account.application_uninstalled(None) {
                Ok(()) => {
                    self.accounts.save(account).await?;
                    debug!(account_id = %account.id(), "account uninstalled");
                }
                Err(err) => {
                    warn!(
                        account_id = %account.id(),
                        error = %err,
                        "skipping account during uninstall"
                    );
                }
            }
        }

        // 4. One flush for the whole batch, then forward events.
        self.flusher.flush().await?;
        for account in &mut accounts {
            self.dispatch_events(account).await;
        }
        self.dispatch_events(&mut installation).await;

        info!(installation_id = %installation.id(), "uninstall finished");
        Ok(())
    }

    // -- internals ------------------------------------------------------

    /// Accounts of the member that are not terminally deleted or
    /// blocked out of the install flow: `New` or `Active`.
    async fn live_accounts(&self, member_id: &str) -> LifecycleResult<Vec<Account>> {
        let mut accounts = self
            .accounts
            .find_by_member_id(member_id, Some(AccountStatus::New), None)
            .await?;
        accounts.extend(
            self.accounts
                .find_by_member_id(member_id, Some(AccountStatus::Active), None)
                .await?,
        );
        Ok(accounts)
    }

    /// Live (`New` or `Active`) installations referenced by the given
    /// accounts. A missing installation for an account is tolerated.
    async fn live_installations(
        &self,
        accounts: &[Account],
    ) -> LifecycleResult<Vec<Installation>> {
        let mut installations = Vec::new();
        for account in accounts {
            match self.installations.find_by_account_id(account.id()).await {
                Ok(installation) if installation.status() != InstallationStatus::Deleted => {
                    installations.push(installation);
                }
                Ok(_) => {}
                Err(LifecycleError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(installations)
    }

    /// Uninstall the given live pairs with the tolerant variant, flush
    /// the batch, and forward its events. Accounts and installations
    /// that are not in a state to be uninstalled (e.g. a `New`
    /// installation whose install never finished) are logged and
    /// skipped.
    async fn deactivate_batch(
        &self,
        accounts: &mut [Account],
        installations: &mut [Installation],
    ) -> LifecycleResult<()> {
        for installation in installations.iter_mut() {
            match installation.application_uninstalled(None) {
                Ok(()) => self.installations.save(installation).await?,
                Err(err) => {
                    warn!(
                        installation_id = %installation.id(),
                        error = %err,
                        "skipping installation during deactivation"
                    );
                }
            }
        }
        for account in accounts.iter_mut() {
            match account.application_uninstalled(None) {
                Ok(()) => self.accounts.save(account).await?,
                Err(err) => {
                    warn!(
                        account_id = %account.id(),
                        error = %err,
                        "skipping account during deactivation"
                    );
                }
            }
        }

        self.flusher.flush().await?;
        for account in accounts.iter_mut() {
            self.dispatch_events(account).await;
        }
        for installation in installations.iter_mut() {
            self.dispatch_events(installation).await;
        }
        Ok(())
    }

    async fn dispatch_events(&self, emitter: &mut impl EventEmitter) {
        for event in emitter.take_events() {
            self.dispatcher.dispatch(event).await;
        }
    }
}
