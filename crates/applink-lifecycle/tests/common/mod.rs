//! In-memory collaborator fakes for handler tests.
#![allow(dead_code)]
//!
//! The store distinguishes committed from pending state so tests can
//! assert on flush checkpoints: `save` only stages a snapshot, and the
//! flusher moves the staged batch into the committed maps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use applink_core::error::{LifecycleError, LifecycleResult};
use applink_core::events::DomainEvent;
use applink_core::models::account::{Account, AccountSnapshot, AccountStatus};
use applink_core::models::domain_url::DomainUrl;
use applink_core::models::installation::{Installation, InstallationSnapshot};
use applink_core::repository::{
    AccountRepository, EventDispatcher, Flusher, InstallationRepository,
};
use uuid::Uuid;

#[derive(Default)]
struct StoreInner {
    accounts: HashMap<Uuid, AccountSnapshot>,
    installations: HashMap<Uuid, InstallationSnapshot>,
    pending_accounts: Vec<AccountSnapshot>,
    pending_installations: Vec<InstallationSnapshot>,
    flush_count: usize,
    save_count: usize,
}

/// Shared in-memory backing store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_repo(&self) -> InMemoryAccounts {
        InMemoryAccounts {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn installation_repo(&self) -> InMemoryInstallations {
        InMemoryInstallations {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn flusher(&self) -> InMemoryFlusher {
        InMemoryFlusher {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Commit an account directly, bypassing the staging buffer.
    pub fn seed_account(&self, account: &Account) {
        let snapshot = account.snapshot();
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(snapshot.id, snapshot);
    }

    /// Commit an installation directly, bypassing the staging buffer.
    pub fn seed_installation(&self, installation: &Installation) {
        let snapshot = installation.snapshot();
        self.inner
            .lock()
            .unwrap()
            .installations
            .insert(snapshot.id, snapshot);
    }

    pub fn committed_account(&self, id: Uuid) -> Option<AccountSnapshot> {
        self.inner.lock().unwrap().accounts.get(&id).cloned()
    }

    pub fn committed_installation(&self, id: Uuid) -> Option<InstallationSnapshot> {
        self.inner.lock().unwrap().installations.get(&id).cloned()
    }

    pub fn committed_accounts_by_member(&self, member_id: &str) -> Vec<AccountSnapshot> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .values()
            .filter(|snapshot| snapshot.member_id == member_id)
            .cloned()
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.inner.lock().unwrap().flush_count
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().unwrap().save_count
    }

    pub fn pending_len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pending_accounts.len() + inner.pending_installations.len()
    }
}

#[derive(Clone)]
pub struct InMemoryAccounts {
    inner: Arc<Mutex<StoreInner>>,
}

impl AccountRepository for InMemoryAccounts {
    async fn save(&self, account: &Account) -> LifecycleResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_accounts.push(account.snapshot());
        inner.save_count += 1;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> LifecycleResult<Account> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .get(&id)
            .cloned()
            .map(Account::from_snapshot)
            .ok_or_else(|| LifecycleError::NotFound {
                entity: "account",
                key: format!("id={id}"),
            })
    }

    async fn find_by_member_id(
        &self,
        member_id: &str,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> LifecycleResult<Vec<Account>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .accounts
            .values()
            .filter(|s| s.member_id == member_id)
            .filter(|s| status.is_none_or(|status| s.status == status))
            .filter(|s| is_admin.is_none_or(|admin| s.is_tenant_user_admin == admin))
            .cloned()
            .map(Account::from_snapshot)
            .collect())
    }

    async fn find_by_domain(
        &self,
        domain_url: &DomainUrl,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> LifecycleResult<Vec<Account>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .accounts
            .values()
            .filter(|s| s.domain_url == *domain_url)
            .filter(|s| status.is_none_or(|status| s.status == status))
            .filter(|s| is_admin.is_none_or(|admin| s.is_tenant_user_admin == admin))
            .cloned()
            .map(Account::from_snapshot)
            .collect())
    }

    async fn find_by_application_token(&self, token: &str) -> LifecycleResult<Vec<Account>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .accounts
            .values()
            .filter(|s| s.application_token.as_deref() == Some(token))
            .cloned()
            .map(Account::from_snapshot)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> LifecycleResult<()> {
        self.inner.lock().unwrap().accounts.remove(&id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryInstallations {
    inner: Arc<Mutex<StoreInner>>,
}

impl InstallationRepository for InMemoryInstallations {
    async fn save(&self, installation: &Installation) -> LifecycleResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_installations.push(installation.snapshot());
        inner.save_count += 1;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> LifecycleResult<Installation> {
        self.inner
            .lock()
            .unwrap()
            .installations
            .get(&id)
            .cloned()
            .map(Installation::from_snapshot)
            .ok_or_else(|| LifecycleError::NotFound {
                entity: "installation",
                key: format!("id={id}"),
            })
    }

    async fn find_by_account_id(&self, account_id: Uuid) -> LifecycleResult<Installation> {
        self.inner
            .lock()
            .unwrap()
            .installations
            .values()
            .find(|s| s.account_id == account_id)
            .cloned()
            .map(Installation::from_snapshot)
            .ok_or_else(|| LifecycleError::NotFound {
                entity: "installation",
                key: format!("account_id={account_id}"),
            })
    }

    async fn find_by_external_id(&self, external_id: &str) -> LifecycleResult<Installation> {
        self.inner
            .lock()
            .unwrap()
            .installations
            .values()
            .find(|s| s.external_id.as_deref() == Some(external_id))
            .cloned()
            .map(Installation::from_snapshot)
            .ok_or_else(|| LifecycleError::NotFound {
                entity: "installation",
                key: format!("external_id={external_id}"),
            })
    }

    async fn find_by_application_token(&self, token: &str) -> LifecycleResult<Vec<Installation>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .installations
            .values()
            .filter(|s| s.application_token.as_deref() == Some(token))
            .cloned()
            .map(Installation::from_snapshot)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> LifecycleResult<()> {
        self.inner.lock().unwrap().installations.remove(&id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryFlusher {
    inner: Arc<Mutex<StoreInner>>,
}

impl Flusher for InMemoryFlusher {
    async fn flush(&self) -> LifecycleResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.flush_count += 1;
        let accounts = std::mem::take(&mut inner.pending_accounts);
        for snapshot in accounts {
            inner.accounts.insert(snapshot.id, snapshot);
        }
        let installations = std::mem::take(&mut inner.pending_installations);
        for snapshot in installations {
            inner.installations.insert(snapshot.id, snapshot);
        }
        Ok(())
    }
}

/// Dispatcher that records every forwarded event in order.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// -----------------------------------------------------------------------
// Fixtures
// -----------------------------------------------------------------------

use applink_core::events::EventEmitter;
use applink_core::models::account::NewAccount;
use applink_core::models::auth_token::{AuthToken, Scope};
use applink_core::models::installation::{
    ApplicationStatus, LicenseFamily, NewInstallation,
};
use applink_lifecycle::{AccountPayload, InstallationPayload, LifecycleService};
use chrono::{Duration, Utc};

pub type TestService =
    LifecycleService<InMemoryAccounts, InMemoryInstallations, InMemoryFlusher, RecordingDispatcher>;

pub fn service(store: &InMemoryStore, dispatcher: &RecordingDispatcher) -> TestService {
    LifecycleService::new(
        store.account_repo(),
        store.installation_repo(),
        store.flusher(),
        dispatcher.clone(),
    )
}

pub fn auth_token() -> AuthToken {
    AuthToken::new("access-1", "refresh-1", Utc::now() + Duration::hours(1)).unwrap()
}

pub fn account_payload(member_id: &str, domain: &str) -> AccountPayload {
    AccountPayload::new(
        domain,
        member_id,
        7,
        true,
        auth_token(),
        1,
        Scope::new(["crm"]).unwrap(),
    )
    .unwrap()
}

pub fn installation_payload() -> InstallationPayload {
    InstallationPayload::new(
        ApplicationStatus::Free,
        LicenseFamily::Basic,
        Some(10),
        None,
        None,
        None,
        None,
    )
    .unwrap()
}

/// Seed a committed, already-active account with no installation.
pub fn seed_active_account(
    store: &InMemoryStore,
    member_id: &str,
    domain: &str,
    token: &str,
) -> Uuid {
    let mut account = Account::new(NewAccount {
        tenant_user_id: 7,
        is_tenant_user_admin: true,
        member_id: member_id.into(),
        domain_url: DomainUrl::parse(domain).unwrap(),
        auth_token: auth_token(),
        application_version: 1,
        application_scope: Scope::new(["crm"]).unwrap(),
    });
    account.application_installed(token).unwrap();
    account.take_events();
    store.seed_account(&account);
    account.id()
}

/// Seed a committed, already-active account + installation pair.
pub fn seed_active_pair(
    store: &InMemoryStore,
    member_id: &str,
    domain: &str,
    token: &str,
) -> (Uuid, Uuid) {
    let mut account = Account::new(NewAccount {
        tenant_user_id: 7,
        is_tenant_user_admin: true,
        member_id: member_id.into(),
        domain_url: DomainUrl::parse(domain).unwrap(),
        auth_token: auth_token(),
        application_version: 1,
        application_scope: Scope::new(["crm"]).unwrap(),
    });
    account.application_installed(token).unwrap();
    account.take_events();

    let mut installation = Installation::new(NewInstallation {
        account_id: account.id(),
        application_status: ApplicationStatus::Free,
        license_family: LicenseFamily::Basic,
        users_count: Some(10),
        contact_person_id: None,
        partner_contact_person_id: None,
        partner_id: None,
        external_id: None,
    })
    .unwrap();
    installation.application_installed(Some(token)).unwrap();
    installation.take_events();

    store.seed_account(&account);
    store.seed_installation(&installation);
    (account.id(), installation.id())
}
