//! Integration tests for the deferred-write unit of work: staging,
//! batch commit, and last-write-wins semantics.

use applink_core::models::account::{Account, AccountStatus, NewAccount};
use applink_core::models::auth_token::{AuthToken, Scope};
use applink_core::models::domain_url::DomainUrl;
use applink_core::models::installation::{
    ApplicationStatus, Installation, LicenseFamily, NewInstallation,
};
use applink_core::repository::{AccountRepository, Flusher, InstallationRepository};
use applink_db::SurrealUnitOfWork;
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    applink_db::run_migrations(&db).await.unwrap();
    db
}

fn sample_account(member_id: &str) -> Account {
    Account::new(NewAccount {
        tenant_user_id: 7,
        is_tenant_user_admin: false,
        member_id: member_id.into(),
        domain_url: DomainUrl::parse("portal.example.com").unwrap(),
        auth_token: AuthToken::new("access-1", "refresh-1", Utc::now() + Duration::hours(1))
            .unwrap(),
        application_version: 1,
        application_scope: Scope::new(["crm"]).unwrap(),
    })
}

fn sample_installation(account: &Account) -> Installation {
    Installation::new(NewInstallation {
        account_id: account.id(),
        application_status: ApplicationStatus::Free,
        license_family: LicenseFamily::Free,
        users_count: Some(5),
        contact_person_id: None,
        partner_contact_person_id: None,
        partner_id: None,
        external_id: None,
    })
    .unwrap()
}

#[tokio::test]
async fn one_flush_commits_the_whole_batch() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let accounts = uow.account_repository();
    let installations = uow.installation_repository();

    let account = sample_account("member-a");
    let installation = sample_installation(&account);
    accounts.save(&account).await.unwrap();
    installations.save(&installation).await.unwrap();

    // Neither entity is visible before the checkpoint.
    assert!(accounts.get_by_id(account.id()).await.is_err());
    assert!(installations.get_by_id(installation.id()).await.is_err());

    uow.flusher().flush().await.unwrap();

    assert!(accounts.get_by_id(account.id()).await.is_ok());
    assert!(installations.get_by_id(installation.id()).await.is_ok());
}

#[tokio::test]
async fn flush_with_empty_buffer_is_a_noop() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);

    uow.flusher().flush().await.unwrap();
    // Repeated empty checkpoints are fine too.
    uow.flusher().flush().await.unwrap();
}

#[tokio::test]
async fn restaging_the_same_entity_keeps_the_last_write() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let mut account = sample_account("member-a");
    repo.save(&account).await.unwrap();
    account.application_installed("token-1").unwrap();
    repo.save(&account).await.unwrap();

    uow.flusher().flush().await.unwrap();

    let snapshot = repo.get_by_id(account.id()).await.unwrap().snapshot();
    assert_eq!(snapshot.status, AccountStatus::Active);
    assert_eq!(snapshot.application_token.as_deref(), Some("token-1"));
}

#[tokio::test]
async fn flush_drains_the_buffer() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let account = sample_account("member-a");
    repo.save(&account).await.unwrap();
    uow.flusher().flush().await.unwrap();

    // A second checkpoint without new writes must not re-commit the
    // stale snapshot over later changes.
    let mut reloaded = repo.get_by_id(account.id()).await.unwrap();
    reloaded.application_installed("token-1").unwrap();
    repo.save(&reloaded).await.unwrap();
    uow.flusher().flush().await.unwrap();
    uow.flusher().flush().await.unwrap();

    let snapshot = repo.get_by_id(account.id()).await.unwrap().snapshot();
    assert_eq!(snapshot.status, AccountStatus::Active);
}

#[tokio::test]
async fn separate_units_of_work_do_not_share_staged_state() {
    let db = setup().await;
    let uow_a = SurrealUnitOfWork::new(db.clone());
    let uow_b = SurrealUnitOfWork::new(db);

    let account = sample_account("member-a");
    uow_a.account_repository().save(&account).await.unwrap();

    // Flushing the other unit of work commits nothing.
    uow_b.flusher().flush().await.unwrap();
    assert!(
        uow_b
            .account_repository()
            .get_by_id(account.id())
            .await
            .is_err()
    );

    uow_a.flusher().flush().await.unwrap();
    assert!(
        uow_b
            .account_repository()
            .get_by_id(account.id())
            .await
            .is_ok()
    );
}
