//! Integration tests for the Account and Installation repository
//! implementations using in-memory SurrealDB.

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
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    applink_db::run_migrations(&db).await.unwrap();
    db
}

fn sample_account(member_id: &str, domain: &str) -> Account {
    Account::new(NewAccount {
        tenant_user_id: 7,
        is_tenant_user_admin: true,
        member_id: member_id.into(),
        domain_url: DomainUrl::parse(domain).unwrap(),
        auth_token: AuthToken::new("access-1", "refresh-1", Utc::now() + Duration::hours(1))
            .unwrap(),
        application_version: 1,
        application_scope: Scope::new(["crm", "task"]).unwrap(),
    })
}

fn sample_installation(account_id: Uuid, external_id: Option<&str>) -> Installation {
    Installation::new(NewInstallation {
        account_id,
        application_status: ApplicationStatus::Free,
        license_family: LicenseFamily::Basic,
        users_count: Some(25),
        contact_person_id: Some(Uuid::new_v4()),
        partner_contact_person_id: None,
        partner_id: None,
        external_id: external_id.map(Into::into),
    })
    .unwrap()
}

// -----------------------------------------------------------------------
// Account repository
// -----------------------------------------------------------------------

#[tokio::test]
async fn save_is_invisible_until_flush() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let account = sample_account("member-a", "portal.example.com");
    repo.save(&account).await.unwrap();

    // Staged only: a direct read must miss.
    assert!(repo.get_by_id(account.id()).await.is_err());

    uow.flusher().flush().await.unwrap();

    let fetched = repo.get_by_id(account.id()).await.unwrap();
    let snapshot = fetched.snapshot();
    assert_eq!(snapshot.member_id, "member-a");
    assert_eq!(snapshot.domain_url.as_str(), "portal.example.com");
    assert_eq!(snapshot.status, AccountStatus::New);
    assert_eq!(snapshot.auth_token.access_token(), "access-1");
    assert_eq!(snapshot.application_version, 1);
    assert!(snapshot.application_scope.contains("task"));
}

#[tokio::test]
async fn find_by_member_applies_status_and_admin_filters() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let mut active = sample_account("member-a", "portal.example.com");
    active.application_installed("token-1").unwrap();
    let fresh = sample_account("member-a", "portal.example.com");
    let other = sample_account("member-b", "portal.example.com");

    repo.save(&active).await.unwrap();
    repo.save(&fresh).await.unwrap();
    repo.save(&other).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let all = repo
        .find_by_member_id("member-a", None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let active_only = repo
        .find_by_member_id("member-a", Some(AccountStatus::Active), None)
        .await
        .unwrap();
    assert_eq!(active_only.len(), 1);
    assert_eq!(active_only[0].id(), active.id());

    let admins = repo
        .find_by_member_id("member-a", None, Some(false))
        .await
        .unwrap();
    assert!(admins.is_empty());
}

#[tokio::test]
async fn find_by_domain_scopes_to_the_portal() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let here = sample_account("member-a", "portal.example.com");
    let elsewhere = sample_account("member-a", "other.example.com");
    repo.save(&here).await.unwrap();
    repo.save(&elsewhere).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let domain = DomainUrl::parse("portal.example.com").unwrap();
    let found = repo.find_by_domain(&domain, None, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), here.id());
}

#[tokio::test]
async fn find_account_by_application_token() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let mut account = sample_account("member-a", "portal.example.com");
    account.application_installed("token-xyz").unwrap();
    repo.save(&account).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let found = repo.find_by_application_token("token-xyz").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), account.id());

    let missing = repo.find_by_application_token("no-such").await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn delete_account_removes_the_record() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.account_repository();

    let account = sample_account("member-a", "portal.example.com");
    repo.save(&account).await.unwrap();
    uow.flusher().flush().await.unwrap();

    repo.delete(account.id()).await.unwrap();
    assert!(repo.get_by_id(account.id()).await.is_err());
}

// -----------------------------------------------------------------------
// Installation repository
// -----------------------------------------------------------------------

#[tokio::test]
async fn installation_round_trip_preserves_every_field() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.installation_repository();

    let account_id = Uuid::new_v4();
    let mut installation = sample_installation(account_id, Some("ext-42"));
    installation.application_installed(Some("token-1")).unwrap();
    repo.save(&installation).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let fetched = repo.get_by_id(installation.id()).await.unwrap();
    let snapshot = fetched.snapshot();
    assert_eq!(snapshot.account_id, account_id);
    assert_eq!(snapshot.application_status, ApplicationStatus::Free);
    assert_eq!(snapshot.license_family, LicenseFamily::Basic);
    assert_eq!(snapshot.users_count, Some(25));
    assert!(snapshot.contact_person_id.is_some());
    assert_eq!(snapshot.external_id.as_deref(), Some("ext-42"));
    assert_eq!(snapshot.application_token.as_deref(), Some("token-1"));
}

#[tokio::test]
async fn find_installation_by_account_and_external_id() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.installation_repository();

    let account_id = Uuid::new_v4();
    let installation = sample_installation(account_id, Some("ext-7"));
    repo.save(&installation).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let by_account = repo.find_by_account_id(account_id).await.unwrap();
    assert_eq!(by_account.id(), installation.id());

    let by_external = repo.find_by_external_id("ext-7").await.unwrap();
    assert_eq!(by_external.id(), installation.id());

    assert!(repo.find_by_account_id(Uuid::new_v4()).await.is_err());
    assert!(repo.find_by_external_id("ext-missing").await.is_err());
}

#[tokio::test]
async fn find_installations_by_application_token() {
    let db = setup().await;
    let uow = SurrealUnitOfWork::new(db);
    let repo = uow.installation_repository();

    let mut installation = sample_installation(Uuid::new_v4(), None);
    installation.application_installed(Some("token-a")).unwrap();
    let unrelated = sample_installation(Uuid::new_v4(), None);
    repo.save(&installation).await.unwrap();
    repo.save(&unrelated).await.unwrap();
    uow.flusher().flush().await.unwrap();

    let found = repo.find_by_application_token("token-a").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), installation.id());
}
