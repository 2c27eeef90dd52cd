//! Collaborator contracts consumed by the lifecycle handlers.
//!
//! All operations are async. `save` only has to stage the entity; the
//! durable commit point is [`Flusher::flush`], which persists every
//! pending write atomically or fails without a partial state. The core
//! performs no locking of its own — conflicting concurrent writers are
//! serialized by the storage implementation.

use uuid::Uuid;

use crate::error::LifecycleResult;
use crate::events::DomainEvent;
use crate::models::account::{Account, AccountStatus};
use crate::models::domain_url::DomainUrl;
use crate::models::installation::Installation;

pub trait AccountRepository: Send + Sync {
    /// Stage an account for persistence at the next flush.
    fn save(&self, account: &Account) -> impl Future<Output = LifecycleResult<()>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LifecycleResult<Account>> + Send;

    /// All accounts of a member, optionally narrowed by status and the
    /// admin flag.
    fn find_by_member_id(
        &self,
        member_id: &str,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> impl Future<Output = LifecycleResult<Vec<Account>>> + Send;

    fn find_by_domain(
        &self,
        domain_url: &DomainUrl,
        status: Option<AccountStatus>,
        is_admin: Option<bool>,
    ) -> impl Future<Output = LifecycleResult<Vec<Account>>> + Send;

    fn find_by_application_token(
        &self,
        token: &str,
    ) -> impl Future<Output = LifecycleResult<Vec<Account>>> + Send;

    /// Physically remove a record. The lifecycle core only soft-deletes
    /// via status; this exists for operational cleanup.
    fn delete(&self, id: Uuid) -> impl Future<Output = LifecycleResult<()>> + Send;
}

pub trait InstallationRepository: Send + Sync {
    /// Stage an installation for persistence at the next flush.
    fn save(&self, installation: &Installation)
    -> impl Future<Output = LifecycleResult<()>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LifecycleResult<Installation>> + Send;

    /// The installation referencing the given account, or `NotFound`.
    fn find_by_account_id(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = LifecycleResult<Installation>> + Send;

    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> impl Future<Output = LifecycleResult<Installation>> + Send;

    /// All installations carrying the given application token. The
    /// token is the authoritative uninstall key, so the caller decides
    /// how to treat zero or multiple matches.
    fn find_by_application_token(
        &self,
        token: &str,
    ) -> impl Future<Output = LifecycleResult<Vec<Installation>>> + Send;

    /// Physically remove a record (operational cleanup only).
    fn delete(&self, id: Uuid) -> impl Future<Output = LifecycleResult<()>> + Send;
}

/// Durable commit point for all pending repository writes.
pub trait Flusher: Send + Sync {
    /// Persist every staged write atomically. On error no partial
    /// state is guaranteed persisted.
    fn flush(&self) -> impl Future<Output = LifecycleResult<()>> + Send;
}

/// Fire-and-forget forwarding of drained domain events. Delivery and
/// retry semantics are owned by the implementation.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: DomainEvent) -> impl Future<Output = ()> + Send;
}
