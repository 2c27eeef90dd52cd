//! SurrealDB repository implementations for the core traits.

pub(crate) mod account;
pub(crate) mod installation;

pub use account::SurrealAccountRepository;
pub use installation::SurrealInstallationRepository;
