//! AppLink Lifecycle — use-case orchestration for installation,
//! reinstallation, token renewal, version upgrade, domain migration,
//! and uninstallation.
//!
//! Each business transaction is one method on
//! [`LifecycleService`](service::LifecycleService): it loads the
//! affected aggregates through the repository contracts, invokes their
//! transition methods, flushes once per transaction scope, and forwards
//! the drained domain events to the injected dispatcher.

pub mod command;
pub mod dispatch;
pub mod error;
pub mod service;

pub use command::{
    AccountPayload, ChangeDomainUrlCommand, InstallCommand, InstallFinishCommand,
    InstallStartCommand, InstallationPayload, OnAppInstallCommand, ReinstallCommand,
    RenewAuthTokenCommand, UninstallCommand, UpdateVersionCommand,
};
pub use dispatch::TracingDispatcher;
pub use error::CommandError;
pub use service::{InstallOutput, LifecycleService};
