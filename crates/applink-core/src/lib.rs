//! AppLink Core — domain models and collaborator contracts for the
//! application-installation lifecycle on a multi-tenant SaaS platform.
//!
//! This crate provides:
//! - The [`Account`](models::account::Account) and
//!   [`Installation`](models::installation::Installation) state machines
//! - Domain events and the [`EventEmitter`](events::EventEmitter) drain
//!   protocol
//! - Repository, [`Flusher`](repository::Flusher), and
//!   [`EventDispatcher`](repository::EventDispatcher) trait contracts
//! - Error types ([`LifecycleError`](error::LifecycleError))
//!
//! Persistence implementations live in `applink-db`; use-case
//! orchestration lives in `applink-lifecycle`.

pub mod error;
pub mod events;
pub mod models;
pub mod repository;

pub use error::{LifecycleError, LifecycleResult};
pub use events::{DomainEvent, EventEmitter};
