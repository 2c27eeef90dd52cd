//! Domain events and the emitter drain protocol.
//!
//! Entities buffer events on mutation; the orchestrating handler drains
//! them once per flush cycle via [`EventEmitter::take_events`] and hands
//! them to an injected dispatcher. An event is never re-delivered from
//! the entity once drained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fact recording a completed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    AccountCreated {
        account_id: Uuid,
        member_id: String,
        occurred_at: DateTime<Utc>,
    },
    AccountApplicationInstalled {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountApplicationUninstalled {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountBlocked {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountUnblocked {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountDomainUrlChanged {
        account_id: Uuid,
        old_domain_url: String,
        new_domain_url: String,
        occurred_at: DateTime<Utc>,
    },
    AccountApplicationVersionUpdated {
        account_id: Uuid,
        previous_version: u32,
        new_version: u32,
        occurred_at: DateTime<Utc>,
    },
    InstallationCreated {
        installation_id: Uuid,
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    InstallationFinished {
        installation_id: Uuid,
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    InstallationUninstalled {
        installation_id: Uuid,
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
}

/// Capability of an entity to hand over its buffered domain events.
pub trait EventEmitter {
    /// Return all buffered events and clear the buffer.
    ///
    /// Draining is destructive: a second call returns an empty vector
    /// unless new transitions happened in between.
    fn take_events(&mut self) -> Vec<DomainEvent>;
}
