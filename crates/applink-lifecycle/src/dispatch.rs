//! Log-only event dispatcher.

use applink_core::events::DomainEvent;
use applink_core::repository::EventDispatcher;
use tracing::info;

/// Dispatcher that records every event on the `tracing` pipeline.
///
/// Useful as a default wiring and in environments without a message
/// bus; real deployments inject their own [`EventDispatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

impl EventDispatcher for TracingDispatcher {
    async fn dispatch(&self, event: DomainEvent) {
        info!(?event, "domain event");
    }
}
