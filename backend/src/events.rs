//! In-process fan-out of dashboard events to SSE subscribers.
//!
//! Each subscriber gets its own bounded channel. Publishing never blocks a
//! domain operation: a subscriber whose channel is full or closed is pruned
//! on the spot and the event is simply dropped for it. Subscriptions
//! unregister themselves on drop, so a disconnected dashboard stops costing
//! anything after its next missed send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use shared::DashboardEvent;

/// Idle gap after which the SSE stream emits a ping so proxies keep the
/// connection open.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Events buffered per subscriber before publishes start dropping for it.
const EVENT_BUFFER: usize = 64;

struct Registration {
    /// Parent scope: `Some` receives only that parent's events plus
    /// broadcasts, `None` receives everything.
    parent_id: Option<i64>,
    tx: mpsc::Sender<DashboardEvent>,
}

/// EventBroadcaster owns the live subscriber registry.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    registry: Arc<Mutex<HashMap<Uuid, Registration>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber, optionally scoped to one parent's events.
    pub fn subscribe(&self, parent_id: Option<i64>) -> Subscription {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let connection_id = Uuid::new_v4();

        let mut registry = self.lock_registry();
        registry.insert(connection_id, Registration { parent_id, tx });
        info!(
            "dashboard connected: {} ({} active)",
            connection_id,
            registry.len()
        );
        drop(registry);

        Subscription {
            connection_id,
            rx,
            broadcaster: self.clone(),
        }
    }

    /// Delivers an event to every matching subscriber. A `scope` of `None`
    /// reaches everyone; `Some(parent_id)` reaches that parent's
    /// subscriptions and the unscoped ones.
    pub fn publish(&self, scope: Option<i64>, event: &DashboardEvent) {
        let mut dead = Vec::new();
        {
            let registry = self.lock_registry();
            for (id, registration) in registry.iter() {
                let matches = match (scope, registration.parent_id) {
                    (Some(scoped), Some(subscribed)) => scoped == subscribed,
                    _ => true,
                };
                if !matches {
                    continue;
                }
                if registration.tx.try_send(event.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            debug!("pruning unresponsive dashboard connection {}", id);
            self.unsubscribe(id);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.lock_registry().len()
    }

    fn unsubscribe(&self, connection_id: Uuid) {
        let mut registry = self.lock_registry();
        if registry.remove(&connection_id).is_some() {
            info!(
                "dashboard disconnected: {} ({} active)",
                connection_id,
                registry.len()
            );
        }
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Registration>> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A live subscriber handle. Dropping it unregisters the connection.
pub struct Subscription {
    connection_id: Uuid,
    rx: mpsc::Receiver<DashboardEvent>,
    broadcaster: EventBroadcaster,
}

impl Subscription {
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub async fn recv(&mut self) -> Option<DashboardEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.connection_id);
    }
}
