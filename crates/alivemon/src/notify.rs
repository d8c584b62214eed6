use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::PublishError;
use crate::types::MonitorEvent;

/// Notification bus the engine publishes liveness transitions to
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a transition; failures are reported, never retried
    async fn publish(&self, event: MonitorEvent) -> Result<(), PublishError>;
}

/// In-process bus backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<MonitorEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: MonitorEvent) -> Result<(), PublishError> {
        debug!(monitor_id = event.monitor_id, state = %event.state, "Publishing liveness event");
        // Ignore errors if there are no receivers
        let _ = self.tx.send(event);
        Ok(())
    }
}
