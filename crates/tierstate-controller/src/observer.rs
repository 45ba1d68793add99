//! Transition event observers
//!
//! Observers are called synchronously by the controller after a transition
//! is published and before the requesting call returns. They run while the
//! partition's transition gate is held, so they must not block and must not
//! request transitions on the partition they are being notified about.
//!
//! Consumers that need to do real work (a routing service, the flush worker)
//! subscribe through [`BroadcastObserver`] and process events on their own task.

use tierstate_core::{ControllerConfig, TransitionEvent};
use tokio::sync::broadcast;

/// Receiver of accepted transitions
pub trait TransitionObserver: Send + Sync {
    /// Called once per accepted transition, in per-partition order
    fn on_transition(&self, event: &TransitionEvent);
}

impl<F> TransitionObserver for F
where
    F: Fn(&TransitionEvent) + Send + Sync,
{
    fn on_transition(&self, event: &TransitionEvent) {
        self(event);
    }
}

/// Fans transition events out on a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<TransitionEvent>,
}

impl BroadcastObserver {
    /// Create an observer buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create an observer sized from controller configuration
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.event_channel_capacity)
    }

    /// Subscribe to events accepted after this call
    ///
    /// A subscriber that falls more than `capacity` events behind receives
    /// `RecvError::Lagged` and should resynchronize from a controller snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl TransitionObserver for BroadcastObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        // No subscribers is not an error, events are simply dropped
        let _ = self.sender.send(event.clone());
    }
}

/// Logs every transition through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TransitionObserver for TracingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        if event.kind.is_reversal() {
            tracing::info!(
                partition = %event.partition_id,
                from = %event.from,
                to = %event.to,
                kind = %event.kind,
                sequence = event.sequence,
                "Partition returned to memory"
            );
        } else {
            tracing::debug!(
                partition = %event.partition_id,
                from = %event.from,
                to = %event.to,
                kind = %event.kind,
                sequence = event.sequence,
                "Partition changed tier"
            );
        }
    }
}
