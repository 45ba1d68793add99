//! Observer that records every event it receives

use parking_lot::Mutex;
use tierstate_controller::TransitionObserver;
use tierstate_core::{PartitionId, TierMode, TransitionEvent};

/// Keeps every transition event in arrival order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().clone()
    }

    /// Events of one partition, in arrival order
    pub fn events_for(&self, partition_id: &PartitionId) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| &event.partition_id == partition_id)
            .cloned()
            .collect()
    }

    /// The `(from, to)` path a partition has taken
    pub fn path_of(&self, partition_id: &PartitionId) -> Vec<(TierMode, TierMode)> {
        self.events_for(partition_id)
            .into_iter()
            .map(|event| (event.from, event.to))
            .collect()
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl TransitionObserver for RecordingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        self.events.lock().push(event.clone());
    }
}
