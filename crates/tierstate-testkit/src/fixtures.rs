//! Controller fixtures and descriptor factories

use crate::clock::ManualClock;
use crate::observer::RecordingObserver;
use std::sync::Arc;
use tierstate_controller::TierStateController;
use tierstate_core::{PartitionDescriptor, PartitionId, TierMode};

/// Descriptor for a test partition backed by `/tmp/tierstate/<name>`
pub fn descriptor(name: &str) -> PartitionDescriptor {
    PartitionDescriptor::new(name, format!("/tmp/tierstate/{name}")).with_capacity(1 << 20)
}

/// Partition identifier from a name
pub fn partition(name: &str) -> PartitionId {
    PartitionId::from(name)
}

/// Controller wired to a recording observer and a manual clock
pub struct ControllerFixture {
    /// Controller under test
    pub controller: Arc<TierStateController>,
    /// Every event the controller emitted
    pub recorder: Arc<RecordingObserver>,
    /// Clock stamping the events
    pub clock: Arc<ManualClock>,
}

impl ControllerFixture {
    /// Fixture with no partitions registered
    pub fn new() -> Self {
        let recorder = Arc::new(RecordingObserver::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let controller = Arc::new(
            TierStateController::with_time_source(clock.clone()).with_observer(recorder.clone()),
        );
        Self {
            controller,
            recorder,
            clock,
        }
    }

    /// Fixture with the named partitions registered in memory
    pub fn with_partitions(names: &[&str]) -> Self {
        let fixture = Self::new();
        for name in names {
            fixture.controller.register(descriptor(name)).unwrap();
        }
        fixture
    }

    /// Current mode of a partition that must exist
    pub fn mode(&self, name: &str) -> TierMode {
        self.controller.current_mode(&partition(name)).unwrap()
    }

    /// Apply a sequence of transitions that must all succeed
    pub fn drive(&self, name: &str, path: &[TierMode]) {
        let id = partition(name);
        for target in path {
            self.controller.request_transition(&id, *target).unwrap();
        }
    }
}

impl Default for ControllerFixture {
    fn default() -> Self {
        Self::new()
    }
}
