//! Tier State Controller
//!
//! Holds the current [`TierMode`] of every registered partition and enforces
//! the transition graph defined by [`TierMode::can_transition_to`].
//!
//! # Locking
//!
//! - The partition table is a `RwLock<HashMap>` held only long enough to
//!   look up, insert or remove a slot.
//! - Each slot has a `gate` mutex that serializes transitions of that
//!   partition, and a separate `state` lock that readers take without
//!   waiting on the gate. The state pairs the mode with the sequence number
//!   of the transition that produced it.
//! - Observers run while the gate is held, after the new mode is published,
//!   so events of one partition are delivered in transition order and
//!   `current_mode` already reports the new mode when an observer runs.

use crate::observer::TransitionObserver;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tierstate_core::{
    PartitionDescriptor, PartitionId, Result, SystemTimeSource, TierError, TierMode, TimeSource,
    TransitionEvent, TransitionKind,
};

/// Transition gate state of a slot
#[derive(Debug, Default)]
struct Gate {
    /// Set once the partition is deregistered; later transitions fail
    retired: bool,
}

/// Mode of a partition together with the transition that produced it
///
/// `sequence` is the [`TransitionEvent::sequence`] of the latest accepted
/// transition, or 0 if the partition has not moved since registration.
/// Workers hold on to it to tell one grace window or flush from a later one
/// in the same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionState {
    /// Current mode
    pub mode: TierMode,
    /// Sequence of the transition into `mode`
    pub sequence: u64,
}

/// Precondition a transition must meet besides the graph edge
#[derive(Debug, Clone, Copy)]
enum Guard {
    Any,
    Mode(TierMode),
    Sequence(u64),
}

struct PartitionSlot {
    descriptor: PartitionDescriptor,
    gate: Mutex<Gate>,
    state: RwLock<PartitionState>,
}

impl PartitionSlot {
    fn new(descriptor: PartitionDescriptor) -> Self {
        Self {
            descriptor,
            gate: Mutex::new(Gate::default()),
            state: RwLock::new(PartitionState {
                mode: TierMode::InMemory,
                sequence: 0,
            }),
        }
    }

    fn state(&self) -> PartitionState {
        *self.state.read()
    }

    fn mode(&self) -> TierMode {
        self.state.read().mode
    }
}

/// Authoritative owner of partition tier modes
///
/// Shared between foreground request paths and background workers, usually
/// behind an `Arc`.
pub struct TierStateController {
    partitions: RwLock<HashMap<PartitionId, Arc<PartitionSlot>>>,
    observers: RwLock<Vec<Arc<dyn TransitionObserver>>>,
    sequence: AtomicU64,
    time: Arc<dyn TimeSource>,
}

impl TierStateController {
    /// Create a controller using the system clock for event timestamps
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    /// Create a controller with an explicit time source
    pub fn with_time_source(time: Arc<dyn TimeSource>) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            time,
        }
    }

    /// Attach an observer while building the controller
    pub fn with_observer(self, observer: Arc<dyn TransitionObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Attach an observer; it receives every transition accepted from now on
    pub fn add_observer(&self, observer: Arc<dyn TransitionObserver>) {
        self.observers.write().push(observer);
    }

    /// Reverse lookup from a wire integer, `None` if out of range
    pub fn decode_mode(value: i32) -> Option<TierMode> {
        TierMode::decode(value)
    }

    /// Register a partition in `in_memory`
    pub fn register(&self, descriptor: PartitionDescriptor) -> Result<TierMode> {
        descriptor.id.validate()?;

        let mut partitions = self.partitions.write();
        if partitions.contains_key(&descriptor.id) {
            return Err(TierError::DuplicatePartition {
                partition_id: descriptor.id,
            });
        }

        let id = descriptor.id.clone();
        tracing::info!(
            partition = %id,
            partition_type = %descriptor.partition_type,
            capacity_bytes = descriptor.capacity_bytes,
            "Registered partition"
        );
        partitions.insert(id, Arc::new(PartitionSlot::new(descriptor)));
        Ok(TierMode::InMemory)
    }

    /// Remove a partition, returning the mode it was last in
    ///
    /// A transition racing with deregistration either completes first or
    /// fails with `UnknownPartition`.
    pub fn deregister(&self, partition_id: &PartitionId) -> Result<TierMode> {
        let slot = self
            .partitions
            .write()
            .remove(partition_id)
            .ok_or_else(|| TierError::unknown_partition(partition_id))?;

        let mut gate = slot.gate.lock();
        gate.retired = true;
        let mode = slot.mode();
        drop(gate);

        tracing::info!(partition = %partition_id, %mode, "Deregistered partition");
        Ok(mode)
    }

    /// Current mode of a partition
    pub fn current_mode(&self, partition_id: &PartitionId) -> Result<TierMode> {
        Ok(self.slot(partition_id)?.mode())
    }

    /// Current mode of a partition and the sequence of the transition into it
    pub fn state(&self, partition_id: &PartitionId) -> Result<PartitionState> {
        Ok(self.slot(partition_id)?.state())
    }

    /// Descriptor supplied when the partition was registered
    pub fn descriptor(&self, partition_id: &PartitionId) -> Result<PartitionDescriptor> {
        Ok(self.slot(partition_id)?.descriptor.clone())
    }

    /// Move a partition to `target`
    ///
    /// Succeeds only if `(current, target)` is an edge of the transition
    /// graph. On success the new mode is visible to `current_mode` and every
    /// observer has received the event before this returns. A rejected
    /// request leaves the partition untouched.
    pub fn request_transition(
        &self,
        partition_id: &PartitionId,
        target: TierMode,
    ) -> Result<TierMode> {
        self.transition(partition_id, Guard::Any, target)
            .map(|event| event.to)
    }

    /// Move a partition to `target` only if it is currently in `expected`
    ///
    /// Background workers use this so that a transition decided on a stale
    /// read is rejected instead of applied to a partition that has moved on.
    /// The returned `IllegalTransition` carries the actual current mode.
    pub fn transition_from(
        &self,
        partition_id: &PartitionId,
        expected: TierMode,
        target: TierMode,
    ) -> Result<TierMode> {
        self.transition(partition_id, Guard::Mode(expected), target)
            .map(|event| event.to)
    }

    /// Move a partition to `target` only if its latest transition is still
    /// the one numbered `expected_sequence`
    ///
    /// Stricter than [`transition_from`](Self::transition_from): a partition
    /// that left and re-entered the same mode is rejected with `Superseded`.
    /// Returns the accepted event so the caller can chain on its sequence.
    pub fn transition_at(
        &self,
        partition_id: &PartitionId,
        expected_sequence: u64,
        target: TierMode,
    ) -> Result<TransitionEvent> {
        self.transition(partition_id, Guard::Sequence(expected_sequence), target)
    }

    /// All partitions and their modes, ordered by partition id
    pub fn snapshot(&self) -> Vec<(PartitionId, TierMode)> {
        let mut entries: Vec<_> = self
            .partitions
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.mode()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Partitions currently in `mode`, ordered by partition id
    pub fn partitions_in(&self, mode: TierMode) -> Vec<PartitionId> {
        self.states_in(mode).into_iter().map(|(id, _)| id).collect()
    }

    /// Partitions currently in `mode` with their states, ordered by partition id
    pub fn states_in(&self, mode: TierMode) -> Vec<(PartitionId, PartitionState)> {
        let mut entries: Vec<_> = self
            .partitions
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.state()))
            .filter(|(_, state)| state.mode == mode)
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of registered partitions
    pub fn len(&self) -> usize {
        self.partitions.read().len()
    }

    /// Whether no partition is registered
    pub fn is_empty(&self) -> bool {
        self.partitions.read().is_empty()
    }

    fn slot(&self, partition_id: &PartitionId) -> Result<Arc<PartitionSlot>> {
        self.partitions
            .read()
            .get(partition_id)
            .cloned()
            .ok_or_else(|| TierError::unknown_partition(partition_id))
    }

    fn transition(
        &self,
        partition_id: &PartitionId,
        guard: Guard,
        target: TierMode,
    ) -> Result<TransitionEvent> {
        let slot = self.slot(partition_id)?;
        let gate = slot.gate.lock();
        if gate.retired {
            return Err(TierError::unknown_partition(partition_id));
        }

        let current = slot.state();
        let from = current.mode;
        if let Guard::Sequence(expected) = guard {
            if expected != current.sequence {
                tracing::debug!(
                    partition = %partition_id,
                    expected_sequence = expected,
                    current_sequence = current.sequence,
                    to = %target,
                    "Rejected superseded transition"
                );
                return Err(TierError::superseded(
                    partition_id,
                    expected,
                    current.sequence,
                    from,
                ));
            }
        }

        let admitted = match guard {
            Guard::Mode(expected) => expected == from,
            Guard::Any | Guard::Sequence(_) => true,
        };
        let kind = match TransitionKind::classify(from, target) {
            Some(kind) if admitted => kind,
            _ => {
                tracing::debug!(
                    partition = %partition_id,
                    %from,
                    to = %target,
                    "Rejected tier transition"
                );
                return Err(TierError::illegal_transition(partition_id, from, target));
            }
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        *slot.state.write() = PartitionState {
            mode: target,
            sequence,
        };

        let event = TransitionEvent {
            partition_id: partition_id.clone(),
            from,
            to: target,
            kind,
            sequence,
            timestamp_ms: self.time.now_ms(),
        };
        tracing::debug!(
            partition = %partition_id,
            %from,
            to = %target,
            %kind,
            sequence = event.sequence,
            "Tier transition"
        );

        let observers = self.observers.read().clone();
        for observer in &observers {
            observer.on_transition(&event);
        }
        drop(gate);

        Ok(event)
    }
}

impl Default for TierStateController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TierStateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierStateController")
            .field("partitions", &self.len())
            .field("observers", &self.observers.read().len())
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn registered(name: &str) -> (TierStateController, PartitionId) {
        let controller = TierStateController::new();
        let descriptor = PartitionDescriptor::new(name, format!("/tmp/{name}"));
        controller.register(descriptor).unwrap();
        (controller, PartitionId::from(name))
    }

    #[test]
    fn test_fresh_partition_is_in_memory() {
        let (controller, id) = registered("p0");
        assert_eq!(controller.current_mode(&id).unwrap(), TierMode::InMemory);
        assert_eq!(controller.len(), 1);
    }

    #[test]
    fn test_unknown_partition() {
        let controller = TierStateController::new();
        let id = PartitionId::from("missing");
        assert_matches!(
            controller.current_mode(&id),
            Err(TierError::UnknownPartition { .. })
        );
        assert_matches!(
            controller.request_transition(&id, TierMode::InMemoryGrace),
            Err(TierError::UnknownPartition { .. })
        );
    }

    #[test]
    fn test_duplicate_and_invalid_registration() {
        let (controller, _) = registered("p0");
        assert_matches!(
            controller.register(PartitionDescriptor::new("p0", "/tmp/other")),
            Err(TierError::DuplicatePartition { .. })
        );
        assert_matches!(
            controller.register(PartitionDescriptor::new("", "/tmp/empty")),
            Err(TierError::InvalidPartitionId { .. })
        );
    }

    #[test]
    fn test_compare_and_set_reports_actual_mode() {
        let (controller, id) = registered("p0");
        controller
            .request_transition(&id, TierMode::InMemoryGrace)
            .unwrap();

        let err = controller
            .transition_from(&id, TierMode::InMemory, TierMode::InMemoryGrace)
            .unwrap_err();
        assert_eq!(
            err,
            TierError::illegal_transition("p0", TierMode::InMemoryGrace, TierMode::InMemoryGrace)
        );
    }

    #[test]
    fn test_state_tracks_latest_sequence() {
        let (controller, id) = registered("p0");
        assert_eq!(
            controller.state(&id).unwrap(),
            PartitionState {
                mode: TierMode::InMemory,
                sequence: 0
            }
        );

        let entered = controller
            .transition_at(&id, 0, TierMode::InMemoryGrace)
            .unwrap();
        assert_eq!(controller.state(&id).unwrap().sequence, entered.sequence);
        assert_eq!(
            controller.states_in(TierMode::InMemoryGrace),
            vec![(
                id.clone(),
                PartitionState {
                    mode: TierMode::InMemoryGrace,
                    sequence: entered.sequence
                }
            )]
        );
    }

    #[test]
    fn test_reentered_mode_supersedes_old_sequence() {
        let (controller, id) = registered("p0");
        let first = controller
            .transition_at(&id, 0, TierMode::InMemoryGrace)
            .unwrap();
        controller.request_transition(&id, TierMode::InMemory).unwrap();
        controller
            .request_transition(&id, TierMode::InMemoryGrace)
            .unwrap();

        // Same mode as the first entry, but a different grace window
        let err = controller
            .transition_at(&id, first.sequence, TierMode::Flushing)
            .unwrap_err();
        assert_eq!(
            err,
            TierError::superseded("p0", first.sequence, 3, TierMode::InMemoryGrace)
        );
        assert_eq!(
            controller.current_mode(&id).unwrap(),
            TierMode::InMemoryGrace
        );

        // The matching sequence still has to name a graph edge
        assert_matches!(
            controller.transition_at(&id, 3, TierMode::OnDisk),
            Err(TierError::IllegalTransition { .. })
        );
    }

    #[test]
    fn test_deregistered_partition_is_unknown() {
        let (controller, id) = registered("p0");
        controller
            .request_transition(&id, TierMode::InMemoryGrace)
            .unwrap();

        assert_eq!(controller.deregister(&id).unwrap(), TierMode::InMemoryGrace);
        assert!(controller.is_empty());
        assert_matches!(
            controller.current_mode(&id),
            Err(TierError::UnknownPartition { .. })
        );
        assert_matches!(
            controller.deregister(&id),
            Err(TierError::UnknownPartition { .. })
        );

        // Re-registration starts over in memory
        controller
            .register(PartitionDescriptor::new("p0", "/tmp/p0"))
            .unwrap();
        assert_eq!(controller.current_mode(&id).unwrap(), TierMode::InMemory);
    }

    #[test]
    fn test_observer_sees_published_mode() {
        let controller = Arc::new(TierStateController::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&controller);
        let sink = seen.clone();
        controller.add_observer(Arc::new(move |event: &TransitionEvent| {
            if let Some(controller) = weak.upgrade() {
                let mode = controller.current_mode(&event.partition_id).ok();
                sink.lock().push((event.to, mode));
            }
        }));

        controller
            .register(PartitionDescriptor::new("p0", "/tmp/p0"))
            .unwrap();
        let id = PartitionId::from("p0");
        controller
            .request_transition(&id, TierMode::InMemoryGrace)
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![(TierMode::InMemoryGrace, Some(TierMode::InMemoryGrace))]
        );
    }

    #[test]
    fn test_snapshot_and_filter() {
        let controller = TierStateController::new();
        for name in ["b", "a", "c"] {
            controller
                .register(PartitionDescriptor::new(name, format!("/tmp/{name}")))
                .unwrap();
        }
        controller
            .request_transition(&PartitionId::from("c"), TierMode::InMemoryGrace)
            .unwrap();

        let snapshot = controller.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(
            controller.partitions_in(TierMode::InMemoryGrace),
            vec![PartitionId::from("c")]
        );
    }

    #[test]
    fn test_decode_mode() {
        assert_eq!(TierStateController::decode_mode(2), Some(TierMode::Flushing));
        assert_eq!(TierStateController::decode_mode(9), None);
    }
}
