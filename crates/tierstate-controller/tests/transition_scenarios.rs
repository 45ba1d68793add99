#![allow(missing_docs)]
use assert_matches::assert_matches;
use tierstate_controller::TierStateController;
use tierstate_core::{TierError, TierMode, TransitionKind};
use tierstate_testkit::{partition, ControllerFixture};

use TierMode::*;

#[test]
fn fresh_partition_starts_in_memory() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    assert_eq!(fixture.mode("p"), InMemory);
    assert!(fixture.recorder.is_empty());
}

#[test]
fn entering_grace_is_visible_immediately() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");

    assert_eq!(
        fixture.controller.request_transition(&id, InMemoryGrace),
        Ok(InMemoryGrace)
    );
    assert_eq!(fixture.mode("p"), InMemoryGrace);
}

#[test]
fn skipping_the_flush_is_rejected_without_side_effects() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");
    fixture.drive("p", &[InMemoryGrace]);
    let recorded = fixture.recorder.len();

    assert_matches!(
        fixture.controller.request_transition(&id, OnDisk),
        Err(TierError::IllegalTransition {
            from: InMemoryGrace,
            to: OnDisk,
            ..
        })
    );
    assert_eq!(fixture.mode("p"), InMemoryGrace);
    assert_eq!(fixture.recorder.len(), recorded);
}

#[test]
fn in_memory_cannot_jump_to_disk() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");

    for target in [Flushing, OnDisk, InMemory] {
        assert_matches!(
            fixture.controller.request_transition(&id, target),
            Err(TierError::IllegalTransition { from: InMemory, .. })
        );
    }
    assert_eq!(fixture.mode("p"), InMemory);
}

#[test]
fn happy_path_end_to_end() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");

    for target in [InMemoryGrace, Flushing, OnDisk] {
        fixture.clock.advance(10);
        assert_eq!(fixture.controller.request_transition(&id, target), Ok(target));
        assert_eq!(fixture.mode("p"), target);
    }

    let events = fixture.recorder.events();
    let kinds: Vec<TransitionKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransitionKind::BeginGrace,
            TransitionKind::BeginFlush,
            TransitionKind::CompleteFlush,
        ]
    );
    let timestamps: Vec<u64> = events.iter().map(|event| event.timestamp_ms).collect();
    assert_eq!(timestamps, vec![1_010, 1_020, 1_030]);
}

#[test]
fn on_disk_is_terminal() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");
    fixture.drive("p", &[InMemoryGrace, Flushing, OnDisk]);

    for target in TierMode::ALL {
        assert_matches!(
            fixture.controller.request_transition(&id, target),
            Err(TierError::IllegalTransition { from: OnDisk, .. })
        );
    }
}

#[test]
fn aborted_flush_must_pass_through_grace_again() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");
    fixture.drive("p", &[InMemoryGrace, Flushing]);

    assert_eq!(fixture.controller.request_transition(&id, InMemory), Ok(InMemory));
    assert_matches!(
        fixture.controller.request_transition(&id, Flushing),
        Err(TierError::IllegalTransition {
            from: InMemory,
            to: Flushing,
            ..
        })
    );

    fixture.drive("p", &[InMemoryGrace, Flushing]);
    assert_eq!(fixture.mode("p"), Flushing);
}

#[test]
fn repeated_abort_fails_the_second_time() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");
    fixture.drive("p", &[InMemoryGrace, Flushing]);

    assert_eq!(fixture.controller.request_transition(&id, InMemory), Ok(InMemory));
    assert_matches!(
        fixture.controller.request_transition(&id, InMemory),
        Err(TierError::IllegalTransition { from: InMemory, .. })
    );
}

#[test]
fn grace_can_be_cancelled() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    fixture.drive("p", &[InMemoryGrace, InMemory]);

    assert_eq!(fixture.mode("p"), InMemory);
    assert_eq!(
        fixture.recorder.path_of(&partition("p")),
        vec![(InMemory, InMemoryGrace), (InMemoryGrace, InMemory)]
    );
}

#[test]
fn partitions_are_independent() {
    let fixture = ControllerFixture::with_partitions(&["a", "b"]);
    fixture.drive("a", &[InMemoryGrace, Flushing]);

    assert_eq!(fixture.mode("a"), Flushing);
    assert_eq!(fixture.mode("b"), InMemory);
    assert!(fixture.recorder.events_for(&partition("b")).is_empty());
}

#[test]
fn sequence_numbers_increase_across_partitions() {
    let fixture = ControllerFixture::with_partitions(&["a", "b"]);
    fixture.drive("a", &[InMemoryGrace]);
    fixture.drive("b", &[InMemoryGrace]);
    fixture.drive("a", &[Flushing]);

    let sequences: Vec<u64> = fixture
        .recorder
        .events()
        .iter()
        .map(|event| event.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[test]
fn deregistered_partition_is_unknown() {
    let fixture = ControllerFixture::with_partitions(&["p"]);
    let id = partition("p");
    fixture.drive("p", &[InMemoryGrace, Flushing, OnDisk]);

    assert_eq!(fixture.controller.deregister(&id), Ok(OnDisk));
    assert_matches!(
        fixture.controller.current_mode(&id),
        Err(TierError::UnknownPartition { .. })
    );
    assert_matches!(
        fixture.controller.request_transition(&id, InMemoryGrace),
        Err(TierError::UnknownPartition { .. })
    );
}

#[test]
fn wire_decode_never_defaults() {
    for value in 0..=3 {
        let mode = TierStateController::decode_mode(value).unwrap();
        assert_eq!(mode.encode(), value);
    }
    for value in [-1, 4, 255, i32::MIN, i32::MAX] {
        assert_eq!(TierStateController::decode_mode(value), None);
    }
}
