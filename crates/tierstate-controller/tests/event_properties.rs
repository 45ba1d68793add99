#![allow(missing_docs)]
use proptest::prelude::*;
use std::collections::HashMap;
use tierstate_core::{TierMode, TransitionKind};
use tierstate_testkit::{partition, ControllerFixture};

const PARTITIONS: [&str; 3] = ["a", "b", "c"];

fn arb_request() -> impl Strategy<Value = (usize, TierMode)> {
    (
        0..PARTITIONS.len(),
        prop::sample::select(TierMode::ALL.to_vec()),
    )
}

proptest! {
    /// The controller agrees with a sequential model of the transition graph,
    /// and every emitted event describes exactly one accepted request.
    #[test]
    fn controller_matches_graph_model(requests in prop::collection::vec(arb_request(), 0..64)) {
        let fixture = ControllerFixture::with_partitions(&PARTITIONS);
        let mut model: HashMap<&str, TierMode> =
            PARTITIONS.iter().map(|name| (*name, TierMode::InMemory)).collect();
        let mut accepted = 0usize;

        for (index, target) in requests {
            let name = PARTITIONS[index];
            let before = model[name];
            let result = fixture.controller.request_transition(&partition(name), target);

            if before.can_transition_to(target) {
                prop_assert_eq!(result, Ok(target));
                model.insert(name, target);
                accepted += 1;
            } else {
                prop_assert!(result.unwrap_err().is_illegal_transition());
            }
            prop_assert_eq!(fixture.mode(name), model[name]);
        }

        let events = fixture.recorder.events();
        prop_assert_eq!(events.len(), accepted);
        for (position, event) in events.iter().enumerate() {
            prop_assert_eq!(event.sequence, position as u64 + 1);
            prop_assert_eq!(TransitionKind::classify(event.from, event.to), Some(event.kind));
        }
    }
}
