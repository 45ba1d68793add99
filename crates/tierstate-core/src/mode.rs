//! TierMode - Storage Residency States
//!
//! The four residency states of a partition and their integer wire encoding.
//! The encoding is an external contract: values are never renumbered, and an
//! integer outside `0..=3` never decodes to a mode.
//!
//! ## State Transitions
//!
//! ```text
//! InMemory → InMemoryGrace → Flushing → OnDisk
//!     ↑            │            │
//!     └────────────┴────────────┘
//!        cancel         abort
//! ```
//!
//! `OnDisk` is terminal.

use crate::errors::{Result, TierError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage residency state of a partition
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum TierMode {
    /// Fully resident in memory, no disk I/O on reads or writes
    #[default]
    InMemory = 0,

    /// Marked for eviction, still served from memory during the grace window
    InMemoryGrace = 1,

    /// Background flush in progress, memory copy still authoritative for reads
    Flushing = 2,

    /// Fully persisted, reads incur disk I/O
    OnDisk = 3,
}

impl TierMode {
    /// All modes in wire order
    pub const ALL: [TierMode; 4] = [
        TierMode::InMemory,
        TierMode::InMemoryGrace,
        TierMode::Flushing,
        TierMode::OnDisk,
    ];

    /// Integer value of this mode on the wire
    pub const fn encode(self) -> i32 {
        self as i32
    }

    /// Reverse lookup from a wire integer
    ///
    /// Returns `None` for any value outside `0..=3`.
    pub const fn decode(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::InMemory),
            1 => Some(Self::InMemoryGrace),
            2 => Some(Self::Flushing),
            3 => Some(Self::OnDisk),
            _ => None,
        }
    }

    /// Reverse lookup that reports unknown values as [`TierError::UnrecognizedWireValue`]
    pub fn try_decode(value: i32) -> Result<Self> {
        Self::decode(value).ok_or(TierError::UnrecognizedWireValue { value })
    }

    /// Snake-case name of the mode
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::InMemoryGrace => "in_memory_grace",
            Self::Flushing => "flushing",
            Self::OnDisk => "on_disk",
        }
    }

    /// Check if this mode can move to `next`
    ///
    /// Allowed transitions:
    /// - InMemory → InMemoryGrace
    /// - InMemoryGrace → InMemory (cancel), Flushing
    /// - Flushing → InMemory (abort), OnDisk (complete)
    /// - OnDisk is terminal
    pub const fn can_transition_to(self, next: TierMode) -> bool {
        use TierMode::*;

        matches!(
            (self, next),
            (InMemory, InMemoryGrace)
                | (InMemoryGrace, InMemory)
                | (InMemoryGrace, Flushing)
                | (Flushing, InMemory)
                | (Flushing, OnDisk)
        )
    }

    /// Modes reachable from this one in a single transition
    pub fn allowed_targets(self) -> impl Iterator<Item = TierMode> {
        Self::ALL
            .into_iter()
            .filter(move |next| self.can_transition_to(*next))
    }

    /// Check if no further transitions are possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::OnDisk)
    }

    /// Check if reads are served from the in-memory copy
    pub const fn serves_from_memory(self) -> bool {
        !matches!(self, Self::OnDisk)
    }
}

impl fmt::Display for TierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("Invalid tier mode: {s}"))
    }
}

impl From<TierMode> for i32 {
    fn from(mode: TierMode) -> Self {
        mode.encode()
    }
}

impl TryFrom<i32> for TierMode {
    type Error = TierError;

    fn try_from(value: i32) -> Result<Self> {
        Self::try_decode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_wire_values_are_stable() {
        assert_eq!(TierMode::InMemory.encode(), 0);
        assert_eq!(TierMode::InMemoryGrace.encode(), 1);
        assert_eq!(TierMode::Flushing.encode(), 2);
        assert_eq!(TierMode::OnDisk.encode(), 3);
    }

    #[test]
    fn test_unknown_values_do_not_decode() {
        assert_eq!(TierMode::decode(-1), None);
        assert_eq!(TierMode::decode(4), None);
        assert_eq!(TierMode::decode(i32::MAX), None);
        assert_matches!(
            TierMode::try_decode(7),
            Err(TierError::UnrecognizedWireValue { value: 7 })
        );
    }

    #[test]
    fn test_transition_table() {
        use TierMode::*;

        let allowed: Vec<(TierMode, TierMode)> = TierMode::ALL
            .into_iter()
            .flat_map(|from| from.allowed_targets().map(move |to| (from, to)))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (InMemory, InMemoryGrace),
                (InMemoryGrace, InMemory),
                (InMemoryGrace, Flushing),
                (Flushing, InMemory),
                (Flushing, OnDisk),
            ]
        );
    }

    #[test]
    fn test_no_self_transitions() {
        for mode in TierMode::ALL {
            assert!(!mode.can_transition_to(mode), "{mode} -> {mode} allowed");
        }
    }

    #[test]
    fn test_terminal_state() {
        assert!(TierMode::OnDisk.is_terminal());
        assert_eq!(TierMode::OnDisk.allowed_targets().count(), 0);
        assert!(!TierMode::Flushing.is_terminal());
        assert!(TierMode::Flushing.serves_from_memory());
        assert!(!TierMode::OnDisk.serves_from_memory());
    }

    #[test]
    fn test_names_parse_back() {
        for mode in TierMode::ALL {
            assert_eq!(mode.as_str().parse::<TierMode>(), Ok(mode));
        }
        assert!("rpc_on_disk".parse::<TierMode>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_integer() {
        assert_eq!(serde_json::to_string(&TierMode::Flushing).unwrap(), "2");
        assert_eq!(
            serde_json::from_str::<TierMode>("3").unwrap(),
            TierMode::OnDisk
        );
        assert!(serde_json::from_str::<TierMode>("4").is_err());
    }
}

#[cfg(test)]
mod proptest_wire {
    use super::*;
    use proptest::prelude::*;

    fn arb_mode() -> impl Strategy<Value = TierMode> {
        prop::sample::select(TierMode::ALL.to_vec())
    }

    proptest! {
        /// decode(encode(v)) == v for every mode
        #[test]
        fn decode_inverts_encode(mode in arb_mode()) {
            prop_assert_eq!(TierMode::decode(mode.encode()), Some(mode));
        }

        /// encode(decode(n)) == n on the wire range, nothing decodes outside it
        #[test]
        fn decode_is_partial(value in any::<i32>()) {
            match TierMode::decode(value) {
                Some(mode) => {
                    prop_assert!((0..=3).contains(&value));
                    prop_assert_eq!(mode.encode(), value);
                }
                None => prop_assert!(!(0..=3).contains(&value)),
            }
        }

        /// Every legal edge is either forward along the happy path or returns to memory
        #[test]
        fn edges_are_forward_or_back_to_memory(from in arb_mode(), to in arb_mode()) {
            if from.can_transition_to(to) {
                prop_assert!(to.encode() == from.encode() + 1 || to == TierMode::InMemory);
                prop_assert!(!from.is_terminal());
            }
        }
    }
}
