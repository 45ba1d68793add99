//! Transition classification and events
//!
//! Every legal edge of the tier graph has a [`TransitionKind`]. Accepted
//! transitions are recorded as [`TransitionEvent`]s and handed to observers,
//! e.g. a directory service that reroutes reads between memory and disk.

use crate::mode::TierMode;
use crate::partition::PartitionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic label of a legal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// `in_memory → in_memory_grace`: partition slated for eviction
    BeginGrace,
    /// `in_memory_grace → in_memory`: grace period cancelled
    CancelGrace,
    /// `in_memory_grace → flushing`: background flush started
    BeginFlush,
    /// `flushing → in_memory`: flush aborted before completion
    AbortFlush,
    /// `flushing → on_disk`: flush completed
    CompleteFlush,
}

impl TransitionKind {
    /// Classify an edge, `None` if it is not part of the graph
    pub const fn classify(from: TierMode, to: TierMode) -> Option<Self> {
        use TierMode::*;

        match (from, to) {
            (InMemory, InMemoryGrace) => Some(Self::BeginGrace),
            (InMemoryGrace, InMemory) => Some(Self::CancelGrace),
            (InMemoryGrace, Flushing) => Some(Self::BeginFlush),
            (Flushing, InMemory) => Some(Self::AbortFlush),
            (Flushing, OnDisk) => Some(Self::CompleteFlush),
            _ => None,
        }
    }

    /// Whether the transition moves the partition back towards memory
    pub const fn is_reversal(self) -> bool {
        matches!(self, Self::CancelGrace | Self::AbortFlush)
    }

    /// Snake-case name of the kind
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeginGrace => "begin_grace",
            Self::CancelGrace => "cancel_grace",
            Self::BeginFlush => "begin_flush",
            Self::AbortFlush => "abort_flush",
            Self::CompleteFlush => "complete_flush",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one accepted transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Partition that moved
    pub partition_id: PartitionId,
    /// Mode before the transition
    pub from: TierMode,
    /// Mode after the transition
    pub to: TierMode,
    /// Edge classification
    pub kind: TransitionKind,
    /// Controller-wide sequence number, strictly increasing
    pub sequence: u64,
    /// Wall-clock time of the transition in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} -> {} ({})",
            self.sequence, self.partition_id, self.from, self.to, self.kind
        )
    }
}
