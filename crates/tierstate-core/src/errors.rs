//! Unified error type for tier operations
//!
//! Every failure is reported synchronously as a typed value. None of these
//! errors is fatal: a failed operation leaves the partition in its prior
//! valid mode.

use crate::mode::TierMode;
use crate::partition::PartitionId;
use serde::{Deserialize, Serialize};

/// Error type for all tier operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TierError {
    /// The partition was never registered or has been deregistered
    #[error("Unknown partition: {partition_id}")]
    UnknownPartition {
        /// Partition that was looked up
        partition_id: PartitionId,
    },

    /// The requested edge is not part of the transition graph
    #[error("Illegal transition for {partition_id}: {from} -> {to}")]
    IllegalTransition {
        /// Partition the request targeted
        partition_id: PartitionId,
        /// Mode the partition was actually in when the request was evaluated
        from: TierMode,
        /// Mode that was requested
        to: TierMode,
    },

    /// An integer outside the wire range was decoded
    #[error("Unrecognized tier mode wire value: {value}")]
    UnrecognizedWireValue {
        /// The offending integer
        value: i32,
    },

    /// The partition moved on since the transition the caller expected
    #[error(
        "Transition for {partition_id} superseded: expected sequence {expected_sequence}, \
         found {current_sequence} ({current})"
    )]
    Superseded {
        /// Partition the request targeted
        partition_id: PartitionId,
        /// Sequence of the transition the caller acted on
        expected_sequence: u64,
        /// Sequence of the partition's latest transition
        current_sequence: u64,
        /// Mode the partition is in now
        current: TierMode,
    },

    /// A partition with the same identifier is already registered
    #[error("Partition already registered: {partition_id}")]
    DuplicatePartition {
        /// Partition that was registered twice
        partition_id: PartitionId,
    },

    /// A partition identifier failed validation
    #[error("Invalid partition id: {message}")]
    InvalidPartitionId {
        /// Why the identifier was rejected
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl TierError {
    /// Create an unknown partition error
    pub fn unknown_partition(partition_id: impl Into<PartitionId>) -> Self {
        Self::UnknownPartition {
            partition_id: partition_id.into(),
        }
    }

    /// Create an illegal transition error
    pub fn illegal_transition(
        partition_id: impl Into<PartitionId>,
        from: TierMode,
        to: TierMode,
    ) -> Self {
        Self::IllegalTransition {
            partition_id: partition_id.into(),
            from,
            to,
        }
    }

    /// Create a superseded transition error
    pub fn superseded(
        partition_id: impl Into<PartitionId>,
        expected_sequence: u64,
        current_sequence: u64,
        current: TierMode,
    ) -> Self {
        Self::Superseded {
            partition_id: partition_id.into(),
            expected_sequence,
            current_sequence,
            current,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error says the partition does not exist
    pub fn is_unknown_partition(&self) -> bool {
        matches!(self, Self::UnknownPartition { .. })
    }

    /// Whether the error says the requested edge was rejected
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. })
    }

    /// Whether the error says the partition changed under the caller
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Standard Result type for tier operations
pub type Result<T> = std::result::Result<T, TierError>;

impl From<toml::de::Error> for TierError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}
