//! # Tierstate Core - Domain Types
//!
//! **Purpose**: Define storage tier modes, their stable wire encoding, and the
//! rules governing movement between memory and disk residency.
//!
//! # Architecture Constraints
//!
//! - YES Tier mode values and their integer wire contract
//! - YES The transition graph and transition classification
//! - YES Partition identifiers, descriptors and transition events
//! - YES Configuration loading and validation
//! - NO locking or shared state (that's `tierstate-controller`)
//! - NO async execution or I/O beyond reading configuration files
//!
//! ## Core Concepts
//!
//! - **TierMode**: `in_memory`, `in_memory_grace`, `flushing`, `on_disk`,
//!   encoded on the wire as `0..=3`. Unknown integers never decode to a mode.
//! - **Transition graph**: the happy path `in_memory → in_memory_grace →
//!   flushing → on_disk` plus the cancel (`in_memory_grace → in_memory`) and
//!   abort (`flushing → in_memory`) edges.
//! - **TransitionEvent**: the record emitted for every accepted transition.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration types and loading
pub mod config;

/// Unified error type
pub mod errors;

/// Partition identifiers and descriptors
pub mod partition;

/// Tier modes and wire encoding
pub mod mode;

/// Time sources for event timestamps
pub mod time;

/// Transition classification and events
pub mod transition;

pub use config::{ControllerConfig, FlushConfig, PressureConfig, TierConfig, CONFIG_KEYS};
pub use errors::{Result, TierError};
pub use mode::TierMode;
pub use partition::{PartitionDescriptor, PartitionId, StorageUsage};
pub use time::{SystemTimeSource, TimeSource};
pub use transition::{TransitionEvent, TransitionKind};
