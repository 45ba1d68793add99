//! # Tierstate Controller
//!
//! **Purpose**: Own the authoritative tier mode of every registered partition
//! and drive partitions between memory and disk residency.
//!
//! The [`TierStateController`] is the single authority for transition
//! legality. Everything else in this crate is a client of it:
//!
//! - [`observer`]: fan-out of transition events to routing services
//! - [`pressure`]: capacity-driven entry into (and exit from) the grace window
//! - [`flush`]: background worker that persists partitions and aborts failed flushes
//!
//! ## Concurrency
//!
//! Transitions are serialized per partition; different partitions never
//! contend beyond a brief table lookup. Reads of the current mode never
//! observe an intermediate value and are not blocked by observers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierstate_controller::{BroadcastObserver, TierStateController};
//! use tierstate_core::{PartitionDescriptor, TierMode};
//!
//! # fn example() -> tierstate_core::Result<()> {
//! let events = Arc::new(BroadcastObserver::new(1024));
//! let controller = TierStateController::new().with_observer(events.clone());
//!
//! let descriptor = PartitionDescriptor::new("0_65536", "/var/lib/tierstate/0_65536");
//! controller.register(descriptor.clone())?;
//! controller.request_transition(&descriptor.id, TierMode::InMemoryGrace)?;
//! assert_eq!(controller.current_mode(&descriptor.id)?, TierMode::InMemoryGrace);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authoritative per-partition tier state
pub mod controller;

/// Background flush worker
pub mod flush;

/// Transition event observers
pub mod observer;

/// Capacity pressure policy
pub mod pressure;

pub use controller::{PartitionState, TierStateController};
pub use flush::{FlushError, FlushOutcome, FlushSink, FlushWorker, FlushWorkerHandle};
pub use observer::{BroadcastObserver, TracingObserver, TransitionObserver};
pub use pressure::PressurePolicy;
