//! Tierstate Testing Infrastructure
//!
//! Shared test doubles and fixtures for controller and worker tests: a
//! recording observer, a scripted flush sink, a manual clock and a few
//! factories for registered controllers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! tierstate-testkit = { path = "../tierstate-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,no_run
//! use tierstate_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     let fixture = ControllerFixture::with_partitions(&["p0", "p1"]);
//!     // ... drive fixture.controller, inspect fixture.recorder.events()
//! }
//! ```

pub mod clock;
pub mod fixtures;
pub mod observer;
pub mod sink;

pub use clock::ManualClock;
pub use fixtures::{descriptor, partition, ControllerFixture};
pub use observer::RecordingObserver;
pub use sink::{ScriptedFlushSink, SinkStep};
