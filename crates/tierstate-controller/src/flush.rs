//! Background flush worker
//!
//! Drives partitions along `in_memory_grace → flushing → on_disk` and owns
//! the retry policy for failed writes. The controller never performs I/O;
//! the worker persists through a [`FlushSink`] and reports the result back
//! as a transition:
//!
//! - sink succeeds: `flushing → on_disk`
//! - sink fails `max_attempts` times: `flushing → in_memory` (abort), so the
//!   partition is never left stuck in `flushing`
//! - grace cancelled before the flush starts: nothing to do
//!
//! Each run is tied to the grace window that scheduled it through the
//! sequence number of its `begin_grace` event, so a window that is cancelled
//! and re-entered gets a full grace period of its own.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierstate_controller::{BroadcastObserver, FlushSink, FlushWorker, TierStateController};
//! use tierstate_core::TierConfig;
//!
//! # async fn example(sink: Arc<dyn FlushSink>) {
//! let config = TierConfig::default();
//! let events = Arc::new(BroadcastObserver::from_config(&config.controller));
//! let controller = Arc::new(TierStateController::new().with_observer(events.clone()));
//!
//! let worker = FlushWorker::new(controller.clone(), sink, config.flush.clone());
//! let handle = worker.spawn(events.subscribe());
//! // ... partitions entering grace are flushed in the background ...
//! handle.shutdown().await;
//! # }
//! ```

use crate::controller::TierStateController;
use async_trait::async_trait;
use std::sync::Arc;
use tierstate_core::{
    FlushConfig, PartitionDescriptor, PartitionId, Result, TierError, TierMode, TransitionEvent,
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Failure reported by a [`FlushSink`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlushError {
    /// Writing the partition to its backing store failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the underlying I/O operation
        message: String,
    },

    /// The sink refused to persist the partition
    #[error("Flush rejected: {message}")]
    Rejected {
        /// Reason given by the sink
        message: String,
    },
}

impl FlushError {
    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FlushError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Destination that persists a partition to disk
#[async_trait]
pub trait FlushSink: Send + Sync {
    /// Persist the partition described by `descriptor`
    async fn flush(&self, descriptor: &PartitionDescriptor)
        -> std::result::Result<(), FlushError>;
}

/// Result of one flush run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Partition persisted and moved to `on_disk`
    Persisted {
        /// Sink calls made, including the successful one
        attempts: u32,
    },
    /// Every attempt failed; partition returned to `in_memory`
    Aborted {
        /// Sink calls made
        attempts: u32,
        /// Error from the last attempt
        error: FlushError,
    },
    /// The partition left the flush path before or during the run
    Cancelled {
        /// Mode the partition was found in
        observed: TierMode,
    },
}

/// Background driver of partition flushes
#[derive(Clone)]
pub struct FlushWorker {
    controller: Arc<TierStateController>,
    sink: Arc<dyn FlushSink>,
    config: FlushConfig,
}

impl FlushWorker {
    /// Create a worker
    pub fn new(
        controller: Arc<TierStateController>,
        sink: Arc<dyn FlushSink>,
        config: FlushConfig,
    ) -> Self {
        Self {
            controller,
            sink,
            config,
        }
    }

    /// Flush settings in use
    pub fn config(&self) -> &FlushConfig {
        &self.config
    }

    /// Wait out the grace period, then persist the partition
    ///
    /// The grace window is the one the partition is in when this is called;
    /// a partition not in grace is reported as `Cancelled` right away.
    pub async fn flush_partition(&self, partition_id: PartitionId) -> Result<FlushOutcome> {
        let state = self.controller.state(&partition_id)?;
        if state.mode != TierMode::InMemoryGrace {
            tracing::debug!(partition = %partition_id, observed = %state.mode, "Flush skipped");
            return Ok(FlushOutcome::Cancelled {
                observed: state.mode,
            });
        }
        self.flush_grace_entry(partition_id, state.sequence).await
    }

    /// Persist the partition if it is still in the grace window entered by
    /// transition `grace_sequence`
    ///
    /// Every step is a compare-and-set on the sequence of the step before it,
    /// so a grace window that was cancelled and re-entered, or a flush that
    /// was aborted and restarted, is never advanced by this run. Such runs end
    /// as `Cancelled`. Errors are controller errors, e.g. the partition was
    /// deregistered.
    pub async fn flush_grace_entry(
        &self,
        partition_id: PartitionId,
        grace_sequence: u64,
    ) -> Result<FlushOutcome> {
        if self.config.grace_period_ms > 0 {
            tokio::time::sleep(self.config.grace_period()).await;
        }

        let flushing = match self.controller.transition_at(
            &partition_id,
            grace_sequence,
            TierMode::Flushing,
        ) {
            Ok(event) => event.sequence,
            Err(err) => return cancelled_if_superseded(&partition_id, err),
        };

        let descriptor = self.controller.descriptor(&partition_id)?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        let last_error = loop {
            attempt += 1;
            let error = match self.sink.flush(&descriptor).await {
                Ok(()) => {
                    return match self.controller.transition_at(
                        &partition_id,
                        flushing,
                        TierMode::OnDisk,
                    ) {
                        Ok(_) => {
                            tracing::info!(
                                partition = %partition_id,
                                attempts = attempt,
                                "Partition flushed to disk"
                            );
                            Ok(FlushOutcome::Persisted { attempts: attempt })
                        }
                        Err(err) => cancelled_if_superseded(&partition_id, err),
                    };
                }
                Err(error) => error,
            };

            tracing::warn!(
                partition = %partition_id,
                attempt,
                max_attempts,
                %error,
                "Flush attempt failed"
            );
            if attempt >= max_attempts {
                break error;
            }

            tokio::time::sleep(self.config.backoff_for(attempt)).await;

            // An abort issued while we were backing off wins, even if a newer
            // flush has since put the partition back in `flushing`
            let state = self.controller.state(&partition_id)?;
            if state.sequence != flushing {
                tracing::debug!(
                    partition = %partition_id,
                    observed = %state.mode,
                    "Flush superseded"
                );
                return Ok(FlushOutcome::Cancelled {
                    observed: state.mode,
                });
            }
        };

        if let Err(err) = self
            .controller
            .transition_at(&partition_id, flushing, TierMode::InMemory)
        {
            return cancelled_if_superseded(&partition_id, err);
        }
        tracing::error!(
            partition = %partition_id,
            attempts = attempt,
            error = %last_error,
            "Flush aborted, partition returned to memory"
        );
        Ok(FlushOutcome::Aborted {
            attempts: attempt,
            error: last_error,
        })
    }

    /// Flush every partition that enters grace until shut down
    pub fn spawn(&self, events: broadcast::Receiver<TransitionEvent>) -> FlushWorkerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = self.clone();
        let task = tokio::spawn(async move { worker.run(events, shutdown_rx).await });
        FlushWorkerHandle { shutdown, task }
    }

    /// Event loop behind [`FlushWorker::spawn`]
    ///
    /// Exits when the event channel closes or `shutdown` becomes `true`.
    /// Flushes already started keep running to completion.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<TransitionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        // Partitions already waiting in grace would otherwise never be flushed
        self.schedule_waiting();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = events.recv() => match received {
                    Ok(event) if event.to == TierMode::InMemoryGrace => {
                        self.schedule(event.partition_id, event.sequence);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Flush worker lagged, rescanning partitions in grace");
                        self.schedule_waiting();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!("Flush worker stopped");
    }

    /// Schedule every partition currently in grace
    ///
    /// A partition also scheduled from its event gets two runs for the same
    /// grace window; only one of them wins the move to `flushing`.
    fn schedule_waiting(&self) {
        for (partition_id, state) in self.controller.states_in(TierMode::InMemoryGrace) {
            self.schedule(partition_id, state.sequence);
        }
    }

    fn schedule(&self, partition_id: PartitionId, grace_sequence: u64) {
        let worker = self.clone();
        tokio::spawn(async move {
            match worker
                .flush_grace_entry(partition_id.clone(), grace_sequence)
                .await
            {
                Ok(outcome) => {
                    tracing::debug!(partition = %partition_id, ?outcome, "Flush finished");
                }
                Err(err) => {
                    tracing::warn!(partition = %partition_id, error = %err, "Flush interrupted");
                }
            }
        });
    }
}

/// Report a superseded step as `Cancelled`, pass every other error through
fn cancelled_if_superseded(partition_id: &PartitionId, err: TierError) -> Result<FlushOutcome> {
    match err {
        TierError::Superseded { current, .. } => {
            tracing::debug!(partition = %partition_id, observed = %current, "Flush superseded");
            Ok(FlushOutcome::Cancelled { observed: current })
        }
        err => Err(err),
    }
}

impl std::fmt::Debug for FlushWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushWorker")
            .field("controller", &self.controller)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handle to a spawned [`FlushWorker`] event loop
#[derive(Debug)]
pub struct FlushWorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FlushWorkerHandle {
    /// Stop the event loop and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "Flush worker task ended abnormally");
        }
    }

    /// Whether the event loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
