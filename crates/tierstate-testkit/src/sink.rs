//! Flush sink driven by a script of outcomes

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tierstate_controller::{FlushError, FlushSink};
use tierstate_core::{PartitionDescriptor, PartitionId};
use tokio::sync::Notify;

/// One scripted sink call
#[derive(Debug, Clone)]
pub enum SinkStep {
    /// Report success
    Succeed,
    /// Report the given error
    Fail(FlushError),
    /// Wait until notified, then report success
    WaitFor(Arc<Notify>),
}

/// Flush sink that replays a script, then succeeds once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedFlushSink {
    steps: Mutex<VecDeque<SinkStep>>,
    calls: Mutex<Vec<PartitionId>>,
}

impl ScriptedFlushSink {
    /// Sink that always succeeds
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Sink that replays `steps` in order
    pub fn scripted(steps: impl IntoIterator<Item = SinkStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sink that fails `count` times with an I/O error, then succeeds
    pub fn failing(count: usize) -> Self {
        Self::scripted((0..count).map(|_| SinkStep::Fail(FlushError::io("disk write failed"))))
    }

    /// Append a step to the script
    pub fn push(&self, step: SinkStep) {
        self.steps.lock().push_back(step);
    }

    /// Partitions the sink was called for, one entry per call
    pub fn calls(&self) -> Vec<PartitionId> {
        self.calls.lock().clone()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl FlushSink for ScriptedFlushSink {
    async fn flush(&self, descriptor: &PartitionDescriptor) -> Result<(), FlushError> {
        self.calls.lock().push(descriptor.id.clone());
        let step = self.steps.lock().pop_front().unwrap_or(SinkStep::Succeed);
        match step {
            SinkStep::Succeed => Ok(()),
            SinkStep::Fail(error) => Err(error),
            SinkStep::WaitFor(notify) => {
                notify.notified().await;
                Ok(())
            }
        }
    }
}
