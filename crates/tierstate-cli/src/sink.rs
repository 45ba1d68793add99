use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tierstate_controller::{FlushError, FlushSink};
use tierstate_core::PartitionDescriptor;

/// Persists each partition as a JSON manifest at its backing path
///
/// With `fail_every = Some(k)`, every k-th call fails with an injected I/O
/// error so retry and abort handling can be observed locally.
#[derive(Debug, Default)]
pub struct LocalDirFlushSink {
    fail_every: Option<u32>,
    calls: AtomicU32,
}

impl LocalDirFlushSink {
    /// Create a sink, optionally injecting failures
    pub fn new(fail_every: Option<u32>) -> Self {
        Self {
            fail_every: fail_every.filter(|k| *k > 0),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of flush calls made
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlushSink for LocalDirFlushSink {
    async fn flush(&self, descriptor: &PartitionDescriptor) -> Result<(), FlushError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every.is_some_and(|k| call % k == 0) {
            return Err(FlushError::io(format!("injected failure on call {call}")));
        }

        if let Some(parent) = descriptor.backing_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let manifest = serde_json::to_vec_pretty(descriptor)
            .map_err(|e| FlushError::rejected(format!("manifest encoding failed: {e}")))?;
        tokio::fs::write(&descriptor.backing_path, manifest).await?;

        tracing::debug!(
            partition = %descriptor.id,
            path = %descriptor.backing_path.display(),
            "Wrote partition manifest"
        );
        Ok(())
    }
}
