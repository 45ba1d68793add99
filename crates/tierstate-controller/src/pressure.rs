//! Capacity pressure policy
//!
//! Turns storage usage reports into grace-window decisions. Entering and
//! leaving the grace window use separate thresholds so a partition hovering
//! around one threshold does not flap between modes.

use crate::controller::TierStateController;
use tierstate_core::{PartitionId, PressureConfig, Result, StorageUsage, TierMode};

/// Decides grace-window transitions from utilization
#[derive(Debug, Clone)]
pub struct PressurePolicy {
    config: PressureConfig,
}

impl PressurePolicy {
    /// Create a policy from validated thresholds
    pub fn new(config: PressureConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &PressureConfig {
        &self.config
    }

    /// Target mode for a partition in `mode` with the given usage, if any
    pub fn evaluate(&self, mode: TierMode, usage: &StorageUsage) -> Option<TierMode> {
        let utilization = usage.utilization();
        match mode {
            TierMode::InMemory if utilization >= self.config.grace_threshold => {
                Some(TierMode::InMemoryGrace)
            }
            TierMode::InMemoryGrace if utilization < self.config.cancel_threshold => {
                Some(TierMode::InMemory)
            }
            _ => None,
        }
    }

    /// Evaluate a usage report and apply the decision to the controller
    ///
    /// Returns the new mode, or `None` when no transition was needed. If the
    /// partition moved between the read and the write, the controller rejects
    /// the transition with `IllegalTransition`.
    pub fn apply(
        &self,
        controller: &TierStateController,
        usage: &StorageUsage,
    ) -> Result<Option<TierMode>> {
        let current = controller.current_mode(&usage.partition_id)?;
        let Some(target) = self.evaluate(current, usage) else {
            return Ok(None);
        };

        tracing::debug!(
            partition = %usage.partition_id,
            used_bytes = usage.used_bytes,
            capacity_bytes = usage.capacity_bytes,
            from = %current,
            to = %target,
            "Capacity pressure transition"
        );
        controller
            .transition_from(&usage.partition_id, current, target)
            .map(Some)
    }

    /// Apply a report of `used_bytes` against the capacity the partition was
    /// registered with
    pub fn apply_used_bytes(
        &self,
        controller: &TierStateController,
        partition_id: &PartitionId,
        used_bytes: u64,
    ) -> Result<Option<TierMode>> {
        let capacity_bytes = controller.descriptor(partition_id)?.capacity_bytes;
        let usage = StorageUsage::new(partition_id.clone(), used_bytes, capacity_bytes);
        self.apply(controller, &usage)
    }
}

impl Default for PressurePolicy {
    fn default() -> Self {
        Self::new(PressureConfig::default())
    }
}
