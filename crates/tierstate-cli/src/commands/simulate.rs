//! Local end-to-end run of the controller with a directory-backed sink
//!
//! Registers a set of partitions, pushes half of them over the grace
//! threshold and lets a flush worker persist them. Every transition is
//! collected so the run can be printed or asserted on afterwards.

use crate::sink::LocalDirFlushSink;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tierstate_controller::{
    BroadcastObserver, FlushWorker, PressurePolicy, TierStateController, TracingObserver,
};
use tierstate_core::{PartitionDescriptor, PartitionId, TierConfig, TierMode, TransitionEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const PARTITION_CAPACITY: u64 = 1 << 20;

/// Parameters of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Controller, pressure and flush configuration
    pub config: TierConfig,
    /// Number of partitions to register
    pub partitions: usize,
    /// Fail every k-th flush call
    pub fail_every: Option<u32>,
    /// Directory receiving partition manifests
    pub dir: PathBuf,
    /// Upper bound on the whole run
    pub timeout: Duration,
}

impl SimulationOptions {
    /// Options with default configuration writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            config: TierConfig::default(),
            partitions: 4,
            fail_every: None,
            dir: dir.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Every transition in emission order
    pub events: Vec<TransitionEvent>,
    /// Final mode of every partition, sorted by id
    pub final_modes: Vec<(PartitionId, TierMode)>,
    /// Number of calls the sink received
    pub sink_calls: u32,
}

impl SimulationReport {
    /// Partitions that ended in `mode`
    pub fn count_in(&self, mode: TierMode) -> usize {
        self.final_modes.iter().filter(|(_, m)| *m == mode).count()
    }
}

fn partition_name(index: usize) -> String {
    format!("part_{index}")
}

/// No partition is in grace or flushing and the log holds every transition
///
/// Modes are published before observers run, so a final mode can be visible
/// slightly ahead of its event.
fn is_settled(controller: &TierStateController, log: &Mutex<Vec<TransitionEvent>>) -> bool {
    let snapshot = controller.snapshot();
    if snapshot
        .iter()
        .any(|(_, mode)| matches!(mode, TierMode::InMemoryGrace | TierMode::Flushing))
    {
        return false;
    }

    let log = log.lock();
    snapshot.iter().all(|(id, mode)| {
        log.iter()
            .rev()
            .find(|event| &event.partition_id == id)
            .map_or(*mode == TierMode::InMemory, |event| event.to == *mode)
    })
}

/// Run the simulation until no partition is in grace or flushing
pub async fn run(options: SimulationOptions) -> Result<SimulationReport> {
    let SimulationOptions {
        config,
        partitions,
        fail_every,
        dir,
        timeout,
    } = options;
    config.validate().context("invalid configuration")?;

    let log: Arc<Mutex<Vec<TransitionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let collector = {
        let log = log.clone();
        Arc::new(move |event: &TransitionEvent| log.lock().push(event.clone()))
    };
    let events = Arc::new(BroadcastObserver::from_config(&config.controller));
    let controller = Arc::new(
        TierStateController::new()
            .with_observer(events.clone())
            .with_observer(Arc::new(TracingObserver))
            .with_observer(collector),
    );

    for index in 0..partitions {
        let name = partition_name(index);
        let descriptor = PartitionDescriptor::new(name.as_str(), dir.join(format!("{name}.json")))
            .with_capacity(PARTITION_CAPACITY);
        controller.register(descriptor)?;
    }

    let sink = Arc::new(LocalDirFlushSink::new(fail_every));
    let worker = FlushWorker::new(controller.clone(), sink.clone(), config.flush.clone());
    let handle = worker.spawn(events.subscribe());

    // Even partitions are nearly full, odd ones lightly used
    let policy = PressurePolicy::new(config.pressure.clone());
    for index in 0..partitions {
        let used = if index % 2 == 0 {
            PARTITION_CAPACITY / 100 * 95
        } else {
            PARTITION_CAPACITY / 100 * 30
        };
        policy.apply_used_bytes(&controller, &PartitionId::from(partition_name(index)), used)?;
    }

    let settled = tokio::time::timeout(timeout, async {
        while !is_settled(&controller, &log) {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;
    handle.shutdown().await;

    if settled.is_err() {
        bail!("partitions did not settle within {timeout:?}");
    }

    let events = log.lock().clone();
    tracing::info!(
        partitions,
        transitions = events.len(),
        sink_calls = sink.calls(),
        "Simulation finished"
    );
    Ok(SimulationReport {
        events,
        final_modes: controller.snapshot(),
        sink_calls: sink.calls(),
    })
}
