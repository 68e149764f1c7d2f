use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use gaugevecset::{GaugeVecSet, GaugeVecSetError, GaugeVecSetOpts};

const NAMESPACES: &[&str] = &["default", "kube-system", "monitoring"];
const NAMES: &[&str] = &["alpha", "beta", "gamma", "delta"];
const CONDITIONS: &[&str] = &["Ready", "Available", "Progressing", "Degraded"];
const STATUSES: &[&str] = &["True", "False", "Unknown"];
const REASONS: &[&str] = &["Reconciled", "Pending", "Failed"];

#[derive(Debug, Clone)]
pub(crate) struct StressConfig {
    pub(crate) duration: Duration,
    pub(crate) writers: usize,
    pub(crate) group_deleters: usize,
    pub(crate) index_deleters: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(2),
            writers: 8,
            group_deleters: 4,
            index_deleters: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Writer,
    GroupDeleter,
    IndexDeleter,
}

#[derive(Debug, Clone, Copy)]
struct WorkerReport {
    role: Role,
    operations: u64,
    removed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StressSummary {
    pub(crate) operations: u64,
    pub(crate) removed: usize,
    pub(crate) indexed: usize,
    pub(crate) exported: usize,
}

fn pick<R: Rng>(rng: &mut R, values: &[&'static str]) -> &'static str {
    values.choose(rng).copied().unwrap_or_default()
}

fn conditions_set() -> Result<GaugeVecSet, GaugeVecSetError> {
    GaugeVecSet::new(
        GaugeVecSetOpts::new("condition", "Stress test conditions")
            .namespace("gaugevecset")
            .subsystem("stress")
            .outer_labels(&["namespace", "name"])
            .sub_labels(&["condition"])
            .extra_labels(&["status", "reason"]),
    )
}

fn work(
    store: &GaugeVecSet,
    role: Role,
    deadline: Instant,
    reports: Sender<WorkerReport>,
) -> Result<(), GaugeVecSetError> {
    let mut rng = rand::thread_rng();
    let mut report = WorkerReport {
        role,
        operations: 0,
        removed: 0,
    };

    while Instant::now() < deadline {
        let outer = [pick(&mut rng, NAMESPACES), pick(&mut rng, NAMES)];
        let sub = [pick(&mut rng, CONDITIONS)];
        match role {
            Role::Writer => {
                let extra = [pick(&mut rng, STATUSES), pick(&mut rng, REASONS)];
                store.set_active_in_group(rng.gen_range(0.5..1.0), &outer, &sub, &extra)?;
            }
            Role::GroupDeleter => report.removed += store.delete_by_group(&outer, &sub)?,
            Role::IndexDeleter => {
                report.removed += store.delete_by_index(&outer)?;
                thread::sleep(Duration::from_millis(1));
            }
        }
        report.operations += 1;
    }

    debug!("{:?} finished after {} operations", role, report.operations);
    // The receiver outlives every worker.
    let _ = reports.send(report);
    Ok(())
}

/// Runs writers and deleters against one shared set until `config.duration`
/// elapses, then collects it once more.
///
/// Writers racing deleters on the same group may leave the index and the
/// exported series apart, so a difference is only reported.
pub(crate) fn run(config: &StressConfig) -> anyhow::Result<StressSummary> {
    let store = conditions_set()?;
    let deadline = Instant::now() + config.duration;
    let (sender, receiver) = unbounded();

    let roles = std::iter::repeat(Role::Writer)
        .take(config.writers)
        .chain(std::iter::repeat(Role::GroupDeleter).take(config.group_deleters))
        .chain(std::iter::repeat(Role::IndexDeleter).take(config.index_deleters));

    thread::scope(|s| -> anyhow::Result<()> {
        let handles: Vec<_> = roles
            .map(|role| {
                let store = &store;
                let sender = sender.clone();
                s.spawn(move || work(store, role, deadline, sender))
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => anyhow::bail!("stress worker panicked"),
            }
        }
        Ok(())
    })?;
    drop(sender);

    let mut summary = StressSummary::default();
    for report in receiver.iter() {
        debug!(
            "{:?}: {} operations, {} removed",
            report.role, report.operations, report.removed
        );
        summary.operations += report.operations;
        summary.removed += report.removed;
    }

    summary.indexed = store.len();
    summary.exported = prometheus::core::Collector::collect(&store)
        .iter()
        .map(|family| family.get_metric().len())
        .sum();
    info!(
        "{} operations, {} series removed, {} indexed, {} exported",
        summary.operations, summary.removed, summary.indexed, summary.exported
    );
    if summary.indexed != summary.exported {
        warn!(
            "index tracks {} series but {} are exported",
            summary.indexed, summary.exported
        );
    }
    Ok(summary)
}
