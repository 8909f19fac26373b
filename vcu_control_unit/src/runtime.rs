//! Fixed-priority periodic tasks.
//!
//! Each component runs on its own named thread, paced by absolute
//! deadlines (`next += period`, sleep until `next`) so the period does not
//! drift with the body's run time. With the `rt` feature the process locks
//! its memory and each thread takes a `SCHED_FIFO` level from its
//! [`TaskPriority`]; without it both are no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("RT setup error: {0}")]
    RtSetup(String),
    #[error("failed to spawn task {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

// ─── Priorities ─────────────────────────────────────────────────────

/// Scheduling class of each task. Bus receive must always preempt the
/// control loops; telemetry never preempts anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    BusReceive,
    Supervisor,
    Inverter,
    CanOpen,
    Host,
    Telemetry,
}

impl TaskPriority {
    /// `SCHED_FIFO` level.
    pub const fn fifo_level(self) -> i32 {
        match self {
            Self::BusReceive => 80,
            Self::Supervisor | Self::Inverter => 70,
            Self::CanOpen => 60,
            Self::Host => 40,
            Self::Telemetry => 20,
        }
    }
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Last body duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    /// Bodies that ran longer than the period.
    pub overruns: u64,
    /// Worst wake-up lateness against the deadline [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future pages.
#[cfg(feature = "rt")]
pub fn rt_setup() -> Result<(), RuntimeError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| RuntimeError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
pub fn rt_setup() -> Result<(), RuntimeError> {
    Ok(())
}

/// `SCHED_FIFO` for the calling thread.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), RuntimeError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::from_raw_os_error(ret);
        return Err(RuntimeError::RtSetup(format!(
            "pthread_setschedparam(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), RuntimeError> {
    Ok(())
}

// ─── Periodic Tasks ─────────────────────────────────────────────────

/// Run `body` every `period` on a named thread until `running` is cleared.
///
/// The thread returns its [`CycleStats`] on exit. Overruns are logged,
/// never fatal.
pub fn spawn_periodic<F>(
    name: &str,
    priority: TaskPriority,
    period: Duration,
    running: Arc<AtomicBool>,
    mut body: F,
) -> Result<JoinHandle<CycleStats>, RuntimeError>
where
    F: FnMut() + Send + 'static,
{
    let task = name.to_owned();
    std::thread::Builder::new()
        .name(task.clone())
        .spawn(move || {
            if let Err(e) = rt_set_scheduler(priority.fifo_level()) {
                warn!(task = %task, error = %e, "running without RT priority");
            }

            let period_ns = period.as_nanos() as i64;
            let mut stats = CycleStats::new();
            let mut next = Instant::now();

            while running.load(Ordering::Acquire) {
                let start = Instant::now();
                let latency_ns = start.saturating_duration_since(next).as_nanos() as i64;

                body();

                let duration_ns = start.elapsed().as_nanos() as i64;
                stats.record(duration_ns, latency_ns);
                if duration_ns > period_ns {
                    stats.overruns += 1;
                    warn!(task = %task, duration_ns, period_ns, "cycle overrun");
                }

                next += period;
                let now = Instant::now();
                if next > now {
                    std::thread::sleep(next - now);
                } else {
                    // Missed deadlines are dropped, not replayed.
                    next = now;
                }
            }

            debug!(
                task = %task,
                cycles = stats.cycle_count,
                overruns = stats.overruns,
                avg_ns = stats.avg_cycle_ns(),
                "task stopped"
            );
            stats
        })
        .map_err(|source| RuntimeError::Spawn {
            name: name.to_owned(),
            source,
        })
}
