//! The monitor core: a background task samples one process's accumulated
//! CPU time on a fixed cadence and keeps a bounded history of normalized
//! load percentages for concurrent readers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::env::Environment;
use crate::error::MonitorError;
use crate::history::{CpuLoadHistory, SAMPLE_HISTORY_SIZE};
use crate::process::{ProcessCpu, ProcessSource, SysProcessSource};
use crate::types::ProcessStats;

/// Fixed sampling cadence; the first tick fires immediately.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

// State shared between the monitor handle and its sampling task.
struct Shared {
    history: Mutex<CpuLoadHistory>,
    disposed: AtomicBool,
}

// Last successful reading; both fields advance together.
struct Baseline {
    at: Instant,
    cpu: Duration,
}

// Owned by the sampling task alone, so the baseline needs no lock.
struct Sampler {
    handle: Box<dyn ProcessCpu>,
    effective_cores: usize,
    baseline: Option<Baseline>,
    shared: Arc<Shared>,
}

impl Sampler {
    fn tick(&mut self, now: Instant) {
        if self.shared.disposed.load(Ordering::Acquire) {
            return;
        }
        let cpu = match self.handle.total_cpu_time() {
            Ok(cpu) => cpu,
            Err(e) => {
                // Dropped, never propagated; retried at the next tick.
                debug!("cpu time sample dropped: {e}");
                return;
            }
        };
        if let Some(prev) = &self.baseline {
            let wall = now.saturating_duration_since(prev.at);
            let used = cpu.saturating_sub(prev.cpu);
            let capacity = self.effective_cores as f64 * wall.as_secs_f64();
            if capacity > 0.0 {
                let load = (used.as_secs_f64() / capacity * 100.0).round();
                let mut history = self.shared.history.lock().unwrap();
                history.push(load);
            }
        }
        self.baseline = Some(Baseline { at: now, cpu });
    }
}

/// Monitors CPU load of a single OS process.
///
/// Construction does no OS work. [`start`](Self::start) resolves the process
/// and arms a 1 s sampling loop on a background tokio task; it must be
/// called from within a tokio runtime, and at most once per instance. The
/// monitor only observes the target process, it never starts or kills it.
pub struct ProcessMonitor {
    pid: u32,
    effective_cores: usize,
    source: Box<dyn ProcessSource>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl ProcessMonitor {
    /// Monitor `pid` using the host process table.
    ///
    /// The effective core count is cached here, once. It is assumed to be
    /// >= 1; see [`Environment::effective_core_count`].
    pub fn new(pid: u32, environment: &dyn Environment) -> Self {
        Self::with_source(pid, environment, Box::new(SysProcessSource))
    }

    /// Like [`new`](Self::new) with an explicit process source.
    pub fn with_source(
        pid: u32,
        environment: &dyn Environment,
        source: Box<dyn ProcessSource>,
    ) -> Self {
        Self {
            pid,
            effective_cores: environment.effective_core_count(),
            source,
            shared: Arc::new(Shared {
                history: Mutex::new(CpuLoadHistory::new(SAMPLE_HISTORY_SIZE)),
                disposed: AtomicBool::new(false),
            }),
            task: None,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Resolve the process and begin sampling.
    ///
    /// The first tick fires immediately and only establishes a baseline;
    /// each later tick appends one load percentage. Fails with
    /// [`MonitorError::ProcessNotFound`] if the pid is not live right now,
    /// and with [`MonitorError::AlreadyStarted`] on a repeat call.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.task.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }
        let handle = self.source.open(self.pid)?;
        let mut sampler = Sampler {
            handle,
            effective_cores: self.effective_cores,
            baseline: None,
            shared: Arc::clone(&self.shared),
        };
        self.task = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(SAMPLE_INTERVAL);
            // Never burst after a stall; ticks stay serialized.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                sampler.tick(Instant::now());
            }
        }));
        Ok(())
    }

    /// Copy of the recent load history, oldest first.
    ///
    /// Safe to call from any thread while sampling runs; never blocks on
    /// process I/O, only on the history lock.
    pub fn get_stats(&self) -> ProcessStats {
        let history = self.shared.history.lock().unwrap();
        ProcessStats {
            cpu_load_history: history.snapshot(),
        }
    }

    /// Stop sampling. Idempotent; only the first call has effect.
    ///
    /// A tick already in flight observes the disposed flag and exits
    /// without touching the history. The target process is left alone.
    pub fn dispose(&mut self) {
        if !self.shared.disposed.swap(true, Ordering::AcqRel) {
            if let Some(task) = self.task.take() {
                task.abort();
            }
        }
    }
}

impl Drop for ProcessMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SampleError;
    use std::collections::VecDeque;

    struct ScriptedCpu(VecDeque<Result<Duration, SampleError>>);

    impl ProcessCpu for ScriptedCpu {
        fn total_cpu_time(&mut self) -> Result<Duration, SampleError> {
            self.0
                .pop_front()
                .unwrap_or(Err(SampleError::ProcessExited(0)))
        }
    }

    fn sampler(cores: usize, readings: Vec<Result<Duration, SampleError>>) -> Sampler {
        Sampler {
            handle: Box::new(ScriptedCpu(readings.into())),
            effective_cores: cores,
            baseline: None,
            shared: Arc::new(Shared {
                history: Mutex::new(CpuLoadHistory::new(SAMPLE_HISTORY_SIZE)),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    fn history(s: &Sampler) -> Vec<f64> {
        s.shared.history.lock().unwrap().snapshot()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn first_tick_only_establishes_baseline() {
        let mut s = sampler(1, vec![Ok(secs(0))]);
        s.tick(Instant::now());
        assert!(history(&s).is_empty());
        assert!(s.baseline.is_some());
    }

    #[test]
    fn full_core_consumption_reads_one_hundred() {
        let t0 = Instant::now();
        let mut s = sampler(1, vec![Ok(secs(0)), Ok(secs(1))]);
        s.tick(t0);
        s.tick(t0 + secs(1));
        assert_eq!(history(&s), vec![100.0]);
    }

    #[test]
    fn load_is_normalized_by_effective_cores() {
        // One fully busy core on a two-core budget reads 50
        let t0 = Instant::now();
        let mut s = sampler(2, vec![Ok(secs(0)), Ok(secs(1))]);
        s.tick(t0);
        s.tick(t0 + secs(1));
        assert_eq!(history(&s), vec![50.0]);
    }

    #[test]
    fn load_rounds_to_nearest_whole() {
        let t0 = Instant::now();
        let mut s = sampler(1, vec![Ok(secs(0)), Ok(Duration::from_millis(346))]);
        s.tick(t0);
        s.tick(t0 + secs(1));
        assert_eq!(history(&s), vec![35.0]);
    }

    #[test]
    fn load_above_capacity_is_not_clamped() {
        // More CPU time than one core's wall-clock window (busy threads)
        let t0 = Instant::now();
        let mut s = sampler(1, vec![Ok(secs(0)), Ok(secs(3))]);
        s.tick(t0);
        s.tick(t0 + secs(1));
        assert_eq!(history(&s), vec![300.0]);
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        // Baseline, then one 50% window, then eleven 25% windows: the 50
        // entry and the first 25 fall off the front.
        let t0 = Instant::now();
        let mut readings = vec![Ok(secs(0)), Ok(secs(2))];
        for i in 0..11u64 {
            readings.push(Ok(secs(3 + i)));
        }
        let mut s = sampler(4, readings);
        for i in 0..13u64 {
            s.tick(t0 + secs(i));
        }
        let h = history(&s);
        assert_eq!(h.len(), SAMPLE_HISTORY_SIZE);
        assert!(h.iter().all(|v| *v == 25.0));
    }

    #[test]
    fn failed_read_changes_nothing() {
        let t0 = Instant::now();
        let mut s = sampler(
            1,
            vec![
                Ok(secs(1)),
                Err(SampleError::ProcessExited(42)),
                Ok(secs(3)),
            ],
        );
        s.tick(t0);
        s.tick(t0 + secs(1));
        assert!(history(&s).is_empty());
        // Baseline still points at the first reading, so the next success
        // spans the full two-second window.
        s.tick(t0 + secs(2));
        assert_eq!(history(&s), vec![100.0]);
    }

    #[test]
    fn disposed_tick_is_a_noop() {
        let t0 = Instant::now();
        let mut s = sampler(1, vec![Ok(secs(0)), Ok(secs(1))]);
        s.tick(t0);
        s.shared.disposed.store(true, Ordering::Release);
        s.tick(t0 + secs(1));
        assert!(history(&s).is_empty());
    }

    #[test]
    fn zero_elapsed_window_skips_the_entry() {
        let t0 = Instant::now();
        let mut s = sampler(1, vec![Ok(secs(0)), Ok(secs(1))]);
        s.tick(t0);
        s.tick(t0);
        assert!(history(&s).is_empty());
        // The baseline still advances to the newer reading
        assert_eq!(s.baseline.as_ref().map(|b| b.cpu), Some(secs(1)));
    }

    struct NoSuchProcess;

    impl ProcessSource for NoSuchProcess {
        fn open(&self, pid: u32) -> Result<Box<dyn ProcessCpu>, MonitorError> {
            Err(MonitorError::ProcessNotFound(pid))
        }
    }

    struct IdleCpu;

    impl ProcessCpu for IdleCpu {
        fn total_cpu_time(&mut self) -> Result<Duration, SampleError> {
            Ok(secs(0))
        }
    }

    struct IdleSource;

    impl ProcessSource for IdleSource {
        fn open(&self, _pid: u32) -> Result<Box<dyn ProcessCpu>, MonitorError> {
            Ok(Box::new(IdleCpu))
        }
    }

    struct FourCores;

    impl Environment for FourCores {
        fn effective_core_count(&self) -> usize {
            4
        }
    }

    #[test]
    fn stats_start_empty() {
        let m = ProcessMonitor::with_source(7, &FourCores, Box::new(IdleSource));
        assert_eq!(m.pid(), 7);
        assert!(m.get_stats().cpu_load_history.is_empty());
    }

    #[tokio::test]
    async fn start_propagates_process_not_found() {
        let mut m = ProcessMonitor::with_source(7, &FourCores, Box::new(NoSuchProcess));
        assert!(matches!(m.start(), Err(MonitorError::ProcessNotFound(7))));
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut m = ProcessMonitor::with_source(7, &FourCores, Box::new(IdleSource));
        m.start().expect("first start succeeds");
        assert!(matches!(m.start(), Err(MonitorError::AlreadyStarted)));
        m.dispose();
        m.dispose(); // idempotent
    }
}
