//! OS process capability: resolve a pid to a handle that reports total
//! accumulated CPU time on demand.

use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{MonitorError, SampleError};

/// Live handle to a monitored process.
///
/// `total_cpu_time` is monotonically non-decreasing while the process is
/// alive and fails once it has exited.
pub trait ProcessCpu: Send {
    fn total_cpu_time(&mut self) -> Result<Duration, SampleError>;
}

/// Resolves pids to [`ProcessCpu`] handles.
pub trait ProcessSource: Send + Sync {
    fn open(&self, pid: u32) -> Result<Box<dyn ProcessCpu>, MonitorError>;
}

/// sysinfo-backed source; the default for real processes.
pub struct SysProcessSource;

impl ProcessSource for SysProcessSource {
    fn open(&self, pid: u32) -> Result<Box<dyn ProcessCpu>, MonitorError> {
        let mut handle = SysProcessCpu {
            sys: System::new(),
            pid: Pid::from_u32(pid),
        };
        if handle.refresh() == 0 {
            return Err(MonitorError::ProcessNotFound(pid));
        }
        Ok(Box::new(handle))
    }
}

struct SysProcessCpu {
    sys: System,
    pid: Pid,
}

impl SysProcessCpu {
    // Refresh only the target process, CPU counters only; returns the number
    // of processes actually found.
    fn refresh(&mut self) -> usize {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        )
    }
}

impl ProcessCpu for SysProcessCpu {
    fn total_cpu_time(&mut self) -> Result<Duration, SampleError> {
        self.refresh();
        match self.sys.process(self.pid) {
            Some(p) => Ok(Duration::from_millis(p.accumulated_cpu_time())),
            None => Err(SampleError::ProcessExited(self.pid.as_u32())),
        }
    }
}
