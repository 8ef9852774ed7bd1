//! Per-process CPU load monitoring.
//!
//! A [`ProcessMonitor`] watches one OS process: every second a background
//! task reads the process's total accumulated CPU time, converts the delta
//! into a load percentage normalized by the effective core count, and keeps
//! the ten most recent percentages. [`ProcessMonitor::get_stats`] hands out
//! a copy of that history at any time. Sampling failures are absorbed inside
//! the tick, so a monitored process dying never destabilizes the host.
//!
//! ```no_run
//! use procload::{ProcessMonitor, SystemEnvironment};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), procload::MonitorError> {
//! let mut monitor = ProcessMonitor::new(std::process::id(), &SystemEnvironment);
//! monitor.start()?;
//! // ... later, from any thread
//! let stats = monitor.get_stats();
//! println!("recent load: {:?}", stats.cpu_load_history);
//! monitor.dispose();
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
mod history;
pub mod monitor;
pub mod process;
pub mod types;

pub use env::{Environment, SystemEnvironment};
pub use error::{MonitorError, SampleError};
pub use history::SAMPLE_HISTORY_SIZE;
pub use monitor::{ProcessMonitor, SAMPLE_INTERVAL};
pub use process::{ProcessCpu, ProcessSource, SysProcessSource};
pub use types::ProcessStats;
