//! Error taxonomy. Only `start` failures reach callers; anything that goes
//! wrong inside a sampling tick stays there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The pid did not resolve to a live process when `start` was called.
    #[error("no process found with pid {0}")]
    ProcessNotFound(u32),

    /// `start` was called a second time on the same instance.
    #[error("monitor already started")]
    AlreadyStarted,
}

/// Transient failure while reading CPU time. Never surfaced to callers; the
/// tick that hit it is dropped and sampling retries at the next interval.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("process {0} has exited")]
    ProcessExited(u32),
}
