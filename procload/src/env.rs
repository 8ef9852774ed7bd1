//! Effective-core discovery: the divisor every load percentage is
//! normalized against.

use once_cell::sync::OnceCell;
use sysinfo::System;
use tracing::warn;

/// Runtime environment, queried once at monitor construction.
pub trait Environment: Send + Sync {
    /// Number of cores to normalize against. Expected to be >= 1; an
    /// environment returning 0 is misconfigured and is not validated here.
    fn effective_core_count(&self) -> usize;
}

/// Host environment. `PROCLOAD_EFFECTIVE_CORES` overrides the logical core
/// count for hosts whose scheduler caps the process below the hardware
/// (container quotas and the like). Read once per process.
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn effective_core_count(&self) -> usize {
        static CORES: OnceCell<usize> = OnceCell::new();
        *CORES.get_or_init(|| {
            if let Ok(raw) = std::env::var("PROCLOAD_EFFECTIVE_CORES") {
                match raw.parse::<usize>() {
                    Ok(n) if n >= 1 => return n,
                    _ => warn!("ignoring invalid PROCLOAD_EFFECTIVE_CORES={raw}"),
                }
            }
            let mut sys = System::new();
            sys.refresh_cpu_usage();
            sys.cpus().len().max(1)
        })
    }
}
