//! Snapshot types handed to callers. Keep this module minimal and stable.

use serde::{Deserialize, Serialize};

/// Copy of a monitor's recent load history, oldest first, at most
/// [`SAMPLE_HISTORY_SIZE`](crate::SAMPLE_HISTORY_SIZE) entries.
///
/// Percentages are not clamped; a process outrunning its effective-core
/// budget reads above 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub cpu_load_history: Vec<f64>,
}
