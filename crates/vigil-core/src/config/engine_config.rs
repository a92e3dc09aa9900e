//! Orchestration engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound of the work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default time allowed for the enumerator to stop after an abort.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;
/// Default polling granularity for queue pops and blocking pushes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Whether the engine runs headless or alongside interactive mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Batch run. May start while the caller holds a read snapshot, which
    /// keeps mutations out for the whole run; a mutation requested anyway
    /// aborts the run with an illegal-state error instead of waiting.
    Offline,
    /// Runs alongside an editor; must not be started while holding a read snapshot.
    #[default]
    Interactive,
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "interactive" => Ok(Self::Interactive),
            other => Err(format!("unknown run mode '{other}'")),
        }
    }
}

/// Configuration for the analysis orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Work queue capacity (backpressure bound). Default: 1000.
    pub queue_capacity: Option<usize>,
    /// Worker count. Default and upper bound: available parallelism.
    pub workers: Option<usize>,
    /// Run mode. Default: interactive.
    pub run_mode: Option<RunMode>,
    /// Enumerator shutdown timeout after an abort, in ms. Default: 30000.
    pub shutdown_timeout_ms: Option<u64>,
    /// Polling interval for cancellation-aware blocking, in ms. Default: 10.
    pub poll_interval_ms: Option<u64>,
    /// Run only whole-corpus tools. Default: false.
    pub global_tools_only: Option<bool>,
}

impl EngineConfig {
    /// Returns the effective queue capacity, defaulting to 1000.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    /// Returns the effective worker count, clamped to `1..=available_parallelism`.
    pub fn effective_workers(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.workers.unwrap_or(available).clamp(1, available)
    }

    pub fn effective_run_mode(&self) -> RunMode {
        self.run_mode.unwrap_or_default()
    }

    pub fn effective_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS))
    }

    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(1))
    }

    pub fn effective_global_tools_only(&self) -> bool {
        self.global_tools_only.unwrap_or(false)
    }

    /// Layer `upper` on top of `self`; fields set in `upper` win.
    pub(crate) fn overlay(&mut self, upper: &Self) {
        self.queue_capacity = upper.queue_capacity.or(self.queue_capacity);
        self.workers = upper.workers.or(self.workers);
        self.run_mode = upper.run_mode.or(self.run_mode);
        self.shutdown_timeout_ms = upper.shutdown_timeout_ms.or(self.shutdown_timeout_ms);
        self.poll_interval_ms = upper.poll_interval_ms.or(self.poll_interval_ms);
        self.global_tools_only = upper.global_tools_only.or(self.global_tools_only);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_never_exceed_available_parallelism() {
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let config = EngineConfig {
            workers: Some(available + 64),
            ..Default::default()
        };
        assert_eq!(config.effective_workers(), available);

        let config = EngineConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn run_mode_parses_case_insensitively() {
        assert_eq!("OFFLINE".parse::<RunMode>(), Ok(RunMode::Offline));
        assert_eq!("interactive".parse::<RunMode>(), Ok(RunMode::Interactive));
        assert!("batch".parse::<RunMode>().is_err());
    }
}
