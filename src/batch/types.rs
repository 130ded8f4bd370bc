use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::attempt::{TryError, TryFailure};

/// Default number of items submitted together
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One input that failed, with the error it produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionFailure<I> {
    /// The input the function was applied to
    pub input: I,
    /// The error raised by the function, as it raised it
    pub cause: TryFailure,
}

impl<I: fmt::Debug> fmt::Display for ExecutionFailure<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input {:?} failed: {}", self.input, self.cause)
    }
}

/// Parallel mapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Maximum items in flight at once; bounds peak memory, not the pool
    pub batch_size: usize,
    /// Hard cap on worker threads; `None` lets the pool grow to a full batch
    pub max_blocking_threads: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_blocking_threads: None,
        }
    }
}

impl MapperConfig {
    /// Configuration from environment variables or defaults.
    ///
    /// - `PARALLEL_MAPPER_BATCH_SIZE`: items per batch (default: 100)
    /// - `PARALLEL_MAPPER_MAX_THREADS`: worker thread cap (default: none)
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
        };

        Self {
            batch_size: positive("PARALLEL_MAPPER_BATCH_SIZE").unwrap_or(DEFAULT_BATCH_SIZE),
            max_blocking_threads: positive("PARALLEL_MAPPER_MAX_THREADS"),
        }
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run impossible
    pub fn validate(&self) -> std::result::Result<(), TryError> {
        if self.batch_size == 0 {
            return Err(TryError::InvalidArgument(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.max_blocking_threads == Some(0) {
            return Err(TryError::InvalidArgument(
                "max_blocking_threads must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Called after each batch with `(completed_items, total_items)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Summary of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Inputs handed to the mapper
    pub total: usize,
    /// Inputs whose function call succeeded
    pub succeeded: usize,
    /// Inputs recorded as an `ExecutionFailure`
    pub failed: usize,
    /// Batches whose results were recorded
    pub batches_completed: usize,
    /// Batches the inputs were split into
    pub total_batches: usize,
    /// Wall time of `run`
    pub duration: Duration,
}

impl RunStats {
    /// Percentage of processed items that succeeded
    pub fn success_rate(&self) -> f64 {
        let processed = self.succeeded + self.failed;
        if processed == 0 {
            return 100.0;
        }
        self.succeeded as f64 / processed as f64 * 100.0
    }
}

/// Stops a running mapper between batches. Clones share one signal.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    token: CancellationToken,
}

impl InterruptHandle {
    /// Signal the mapper to stop waiting and skip remaining batches
    pub fn interrupt(&self) {
        self.token.cancel();
    }

    /// Whether `interrupt` has been called
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MapperConfig::default();
        assert_eq!(config.batch_size, 100);
        assert!(config.max_blocking_threads.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = MapperConfig::from_lookup(lookup_from(&[
            ("PARALLEL_MAPPER_BATCH_SIZE", "25"),
            ("PARALLEL_MAPPER_MAX_THREADS", " 8 "),
        ]));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_blocking_threads, Some(8));
    }

    #[test]
    fn test_from_lookup_ignores_invalid_values() {
        let config = MapperConfig::from_lookup(lookup_from(&[
            ("PARALLEL_MAPPER_BATCH_SIZE", "0"),
            ("PARALLEL_MAPPER_MAX_THREADS", "lots"),
        ]));
        assert_eq!(config, MapperConfig::default());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = MapperConfig::from_json(r#"{"batch_size": 10}"#).unwrap();
        assert_eq!(config.batch_size, 10);
        assert!(config.max_blocking_threads.is_none());
    }

    #[test]
    fn test_from_json_rejects_zero_batch() {
        let err = MapperConfig::from_json(r#"{"batch_size": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            crate::ParallelTryError::Try(TryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = MapperConfig::from_json("{batch_size").unwrap_err();
        assert!(matches!(err, crate::ParallelTryError::Serialization(_)));
    }

    #[test]
    fn test_success_rate() {
        let stats = RunStats {
            succeeded: 3,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(RunStats::default().success_rate(), 100.0);
    }

    #[test]
    fn test_interrupt_handle_clones_share_signal() {
        let handle = InterruptHandle::default();
        let clone = handle.clone();
        clone.interrupt();
        assert!(handle.is_interrupted());
    }
}
