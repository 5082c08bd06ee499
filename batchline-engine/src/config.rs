//! Engine configuration
//!
//! Defines the engine-wide defaults every step falls back to, the
//! per-job/per-step override shape, and the single function that resolves
//! them into the settings a step actually runs with.

use batchline_core::{BatchError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of items per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Decides, per error, whether another attempt should be made
pub type RetryPredicate = Arc<dyn Fn(&BatchError) -> bool + Send + Sync>;

/// Predicate that retries every retryable error
pub fn retry_all() -> RetryPredicate {
    Arc::new(|_: &BatchError| true)
}

/// What happens when a listener callback returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerErrorPolicy {
    /// Log the error and keep notifying the remaining listeners
    #[default]
    LogAndContinue,
    /// Stop at the first failing listener and fail the operation in progress
    Propagate,
}

impl std::str::FromStr for ListenerErrorPolicy {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            "propagate" => Ok(Self::Propagate),
            other => Err(BatchError::configuration(format!(
                "unknown listener error policy '{}'",
                other
            ))),
        }
    }
}

/// Engine-wide defaults
#[derive(Clone)]
pub struct BatchConfig {
    /// Items per chunk handed to a writer
    pub chunk_size: usize,

    /// Retries after the first failed attempt of a step
    pub max_retries: u32,

    /// Pause between attempts
    pub retry_delay: Duration,

    /// Process items and write chunks concurrently
    pub parallel_processing: bool,

    /// Gate applied to retryable errors
    pub retry_predicate: RetryPredicate,

    /// How listener errors are handled by jobs and steps
    pub listener_error_policy: ListenerErrorPolicy,
}

impl BatchConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: 0,
            retry_delay: Duration::ZERO,
            parallel_processing: false,
            retry_predicate: retry_all(),
            listener_error_policy: ListenerErrorPolicy::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised variables (all optional):
    /// - BATCH_CHUNK_SIZE (default: 10)
    /// - BATCH_MAX_RETRIES (default: 0)
    /// - BATCH_RETRY_DELAY_MS (default: 0)
    /// - BATCH_PARALLEL_PROCESSING (true/false, default: false)
    /// - BATCH_LISTENER_ERROR_POLICY (log/propagate, default: log)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BatchConfig::from_env`] with an arbitrary variable source
    ///
    /// A variable that is set but does not parse is an error; it never
    /// silently falls back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();

        if let Some(chunk_size) = parse_var(&lookup, "BATCH_CHUNK_SIZE")? {
            config.chunk_size = chunk_size;
        }

        if let Some(max_retries) = parse_var(&lookup, "BATCH_MAX_RETRIES")? {
            config.max_retries = max_retries;
        }

        if let Some(delay_ms) = parse_var(&lookup, "BATCH_RETRY_DELAY_MS")? {
            config.retry_delay = Duration::from_millis(delay_ms);
        }

        if let Some(parallel) = parse_var(&lookup, "BATCH_PARALLEL_PROCESSING")? {
            config.parallel_processing = parallel;
        }

        if let Some(policy) = lookup("BATCH_LISTENER_ERROR_POLICY") {
            config.listener_error_policy = policy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_parallel_processing(mut self, parallel: bool) -> Self {
        self.parallel_processing = parallel;
        self
    }

    pub fn with_retry_predicate(
        mut self,
        predicate: impl Fn(&BatchError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub fn with_listener_error_policy(mut self, policy: ListenerErrorPolicy) -> Self {
        self.listener_error_policy = policy;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BatchError::configuration(
                "chunk_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("chunk_size", &self.chunk_size)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("parallel_processing", &self.parallel_processing)
            .field("listener_error_policy", &self.listener_error_policy)
            .finish_non_exhaustive()
    }
}

/// Optional settings layered over the engine defaults
///
/// Used both on a job builder (applies to all of its steps) and on a single
/// step definition.
#[derive(Clone, Default)]
pub struct StepOverrides {
    pub chunk_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub retry_predicate: Option<RetryPredicate>,
    pub parallel_processing: Option<bool>,
}

impl fmt::Debug for StepOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepOverrides")
            .field("chunk_size", &self.chunk_size)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("parallel_processing", &self.parallel_processing)
            .finish()
    }
}

/// Fully resolved settings a step runs with
#[derive(Clone)]
pub struct StepSettings {
    pub chunk_size: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retry_predicate: RetryPredicate,
    pub parallel_processing: bool,
    pub listener_error_policy: ListenerErrorPolicy,
}

impl StepSettings {
    /// Settings taken straight from the engine defaults
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            retry_predicate: config.retry_predicate.clone(),
            parallel_processing: config.parallel_processing,
            listener_error_policy: config.listener_error_policy,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BatchError::configuration(
                "Chunk size must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for StepSettings {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

impl fmt::Debug for StepSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSettings")
            .field("chunk_size", &self.chunk_size)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("parallel_processing", &self.parallel_processing)
            .field("listener_error_policy", &self.listener_error_policy)
            .finish_non_exhaustive()
    }
}

/// Resolves the settings for one step
///
/// Precedence, field by field: step overrides, then job-builder overrides,
/// then the engine defaults. The listener policy is engine-wide.
pub fn resolve_step_settings(
    step: &StepOverrides,
    job: &StepOverrides,
    engine: &BatchConfig,
) -> Result<StepSettings> {
    let settings = StepSettings {
        chunk_size: step
            .chunk_size
            .or(job.chunk_size)
            .unwrap_or(engine.chunk_size),
        max_retries: step
            .max_retries
            .or(job.max_retries)
            .unwrap_or(engine.max_retries),
        retry_delay: step
            .retry_delay
            .or(job.retry_delay)
            .unwrap_or(engine.retry_delay),
        retry_predicate: step
            .retry_predicate
            .clone()
            .or_else(|| job.retry_predicate.clone())
            .unwrap_or_else(|| engine.retry_predicate.clone()),
        parallel_processing: step
            .parallel_processing
            .or(job.parallel_processing)
            .unwrap_or(engine.parallel_processing),
        listener_error_policy: engine.listener_error_policy,
    };
    settings.validate()?;
    Ok(settings)
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            BatchError::configuration(format!("{} has an invalid value '{}'", key, raw))
        }),
    }
}
