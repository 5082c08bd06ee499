//! Step execution record

use serde::{Deserialize, Serialize};

use crate::domain::execution::{Execution, ExecutionRecord};
use crate::domain::job::JobExecution;

/// Item counters reserved for instrumentation
///
/// The engine does not increment these yet; they are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
    pub read_count: u64,
    pub write_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    pub read_skip_count: u64,
    pub process_skip_count: u64,
    pub write_skip_count: u64,
}

/// One run of a step inside a job run
///
/// Holds a snapshot of the owning job execution taken when the step began.
/// Later updates to the job's own record do not show up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    #[serde(flatten)]
    record: ExecutionRecord,
    job_execution: JobExecution,
    #[serde(flatten)]
    counters: StepCounters,
}

impl StepExecution {
    pub fn new(name: impl Into<String>, job_execution: &JobExecution) -> Self {
        Self {
            record: ExecutionRecord::new(name),
            job_execution: job_execution.clone(),
            counters: StepCounters::default(),
        }
    }

    /// Snapshot of the owning job execution
    pub fn job_execution(&self) -> &JobExecution {
        &self.job_execution
    }

    pub fn counters(&self) -> &StepCounters {
        &self.counters
    }
}

impl Execution for StepExecution {
    fn record(&self) -> &ExecutionRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ExecutionRecord {
        &mut self.record
    }
}
