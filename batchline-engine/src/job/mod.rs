//! Jobs
//!
//! A job runs its steps in order on a background task. Launching a job
//! returns as soon as its execution is `STARTED`; the [`JobRun`] handle can
//! be awaited for the final record or dropped to leave the run detached.
//!
//! Stopping is cooperative. [`request_stop`] marks the execution `STOPPING`
//! and the job notices at the next step boundary. A step that is already
//! running is never interrupted.

mod simple;

use async_trait::async_trait;
use batchline_core::{
    BatchError, Execution, ExecutionStatus, JobExecution, JobParameters, Result,
};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::repository::JobRepository;

pub use simple::SimpleJob;

/// A launchable job
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Starts a new execution with `parameters`
    ///
    /// Returns once the execution is `STARTED`. Errors raised before that
    /// point are returned here; later ones are recorded on the execution.
    async fn execute(&self, parameters: JobParameters) -> Result<JobRun>;
}

/// Handle to a job execution running in the background
#[derive(Debug)]
pub struct JobRun {
    execution: JobExecution,
    handle: JoinHandle<Result<JobExecution>>,
}

impl JobRun {
    pub(crate) fn new(execution: JobExecution, handle: JoinHandle<Result<JobExecution>>) -> Self {
        Self { execution, handle }
    }

    /// The execution as it was when the run started
    pub fn execution(&self) -> &JobExecution {
        &self.execution
    }

    pub fn id(&self) -> Uuid {
        self.execution.id()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run to end and returns the final persisted execution
    ///
    /// A step failure is not an error here: the returned execution is
    /// `FAILED` and carries the message. An error means the outcome could
    /// not be recorded on the execution (a repository failure, or a
    /// propagated `after_job` listener error on a completed execution).
    pub async fn wait(self) -> Result<JobExecution> {
        self.handle
            .await
            .map_err(|e| BatchError::Internal(format!("job task failed: {}", e)))?
    }

    /// Drops the handle and leaves the run going in the background
    pub fn detach(self) -> JobExecution {
        self.execution
    }
}

/// Asks a running job execution to stop
///
/// Moves the stored execution from `STARTED` to `STOPPING`. The job
/// finishes as `STOPPED` before its next step. The write only lands if the
/// stored execution is still `STARTED`, so a run that finished in the
/// meantime keeps its final status.
///
/// # Errors
/// `ExecutionNotFound` for an unknown id, `InvalidTransition` if the
/// execution is not `STARTED`.
pub async fn request_stop(
    repository: &dyn JobRepository,
    job_execution_id: Uuid,
) -> Result<JobExecution> {
    let mut execution = repository
        .find_job_execution_by_id(job_execution_id)
        .await?
        .ok_or(BatchError::ExecutionNotFound(job_execution_id))?;

    execution.transition_status(ExecutionStatus::Stopping)?;
    execution.record_mut().touch(Utc::now());
    let execution = repository
        .update_job_execution_if(&execution, ExecutionStatus::Started)
        .await?;

    info!(
        "Stop requested for job {} ({})",
        execution.name(),
        job_execution_id
    );
    Ok(execution)
}
