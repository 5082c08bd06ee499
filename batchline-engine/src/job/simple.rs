//! Sequential job

use async_trait::async_trait;
use batchline_core::{
    BatchError, Execution, ExecutionStatus, JobExecution, JobParameters, Result,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Job, JobRun};
use crate::config::ListenerErrorPolicy;
use crate::listener::{JobListener, check_listener};
use crate::repository::JobRepository;
use crate::step::Step;

/// Runs its steps one after another
///
/// Cheap to clone; the launched run holds its own clone.
#[derive(Clone)]
pub struct SimpleJob {
    name: String,
    steps: Arc<Vec<Arc<dyn Step>>>,
    listeners: Arc<Vec<Arc<dyn JobListener>>>,
    repository: Option<Arc<dyn JobRepository>>,
    listener_error_policy: ListenerErrorPolicy,
}

impl SimpleJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Arc::new(Vec::new()),
            listeners: Arc::new(Vec::new()),
            repository: None,
            listener_error_policy: ListenerErrorPolicy::default(),
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_step(mut self, step: Arc<dyn Step>) -> Self {
        Arc::make_mut(&mut self.steps).push(step);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn JobListener>) -> Self {
        Arc::make_mut(&mut self.listeners).push(listener);
        self
    }

    pub fn with_listener_error_policy(mut self, policy: ListenerErrorPolicy) -> Self {
        self.listener_error_policy = policy;
        self
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    fn validate(&self) -> Result<&Arc<dyn JobRepository>> {
        if self.name.trim().is_empty() {
            return Err(BatchError::configuration("job name must not be empty"));
        }
        self.repository.as_ref().ok_or_else(|| {
            BatchError::configuration(format!("job {} has no job repository", self.name))
        })
    }

    /// Runs the steps in order for the stored execution `job_id`
    ///
    /// The execution is re-read from the repository before every step. If it
    /// is `STOPPING`, the remaining steps are skipped and `STOPPED` is
    /// returned. Otherwise returns `COMPLETED` once every step succeeded.
    pub async fn process_steps(
        &self,
        repository: &dyn JobRepository,
        job_id: Uuid,
    ) -> Result<ExecutionStatus> {
        for step in self.steps.iter() {
            let execution = repository
                .find_job_execution_by_id(job_id)
                .await?
                .ok_or(BatchError::ExecutionNotFound(job_id))?;

            if execution.record().is_stopping() {
                info!("Job {} is stopping, skipping step {}", self.name, step.name());
                return Ok(ExecutionStatus::Stopped);
            }

            debug!("Job {} running step {}", self.name, step.name());
            step.execute(&execution).await?;
        }
        Ok(ExecutionStatus::Completed)
    }

    async fn start(
        &self,
        repository: &Arc<dyn JobRepository>,
        execution: &mut JobExecution,
    ) -> Result<()> {
        for listener in self.listeners.iter() {
            check_listener(
                listener.before_job(execution).await,
                self.listener_error_policy,
                "before_job",
            )?;
        }

        let now = Utc::now();
        execution.transition_status(ExecutionStatus::Starting)?;
        execution.record_mut().set_start_time(now).touch(now);
        *execution = repository.update_job_execution(execution).await?;

        execution.transition_status(ExecutionStatus::Started)?;
        execution.record_mut().touch(Utc::now());
        *execution = repository.update_job_execution(execution).await?;
        info!("Job {} started ({})", self.name, execution.id());
        Ok(())
    }

    /// Background half of a run
    async fn complete_run(
        self,
        repository: Arc<dyn JobRepository>,
        mut execution: JobExecution,
    ) -> Result<JobExecution> {
        let error = match self.process_steps(repository.as_ref(), execution.id()).await {
            Ok(outcome) => match self.finish(&repository, &mut execution, outcome).await {
                Ok(()) => return Ok(execution),
                Err(e) => e,
            },
            Err(e) => e,
        };

        self.reload(&repository, &mut execution).await;
        if self.fail(&repository, &mut execution, &error).await {
            Ok(execution)
        } else {
            Err(error)
        }
    }

    /// Persists the final status of a run whose steps all returned
    ///
    /// A stop request that arrived during the last step still wins, even
    /// one that lands between the re-read and the write.
    async fn finish(
        &self,
        repository: &Arc<dyn JobRepository>,
        execution: &mut JobExecution,
        outcome: ExecutionStatus,
    ) -> Result<()> {
        let target = loop {
            let mut current = repository
                .find_job_execution_by_id(execution.id())
                .await?
                .ok_or(BatchError::ExecutionNotFound(execution.id()))?;

            let observed = current.status();
            let target = if current.record().is_stopping() {
                ExecutionStatus::Stopped
            } else {
                outcome
            };

            let now = Utc::now();
            current.transition_status(target)?;
            current.record_mut().set_end_time(now).touch(now);
            match repository.update_job_execution_if(&current, observed).await {
                Ok(updated) => {
                    *execution = updated;
                    break target;
                }
                Err(BatchError::InvalidTransition { from, .. }) => {
                    debug!("Job {} moved to {} while finishing, retrying", self.name, from);
                }
                Err(e) => return Err(e),
            }
        };

        if target == ExecutionStatus::Stopped {
            info!("Job {} stopped", self.name);
            return Ok(());
        }

        info!("Job {} completed", self.name);
        for listener in self.listeners.iter() {
            check_listener(
                listener.after_job(execution).await,
                self.listener_error_policy,
                "after_job",
            )?;
        }
        Ok(())
    }

    async fn reload(&self, repository: &Arc<dyn JobRepository>, execution: &mut JobExecution) {
        match repository.find_job_execution_by_id(execution.id()).await {
            Ok(Some(current)) => *execution = current,
            Ok(None) => {}
            Err(e) => warn!("Could not reload job {}: {}", self.name, e),
        }
    }

    /// Records `error` on the execution and notifies the listeners
    ///
    /// Returns `true` if the failure was persisted. An execution still
    /// `CREATED` is marked `ABANDONED`; one already terminal is left alone.
    async fn fail(
        &self,
        repository: &Arc<dyn JobRepository>,
        execution: &mut JobExecution,
        error: &BatchError,
    ) -> bool {
        error!("Job {} failed: {}", self.name, error);

        let mut recorded = false;
        if !execution.record().is_terminal() {
            let target = if execution.status() == ExecutionStatus::Created {
                ExecutionStatus::Abandoned
            } else {
                ExecutionStatus::Failed
            };
            if let Err(e) = execution.transition_status(target) {
                warn!("Could not mark job {} as {}: {}", self.name, target, e);
            }
            let now = Utc::now();
            execution
                .record_mut()
                .set_end_time(now)
                .touch(now)
                .add_failure_exception(error.to_string());
            match repository.update_job_execution(execution).await {
                Ok(updated) => {
                    *execution = updated;
                    recorded = true;
                }
                Err(e) => warn!("Could not persist failure of job {}: {}", self.name, e),
            }
        }

        self.notify_error(execution, error).await;
        recorded
    }

    async fn notify_error(&self, execution: &JobExecution, error: &BatchError) {
        for listener in self.listeners.iter() {
            let _ = check_listener(
                listener.on_job_error(execution, error).await,
                ListenerErrorPolicy::LogAndContinue,
                "on_job_error",
            );
        }
    }
}

#[async_trait]
impl Job for SimpleJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, parameters: JobParameters) -> Result<JobRun> {
        let repository = Arc::clone(self.validate()?);
        info!(
            "Starting job {} with parameters {}",
            self.name,
            serde_json::to_string(&parameters).unwrap_or_default()
        );

        let execution = JobExecution::new(&self.name, parameters);
        let mut execution = match repository.save_job_execution(&execution).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("Failed to persist job {}: {}", self.name, e);
                self.notify_error(&execution, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.start(&repository, &mut execution).await {
            self.fail(&repository, &mut execution, &e).await;
            return Err(e);
        }

        let started = execution.clone();
        let handle = tokio::spawn(self.clone().complete_run(repository, execution));
        Ok(JobRun::new(started, handle))
    }
}
