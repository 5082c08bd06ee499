//! Steps
//!
//! A step is one read/process/write phase of a job. Both strategies share
//! [`StepLifecycle`], which owns the status transitions, persistence,
//! listener notification and retry loop. The strategies only supply the
//! item handling for a single attempt.

mod chunk_oriented;
mod page_oriented;
mod retry;

use async_trait::async_trait;
use batchline_core::{
    BatchError, Execution, ExecutionStatus, JobExecution, Result, StepExecution,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::chunk::chunk;
use crate::config::{ListenerErrorPolicy, StepSettings};
use crate::item::{ItemProcessor, ItemWriter};
use crate::listener::{StepListener, check_listener};
use crate::repository::JobRepository;

pub use chunk_oriented::ChunkOrientedStep;
pub use page_oriented::PageOrientedStep;
pub use retry::RetryPolicy;

/// A runnable step
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the step for `job_execution` and returns its final record
    ///
    /// On failure the step record is already persisted as `FAILED` (or
    /// `ABANDONED` if it never started) when the error is returned.
    async fn execute(&self, job_execution: &JobExecution) -> Result<StepExecution>;
}

/// One full attempt at a step's item handling
#[async_trait]
pub trait ProcessItems: Send + Sync {
    async fn process_items(&self, step_execution: &StepExecution) -> Result<()>;
}

/// Lifecycle shared by every step strategy
pub struct StepLifecycle {
    name: String,
    repository: Option<Arc<dyn JobRepository>>,
    listeners: Vec<Arc<dyn StepListener>>,
    settings: StepSettings,
}

impl StepLifecycle {
    pub fn new(name: impl Into<String>, settings: StepSettings) -> Self {
        Self {
            name: name.into(),
            repository: None,
            listeners: Vec::new(),
            settings,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn StepListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_listeners(
        mut self,
        listeners: impl IntoIterator<Item = Arc<dyn StepListener>>,
    ) -> Self {
        self.listeners.extend(listeners);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    fn policy(&self) -> ListenerErrorPolicy {
        self.settings.listener_error_policy
    }

    fn validate(&self) -> Result<&Arc<dyn JobRepository>> {
        if self.name.trim().is_empty() {
            return Err(BatchError::configuration("step name must not be empty"));
        }
        self.settings.validate()?;
        self.repository.as_ref().ok_or_else(|| {
            BatchError::configuration(format!("step {} has no job repository", self.name))
        })
    }

    /// Runs `items` under the step lifecycle
    pub async fn execute(
        &self,
        job_execution: &JobExecution,
        items: &dyn ProcessItems,
    ) -> Result<StepExecution> {
        let repository = self.validate()?;

        let step_execution = StepExecution::new(&self.name, job_execution);
        let mut step_execution = match repository.save_step_execution(&step_execution).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("Failed to persist step {}: {}", self.name, e);
                self.notify_error(&step_execution, &e).await;
                return Err(e);
            }
        };
        debug!(
            "Created step execution {} for job {}",
            step_execution.id(),
            job_execution.id()
        );

        match self.run(repository, &mut step_execution, items).await {
            Ok(()) => Ok(step_execution),
            Err(e) => {
                self.fail(repository, &mut step_execution, &e).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        repository: &Arc<dyn JobRepository>,
        step_execution: &mut StepExecution,
        items: &dyn ProcessItems,
    ) -> Result<()> {
        for listener in &self.listeners {
            check_listener(
                listener.before_step(step_execution).await,
                self.policy(),
                "before_step",
            )?;
        }

        let now = Utc::now();
        step_execution.transition_status(ExecutionStatus::Starting)?;
        step_execution.record_mut().set_start_time(now).touch(now);
        *step_execution = repository.update_step_execution(step_execution).await?;

        step_execution.transition_status(ExecutionStatus::Started)?;
        step_execution.record_mut().touch(Utc::now());
        *step_execution = repository.update_step_execution(step_execution).await?;
        info!("Step {} started ({})", self.name, step_execution.id());

        let current: &StepExecution = step_execution;
        RetryPolicy::from_settings(&self.settings)
            .run(&self.name, || items.process_items(current))
            .await?;

        let now = Utc::now();
        step_execution.transition_status(ExecutionStatus::Completed)?;
        step_execution.record_mut().set_end_time(now).touch(now);
        *step_execution = repository.update_step_execution(step_execution).await?;
        info!("Step {} completed", self.name);

        for listener in &self.listeners {
            check_listener(
                listener.after_step(step_execution).await,
                self.policy(),
                "after_step",
            )?;
        }
        Ok(())
    }

    /// Records a terminal failure and tells the listeners
    ///
    /// A step that never left `CREATED` is marked `ABANDONED`. A record that
    /// already reached a terminal status keeps it.
    async fn fail(
        &self,
        repository: &Arc<dyn JobRepository>,
        step_execution: &mut StepExecution,
        error: &BatchError,
    ) {
        error!("Step {} failed: {}", self.name, error);

        if !step_execution.record().is_terminal() {
            let target = if step_execution.status() == ExecutionStatus::Created {
                ExecutionStatus::Abandoned
            } else {
                ExecutionStatus::Failed
            };
            if let Err(e) = step_execution.transition_status(target) {
                warn!("Could not mark step {} as {}: {}", self.name, target, e);
            }
            let now = Utc::now();
            step_execution
                .record_mut()
                .set_end_time(now)
                .touch(now)
                .set_failure_exceptions(vec![error.to_string()]);
            match repository.update_step_execution(step_execution).await {
                Ok(updated) => *step_execution = updated,
                Err(e) => warn!("Could not persist failure of step {}: {}", self.name, e),
            }
        }

        self.notify_error(step_execution, error).await;
    }

    async fn notify_error(&self, step_execution: &StepExecution, error: &BatchError) {
        for listener in &self.listeners {
            let _ = check_listener(
                listener.on_step_error(step_execution, error).await,
                ListenerErrorPolicy::LogAndContinue,
                "on_step_error",
            );
        }
    }
}

/// Processes `items` concurrently and keeps the non-`None` results in input
/// order
///
/// Every item settles before the first error, if any, is returned.
pub(crate) async fn process_all<I, O>(
    processor: &dyn ItemProcessor<I, O>,
    items: Vec<I>,
    step_execution: &StepExecution,
) -> Result<Vec<O>>
where
    I: Send + 'static,
    O: Send + 'static,
{
    let results = join_all(
        items
            .into_iter()
            .map(|item| processor.process(item, step_execution)),
    )
    .await;

    let mut processed = Vec::with_capacity(results.len());
    for result in results {
        if let Some(item) = result.map_err(BatchError::item_processing)? {
            processed.push(item);
        }
    }
    Ok(processed)
}

pub(crate) async fn write_chunk<O: Send + 'static>(
    writer: &dyn ItemWriter<O>,
    items: Vec<O>,
    step_execution: &StepExecution,
) -> Result<()> {
    debug!("Writing chunk of {} items", items.len());
    writer
        .write(items, step_execution)
        .await
        .map_err(BatchError::item_processing)
}

/// Splits `items` into chunks and writes them all concurrently
pub(crate) async fn write_all<O: Send + 'static>(
    writer: &dyn ItemWriter<O>,
    items: Vec<O>,
    chunk_size: usize,
    step_execution: &StepExecution,
) -> Result<()> {
    let writes = chunk(items, chunk_size)?
        .into_iter()
        .map(|items| write_chunk(writer, items, step_execution));
    join_all(writes).await.into_iter().collect()
}
