//! Job assembly
//!
//! [`JobFactory`] holds the engine defaults and the default repository.
//! [`JobBuilder`] collects listeners, job-level overrides and
//! [`StepDefinition`]s, and turns them into a [`SimpleJob`] whose steps are
//! fully configured. The step strategy is chosen here, once, from the
//! reader variant.

use batchline_core::{BatchError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{BatchConfig, StepOverrides, resolve_step_settings};
use crate::item::{ItemProcessor, ItemWriter, PassThroughProcessor, Reader};
use crate::job::SimpleJob;
use crate::listener::{JobListener, StepListener};
use crate::repository::{InMemoryJobRepository, JobRepository};
use crate::step::{ChunkOrientedStep, PageOrientedStep, Step, StepLifecycle};

/// Entry point for building jobs
#[derive(Clone)]
pub struct JobFactory {
    config: BatchConfig,
    repository: Arc<dyn JobRepository>,
}

impl JobFactory {
    /// Factory backed by a fresh [`InMemoryJobRepository`]
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            repository: Arc::new(InMemoryJobRepository::new()),
        }
    }

    /// Replaces the default repository for every job built afterwards
    pub fn with_repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn repository(&self) -> Arc<dyn JobRepository> {
        Arc::clone(&self.repository)
    }

    pub fn job_builder(&self, name: impl Into<String>) -> JobBuilder {
        JobBuilder {
            name: name.into(),
            config: self.config.clone(),
            repository: Arc::clone(&self.repository),
            listeners: Vec::new(),
            overrides: StepOverrides::default(),
            steps: Vec::new(),
        }
    }
}

impl Default for JobFactory {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

/// Builder for one job
pub struct JobBuilder {
    name: String,
    config: BatchConfig,
    repository: Arc<dyn JobRepository>,
    listeners: Vec<Arc<dyn JobListener>>,
    overrides: StepOverrides,
    steps: Vec<Box<dyn BuildStep>>,
}

impl JobBuilder {
    /// Repository for the job and all of its steps
    pub fn repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn listener(mut self, listener: impl JobListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn listeners(
        mut self,
        listeners: impl IntoIterator<Item = Arc<dyn JobListener>>,
    ) -> Self {
        self.listeners.extend(listeners);
        self
    }

    /// Default chunk size for this job's steps
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.overrides.chunk_size = Some(chunk_size);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.overrides.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.overrides.retry_delay = Some(retry_delay);
        self
    }

    pub fn retry_predicate(
        mut self,
        predicate: impl Fn(&BatchError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.overrides.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn parallel_processing(mut self, parallel: bool) -> Self {
        self.overrides.parallel_processing = Some(parallel);
        self
    }

    pub fn add_step<I, O>(mut self, step: StepDefinition<I, O>) -> Self
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Builds the job and every step
    ///
    /// # Errors
    /// `Configuration` if a name is empty or a resolved step setting is out
    /// of range.
    pub fn build(self) -> Result<SimpleJob> {
        if self.name.trim().is_empty() {
            return Err(BatchError::configuration("job name must not be empty"));
        }

        let mut job = SimpleJob::new(self.name)
            .with_repository(Arc::clone(&self.repository))
            .with_listener_error_policy(self.config.listener_error_policy);
        for listener in self.listeners {
            job = job.with_listener(listener);
        }
        for step in self.steps {
            let step = step.build(&self.overrides, &self.config, &self.repository)?;
            job = job.with_step(step);
        }
        Ok(job)
    }
}

/// Everything needed to build one step
///
/// A definition without a processor passes items straight to the writer.
pub struct StepDefinition<I: Send + 'static, O: Send + 'static> {
    name: String,
    reader: Reader<I>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    listeners: Vec<Arc<dyn StepListener>>,
    overrides: StepOverrides,
}

impl<T: Send + 'static> StepDefinition<T, T> {
    pub fn new(
        name: impl Into<String>,
        reader: Reader<T>,
        writer: impl ItemWriter<T> + 'static,
    ) -> Self {
        Self::with_processor(name, reader, PassThroughProcessor::<T>::new(), writer)
    }
}

impl<I: Send + 'static, O: Send + 'static> StepDefinition<I, O> {
    pub fn with_processor(
        name: impl Into<String>,
        reader: Reader<I>,
        processor: impl ItemProcessor<I, O> + 'static,
        writer: impl ItemWriter<O> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reader,
            processor: Arc::new(processor),
            writer: Arc::new(writer),
            listeners: Vec::new(),
            overrides: StepOverrides::default(),
        }
    }

    pub fn listener(mut self, listener: impl StepListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.overrides.chunk_size = Some(chunk_size);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.overrides.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.overrides.retry_delay = Some(retry_delay);
        self
    }

    pub fn retry_predicate(
        mut self,
        predicate: impl Fn(&BatchError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.overrides.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn parallel_processing(mut self, parallel: bool) -> Self {
        self.overrides.parallel_processing = Some(parallel);
        self
    }
}

/// Type-erased step definition held by the builder
trait BuildStep: Send {
    fn build(
        self: Box<Self>,
        job_overrides: &StepOverrides,
        config: &BatchConfig,
        repository: &Arc<dyn JobRepository>,
    ) -> Result<Arc<dyn Step>>;
}

impl<I: Send + 'static, O: Send + 'static> BuildStep for StepDefinition<I, O> {
    fn build(
        self: Box<Self>,
        job_overrides: &StepOverrides,
        config: &BatchConfig,
        repository: &Arc<dyn JobRepository>,
    ) -> Result<Arc<dyn Step>> {
        let StepDefinition {
            name,
            reader,
            processor,
            writer,
            listeners,
            overrides,
        } = *self;

        if name.trim().is_empty() {
            return Err(BatchError::configuration("step name must not be empty"));
        }
        let settings = resolve_step_settings(&overrides, job_overrides, config)?;
        debug!("Building step {} with {:?}", name, settings);

        let lifecycle = StepLifecycle::new(name, settings)
            .with_repository(Arc::clone(repository))
            .with_listeners(listeners);

        let step: Arc<dyn Step> = match reader {
            Reader::Paginated(reader) => {
                Arc::new(PageOrientedStep::new(lifecycle, reader, processor, writer))
            }
            Reader::Bounded(reader) => {
                Arc::new(ChunkOrientedStep::new(lifecycle, reader, processor, writer))
            }
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::test_support::{AddOne, PageReader, RecordingListener, RecordingWriter, VecReader};
    use batchline_core::{Execution, ExecutionFilter, ExecutionStatus, JobParameters};

    #[tokio::test]
    async fn test_bounded_reader_builds_chunk_step() {
        let writer = RecordingWriter::<i64>::new();
        let job = JobFactory::new(BatchConfig::new().with_chunk_size(3))
            .job_builder("numbers")
            .add_step(StepDefinition::with_processor(
                "increment",
                Reader::bounded(VecReader((1..=10).collect::<Vec<i64>>())),
                AddOne,
                writer.clone(),
            ))
            .build()
            .unwrap();

        let finished = job
            .execute(JobParameters::new())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(finished.status(), ExecutionStatus::Completed);
        assert_eq!(
            writer.chunks(),
            vec![vec![2, 3, 4], vec![5, 6, 7], vec![8, 9, 10], vec![11]]
        );
    }

    #[tokio::test]
    async fn test_paginated_reader_builds_page_step() {
        let writer = RecordingWriter::<i64>::new();
        let job = JobFactory::default()
            .job_builder("pages")
            .chunk_size(2)
            .add_step(StepDefinition::new(
                "copy",
                Reader::paginated(PageReader::new(vec![vec![1_i64, 2, 3], vec![4, 5], vec![6, 7]])),
                writer.clone(),
            ))
            .build()
            .unwrap();

        job.execute(JobParameters::new())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(
            writer.chunks(),
            vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7]]
        );
    }

    #[tokio::test]
    async fn test_step_override_beats_job_override() {
        let writer = RecordingWriter::<i64>::new();
        let job = JobFactory::default()
            .job_builder("numbers")
            .chunk_size(5)
            .add_step(
                StepDefinition::new(
                    "copy",
                    Reader::bounded(VecReader(vec![1_i64, 2, 3, 4])),
                    writer.clone(),
                )
                .chunk_size(2),
            )
            .build()
            .unwrap();

        job.execute(JobParameters::new())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(writer.chunks(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test]
    async fn test_repository_override_reaches_steps() {
        let factory = JobFactory::default();
        let repository = Arc::new(InMemoryJobRepository::new());
        let job = factory
            .job_builder("numbers")
            .repository(repository.clone())
            .add_step(StepDefinition::new(
                "copy",
                Reader::bounded(VecReader(vec![1_i64])),
                RecordingWriter::<i64>::new(),
            ))
            .build()
            .unwrap();

        let finished = job
            .execute(JobParameters::new())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let steps = repository
            .find_step_executions_by(&ExecutionFilter::new().with_name("copy"))
            .await
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].job_execution().id(), finished.id());
        assert!(
            factory
                .repository()
                .find_job_execution_by_id(finished.id())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_listeners_are_attached() {
        let job_listener = RecordingListener::new();
        let step_listener = RecordingListener::new();
        let job = JobFactory::default()
            .job_builder("numbers")
            .listener(job_listener.clone())
            .add_step(
                StepDefinition::new(
                    "copy",
                    Reader::bounded(VecReader(vec![1_i64])),
                    RecordingWriter::<i64>::new(),
                )
                .listener(step_listener.clone()),
            )
            .build()
            .unwrap();

        job.execute(JobParameters::new())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(
            job_listener.events(),
            ["before_job:numbers:CREATED", "after_job:numbers:COMPLETED"]
        );
        assert_eq!(
            step_listener.events(),
            ["before_step:copy:CREATED", "after_step:copy:COMPLETED"]
        );
    }

    #[test]
    fn test_zero_chunk_size_is_rejected_at_build() {
        let result = JobFactory::default()
            .job_builder("numbers")
            .add_step(
                StepDefinition::new(
                    "copy",
                    Reader::bounded(VecReader(vec![1_i64])),
                    RecordingWriter::<i64>::new(),
                )
                .chunk_size(0),
            )
            .build();

        assert!(result.err().is_some_and(|e| e.is_configuration()));
    }

    #[test]
    fn test_empty_names_are_rejected_at_build() {
        assert!(
            JobFactory::default()
                .job_builder("")
                .build()
                .err()
                .is_some_and(|e| e.is_configuration())
        );
        assert!(
            JobFactory::default()
                .job_builder("numbers")
                .add_step(StepDefinition::new(
                    " ",
                    Reader::bounded(VecReader(vec![1_i64])),
                    RecordingWriter::<i64>::new(),
                ))
                .build()
                .err()
                .is_some_and(|e| e.is_configuration())
        );
    }
}
