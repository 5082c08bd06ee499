//! Fixtures shared by the engine's unit tests

use async_trait::async_trait;
use batchline_core::{BatchError, Execution, JobExecution, JobParameters, StepExecution};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::item::{ItemProcessor, ItemReader, ItemWriter, PaginatedReader};
use crate::listener::{JobListener, StepListener};

/// Bounded reader over a fixed list
pub struct VecReader<T>(pub Vec<T>);

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ItemReader<T> for VecReader<T> {
    async fn read(&self, _step_execution: &StepExecution) -> anyhow::Result<Option<Vec<T>>> {
        Ok(Some(self.0.clone()))
    }
}

/// Paginated reader that hands out its pages in order
pub struct PageReader<T>(Mutex<VecDeque<Vec<T>>>);

impl<T> PageReader<T> {
    pub fn new(pages: Vec<Vec<T>>) -> Self {
        Self(Mutex::new(pages.into()))
    }
}

#[async_trait]
impl<T: Send + 'static> PaginatedReader<T> for PageReader<T> {
    fn has_next_page(&self) -> bool {
        !self.0.lock().unwrap().is_empty()
    }

    async fn read_page(&self, _step_execution: &StepExecution) -> anyhow::Result<Vec<T>> {
        Ok(self.0.lock().unwrap().pop_front().unwrap_or_default())
    }
}

pub struct AddOne;

#[async_trait]
impl ItemProcessor<i64, i64> for AddOne {
    async fn process(
        &self,
        item: i64,
        _step_execution: &StepExecution,
    ) -> anyhow::Result<Option<i64>> {
        Ok(Some(item + 1))
    }
}

/// Writer that remembers every chunk it receives
pub struct RecordingWriter<T> {
    chunks: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T: Clone> RecordingWriter<T> {
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn chunks(&self) -> Vec<Vec<T>> {
        self.chunks.lock().unwrap().clone()
    }
}

impl<T> Clone for RecordingWriter<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: Arc::clone(&self.chunks),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> ItemWriter<T> for RecordingWriter<T> {
    async fn write(&self, items: Vec<T>, _step_execution: &StepExecution) -> anyhow::Result<()> {
        self.chunks.lock().unwrap().push(items);
        Ok(())
    }
}

/// Listener that records `"<event>:<name>:<status>"` lines and can be told
/// to fail on one event
#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(event: &'static str) -> Self {
        Self {
            fail_on: Some(event),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &str, execution: &impl Execution) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(format!(
            "{}:{}:{}",
            event,
            execution.name(),
            execution.status()
        ));
        if self.fail_on == Some(event) {
            anyhow::bail!("{} exploded", event);
        }
        Ok(())
    }
}

#[async_trait]
impl JobListener for RecordingListener {
    async fn before_job(&self, job_execution: &JobExecution) -> anyhow::Result<()> {
        self.record("before_job", job_execution)
    }

    async fn after_job(&self, job_execution: &JobExecution) -> anyhow::Result<()> {
        self.record("after_job", job_execution)
    }

    async fn on_job_error(
        &self,
        job_execution: &JobExecution,
        _error: &BatchError,
    ) -> anyhow::Result<()> {
        self.record("on_job_error", job_execution)
    }
}

#[async_trait]
impl StepListener for RecordingListener {
    async fn before_step(&self, step_execution: &StepExecution) -> anyhow::Result<()> {
        self.record("before_step", step_execution)
    }

    async fn after_step(&self, step_execution: &StepExecution) -> anyhow::Result<()> {
        self.record("after_step", step_execution)
    }

    async fn on_step_error(
        &self,
        step_execution: &StepExecution,
        _error: &BatchError,
    ) -> anyhow::Result<()> {
        self.record("on_step_error", step_execution)
    }
}

/// A job execution as a step sees it while the job runs
pub fn running_job(name: &str) -> JobExecution {
    let mut job = JobExecution::new(name, JobParameters::new());
    job.transition_status(batchline_core::ExecutionStatus::Starting)
        .unwrap()
        .transition_status(batchline_core::ExecutionStatus::Started)
        .unwrap();
    job
}
