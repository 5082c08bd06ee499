//! Item writers

use async_trait::async_trait;
use batchline_core::StepExecution;

/// Receives one chunk of processed items per call
///
/// An error here is handled by the step retry loop like any other stage
/// error. Chunks written by a failed attempt are not rolled back.
#[async_trait]
pub trait ItemWriter<T: Send + 'static>: Send + Sync {
    async fn write(&self, items: Vec<T>, step_execution: &StepExecution) -> anyhow::Result<()>;
}
