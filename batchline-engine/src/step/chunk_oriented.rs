//! Chunk-oriented step over a bounded reader

use async_trait::async_trait;
use batchline_core::{BatchError, JobExecution, Result, StepExecution};
use std::sync::Arc;

use super::{ProcessItems, Step, StepLifecycle, process_all, write_all, write_chunk};
use crate::item::{ItemProcessor, ItemReader, ItemWriter};

/// Reads everything once per attempt, then processes and writes it in
/// chunks of `chunk_size`
pub struct ChunkOrientedStep<I: Send + 'static, O: Send + 'static> {
    lifecycle: StepLifecycle,
    reader: Arc<dyn ItemReader<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
}

impl<I: Send + 'static, O: Send + 'static> ChunkOrientedStep<I, O> {
    pub fn new(
        lifecycle: StepLifecycle,
        reader: Arc<dyn ItemReader<I>>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Arc<dyn ItemWriter<O>>,
    ) -> Self {
        Self {
            lifecycle,
            reader,
            processor,
            writer,
        }
    }

    /// Writes each chunk as soon as it fills up
    async fn process_sequential(
        &self,
        items: Vec<I>,
        step_execution: &StepExecution,
    ) -> Result<()> {
        let chunk_size = self.lifecycle.settings().chunk_size;
        let mut buffer = Vec::new();

        for item in items {
            let processed = self
                .processor
                .process(item, step_execution)
                .await
                .map_err(BatchError::item_processing)?;
            if let Some(processed) = processed {
                buffer.push(processed);
            }
            if buffer.len() >= chunk_size {
                let full = std::mem::take(&mut buffer);
                write_chunk(self.writer.as_ref(), full, step_execution).await?;
            }
        }

        if !buffer.is_empty() {
            write_chunk(self.writer.as_ref(), buffer, step_execution).await?;
        }
        Ok(())
    }

    async fn process_parallel(
        &self,
        items: Vec<I>,
        step_execution: &StepExecution,
    ) -> Result<()> {
        let processed = process_all(self.processor.as_ref(), items, step_execution).await?;
        write_all(
            self.writer.as_ref(),
            processed,
            self.lifecycle.settings().chunk_size,
            step_execution,
        )
        .await
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> ProcessItems for ChunkOrientedStep<I, O> {
    async fn process_items(&self, step_execution: &StepExecution) -> Result<()> {
        let items = self
            .reader
            .read(step_execution)
            .await
            .map_err(BatchError::item_processing)?;
        let Some(items) = items else {
            return Ok(());
        };

        if self.lifecycle.settings().parallel_processing {
            self.process_parallel(items, step_execution).await
        } else {
            self.process_sequential(items, step_execution).await
        }
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> Step for ChunkOrientedStep<I, O> {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    async fn execute(&self, job_execution: &JobExecution) -> Result<StepExecution> {
        self.lifecycle.execute(job_execution, self).await
    }
}
