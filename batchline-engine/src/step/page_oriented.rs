//! Page-oriented step over a paginated reader

use async_trait::async_trait;
use batchline_core::{BatchError, JobExecution, Result, StepExecution};
use std::sync::Arc;

use super::{ProcessItems, Step, StepLifecycle, process_all, write_all, write_chunk};
use crate::item::{ItemProcessor, ItemWriter, PaginatedReader};

/// Pulls pages until the reader is exhausted
///
/// Chunks span page boundaries: items left over from one page are carried
/// into the next, and the final remainder is flushed once the reader yields
/// no more pages.
pub struct PageOrientedStep<I: Send + 'static, O: Send + 'static> {
    lifecycle: StepLifecycle,
    reader: Arc<dyn PaginatedReader<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
}

impl<I: Send + 'static, O: Send + 'static> PageOrientedStep<I, O> {
    pub fn new(
        lifecycle: StepLifecycle,
        reader: Arc<dyn PaginatedReader<I>>,
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

    async fn next_page(&self, step_execution: &StepExecution) -> Result<Option<Vec<I>>> {
        self.reader
            .read(step_execution)
            .await
            .map_err(BatchError::item_processing)
    }

    async fn process_sequential(&self, step_execution: &StepExecution) -> Result<()> {
        let chunk_size = self.lifecycle.settings().chunk_size;
        let mut buffer = Vec::new();

        while let Some(page) = self.next_page(step_execution).await? {
            for item in page {
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
        }

        if !buffer.is_empty() {
            write_chunk(self.writer.as_ref(), buffer, step_execution).await?;
        }
        Ok(())
    }

    /// Processes each page concurrently, then writes the full chunks it
    /// completed before reading the next page
    async fn process_parallel(&self, step_execution: &StepExecution) -> Result<()> {
        let chunk_size = self.lifecycle.settings().chunk_size;
        let mut buffer = Vec::new();

        while let Some(page) = self.next_page(step_execution).await? {
            let processed = process_all(self.processor.as_ref(), page, step_execution).await?;
            buffer.extend(processed);

            let full = buffer.len() - buffer.len() % chunk_size;
            if full > 0 {
                let remainder = buffer.split_off(full);
                let ready = std::mem::replace(&mut buffer, remainder);
                write_all(self.writer.as_ref(), ready, chunk_size, step_execution).await?;
            }
        }

        if !buffer.is_empty() {
            write_chunk(self.writer.as_ref(), buffer, step_execution).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> ProcessItems for PageOrientedStep<I, O> {
    async fn process_items(&self, step_execution: &StepExecution) -> Result<()> {
        if self.lifecycle.settings().parallel_processing {
            self.process_parallel(step_execution).await
        } else {
            self.process_sequential(step_execution).await
        }
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> Step for PageOrientedStep<I, O> {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    async fn execute(&self, job_execution: &JobExecution) -> Result<StepExecution> {
        self.lifecycle.execute(job_execution, self).await
    }
}
