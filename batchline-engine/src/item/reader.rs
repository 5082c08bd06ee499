//! Item readers

use async_trait::async_trait;
use batchline_core::StepExecution;
use std::sync::Arc;

/// Reader for a bounded source
///
/// Called once per attempt; returns every available item, or `None` when
/// there is nothing to read.
#[async_trait]
pub trait ItemReader<T: Send + 'static>: Send + Sync {
    async fn read(&self, step_execution: &StepExecution) -> anyhow::Result<Option<Vec<T>>>;
}

/// Reader for a paginated source
///
/// The step keeps calling [`PaginatedReader::read`] until it yields `None`.
/// Implementations track their own cursor.
#[async_trait]
pub trait PaginatedReader<T: Send + 'static>: Send + Sync {
    fn has_next_page(&self) -> bool;

    async fn read_page(&self, step_execution: &StepExecution) -> anyhow::Result<Vec<T>>;

    /// Next page, or `None` once the source is exhausted
    async fn read(&self, step_execution: &StepExecution) -> anyhow::Result<Option<Vec<T>>> {
        if !self.has_next_page() {
            return Ok(None);
        }
        self.read_page(step_execution).await.map(Some)
    }
}

/// A reader tagged with its capability
///
/// The factory picks the step strategy from the variant once, when the step
/// is built.
pub enum Reader<T: Send + 'static> {
    Bounded(Arc<dyn ItemReader<T>>),
    Paginated(Arc<dyn PaginatedReader<T>>),
}

impl<T: Send + 'static> Reader<T> {
    pub fn bounded(reader: impl ItemReader<T> + 'static) -> Self {
        Self::Bounded(Arc::new(reader))
    }

    pub fn paginated(reader: impl PaginatedReader<T> + 'static) -> Self {
        Self::Paginated(Arc::new(reader))
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Paginated(_))
    }
}

impl<T: Send + 'static> Clone for Reader<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Bounded(reader) => Self::Bounded(Arc::clone(reader)),
            Self::Paginated(reader) => Self::Paginated(Arc::clone(reader)),
        }
    }
}
