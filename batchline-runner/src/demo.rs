//! Demo items for the sample job
//!
//! Orders come from a fixed in-memory list, customers from a paged source.
//! Writers log what they receive.

use async_trait::async_trait;
use batchline_core::{Execution, StepExecution};
use batchline_engine::{ItemProcessor, ItemReader, ItemWriter, PaginatedReader};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u32,
    pub amount_cents: i64,
}

/// All orders in one read
pub struct OrderReader {
    orders: Vec<Order>,
}

impl OrderReader {
    pub fn sample() -> Self {
        let orders = [1250, -300, 4999, 150, 0, 8000, -20, 725, 3100, 99, 4400]
            .into_iter()
            .enumerate()
            .map(|(i, amount_cents)| Order {
                id: i as u32 + 1,
                amount_cents,
            })
            .collect();
        Self { orders }
    }
}

#[async_trait]
impl ItemReader<Order> for OrderReader {
    async fn read(&self, _step_execution: &StepExecution) -> anyhow::Result<Option<Vec<Order>>> {
        if self.orders.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.orders.clone()))
    }
}

/// Drops refunds and empty orders and formats the rest
pub struct InvoiceLineProcessor;

#[async_trait]
impl ItemProcessor<Order, String> for InvoiceLineProcessor {
    async fn process(
        &self,
        order: Order,
        _step_execution: &StepExecution,
    ) -> anyhow::Result<Option<String>> {
        if order.amount_cents <= 0 {
            return Ok(None);
        }
        Ok(Some(format!(
            "order #{:04}: {}.{:02}",
            order.id,
            order.amount_cents / 100,
            order.amount_cents % 100
        )))
    }
}

/// Serves customer ids a page at a time
pub struct CustomerPages {
    pages: Mutex<Vec<Vec<u32>>>,
}

impl CustomerPages {
    pub fn new(total: u32, page_size: usize) -> Self {
        let ids: Vec<u32> = (1..=total).collect();
        let mut pages: Vec<Vec<u32>> = ids.chunks(page_size.max(1)).map(<[u32]>::to_vec).collect();
        pages.reverse();
        Self {
            pages: Mutex::new(pages),
        }
    }

    fn pages(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<Vec<u32>>>> {
        self.pages
            .lock()
            .map_err(|_| anyhow::anyhow!("customer page cursor poisoned"))
    }
}

#[async_trait]
impl PaginatedReader<u32> for CustomerPages {
    fn has_next_page(&self) -> bool {
        self.pages().map(|pages| !pages.is_empty()).unwrap_or(false)
    }

    async fn read_page(&self, _step_execution: &StepExecution) -> anyhow::Result<Vec<u32>> {
        Ok(self.pages()?.pop().unwrap_or_default())
    }
}

/// Logs every chunk it is handed
pub struct LogWriter {
    label: &'static str,
}

impl LogWriter {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl<T: std::fmt::Debug + Send + 'static> ItemWriter<T> for LogWriter {
    async fn write(&self, items: Vec<T>, step_execution: &StepExecution) -> anyhow::Result<()> {
        info!(
            "[{}] {} wrote {} items: {:?}",
            step_execution.job_execution().name(),
            self.label,
            items.len(),
            items
        );
        Ok(())
    }
}
