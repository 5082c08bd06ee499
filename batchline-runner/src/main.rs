//! Batchline Runner
//!
//! Runs a sample two-step job on the in-memory repository.
//!
//! Architecture:
//! - Configuration: engine defaults from `BATCH_*` environment variables
//! - Demo items: an order step (bounded reader) and a customer step
//!   (paginated reader)
//! - Launch: the job runs in the background; the runner waits for it and
//!   reports the final records

mod demo;

use anyhow::{Context, Result};
use batchline_core::{Execution, ExecutionFilter, JobParameters};
use batchline_engine::{
    BatchConfig, JobFactory, JobLauncher, JobRepository, Reader, StepDefinition,
    TracingJobListener, TracingStepListener,
};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::demo::{CustomerPages, InvoiceLineProcessor, LogWriter, OrderReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchline_runner=info,batchline_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Batchline Runner");

    let config = BatchConfig::from_env().context("Failed to load batch configuration")?;
    info!("Loaded configuration: {:?}", config);

    let factory = JobFactory::new(config);
    let job = factory
        .job_builder("nightly-billing")
        .listener(TracingJobListener)
        .retry_delay(Duration::from_millis(250))
        .add_step(
            StepDefinition::with_processor(
                "invoice-lines",
                Reader::bounded(OrderReader::sample()),
                InvoiceLineProcessor,
                LogWriter::new("invoices"),
            )
            .listener(TracingStepListener)
            .chunk_size(4),
        )
        .add_step(
            StepDefinition::new(
                "customer-sync",
                Reader::paginated(CustomerPages::new(23, 5)),
                LogWriter::new("customers"),
            )
            .listener(TracingStepListener)
            .parallel_processing(true),
        )
        .build()
        .context("Failed to build job")?;

    let mut parameters = JobParameters::new();
    parameters.insert("source".to_string(), serde_json::json!("sample"));
    parameters.insert("dry_run".to_string(), serde_json::json!(true));

    let run = JobLauncher::new()
        .run(&job, parameters)
        .await
        .context("Failed to launch job")?;
    info!("Job {} launched as {}", run.execution().name(), run.id());

    let finished = match run.wait().await {
        Ok(finished) => finished,
        Err(e) => {
            error!("Job run did not finish cleanly: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Job {} finished with status {}",
        finished.name(),
        finished.status()
    );
    for failure in finished.record().failure_exceptions() {
        error!("  - {}", failure);
    }

    let steps = factory
        .repository()
        .find_step_executions_by(&ExecutionFilter::new())
        .await
        .context("Failed to query step executions")?;
    for step in steps {
        info!("  step {}: {}", step.name(), step.status());
    }

    Ok(())
}
