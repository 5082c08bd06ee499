//! Job launching

use batchline_core::{JobParameters, Result};
use tracing::info;

use crate::job::{Job, JobRun};

/// Starts jobs
///
/// Returns once the job is `STARTED`; it does not wait for the steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobLauncher;

impl JobLauncher {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, job: &dyn Job, parameters: JobParameters) -> Result<JobRun> {
        info!("Launching job {}", job.name());
        job.execute(parameters).await
    }
}
