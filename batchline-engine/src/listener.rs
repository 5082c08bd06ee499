//! Lifecycle listeners
//!
//! Observers for job and step events. Every callback is optional and
//! listeners are notified in registration order. What happens when a
//! callback fails is decided by [`ListenerErrorPolicy`]; failures while
//! reporting an error (`on_job_error`, `on_step_error`) are always logged
//! and never replace the original error.

use async_trait::async_trait;
use batchline_core::{BatchError, Execution, JobExecution, Result, StepExecution};
use tracing::{error, info, warn};

use crate::config::ListenerErrorPolicy;

/// Observer for job lifecycle events
#[async_trait]
pub trait JobListener: Send + Sync {
    async fn before_job(&self, _job_execution: &JobExecution) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_job(&self, _job_execution: &JobExecution) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_job_error(
        &self,
        _job_execution: &JobExecution,
        _error: &BatchError,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observer for step lifecycle events
#[async_trait]
pub trait StepListener: Send + Sync {
    async fn before_step(&self, _step_execution: &StepExecution) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_step(&self, _step_execution: &StepExecution) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_step_error(
        &self,
        _step_execution: &StepExecution,
        _error: &BatchError,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Applies the listener error policy to one callback result
pub(crate) fn check_listener(
    result: anyhow::Result<()>,
    policy: ListenerErrorPolicy,
    event: &str,
) -> Result<()> {
    let Err(e) = result else {
        return Ok(());
    };
    match policy {
        ListenerErrorPolicy::LogAndContinue => {
            warn!("Listener {} failed, continuing: {:#}", event, e);
            Ok(())
        }
        ListenerErrorPolicy::Propagate => {
            error!("Listener {} failed: {:#}", event, e);
            Err(BatchError::ListenerNotification(format!(
                "{} listener failed: {:#}",
                event, e
            )))
        }
    }
}

/// Logs job events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJobListener;

#[async_trait]
impl JobListener for TracingJobListener {
    async fn before_job(&self, job_execution: &JobExecution) -> anyhow::Result<()> {
        info!(
            "Before job: {} ({})",
            job_execution.name(),
            job_execution.id()
        );
        Ok(())
    }

    async fn after_job(&self, job_execution: &JobExecution) -> anyhow::Result<()> {
        info!(
            "After job: {} ({}) status={}",
            job_execution.name(),
            job_execution.id(),
            job_execution.status()
        );
        Ok(())
    }

    async fn on_job_error(
        &self,
        job_execution: &JobExecution,
        error: &BatchError,
    ) -> anyhow::Result<()> {
        error!("Error in job: {}. Error: {}", job_execution.name(), error);
        Ok(())
    }
}

/// Logs step events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStepListener;

#[async_trait]
impl StepListener for TracingStepListener {
    async fn before_step(&self, step_execution: &StepExecution) -> anyhow::Result<()> {
        info!(
            "Before step: {} (job {})",
            step_execution.name(),
            step_execution.job_execution().name()
        );
        Ok(())
    }

    async fn after_step(&self, step_execution: &StepExecution) -> anyhow::Result<()> {
        info!(
            "After step: {} (job {})",
            step_execution.name(),
            step_execution.job_execution().name()
        );
        Ok(())
    }

    async fn on_step_error(
        &self,
        step_execution: &StepExecution,
        error: &BatchError,
    ) -> anyhow::Result<()> {
        error!("Error in step: {}. Error: {}", step_execution.name(), error);
        Ok(())
    }
}
