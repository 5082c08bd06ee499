//! In-memory repository
//!
//! Two id-keyed maps behind async locks. Records are cloned on every store
//! and every retrieval.

use async_trait::async_trait;
use batchline_core::{
    BatchError, Execution, ExecutionFilter, ExecutionStatus, JobExecution, Result, StepExecution,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::JobRepository;

/// Reference [`JobRepository`] keeping everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    job_executions: RwLock<HashMap<Uuid, JobExecution>>,
    step_executions: RwLock<HashMap<Uuid, StepExecution>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save_job_execution(&self, execution: &JobExecution) -> Result<JobExecution> {
        let mut jobs = self.job_executions.write().await;
        jobs.insert(execution.id(), execution.clone());
        Ok(execution.clone())
    }

    async fn save_step_execution(&self, execution: &StepExecution) -> Result<StepExecution> {
        let mut steps = self.step_executions.write().await;
        steps.insert(execution.id(), execution.clone());
        Ok(execution.clone())
    }

    async fn update_job_execution(&self, execution: &JobExecution) -> Result<JobExecution> {
        let mut jobs = self.job_executions.write().await;
        let stored = jobs
            .get_mut(&execution.id())
            .ok_or(BatchError::ExecutionNotFound(execution.id()))?;
        *stored = execution.clone();
        Ok(stored.clone())
    }

    async fn update_job_execution_if(
        &self,
        execution: &JobExecution,
        expected: ExecutionStatus,
    ) -> Result<JobExecution> {
        let mut jobs = self.job_executions.write().await;
        let stored = jobs
            .get_mut(&execution.id())
            .ok_or(BatchError::ExecutionNotFound(execution.id()))?;
        if stored.status() != expected {
            return Err(BatchError::InvalidTransition {
                from: stored.status(),
                to: execution.status(),
            });
        }
        *stored = execution.clone();
        Ok(stored.clone())
    }

    async fn update_step_execution(&self, execution: &StepExecution) -> Result<StepExecution> {
        let mut steps = self.step_executions.write().await;
        let stored = steps
            .get_mut(&execution.id())
            .ok_or(BatchError::ExecutionNotFound(execution.id()))?;
        *stored = execution.clone();
        Ok(stored.clone())
    }

    async fn find_job_execution_by_id(&self, id: Uuid) -> Result<Option<JobExecution>> {
        Ok(self.job_executions.read().await.get(&id).cloned())
    }

    async fn find_step_execution_by_id(&self, id: Uuid) -> Result<Option<StepExecution>> {
        Ok(self.step_executions.read().await.get(&id).cloned())
    }

    async fn find_job_executions_by(&self, filter: &ExecutionFilter) -> Result<Vec<JobExecution>> {
        let jobs = self.job_executions.read().await;
        Ok(jobs
            .values()
            .filter(|execution| filter.matches(execution.record()))
            .cloned()
            .collect())
    }

    async fn find_step_executions_by(
        &self,
        filter: &ExecutionFilter,
    ) -> Result<Vec<StepExecution>> {
        let steps = self.step_executions.read().await;
        Ok(steps
            .values()
            .filter(|execution| filter.matches(execution.record()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchline_core::{ExecutionStatus, JobParameters};

    fn job(name: &str) -> JobExecution {
        let mut params = JobParameters::new();
        params.insert("page_size".to_string(), serde_json::json!(50));
        JobExecution::new(name, params)
    }

    #[tokio::test]
    async fn test_save_then_find_returns_equal_record() {
        let repo = InMemoryJobRepository::new();
        let execution = job("import");

        let saved = repo.save_job_execution(&execution).await.unwrap();
        assert_eq!(saved, execution);

        let found = repo
            .find_job_execution_by_id(execution.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, execution);
    }

    #[tokio::test]
    async fn test_mutating_returned_record_does_not_change_store() {
        let repo = InMemoryJobRepository::new();
        let execution = job("import");
        repo.save_job_execution(&execution).await.unwrap();

        let mut found = repo
            .find_job_execution_by_id(execution.id())
            .await
            .unwrap()
            .unwrap();
        found.transition_status(ExecutionStatus::Starting).unwrap();
        found.set_job_parameters(JobParameters::new());
        found.record_mut().add_failure_exception("not persisted");

        let again = repo
            .find_job_execution_by_id(execution.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again, execution);
        assert_eq!(again.status(), ExecutionStatus::Created);
        assert_eq!(again.job_parameters()["page_size"], 50);
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let repo = InMemoryJobRepository::new();
        let mut execution = job("import");
        repo.save_job_execution(&execution).await.unwrap();

        let now = chrono::Utc::now();
        execution
            .transition_status(ExecutionStatus::Starting)
            .unwrap()
            .record_mut()
            .set_start_time(now)
            .set_exit_status("RUNNING")
            .touch(now);
        let updated = repo.update_job_execution(&execution).await.unwrap();
        assert_eq!(updated, execution);

        let found = repo
            .find_job_execution_by_id(execution.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status(), ExecutionStatus::Starting);
        assert_eq!(found.record().start_time(), Some(now));
        assert_eq!(found.record().exit_status(), "RUNNING");
    }

    #[tokio::test]
    async fn test_update_unknown_record_fails() {
        let repo = InMemoryJobRepository::new();
        let execution = job("never-saved");
        let err = repo.update_job_execution(&execution).await.unwrap_err();
        assert!(matches!(err, BatchError::ExecutionNotFound(id) if id == execution.id()));
    }

    #[tokio::test]
    async fn test_conditional_update_checks_stored_status() {
        let repo = InMemoryJobRepository::new();
        let mut execution = repo.save_job_execution(&job("import")).await.unwrap();
        execution
            .transition_status(ExecutionStatus::Starting)
            .unwrap()
            .transition_status(ExecutionStatus::Started)
            .unwrap();
        repo.update_job_execution(&execution).await.unwrap();

        let mut completed = execution.clone();
        completed.transition_status(ExecutionStatus::Completed).unwrap();
        repo.update_job_execution_if(&completed, ExecutionStatus::Started)
            .await
            .unwrap();

        let mut stale = execution.clone();
        stale.transition_status(ExecutionStatus::Stopping).unwrap();
        let err = repo
            .update_job_execution_if(&stale, ExecutionStatus::Started)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::InvalidTransition {
                from: ExecutionStatus::Completed,
                to: ExecutionStatus::Stopping,
            }
        ));

        let stored = repo
            .find_job_execution_by_id(execution.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_conditional_update_unknown_record_fails() {
        let repo = InMemoryJobRepository::new();
        let execution = job("never-saved");
        let err = repo
            .update_job_execution_if(&execution, ExecutionStatus::Created)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::ExecutionNotFound(id) if id == execution.id()));
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = InMemoryJobRepository::new();
        assert!(
            repo.find_job_execution_by_id(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_step_execution_by_id(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_step_execution_round_trip_keeps_snapshot() {
        let repo = InMemoryJobRepository::new();
        let job = job("import");
        let step = StepExecution::new("load", &job);
        repo.save_step_execution(&step).await.unwrap();

        let found = repo
            .find_step_execution_by_id(step.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, step);
        assert_eq!(found.job_execution().id(), job.id());
    }

    #[tokio::test]
    async fn test_find_by_filter() {
        let repo = InMemoryJobRepository::new();
        let first = job("import");
        let mut second = job("import");
        second.transition_status(ExecutionStatus::Abandoned).unwrap();
        let other = job("export");
        for execution in [&first, &second, &other] {
            repo.save_job_execution(execution).await.unwrap();
        }

        let imports = repo
            .find_job_executions_by(&ExecutionFilter::new().with_name("import"))
            .await
            .unwrap();
        assert_eq!(imports.len(), 2);

        let abandoned = repo
            .find_job_executions_by(
                &ExecutionFilter::new().with_status(ExecutionStatus::Abandoned),
            )
            .await
            .unwrap();
        assert_eq!(abandoned, vec![second.clone()]);

        let by_id = repo
            .find_job_executions_by(&ExecutionFilter::new().with_id(other.id()))
            .await
            .unwrap();
        assert_eq!(by_id, vec![other]);

        let all = repo
            .find_job_executions_by(&ExecutionFilter::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_find_steps_by_filter() {
        let repo = InMemoryJobRepository::new();
        let job = job("import");
        let load = StepExecution::new("load", &job);
        let enrich = StepExecution::new("enrich", &job);
        repo.save_step_execution(&load).await.unwrap();
        repo.save_step_execution(&enrich).await.unwrap();

        let found = repo
            .find_step_executions_by(&ExecutionFilter::new().with_name("enrich"))
            .await
            .unwrap();
        assert_eq!(found, vec![enrich]);
    }
}
