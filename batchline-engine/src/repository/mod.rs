//! Repository layer
//!
//! The repository makes job and step executions durable and queryable.
//! The engine only ever inserts and updates records; retention and deletion
//! are left to the implementation.
//!
//! The contract is trait-based so persistent backends can be plugged in.
//! [`InMemoryJobRepository`] is the reference implementation.

mod memory;

use async_trait::async_trait;
use batchline_core::{ExecutionFilter, ExecutionStatus, JobExecution, Result, StepExecution};
use uuid::Uuid;

pub use memory::InMemoryJobRepository;

/// Durable store for execution records
///
/// Implementations must hand out copies: mutating a returned record never
/// changes what is stored. `update_*` overwrites every field of the stored
/// record with the passed one. Concurrent id-keyed updates must be
/// serialised by the implementation.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persists a new job execution and returns the stored copy
    async fn save_job_execution(&self, execution: &JobExecution) -> Result<JobExecution>;

    /// Persists a new step execution and returns the stored copy
    async fn save_step_execution(&self, execution: &StepExecution) -> Result<StepExecution>;

    /// Overwrites a stored job execution
    ///
    /// # Errors
    /// `ExecutionNotFound` if no record with this id was saved.
    async fn update_job_execution(&self, execution: &JobExecution) -> Result<JobExecution>;

    /// Overwrites a stored job execution only while its stored status is
    /// still `expected`
    ///
    /// The check and the write must be atomic with respect to every other
    /// update of the same id.
    ///
    /// # Errors
    /// `ExecutionNotFound` if no record with this id was saved,
    /// `InvalidTransition` (from the stored status to the passed one) if the
    /// stored status has moved on.
    async fn update_job_execution_if(
        &self,
        execution: &JobExecution,
        expected: ExecutionStatus,
    ) -> Result<JobExecution>;

    /// Overwrites a stored step execution
    ///
    /// # Errors
    /// `ExecutionNotFound` if no record with this id was saved.
    async fn update_step_execution(&self, execution: &StepExecution) -> Result<StepExecution>;

    async fn find_job_execution_by_id(&self, id: Uuid) -> Result<Option<JobExecution>>;

    async fn find_step_execution_by_id(&self, id: Uuid) -> Result<Option<StepExecution>>;

    /// All job executions matching the filter, in no particular order
    async fn find_job_executions_by(&self, filter: &ExecutionFilter) -> Result<Vec<JobExecution>>;

    /// All step executions matching the filter, in no particular order
    async fn find_step_executions_by(
        &self,
        filter: &ExecutionFilter,
    ) -> Result<Vec<StepExecution>>;
}
