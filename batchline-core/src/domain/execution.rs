//! Shared execution record
//!
//! `JobExecution` and `StepExecution` both embed an [`ExecutionRecord`] and
//! expose it through the [`Execution`] trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::status::ExecutionStatus;
use crate::error::{BatchError, Result};

/// Fields every execution carries
///
/// The id is assigned at construction and has no setter. The status only
/// moves through [`ExecutionRecord::transition_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    id: Uuid,
    name: String,
    status: ExecutionStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    create_time: DateTime<Utc>,
    last_updated_time: DateTime<Utc>,
    #[serde(default)]
    exit_status: String,
    #[serde(default)]
    failure_exceptions: Vec<String>,
}

impl ExecutionRecord {
    /// Creates a record in `Created` state with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: ExecutionStatus::Created,
            start_time: None,
            end_time: None,
            create_time: now,
            last_updated_time: now,
            exit_status: String::new(),
            failure_exceptions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn last_updated_time(&self) -> DateTime<Utc> {
        self.last_updated_time
    }

    pub fn exit_status(&self) -> &str {
        &self.exit_status
    }

    pub fn failure_exceptions(&self) -> &[String] {
        &self.failure_exceptions
    }

    /// Moves to `target` if the state machine allows it
    ///
    /// On failure the status is left untouched.
    pub fn transition_status(&mut self, target: ExecutionStatus) -> Result<&mut Self> {
        if !self.status.can_transition_to(target) {
            return Err(BatchError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(self)
    }

    pub fn set_start_time(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.start_time = Some(at);
        self
    }

    pub fn set_end_time(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.end_time = Some(at);
        self
    }

    /// Stamps `last_updated_time`
    pub fn touch(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.last_updated_time = at;
        self
    }

    pub fn set_exit_status(&mut self, exit_status: impl Into<String>) -> &mut Self {
        self.exit_status = exit_status.into();
        self
    }

    /// Replaces the failure list wholesale
    pub fn set_failure_exceptions(&mut self, errors: Vec<String>) -> &mut Self {
        self.failure_exceptions = errors;
        self
    }

    pub fn add_failure_exception(&mut self, error: impl Into<String>) -> &mut Self {
        self.failure_exceptions.push(error.into());
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Starting | ExecutionStatus::Started
        )
    }

    pub fn is_stopping(&self) -> bool {
        self.status == ExecutionStatus::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.status == ExecutionStatus::Stopped
    }

    pub fn is_complete(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }

    pub fn is_abandoned(&self) -> bool {
        self.status == ExecutionStatus::Abandoned
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Common view over job and step executions
pub trait Execution {
    fn record(&self) -> &ExecutionRecord;

    fn record_mut(&mut self) -> &mut ExecutionRecord;

    fn id(&self) -> Uuid {
        self.record().id()
    }

    fn name(&self) -> &str {
        self.record().name()
    }

    fn status(&self) -> ExecutionStatus {
        self.record().status()
    }

    /// Chaining form of [`ExecutionRecord::transition_status`]
    fn transition_status(&mut self, target: ExecutionStatus) -> Result<&mut Self> {
        self.record_mut().transition_status(target)?;
        Ok(self)
    }
}
