//! Job execution record

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::execution::{Execution, ExecutionRecord};

/// Parameters a job was launched with
pub type JobParameters = HashMap<String, serde_json::Value>;

/// One run of a job
///
/// The parameter map is owned by the record: it is moved in on
/// construction and only handed out by shared reference or as a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    #[serde(flatten)]
    record: ExecutionRecord,
    #[serde(default)]
    job_parameters: JobParameters,
}

impl JobExecution {
    pub fn new(name: impl Into<String>, job_parameters: JobParameters) -> Self {
        Self {
            record: ExecutionRecord::new(name),
            job_parameters,
        }
    }

    pub fn job_parameters(&self) -> &JobParameters {
        &self.job_parameters
    }

    pub fn set_job_parameters(&mut self, job_parameters: JobParameters) -> &mut Self {
        self.job_parameters = job_parameters;
        self
    }
}

impl Execution for JobExecution {
    fn record(&self) -> &ExecutionRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ExecutionRecord {
        &mut self.record
    }
}
