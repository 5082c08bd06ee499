//! Batchline Core
//!
//! Core types for the Batchline batch execution engine.
//!
//! This crate contains:
//! - Domain types: execution records and the status state machine
//! - DTOs: repository query filters
//! - Errors: the error taxonomy shared by every layer

pub mod domain;
pub mod dto;
pub mod error;

pub use domain::execution::{Execution, ExecutionRecord};
pub use domain::job::{JobExecution, JobParameters};
pub use domain::status::ExecutionStatus;
pub use domain::step::{StepCounters, StepExecution};
pub use dto::filter::ExecutionFilter;
pub use error::{BatchError, Result};
