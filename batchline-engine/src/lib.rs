//! Batchline Engine
//!
//! Chunk-oriented batch execution on top of `batchline-core`.
//!
//! Architecture:
//! - Configuration: engine defaults and per-job/per-step overrides
//! - Items: reader, processor and writer contracts
//! - Steps: chunk- and page-oriented strategies with retries
//! - Jobs: sequential step runs on a background task
//! - Repository: persistence contract and the in-memory store
//! - Factory/Launcher: job assembly and launching

pub mod chunk;
pub mod config;
pub mod factory;
pub mod item;
pub mod job;
pub mod launcher;
pub mod listener;
pub mod repository;
pub mod step;

#[cfg(test)]
mod test_support;

pub use config::{BatchConfig, ListenerErrorPolicy, StepOverrides, StepSettings};
pub use factory::{JobBuilder, JobFactory, StepDefinition};
pub use item::{
    CompositeItemProcessor, ItemProcessor, ItemReader, ItemWriter, PaginatedReader,
    PassThroughProcessor, Reader,
};
pub use job::{Job, JobRun, SimpleJob, request_stop};
pub use launcher::JobLauncher;
pub use listener::{JobListener, StepListener, TracingJobListener, TracingStepListener};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use step::{ChunkOrientedStep, PageOrientedStep, Step};
