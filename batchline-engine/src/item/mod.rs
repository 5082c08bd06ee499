//! Pipeline stage contracts
//!
//! Readers, processors and writers are supplied by the application. Stages
//! report failures as `anyhow::Error`; the engine wraps them into
//! `BatchError::ItemProcessing` so the step retry loop can act on them.

mod processor;
mod reader;
mod writer;

pub use processor::{CompositeItemProcessor, ItemProcessor, PassThroughProcessor};
pub use reader::{ItemReader, PaginatedReader, Reader};
pub use writer::ItemWriter;
