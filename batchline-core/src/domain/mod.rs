//! Core domain types
//!
//! Execution records shared between the engine (which drives them through
//! their lifecycle) and repository implementations (which persist them).

pub mod execution;
pub mod job;
pub mod status;
pub mod step;
