//! Data transfer objects
//!
//! Query shapes exchanged between the engine and repository implementations.

pub mod filter;
