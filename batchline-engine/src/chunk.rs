//! Chunking utility

use batchline_core::{BatchError, Result};

/// Splits `items` into consecutive groups of `size`
///
/// Every group has exactly `size` items except possibly the last one.
/// An empty input yields no groups.
///
/// # Errors
/// `Configuration` if `size` is zero.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(BatchError::configuration(
            "Chunk size must be greater than 0",
        ));
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    Ok(chunks)
}
