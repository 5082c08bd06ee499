//! Item processors

use async_trait::async_trait;
use batchline_core::StepExecution;
use std::marker::PhantomData;
use std::sync::Arc;

/// Transforms one item
///
/// Returning `Ok(None)` drops the item; it is not an error.
#[async_trait]
pub trait ItemProcessor<I: Send + 'static, O: Send + 'static>: Send + Sync {
    async fn process(&self, item: I, step_execution: &StepExecution) -> anyhow::Result<Option<O>>;
}

/// Hands every item through unchanged
///
/// Used for step definitions that have no processor of their own.
pub struct PassThroughProcessor<T>(PhantomData<fn(T) -> T>);

impl<T> PassThroughProcessor<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for PassThroughProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T, T> for PassThroughProcessor<T> {
    async fn process(&self, item: T, _: &StepExecution) -> anyhow::Result<Option<T>> {
        Ok(Some(item))
    }
}

/// Runs processors one after another
///
/// The first processor to drop an item ends the chain for that item.
pub struct CompositeItemProcessor<T: Send + 'static> {
    processors: Vec<Arc<dyn ItemProcessor<T, T>>>,
}

impl<T: Send + 'static> CompositeItemProcessor<T> {
    pub fn new(processors: Vec<Arc<dyn ItemProcessor<T, T>>>) -> Self {
        Self { processors }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T, T> for CompositeItemProcessor<T> {
    async fn process(&self, item: T, step_execution: &StepExecution) -> anyhow::Result<Option<T>> {
        let mut current = item;
        for processor in &self.processors {
            match processor.process(current, step_execution).await? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchline_core::{JobExecution, JobParameters};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AddOne;

    #[async_trait]
    impl ItemProcessor<i64, i64> for AddOne {
        async fn process(&self, item: i64, _: &StepExecution) -> anyhow::Result<Option<i64>> {
            Ok(Some(item + 1))
        }
    }

    struct DropOdd(AtomicUsize);

    #[async_trait]
    impl ItemProcessor<i64, i64> for DropOdd {
        async fn process(&self, item: i64, _: &StepExecution) -> anyhow::Result<Option<i64>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok((item % 2 == 0).then_some(item))
        }
    }

    struct Explode;

    #[async_trait]
    impl ItemProcessor<i64, i64> for Explode {
        async fn process(&self, _: i64, _: &StepExecution) -> anyhow::Result<Option<i64>> {
            anyhow::bail!("explode")
        }
    }

    fn step_execution() -> StepExecution {
        StepExecution::new("step", &JobExecution::new("job", JobParameters::new()))
    }

    #[tokio::test]
    async fn test_composite_applies_in_order() {
        let composite: CompositeItemProcessor<i64> =
            CompositeItemProcessor::new(vec![Arc::new(AddOne), Arc::new(AddOne), Arc::new(AddOne)]);
        let out = composite.process(1, &step_execution()).await.unwrap();
        assert_eq!(out, Some(4));
        assert_eq!(composite.len(), 3);
    }

    #[tokio::test]
    async fn test_composite_stops_at_first_drop() {
        let drop_odd = Arc::new(DropOdd(AtomicUsize::new(0)));
        let composite: CompositeItemProcessor<i64> = CompositeItemProcessor::new(vec![
            drop_odd.clone(),
            Arc::new(AddOne),
            drop_odd.clone(),
        ]);

        // 2 -> kept -> 3 -> dropped by the second filter
        assert_eq!(composite.process(2, &step_execution()).await.unwrap(), None);
        assert_eq!(drop_odd.0.load(Ordering::SeqCst), 2);

        // 1 -> dropped immediately
        assert_eq!(composite.process(1, &step_execution()).await.unwrap(), None);
        assert_eq!(drop_odd.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_composite_propagates_errors() {
        let composite: CompositeItemProcessor<i64> =
            CompositeItemProcessor::new(vec![Arc::new(AddOne), Arc::new(Explode)]);
        let err = composite.process(1, &step_execution()).await.unwrap_err();
        assert_eq!(err.to_string(), "explode");
    }

    #[tokio::test]
    async fn test_pass_through() {
        let processor = PassThroughProcessor::<String>::new();
        let out = processor
            .process("same".to_string(), &step_execution())
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("same"));
    }
}
