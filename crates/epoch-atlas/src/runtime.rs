//! Task spawning and the cooperative metrics precompute driver

use epoch_atlas_lib::{Atlas, PrecomputePlan, PrecomputeProgress};
use std::sync::Arc;

/// Run a load or precompute task alongside the query
///
/// With `profiling` on, each task's span is labelled with its future type, so the
/// file reads and the precompute pass show up separately in the Chrome trace.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    #[cfg(feature = "profiling")]
    {
        tokio::spawn(async move {
            profiling::scope!(
                "runtime::spawn",
                format!("task_type={}", std::any::type_name::<F>()).as_str()
            );
            future.await
        })
    }
    #[cfg(not(feature = "profiling"))]
    {
        tokio::spawn(future)
    }
}

/// Hand the worker back between precompute batches
pub async fn yield_now() {
    tokio::task::yield_now().await
}

/// Warm the metrics cache over a plan, one bounded batch per poll
///
/// Yields between batches so other tasks keep running. Dropping the returned
/// future abandons the pass; years already computed stay cached.
///
/// # Returns
/// The number of years visited
pub async fn precompute(atlas: Arc<Atlas>, plan: PrecomputePlan) -> usize {
    let mut progress = PrecomputeProgress::new(plan);
    tracing::info!(
        "Precomputing {} years ({}..={} every {})",
        plan.year_count(),
        plan.start,
        plan.end,
        plan.stride
    );

    while progress.step(&atlas) {
        yield_now().await;
    }

    tracing::info!(
        "Precompute finished: {} years, {} cached",
        progress.completed(),
        atlas.metrics_cache().computed_len()
    );
    progress.completed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use epoch_atlas_lib::{Datasets, EngineConfig};

    #[tokio::test]
    async fn test_precompute_fills_cache() {
        let atlas = Arc::new(Atlas::new(EngineConfig::default(), Datasets::default()));
        let plan = PrecomputePlan::new(0, 100).with_stride(10).with_batch_size(3);

        let visited = spawn(precompute(atlas.clone(), plan)).await.unwrap();
        assert_eq!(visited, 11);
        assert_eq!(atlas.metrics_cache().computed_len(), 11);
    }
}
