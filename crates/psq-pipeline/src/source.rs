//! Where sample metadata for a batch comes from.

use std::future::Future;

use psq_core::SampleMetadata;
use psq_qbench::{DEFAULT_SEARCH_PAGE_SIZE, QBenchClient, QBenchError, Transport};

/// Looks up QBench sample metadata by batch.
pub trait MetadataSource: Send + Sync {
    fn batch_samples(
        &self,
        batch: &str,
    ) -> impl Future<Output = Result<Vec<SampleMetadata>, QBenchError>> + Send;
}

impl<T: Transport> MetadataSource for QBenchClient<T> {
    /// Batch listing first. Some tenants leave the batch's sample list empty,
    /// so an empty result falls back to searching recent samples.
    async fn batch_samples(&self, batch: &str) -> Result<Vec<SampleMetadata>, QBenchError> {
        let samples = self.get_batch_samples(batch).await?;
        if !samples.is_empty() {
            return Ok(samples);
        }
        tracing::info!(batch, "batch lists no samples, searching recent samples");
        self.search_samples_by_batch(batch, DEFAULT_SEARCH_PAGE_SIZE)
            .await
    }
}
