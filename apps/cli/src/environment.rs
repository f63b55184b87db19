use std::sync::Arc;

use querystream_ai::{ChartNormalizerTrait, StreamEnvironment, VegaLiteChartNormalizer};
use querystream_core::ChunkStoreTrait;
use querystream_storage_sqlite::FragmentRepository;

/// Stream environment backed by the SQLite fragment repository.
pub struct CliEnvironment {
    repository: Arc<FragmentRepository>,
    chart_normalizer: Arc<VegaLiteChartNormalizer>,
}

impl CliEnvironment {
    pub fn new(repository: Arc<FragmentRepository>) -> Self {
        Self {
            repository,
            chart_normalizer: Arc::new(VegaLiteChartNormalizer::new()),
        }
    }
}

impl StreamEnvironment for CliEnvironment {
    fn chunk_store(&self) -> Arc<dyn ChunkStoreTrait> {
        self.repository.clone()
    }

    fn chart_normalizer(&self) -> Arc<dyn ChartNormalizerTrait> {
        self.chart_normalizer.clone()
    }
}
