//! Server state management.

use std::sync::Arc;

use docex_core::config::ExtractorConfig;
use docex_core::traits::{
    CacheStore, HistorySink, LabelDetector, SemanticExtractor, TextExtractor,
};
use docex_core::{
    BatchOrchestrator, ExtractionCache, ItemProcessor, KvHistoryStore, LabelDetectionService,
    SequentialExtractor,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: ExtractorConfig,
    pub cache: Arc<ExtractionCache>,
    pub processor: Arc<ItemProcessor>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub history: Option<Arc<KvHistoryStore>>,
}

impl AppState {
    /// Wire the pipeline over the given store and collaborators.
    ///
    /// Documents get their labels detected in the background when a
    /// `labels` detector is given.
    pub fn new(
        config: ExtractorConfig,
        store: Arc<dyn CacheStore>,
        text: Arc<dyn TextExtractor>,
        semantic: Arc<dyn SemanticExtractor>,
        labels: Option<Arc<dyn LabelDetector>>,
    ) -> Self {
        let cache = Arc::new(ExtractionCache::new(store, &config));
        let extractor = Arc::new(SequentialExtractor::new(semantic, config.extraction.clone()));
        let mut processor = ItemProcessor::new(cache.clone(), text.clone(), extractor);
        if let Some(detector) = labels {
            processor = processor.with_label_detection(Arc::new(LabelDetectionService::new(
                detector,
                text,
                cache.clone(),
                config.labels.clone(),
            )));
        }
        let processor = Arc::new(processor);

        let history = config.history.enabled.then(|| {
            Arc::new(KvHistoryStore::new(
                cache.store().clone(),
                config.history.ttl(),
            ))
        });

        let mut orchestrator =
            BatchOrchestrator::new(processor.clone(), config.history.default_user_id.clone())
                .with_retention(config.batch.job_retention(), config.batch.max_retained_jobs);
        if let Some(ref history) = history {
            let sink: Arc<dyn HistorySink> = history.clone();
            orchestrator = orchestrator.with_history(sink);
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                cache,
                processor,
                orchestrator: Arc::new(orchestrator),
                history,
            }),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<ExtractionCache> {
        &self.inner.cache
    }

    pub fn processor(&self) -> &Arc<ItemProcessor> {
        &self.inner.processor
    }

    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator> {
        &self.inner.orchestrator
    }

    pub fn history(&self) -> Option<&Arc<KvHistoryStore>> {
        self.inner.history.as_ref()
    }
}
