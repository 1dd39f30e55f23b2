//! Factory for building the application state from configuration.

use std::sync::Arc;
use std::time::Duration;

use docex_client::{LabelDetectClient, SmartExtractClient, TextExtractionClient};
use docex_core::config::ExtractorConfig;
use docex_core::error::DocexResult;
use docex_core::traits::LabelDetector;
use docex_stores::CacheStoreFactory;
use tracing::info;

use crate::state::AppState;

/// Connect the cache store and service clients named by `config`.
pub async fn create_state(config: ExtractorConfig) -> DocexResult<AppState> {
    let store = CacheStoreFactory::create(&config.store).await?;
    info!(backend = store.name(), "Cache store ready");

    let timeout = config.services.timeout_secs.map(Duration::from_secs);
    let text = TextExtractionClient::with_timeout(&config.services.text_extraction_url, timeout)?;
    let semantic = SmartExtractClient::with_timeout(&config.services.semantic_url, timeout)?;
    info!(
        text_extraction = text.base_url(),
        semantic = semantic.base_url(),
        "Service clients configured"
    );

    let labels: Option<Arc<dyn LabelDetector>> = if config.labels.enabled {
        let client =
            LabelDetectClient::with_timeout(&config.services.label_detection_url, timeout)?;
        info!(label_detection = client.base_url(), "Label detection enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    Ok(AppState::new(
        config,
        store,
        Arc::new(text),
        Arc::new(semantic),
        labels,
    ))
}
