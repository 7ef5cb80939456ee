//! Pipeline dependencies (using traits for testability)
//!
//! Central dependency container for the lecture processing pipeline. All
//! external services sit behind trait objects so tests can inject mocks.

use std::sync::Arc;

use crate::config::Config;
use crate::domains::processing::LectureStore;
use crate::kernel::{BaseTextGeneration, BaseTranscription, GeminiClient, RapidApiTranscriber};

/// Dependencies consumed by the stage runner and scheduler
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn LectureStore>,
    pub transcriber: Arc<dyn BaseTranscription>,
    pub text_gen: Arc<dyn BaseTextGeneration>,
}

impl PipelineDeps {
    pub fn new(
        store: Arc<dyn LectureStore>,
        transcriber: Arc<dyn BaseTranscription>,
        text_gen: Arc<dyn BaseTextGeneration>,
    ) -> Self {
        Self {
            store,
            transcriber,
            text_gen,
        }
    }

    /// Wire up the production providers from configuration.
    ///
    /// Providers with missing credentials are still constructed; they report
    /// `ProviderError::Unavailable` per call and the affected stages are
    /// skipped.
    pub fn from_config(store: Arc<dyn LectureStore>, config: &Config) -> Self {
        let transcriber = Arc::new(RapidApiTranscriber::new(
            config.rapidapi_key.clone(),
            config.rapidapi_host.clone(),
        ));
        let text_gen = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));

        Self::new(store, transcriber, text_gen)
    }
}
