// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The pipeline (scheduler/stage runner) depends on these, never on the
// concrete Gemini/RapidAPI clients, so tests inject mocks.
//
// Naming convention: Base* for trait names (e.g. BaseTranscription)

use async_trait::async_trait;
use thiserror::Error;

use crate::domains::processing::TaskDescriptor;

/// Failure modes shared by all artifact providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no credentials/configuration.
    #[error("provider not configured")]
    Unavailable,

    /// A configured provider call failed (network or remote-side error).
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The provider answered but produced no usable content.
    #[error("provider returned empty response")]
    EmptyResponse,
}

// =============================================================================
// Transcription Trait (Infrastructure - audio to text)
// =============================================================================

#[async_trait]
pub trait BaseTranscription: Send + Sync {
    /// Transcribe the audio object behind `audio_url` to plain text.
    async fn transcribe(&self, audio_url: &str) -> Result<String, ProviderError>;
}

// =============================================================================
// Text Generation Trait (Infrastructure - LLM over a transcript)
// =============================================================================

#[async_trait]
pub trait BaseTextGeneration: Send + Sync {
    /// Summarize `text` in at most `max_words` words.
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String, ProviderError>;

    /// Extract up to `max_points` key points, most important first.
    async fn extract_key_points(
        &self,
        text: &str,
        max_points: usize,
    ) -> Result<Vec<String>, ProviderError>;

    /// Extract task descriptors mentioned in `text`.
    ///
    /// An empty list is a valid success. Implementations must degrade
    /// malformed provider output to an empty list rather than erroring;
    /// parse problems never propagate into the pipeline.
    async fn extract_tasks(&self, text: &str) -> Result<Vec<TaskDescriptor>, ProviderError>;
}
