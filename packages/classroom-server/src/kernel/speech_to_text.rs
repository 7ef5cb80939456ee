// Speech-to-text via a RapidAPI transcription service
//
// Infrastructure implementation of BaseTranscription. Takes the URL of an
// already-uploaded audio object; the upload itself happens in the lecture
// routes, upstream of the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseTranscription, ProviderError};

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    url: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    transcript: String,
}

/// RapidAPI implementation of audio transcription
#[derive(Clone)]
pub struct RapidApiTranscriber {
    client: reqwest::Client,
    api_key: Option<String>,
    host: String,
}

impl RapidApiTranscriber {
    pub fn new(api_key: Option<String>, host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            host: host.into(),
        }
    }
}

#[async_trait]
impl BaseTranscription for RapidApiTranscriber {
    async fn transcribe(&self, audio_url: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unavailable)?;

        let url = format!("https://{}/transcribe", self.host);
        let request = TranscribeRequest {
            url: audio_url,
            language: "en-US",
        };

        tracing::debug!(audio_url = %audio_url, "calling transcription API");

        let response = self
            .client
            .post(&url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.host)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "transcription request failed");
            return Err(ProviderError::Remote(format!("HTTP {status}: {body}")));
        }

        let parsed: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Remote(format!("invalid response body: {e}")))?;

        if parsed.transcript.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        tracing::info!(length = parsed.transcript.len(), "transcription successful");

        Ok(parsed.transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_transcriber_is_unavailable() {
        let transcriber = RapidApiTranscriber::new(None, "example.p.rapidapi.com");
        let err = tokio_test::block_on(transcriber.transcribe("https://audio/a1")).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable));
    }
}
