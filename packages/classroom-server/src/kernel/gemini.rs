// Text generation via Google Gemini
//
// Infrastructure implementation of BaseTextGeneration. Prompts are owned
// here because they are provider-shaped (Gemini is asked for raw JSON and
// habitually wraps it in markdown code fences, which we strip).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseTextGeneration, ProviderError};
use crate::domains::processing::TaskDescriptor;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Gemini implementation of text-generation capabilities
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by integration tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, prompt: &str, max_output_tokens: i32) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unavailable)?;

        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens,
            },
        };

        tracing::debug!(
            prompt_length = prompt.len(),
            model = %self.model,
            "calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Gemini API request failed");
            return Err(ProviderError::Remote(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Remote(format!("invalid response body: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(ProviderError::EmptyResponse)?;

        tracing::debug!(response_length = text.len(), "Gemini API response received");

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl BaseTextGeneration for GeminiClient {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String, ProviderError> {
        let prompt = format!(
            "Please provide a concise summary of the following lecture transcript \
             in no more than {max_words} words. Focus on the main points and key \
             concepts. Make it clear and easy to understand.\n\n\
             Lecture Transcript: {text}"
        );

        self.generate(&prompt, 1024).await
    }

    async fn extract_key_points(
        &self,
        text: &str,
        max_points: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let prompt = format!(
            "Extract the {max_points} most important key points from the following \
             lecture transcript. Return them as a JSON array of strings, each point \
             concise and clear.\n\n\
             Lecture Transcript: {text}\n\n\
             Return only the JSON array, no additional text."
        );

        let raw = self.generate(&prompt, 1024).await?;
        Ok(parse_key_points(&raw))
    }

    async fn extract_tasks(&self, text: &str) -> Result<Vec<TaskDescriptor>, ProviderError> {
        let prompt = format!(
            "Analyze the following lecture transcript and extract any tasks, \
             assignments, or action items mentioned.\n\n\
             For each task found, provide:\n\
             - title: a clear, concise title for the task\n\
             - description: a detailed description of what needs to be done\n\
             - priority: one of \"high\", \"medium\", or \"low\"\n\
             - due_date: the due date in ISO format if mentioned, otherwise null\n\n\
             Return the results as a JSON array of objects with these fields.\n\
             If no tasks are found, return an empty array.\n\n\
             Lecture Transcript: {text}\n\n\
             Return only the JSON array, no additional text."
        );

        let raw = self.generate(&prompt, 2048).await?;
        Ok(parse_task_descriptors(&raw))
    }
}

/// Strip a markdown code fence (``` or ```json) wrapped around `raw`.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a JSON array of key points, falling back to one point per line
/// when the model ignored the JSON instruction.
fn parse_key_points(raw: &str) -> Vec<String> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(points) => points,
        Err(_) => {
            let points: Vec<String> = cleaned
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            tracing::info!(count = points.len(), "extracted key points via line fallback");
            points
        }
    }
}

/// Parse a JSON array of task descriptors.
///
/// Malformed output degrades to an empty list; a parse error must never
/// fail the processing attempt.
fn parse_task_descriptors(raw: &str) -> Vec<TaskDescriptor> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Vec<TaskDescriptor>>(cleaned) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, "task extraction returned unparsable JSON, treating as no tasks");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        assert_eq!(strip_code_fence("```json\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fence("```\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fence("  [\"a\"]  "), "[\"a\"]");
    }

    #[test]
    fn key_points_parse_json_array() {
        let points = parse_key_points("```json\n[\"one\", \"two\"]\n```");
        assert_eq!(points, vec!["one", "two"]);
    }

    #[test]
    fn key_points_fall_back_to_lines() {
        let points = parse_key_points("first point\n\nsecond point\n");
        assert_eq!(points, vec!["first point", "second point"]);
    }

    #[test]
    fn task_descriptors_parse() {
        let raw = r#"[{"title":"Read ch.1","description":"Read it","priority":"high","due_date":null}]"#;
        let tasks = parse_task_descriptors(raw);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Read ch.1");
        assert_eq!(tasks[0].priority, "high");
        assert!(tasks[0].due_date.is_none());
    }

    #[test]
    fn malformed_task_json_degrades_to_empty() {
        assert!(parse_task_descriptors("The lecture mentions no tasks.").is_empty());
    }

    #[test]
    fn unconfigured_client_is_unavailable() {
        let client = GeminiClient::new(None);
        let err = tokio_test::block_on(client.summarize("text", 100)).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable));
    }
}
