use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Gemini key for summarization / key points / task extraction.
    /// Absent key means the text-generation stages are skipped.
    pub gemini_api_key: Option<String>,
    /// RapidAPI key for speech-to-text. Absent key means lectures cannot
    /// be transcribed and stay unprocessed.
    pub rapidapi_key: Option<String>,
    pub rapidapi_host: String,
    pub processing_interval_secs: u64,
    pub processing_batch_size: i64,
    pub staleness_window_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            rapidapi_key: env::var("RAPIDAPI_KEY").ok(),
            rapidapi_host: env::var("RAPIDAPI_HOST")
                .unwrap_or_else(|_| "speech-to-text-api.p.rapidapi.com".to_string()),
            processing_interval_secs: env::var("PROCESSING_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("PROCESSING_INTERVAL_SECS must be a valid number")?,
            processing_batch_size: env::var("PROCESSING_BATCH_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("PROCESSING_BATCH_SIZE must be a valid number")?,
            staleness_window_secs: env::var("PROCESSING_STALENESS_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("PROCESSING_STALENESS_SECS must be a valid number")?,
        })
    }
}
