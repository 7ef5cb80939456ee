// Classroom Assistant - API Core
//
// Backend for lecture capture and AI-derived study artifacts. The heart of
// the crate is the lecture processing pipeline in domains/processing:
// a background scheduler drives uploaded lecture audio through
// transcription, summarization, key-point extraction and task extraction,
// then fans extracted tasks out to students.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
