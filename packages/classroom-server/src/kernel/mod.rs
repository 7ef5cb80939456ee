// Infrastructure layer: provider clients and their trait seams.
//
// Business logic (what to do with a transcript) lives in domains/processing;
// this module only knows how to talk to the outside world.

pub mod deps;
pub mod gemini;
pub mod speech_to_text;
pub mod test_dependencies;
pub mod traits;

pub use deps::PipelineDeps;
pub use gemini::GeminiClient;
pub use speech_to_text::RapidApiTranscriber;
pub use traits::{BaseTextGeneration, BaseTranscription, ProviderError};
