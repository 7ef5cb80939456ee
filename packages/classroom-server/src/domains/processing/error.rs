use thiserror::Error;
use uuid::Uuid;

use crate::kernel::ProviderError;

/// One step of the fixed stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcribe,
    Summarize,
    ExtractKeyPoints,
    ExtractTasks,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
            Stage::ExtractKeyPoints => "extract_key_points",
            Stage::ExtractTasks => "extract_tasks",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by the pipeline.
///
/// Only the transcribe stage is attempt-fatal; summarize, key-point and
/// task extraction failures are downgraded to skipped stages inside the
/// stage runner and never reach this type.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("lecture {0} not found")]
    NotFound(Uuid),

    #[error("lecture {0} has no audio to process")]
    NoAudio(Uuid),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        source: ProviderError,
    },

    /// A store write failed; the attempt is aborted and the lecture stays
    /// retry-eligible once its claim goes stale.
    #[error("persistence failed: {0}")]
    Store(#[from] anyhow::Error),
}

impl ProcessingError {
    /// The stage that failed, when the failure was stage-level.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            ProcessingError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
