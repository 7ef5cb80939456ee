use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{LectureStore, ProcessingError, Stage, TaskFanout};
use crate::domains::lectures::Lecture;
use crate::kernel::{BaseTextGeneration, BaseTranscription, PipelineDeps, ProviderError};

const MAX_SUMMARY_WORDS: usize = 500;
const MAX_KEY_POINTS: usize = 10;

/// What a processing attempt produced.
///
/// Flags report whether the artifact exists after the run, so a retry that
/// reuses a transcript from an earlier partial attempt still reports
/// `transcript_generated = true`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageOutcome {
    pub transcript_generated: bool,
    pub summary_generated: bool,
    pub key_points_generated: bool,
    pub tasks_created: u64,
}

/// Runs the ordered stage sequence for exactly one lecture.
///
/// This is the single pipeline implementation; the background loop and the
/// immediate-trigger route are both thin adapters over it. Each stage
/// persists its artifact before the next starts, so a crash after stage k
/// never redoes stages 1..k. Callers must hold the scheduler's claim.
pub struct StageRunner {
    store: Arc<dyn LectureStore>,
    transcriber: Arc<dyn BaseTranscription>,
    text_gen: Arc<dyn BaseTextGeneration>,
    fanout: TaskFanout,
}

impl StageRunner {
    pub fn new(deps: PipelineDeps) -> Self {
        let fanout = TaskFanout::new(deps.store.clone());
        Self {
            store: deps.store,
            transcriber: deps.transcriber,
            text_gen: deps.text_gen,
            fanout,
        }
    }

    pub async fn run(&self, lecture: &Lecture) -> Result<StageOutcome, ProcessingError> {
        // Defensive re-check; the scheduler gates before invoking us, but
        // re-running on a processed lecture must stay a safe no-op.
        if lecture.is_processed {
            debug!(lecture_id = %lecture.id, "lecture already processed, nothing to do");
            return Ok(StageOutcome {
                transcript_generated: has_content(&lecture.transcript),
                summary_generated: has_content(&lecture.summary),
                key_points_generated: has_content(&lecture.key_points),
                tasks_created: 0,
            });
        }

        info!(lecture_id = %lecture.id, title = %lecture.title, "processing lecture");

        // Stage 1: Transcribe. Hard dependency for everything after it;
        // failure or empty output fails the whole attempt.
        let transcript = self.transcribe(lecture).await?;

        // Stage 2: Summarize. Skipped on failure; stages 3-4 only need the
        // transcript.
        let summary_generated = self.summarize(lecture, &transcript).await?;

        // Stage 3: Key points, persisted as one joined text field.
        let key_points_generated = self.extract_key_points(lecture, &transcript).await?;

        // Stage 4: Task extraction and fan-out.
        let tasks_created = self.extract_tasks(lecture, &transcript).await?;

        // Terminal, idempotent marker.
        self.store.mark_processed(lecture.id).await?;

        info!(
            lecture_id = %lecture.id,
            summary_generated,
            key_points_generated,
            tasks_created,
            "lecture processed"
        );

        Ok(StageOutcome {
            transcript_generated: true,
            summary_generated,
            key_points_generated,
            tasks_created,
        })
    }

    async fn transcribe(&self, lecture: &Lecture) -> Result<String, ProcessingError> {
        // A transcript surviving from a crashed attempt is reused; the
        // provider is not called again.
        if let Some(existing) = lecture.transcript.as_deref() {
            if !existing.trim().is_empty() {
                debug!(lecture_id = %lecture.id, "reusing transcript from earlier attempt");
                return Ok(existing.to_string());
            }
        }

        let audio_url = lecture
            .audio_url
            .as_deref()
            .ok_or(ProcessingError::NoAudio(lecture.id))?;

        let transcript = self
            .transcriber
            .transcribe(audio_url)
            .await
            .map_err(|source| ProcessingError::Stage {
                stage: Stage::Transcribe,
                source,
            })?;

        if transcript.trim().is_empty() {
            return Err(ProcessingError::Stage {
                stage: Stage::Transcribe,
                source: ProviderError::EmptyResponse,
            });
        }

        self.store.set_transcript(lecture.id, &transcript).await?;

        Ok(transcript)
    }

    async fn summarize(
        &self,
        lecture: &Lecture,
        transcript: &str,
    ) -> Result<bool, ProcessingError> {
        if has_content(&lecture.summary) {
            return Ok(true);
        }

        match self.text_gen.summarize(transcript, MAX_SUMMARY_WORDS).await {
            Ok(summary) if !summary.trim().is_empty() => {
                self.store.set_summary(lecture.id, summary.trim()).await?;
                Ok(true)
            }
            Ok(_) => {
                warn!(lecture_id = %lecture.id, "summarization returned no content");
                Ok(false)
            }
            Err(e) => {
                warn!(lecture_id = %lecture.id, error = %e, "summarize stage skipped");
                Ok(false)
            }
        }
    }

    async fn extract_key_points(
        &self,
        lecture: &Lecture,
        transcript: &str,
    ) -> Result<bool, ProcessingError> {
        if has_content(&lecture.key_points) {
            return Ok(true);
        }

        match self
            .text_gen
            .extract_key_points(transcript, MAX_KEY_POINTS)
            .await
        {
            Ok(points) if !points.is_empty() => {
                self.store
                    .set_key_points(lecture.id, &points.join(", "))
                    .await?;
                Ok(true)
            }
            Ok(_) => {
                warn!(lecture_id = %lecture.id, "no key points extracted");
                Ok(false)
            }
            Err(e) => {
                warn!(lecture_id = %lecture.id, error = %e, "key-point stage skipped");
                Ok(false)
            }
        }
    }

    async fn extract_tasks(
        &self,
        lecture: &Lecture,
        transcript: &str,
    ) -> Result<u64, ProcessingError> {
        match self.text_gen.extract_tasks(transcript).await {
            // An empty descriptor list is a valid result, not a failure.
            Ok(descriptors) => Ok(self.fanout.fan_out(lecture.id, &descriptors).await?),
            Err(e) => {
                warn!(lecture_id = %lecture.id, error = %e, "task extraction stage skipped");
                Ok(0)
            }
        }
    }
}

fn has_content(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}
