//! Background scheduler for the lecture processing pipeline.
//!
//! One explicitly constructed instance owns the polling loop; the route
//! layer receives a clone through `AppState`. There is no process-global
//! state: tests build a scheduler around mocks and drive cycles directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{LectureStore, ProcessingError, StageOutcome, StageRunner};
use crate::domains::lectures::Lecture;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the polling loop runs a cycle.
    pub poll_interval: Duration,
    /// Maximum lectures processed per cycle.
    pub batch_size: i64,
    /// Age after which an unfinished attempt is presumed crashed and the
    /// lecture becomes claimable again.
    pub staleness_window: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            batch_size: 5,
            staleness_window: chrono::Duration::hours(1),
        }
    }
}

/// Result of an on-demand trigger.
///
/// `InFlight` is the single-flight loser's no-op: another attempt holds the
/// claim right now. Callers must not infer failure from it.
#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(StageOutcome),
    AlreadyProcessed,
    NotEligible,
    InFlight,
}

/// What one polling cycle did.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleSummary {
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub tasks_created: u64,
}

/// Read-only diagnostic snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub total_lectures: i64,
    pub processed_lectures: i64,
    pub unprocessed_with_audio: i64,
    pub poll_interval_secs: u64,
}

struct LoopHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct SchedulerInner {
    store: Arc<dyn LectureStore>,
    runner: StageRunner,
    config: SchedulerConfig,
    running: AtomicBool,
    loop_handle: tokio::sync::Mutex<Option<LoopHandle>>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn LectureStore>, runner: StageRunner, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                runner,
                config,
                running: AtomicBool::new(false),
                loop_handle: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Start the periodic loop. Starting an already-running scheduler is a
    /// warned no-op.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("processing scheduler is already running");
            return;
        }

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.poll_interval);

            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        match inner.run_cycle().await {
                            Ok(summary) if summary.selected > 0 => {
                                info!(
                                    selected = summary.selected,
                                    processed = summary.processed,
                                    failed = summary.failed,
                                    tasks_created = summary.tasks_created,
                                    "processing cycle finished"
                                );
                            }
                            Ok(_) => debug!("no unprocessed lectures found"),
                            Err(e) => error!(error = %e, "processing cycle failed"),
                        }
                    }
                }
            }
        });

        *self.inner.loop_handle.lock().await = Some(LoopHandle { cancel, handle });

        info!(
            interval_secs = self.inner.config.poll_interval.as_secs(),
            batch_size = self.inner.config.batch_size,
            "processing scheduler started"
        );
    }

    /// Stop the periodic loop.
    ///
    /// Cancellation is observed between cycles, so an in-progress lecture
    /// finishes its attempt before this returns; no stage is aborted
    /// midway.
    pub async fn stop(&self) {
        let Some(LoopHandle { cancel, handle }) = self.inner.loop_handle.lock().await.take() else {
            self.inner.running.store(false, Ordering::SeqCst);
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            error!(error = %e, "processing loop task panicked");
        }

        self.inner.running.store(false, Ordering::SeqCst);
        info!("processing scheduler stopped");
    }

    /// Run one selection/processing cycle (also called by the loop).
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        self.inner.run_cycle().await
    }

    /// Synchronous, on-demand processing of one lecture, sharing the same
    /// claim gate as the polling loop.
    pub async fn run_now(&self, lecture_id: Uuid) -> Result<TriggerOutcome, ProcessingError> {
        self.inner.run_now(lecture_id).await
    }

    /// Re-admit lectures whose attempt stalled past the staleness window.
    pub async fn reclaim_stale(&self) -> Result<u64> {
        let stale_before = Utc::now() - self.inner.config.staleness_window;
        let reclaimed = self.inner.store.release_stale(stale_before).await?;

        if reclaimed > 0 {
            info!(reclaimed, "re-admitted stale processing attempts");
        }

        Ok(reclaimed)
    }

    /// Read-only diagnostic; not part of the processing contract.
    pub async fn status(&self) -> Result<SchedulerStatus> {
        let counts = self.inner.store.lecture_counts().await?;

        Ok(SchedulerStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            total_lectures: counts.total,
            processed_lectures: counts.processed,
            unprocessed_with_audio: counts.unprocessed_with_audio,
            poll_interval_secs: self.inner.config.poll_interval.as_secs(),
        })
    }

    /// Read-only diagnostic listing of unprocessed lectures with audio.
    pub async fn list_unprocessed(&self) -> Result<Vec<Lecture>> {
        self.inner.store.find_unprocessed().await
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

impl SchedulerInner {
    async fn run_cycle(&self) -> Result<CycleSummary> {
        let stale_before = Utc::now() - self.config.staleness_window;
        let candidates = self
            .store
            .find_candidates(self.config.batch_size, stale_before)
            .await?;

        let mut summary = CycleSummary {
            selected: candidates.len(),
            ..Default::default()
        };

        for lecture in candidates {
            // The claim may fail if an on-demand trigger got there first;
            // that is the gate doing its job, not an error.
            let claimed = match self.store.claim_for_processing(lecture.id, stale_before).await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    debug!(lecture_id = %lecture.id, "lecture claimed elsewhere, skipping");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(lecture_id = %lecture.id, error = %e, "failed to claim lecture");
                    summary.failed += 1;
                    continue;
                }
            };

            // Failures are isolated per lecture; the batch always continues.
            match self.runner.run(&claimed).await {
                Ok(outcome) => {
                    summary.processed += 1;
                    summary.tasks_created += outcome.tasks_created;
                }
                Err(e) => {
                    error!(lecture_id = %lecture.id, error = %e, "failed to process lecture");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn run_now(&self, lecture_id: Uuid) -> Result<TriggerOutcome, ProcessingError> {
        let lecture = self
            .store
            .find_by_id(lecture_id)
            .await?
            .ok_or(ProcessingError::NotFound(lecture_id))?;

        if lecture.is_processed {
            return Ok(TriggerOutcome::AlreadyProcessed);
        }
        if lecture.audio_url.is_none() {
            return Ok(TriggerOutcome::NotEligible);
        }

        // The pre-checks above are advisory; the claim re-validates
        // everything atomically.
        let stale_before = Utc::now() - self.config.staleness_window;
        match self.store.claim_for_processing(lecture_id, stale_before).await? {
            Some(claimed) => {
                let outcome = self.runner.run(&claimed).await?;
                Ok(TriggerOutcome::Completed(outcome))
            }
            None => {
                // Lost the race: either a concurrent attempt finished the
                // lecture or it still holds the claim.
                let current = self.store.find_by_id(lecture_id).await?;
                if current.is_some_and(|l| l.is_processed) {
                    Ok(TriggerOutcome::AlreadyProcessed)
                } else {
                    Ok(TriggerOutcome::InFlight)
                }
            }
        }
    }
}
