//! Lecture processing pipeline.
//!
//! A background scheduler discovers lectures with uploaded audio and no
//! derived artifacts and drives each through a fixed stage sequence:
//!
//! ```text
//! Scheduler (every 5 minutes, or run_now from a route)
//!     │  claim lecture (conditional last_attempt_at write = single-flight gate)
//!     └─► StageRunner
//!             ├─► Transcribe        (hard dependency; failure aborts attempt)
//!             ├─► Summarize         (skip on failure)
//!             ├─► ExtractKeyPoints  (skip on failure)
//!             └─► ExtractTasks ──► TaskFanout (one task per descriptor × student)
//! ```
//!
//! Every stage persists its artifact immediately, so a crashed attempt
//! resumes where it left off once its claim goes stale.

pub mod descriptor;
pub mod error;
pub mod fanout;
pub mod scheduler;
pub mod stage_runner;
pub mod store;

#[cfg(test)]
mod tests;

pub use descriptor::TaskDescriptor;
pub use error::{ProcessingError, Stage};
pub use fanout::TaskFanout;
pub use scheduler::{CycleSummary, Scheduler, SchedulerConfig, SchedulerStatus, TriggerOutcome};
pub use stage_runner::{StageOutcome, StageRunner};
pub use store::{LectureStore, PgLectureStore};
