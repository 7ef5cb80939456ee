// TestDependencies - mock implementations for testing
//
// Provides mock providers and an in-memory lecture store that can be
// injected into the pipeline for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BaseTextGeneration, BaseTranscription, PipelineDeps, ProviderError};
use crate::domains::lectures::{Lecture, LectureCounts};
use crate::domains::processing::{LectureStore, TaskDescriptor};
use crate::domains::tasks::{NewTask, Task, TaskStatus};
use crate::domains::users::{User, UserRole};

// =============================================================================
// Mock Transcription
// =============================================================================

pub struct MockTranscriber {
    responses: Arc<Mutex<Vec<Result<String, ProviderError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Queue a successful transcription response
    pub fn with_response(self, transcript: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(Ok(transcript.into()));
        self
    }

    /// Queue a remote failure
    pub fn with_failure(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(Err(ProviderError::Remote("mock transcription failure".to_string())));
        self
    }

    /// Hold each call for `delay` (to widen race windows in tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all audio URLs that were transcribed
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTranscription for MockTranscriber {
    async fn transcribe(&self, audio_url: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(audio_url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        // Queued responses apply in call order; an empty queue falls back
        // to a fixed transcript.
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("Mock transcript".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// =============================================================================
// Mock Text Generation
// =============================================================================

pub struct MockTextGeneration {
    summary: Arc<Mutex<String>>,
    key_points: Arc<Mutex<Vec<String>>>,
    tasks: Arc<Mutex<Vec<TaskDescriptor>>>,
    fail_summarize: AtomicBool,
    fail_key_points: AtomicBool,
    fail_tasks: AtomicBool,
    summarize_calls: Arc<Mutex<Vec<String>>>,
    key_point_calls: Arc<Mutex<Vec<String>>>,
    task_calls: Arc<Mutex<Vec<String>>>,
}

impl MockTextGeneration {
    pub fn new() -> Self {
        Self {
            summary: Arc::new(Mutex::new("Mock summary".to_string())),
            key_points: Arc::new(Mutex::new(vec!["Mock key point".to_string()])),
            tasks: Arc::new(Mutex::new(Vec::new())),
            fail_summarize: AtomicBool::new(false),
            fail_key_points: AtomicBool::new(false),
            fail_tasks: AtomicBool::new(false),
            summarize_calls: Arc::new(Mutex::new(Vec::new())),
            key_point_calls: Arc::new(Mutex::new(Vec::new())),
            task_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        *self.summary.lock().unwrap() = summary.into();
        self
    }

    pub fn with_key_points(self, points: Vec<&str>) -> Self {
        *self.key_points.lock().unwrap() = points.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_tasks(self, tasks: Vec<TaskDescriptor>) -> Self {
        *self.tasks.lock().unwrap() = tasks;
        self
    }

    pub fn failing_summarize(self) -> Self {
        self.fail_summarize.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_key_points(self) -> Self {
        self.fail_key_points.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_tasks(self) -> Self {
        self.fail_tasks.store(true, Ordering::SeqCst);
        self
    }

    pub fn summarize_call_count(&self) -> usize {
        self.summarize_calls.lock().unwrap().len()
    }

    pub fn key_point_call_count(&self) -> usize {
        self.key_point_calls.lock().unwrap().len()
    }

    pub fn task_call_count(&self) -> usize {
        self.task_calls.lock().unwrap().len()
    }
}

impl Default for MockTextGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTextGeneration for MockTextGeneration {
    async fn summarize(&self, text: &str, _max_words: usize) -> Result<String, ProviderError> {
        self.summarize_calls.lock().unwrap().push(text.to_string());

        if self.fail_summarize.load(Ordering::SeqCst) {
            return Err(ProviderError::Remote("mock summarize failure".to_string()));
        }
        Ok(self.summary.lock().unwrap().clone())
    }

    async fn extract_key_points(
        &self,
        text: &str,
        _max_points: usize,
    ) -> Result<Vec<String>, ProviderError> {
        self.key_point_calls.lock().unwrap().push(text.to_string());

        if self.fail_key_points.load(Ordering::SeqCst) {
            return Err(ProviderError::Remote("mock key-point failure".to_string()));
        }
        Ok(self.key_points.lock().unwrap().clone())
    }

    async fn extract_tasks(&self, text: &str) -> Result<Vec<TaskDescriptor>, ProviderError> {
        self.task_calls.lock().unwrap().push(text.to_string());

        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(ProviderError::Remote("mock task-extraction failure".to_string()));
        }
        Ok(self.tasks.lock().unwrap().clone())
    }
}

// =============================================================================
// In-memory LectureStore
// =============================================================================

#[derive(Default)]
struct StoreState {
    lectures: Vec<Lecture>,
    tasks: Vec<Task>,
    users: Vec<User>,
}

/// In-memory store with the same gate semantics as the Postgres store:
/// the claim check-and-write happens under one mutex guard.
pub struct InMemoryLectureStore {
    state: Mutex<StoreState>,
    fail_summary_writes: AtomicBool,
}

impl InMemoryLectureStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            fail_summary_writes: AtomicBool::new(false),
        }
    }

    pub fn insert_lecture(&self, lecture: Lecture) {
        self.state.lock().unwrap().lectures.push(lecture);
    }

    pub fn add_student(&self, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@school.test", name.to_lowercase()),
            name: name.to_string(),
            role: UserRole::Student,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<Lecture> {
        self.state
            .lock()
            .unwrap()
            .lectures
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    /// Make the next summary writes fail (persistence-error injection)
    pub fn fail_summary_writes(&self, fail: bool) {
        self.fail_summary_writes.store(fail, Ordering::SeqCst);
    }

    fn update<F>(&self, id: Uuid, f: F) -> Result<()>
    where
        F: FnOnce(&mut Lecture),
    {
        let mut state = self.state.lock().unwrap();
        let lecture = state
            .lectures
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| anyhow!("lecture {} not found", id))?;
        f(lecture);
        lecture.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for InMemoryLectureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LectureStore for InMemoryLectureStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lecture>> {
        Ok(self.get(id))
    }

    async fn find_candidates(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<Lecture>> {
        let state = self.state.lock().unwrap();
        let mut candidates: Vec<Lecture> = state
            .lectures
            .iter()
            .filter(|l| {
                l.is_eligible() && l.last_attempt_at.map_or(true, |at| at < stale_before)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|l| l.created_at);
        candidates.truncate(limit as usize);
        Ok(candidates)
    }

    async fn claim_for_processing(
        &self,
        id: Uuid,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<Lecture>> {
        let mut state = self.state.lock().unwrap();
        let Some(lecture) = state.lectures.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };

        let claimable =
            lecture.is_eligible() && lecture.last_attempt_at.map_or(true, |at| at < stale_before);
        if !claimable {
            return Ok(None);
        }

        lecture.last_attempt_at = Some(Utc::now());
        lecture.updated_at = Utc::now();
        Ok(Some(lecture.clone()))
    }

    async fn release_stale(&self, stale_before: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let mut released = 0u64;
        for lecture in state.lectures.iter_mut() {
            if !lecture.is_processed
                && lecture.last_attempt_at.is_some_and(|at| at < stale_before)
            {
                lecture.last_attempt_at = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()> {
        self.update(id, |l| l.transcript = Some(transcript.to_string()))
    }

    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        if self.fail_summary_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("mock summary write failure"));
        }
        self.update(id, |l| l.summary = Some(summary.to_string()))
    }

    async fn set_key_points(&self, id: Uuid, key_points: &str) -> Result<()> {
        self.update(id, |l| l.key_points = Some(key_points.to_string()))
    }

    async fn mark_processed(&self, id: Uuid) -> Result<()> {
        self.update(id, |l| l.is_processed = true)
    }

    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        for task in tasks {
            state.tasks.push(Task {
                id: Uuid::new_v4(),
                title: task.title.clone(),
                description: task.description.clone(),
                lecture_id: Some(task.lecture_id),
                assigned_to_id: Some(task.assigned_to_id),
                status: TaskStatus::Pending,
                priority: task.priority,
                due_date: task.due_date,
                is_ai_generated: task.is_ai_generated,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        }
        Ok(tasks.len() as u64)
    }

    async fn find_students(&self) -> Result<Vec<User>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| u.role == UserRole::Student)
            .cloned()
            .collect())
    }

    async fn lecture_counts(&self) -> Result<LectureCounts> {
        let state = self.state.lock().unwrap();
        Ok(LectureCounts {
            total: state.lectures.len() as i64,
            processed: state.lectures.iter().filter(|l| l.is_processed).count() as i64,
            unprocessed_with_audio: state.lectures.iter().filter(|l| l.is_eligible()).count()
                as i64,
        })
    }

    async fn find_unprocessed(&self) -> Result<Vec<Lecture>> {
        let state = self.state.lock().unwrap();
        let mut lectures: Vec<Lecture> = state
            .lectures
            .iter()
            .filter(|l| l.is_eligible())
            .cloned()
            .collect();
        lectures.sort_by_key(|l| l.created_at);
        Ok(lectures)
    }
}

// =============================================================================
// TestDependencies - builder for pipeline test wiring
// =============================================================================

pub struct TestDependencies {
    pub store: Arc<InMemoryLectureStore>,
    pub transcriber: Arc<MockTranscriber>,
    pub text_gen: Arc<MockTextGeneration>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryLectureStore::new()),
            transcriber: Arc::new(MockTranscriber::new()),
            text_gen: Arc::new(MockTextGeneration::new()),
        }
    }

    pub fn mock_transcriber(mut self, transcriber: MockTranscriber) -> Self {
        self.transcriber = Arc::new(transcriber);
        self
    }

    pub fn mock_text_gen(mut self, text_gen: MockTextGeneration) -> Self {
        self.text_gen = Arc::new(text_gen);
        self
    }

    /// Wire the mocks into a PipelineDeps container
    pub fn to_deps(&self) -> PipelineDeps {
        PipelineDeps::new(
            self.store.clone(),
            self.transcriber.clone(),
            self.text_gen.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
