use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    LectureStore, ProcessingError, Scheduler, SchedulerConfig, Stage, StageRunner, TriggerOutcome,
};
use crate::domains::lectures::Lecture;
use crate::domains::processing::TaskDescriptor;
use crate::domains::tasks::TaskPriority;
use crate::kernel::test_dependencies::{MockTextGeneration, MockTranscriber, TestDependencies};

fn lecture_with_audio(title: &str, created_at: DateTime<Utc>) -> Lecture {
    Lecture {
        id: Uuid::new_v4(),
        title: title.to_string(),
        subject: "CS".to_string(),
        teacher_id: Uuid::new_v4(),
        audio_url: Some(format!("https://storage/audio/{title}.mp3")),
        audio_duration: Some(3600),
        transcript: None,
        summary: None,
        key_points: None,
        is_processed: false,
        last_attempt_at: None,
        created_at,
        updated_at: created_at,
    }
}

fn descriptor(title: &str, priority: &str) -> TaskDescriptor {
    TaskDescriptor {
        title: title.to_string(),
        description: format!("{title} (from lecture)"),
        priority: priority.to_string(),
        due_date: None,
    }
}

fn scheduler_for(deps: &TestDependencies) -> Scheduler {
    scheduler_with_config(deps, SchedulerConfig::default())
}

fn scheduler_with_config(deps: &TestDependencies, config: SchedulerConfig) -> Scheduler {
    let runner = StageRunner::new(deps.to_deps());
    Scheduler::new(deps.store.clone(), runner, config)
}

#[tokio::test]
async fn processes_lecture_end_to_end() {
    let deps = TestDependencies::new()
        .mock_transcriber(MockTranscriber::new().with_response("hello world"))
        .mock_text_gen(
            MockTextGeneration::new()
                .with_summary("greeting")
                .with_key_points(vec!["greeting"])
                .with_tasks(vec![descriptor("Read ch.1", "high")]),
        );
    let alice = deps.store.add_student("Alice");
    let bob = deps.store.add_student("Bob");

    let lecture = lecture_with_audio("intro", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let outcome = scheduler.run_now(lecture.id).await.unwrap();

    let TriggerOutcome::Completed(outcome) = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert!(outcome.transcript_generated);
    assert!(outcome.summary_generated);
    assert!(outcome.key_points_generated);
    assert_eq!(outcome.tasks_created, 2);

    let stored = deps.store.get(lecture.id).unwrap();
    assert!(stored.is_processed);
    assert_eq!(stored.transcript.as_deref(), Some("hello world"));
    assert_eq!(stored.summary.as_deref(), Some("greeting"));
    assert_eq!(stored.key_points.as_deref(), Some("greeting"));

    let tasks = deps.store.tasks();
    assert_eq!(tasks.len(), 2);
    let mut assignees: Vec<Uuid> = tasks.iter().filter_map(|t| t.assigned_to_id).collect();
    assignees.sort();
    let mut expected = vec![alice.id, bob.id];
    expected.sort();
    assert_eq!(assignees, expected);
    for task in &tasks {
        assert_eq!(task.title, "Read ch.1");
        assert_eq!(task.priority, TaskPriority::High);
        assert!(task.is_ai_generated);
        assert_eq!(task.lecture_id, Some(lecture.id));
    }
}

#[tokio::test]
async fn second_trigger_is_a_no_op() {
    let deps = TestDependencies::new()
        .mock_text_gen(MockTextGeneration::new().with_tasks(vec![descriptor("Review", "low")]));
    deps.store.add_student("Alice");

    let lecture = lecture_with_audio("repeat", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    assert!(matches!(
        scheduler.run_now(lecture.id).await.unwrap(),
        TriggerOutcome::Completed(_)
    ));
    assert!(matches!(
        scheduler.run_now(lecture.id).await.unwrap(),
        TriggerOutcome::AlreadyProcessed
    ));

    // The second trigger must not touch any provider or create more tasks.
    assert_eq!(deps.transcriber.call_count(), 1);
    assert_eq!(deps.text_gen.summarize_call_count(), 1);
    assert_eq!(deps.store.tasks().len(), 1);
}

#[tokio::test]
async fn concurrent_triggers_share_one_attempt() {
    let deps = TestDependencies::new().mock_transcriber(
        MockTranscriber::new()
            .with_response("racy transcript")
            .with_delay(Duration::from_millis(50)),
    );

    let lecture = lecture_with_audio("race", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let (first, second) = tokio::join!(
        scheduler.run_now(lecture.id),
        scheduler.run_now(lecture.id),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let completed = [&first, &second]
        .iter()
        .filter(|o| matches!(o, TriggerOutcome::Completed(_)))
        .count();
    assert_eq!(completed, 1, "exactly one trigger may win the claim");
    assert!(
        [&first, &second].iter().any(|o| matches!(
            o,
            TriggerOutcome::InFlight | TriggerOutcome::AlreadyProcessed
        )),
        "the loser reports a no-op, not a failure"
    );

    assert_eq!(deps.transcriber.call_count(), 1);
    assert!(deps.store.get(lecture.id).unwrap().is_processed);
}

#[tokio::test]
async fn transcribe_failure_aborts_attempt() {
    let deps =
        TestDependencies::new().mock_transcriber(MockTranscriber::new().with_failure());

    let lecture = lecture_with_audio("broken-audio", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let err = scheduler.run_now(lecture.id).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(Stage::Transcribe));

    let stored = deps.store.get(lecture.id).unwrap();
    assert!(!stored.is_processed);
    assert!(stored.transcript.is_none());

    // Later stages never ran.
    assert_eq!(deps.text_gen.summarize_call_count(), 0);
    assert!(deps.store.tasks().is_empty());
}

#[tokio::test]
async fn partial_progress_survives_a_failed_attempt() {
    let deps = TestDependencies::new()
        .mock_transcriber(MockTranscriber::new().with_response("durable transcript"))
        .mock_text_gen(MockTextGeneration::new().with_summary("late summary"));
    deps.store.fail_summary_writes(true);

    let lecture = lecture_with_audio("crashy", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let err = scheduler.run_now(lecture.id).await.unwrap_err();
    assert!(matches!(err, ProcessingError::Store(_)));

    // The transcript was committed before the failure and survives it.
    let stored = deps.store.get(lecture.id).unwrap();
    assert!(!stored.is_processed);
    assert_eq!(stored.transcript.as_deref(), Some("durable transcript"));

    // Retry once the claim is released: the transcribe stage is skipped
    // because its artifact already exists.
    deps.store.fail_summary_writes(false);
    deps.store
        .release_stale(Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();

    let outcome = scheduler.run_now(lecture.id).await.unwrap();
    assert!(matches!(outcome, TriggerOutcome::Completed(_)));
    assert_eq!(deps.transcriber.call_count(), 1);

    let stored = deps.store.get(lecture.id).unwrap();
    assert!(stored.is_processed);
    assert_eq!(stored.summary.as_deref(), Some("late summary"));
}

#[tokio::test]
async fn skipped_stages_do_not_block_completion() {
    let deps = TestDependencies::new().mock_text_gen(
        MockTextGeneration::new()
            .failing_summarize()
            .failing_key_points()
            .failing_tasks(),
    );
    deps.store.add_student("Alice");

    let lecture = lecture_with_audio("flaky-providers", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let outcome = scheduler.run_now(lecture.id).await.unwrap();

    let TriggerOutcome::Completed(outcome) = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert!(outcome.transcript_generated);
    assert!(!outcome.summary_generated);
    assert!(!outcome.key_points_generated);
    assert_eq!(outcome.tasks_created, 0);

    let stored = deps.store.get(lecture.id).unwrap();
    assert!(stored.is_processed);
    assert!(stored.transcript.is_some());
    assert!(stored.summary.is_none());
    assert!(stored.key_points.is_none());
}

#[tokio::test]
async fn fan_out_creates_one_task_per_descriptor_and_student() {
    let deps = TestDependencies::new().mock_text_gen(MockTextGeneration::new().with_tasks(vec![
        descriptor("Read ch.1", "high"),
        descriptor("Solve problem set", "medium"),
        descriptor("Form project groups", "whenever"),
    ]));
    deps.store.add_student("Alice");
    deps.store.add_student("Bob");

    let lecture = lecture_with_audio("busy", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let outcome = scheduler.run_now(lecture.id).await.unwrap();

    let TriggerOutcome::Completed(outcome) = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(outcome.tasks_created, 6);

    let tasks = deps.store.tasks();
    assert_eq!(tasks.len(), 6);
    assert!(tasks.iter().all(|t| t.is_ai_generated));
    // Unrecognized priority degrades to medium.
    let medium = tasks
        .iter()
        .filter(|t| t.priority == TaskPriority::Medium)
        .count();
    assert_eq!(medium, 4);
}

#[tokio::test]
async fn fan_out_without_students_still_completes() {
    let deps = TestDependencies::new()
        .mock_text_gen(MockTextGeneration::new().with_tasks(vec![descriptor("Read", "high")]));

    let lecture = lecture_with_audio("empty-roster", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let outcome = scheduler.run_now(lecture.id).await.unwrap();

    let TriggerOutcome::Completed(outcome) = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(outcome.tasks_created, 0);
    assert!(deps.store.tasks().is_empty());
    assert!(deps.store.get(lecture.id).unwrap().is_processed);
}

#[tokio::test]
async fn empty_task_extraction_still_completes() {
    let deps = TestDependencies::new();
    deps.store.add_student("Alice");

    let lecture = lecture_with_audio("taskless", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let scheduler = scheduler_for(&deps);
    let outcome = scheduler.run_now(lecture.id).await.unwrap();

    let TriggerOutcome::Completed(outcome) = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(outcome.tasks_created, 0);
    assert!(deps.store.get(lecture.id).unwrap().is_processed);
}

#[tokio::test]
async fn trigger_rejects_missing_and_ineligible_lectures() {
    let deps = TestDependencies::new();
    let scheduler = scheduler_for(&deps);

    let missing = Uuid::new_v4();
    let err = scheduler.run_now(missing).await.unwrap_err();
    assert!(matches!(err, ProcessingError::NotFound(id) if id == missing));

    let mut no_audio = lecture_with_audio("silent", Utc::now());
    no_audio.audio_url = None;
    deps.store.insert_lecture(no_audio.clone());
    assert!(matches!(
        scheduler.run_now(no_audio.id).await.unwrap(),
        TriggerOutcome::NotEligible
    ));

    let mut done = lecture_with_audio("done", Utc::now());
    done.is_processed = true;
    deps.store.insert_lecture(done.clone());
    assert!(matches!(
        scheduler.run_now(done.id).await.unwrap(),
        TriggerOutcome::AlreadyProcessed
    ));

    assert_eq!(deps.transcriber.call_count(), 0);
}

#[tokio::test]
async fn cycle_skips_recent_attempts_and_reclaims_stale_ones() {
    let deps = TestDependencies::new();

    let mut stale = lecture_with_audio("stale-attempt", Utc::now() - chrono::Duration::hours(3));
    stale.last_attempt_at = Some(Utc::now() - chrono::Duration::hours(2));
    deps.store.insert_lecture(stale.clone());

    let mut recent = lecture_with_audio("in-flight", Utc::now());
    recent.last_attempt_at = Some(Utc::now() - chrono::Duration::minutes(5));
    deps.store.insert_lecture(recent.clone());

    let scheduler = scheduler_for(&deps);
    let summary = scheduler.run_cycle().await.unwrap();

    // Only the stale attempt is past the one-hour window.
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert!(deps.store.get(stale.id).unwrap().is_processed);
    assert!(!deps.store.get(recent.id).unwrap().is_processed);
}

#[tokio::test]
async fn cycle_isolates_per_lecture_failures() {
    let deps = TestDependencies::new().mock_transcriber(
        MockTranscriber::new()
            .with_failure()
            .with_response("second lecture transcript"),
    );

    let first = lecture_with_audio("fails", Utc::now() - chrono::Duration::minutes(10));
    let second = lecture_with_audio("succeeds", Utc::now());
    deps.store.insert_lecture(first.clone());
    deps.store.insert_lecture(second.clone());

    let scheduler = scheduler_for(&deps);
    let summary = scheduler.run_cycle().await.unwrap();

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert!(!deps.store.get(first.id).unwrap().is_processed);
    assert!(deps.store.get(second.id).unwrap().is_processed);
}

#[tokio::test]
async fn reclaim_stale_releases_old_claims() {
    let deps = TestDependencies::new();

    let mut stalled = lecture_with_audio("stalled", Utc::now() - chrono::Duration::hours(3));
    stalled.last_attempt_at = Some(Utc::now() - chrono::Duration::hours(2));
    deps.store.insert_lecture(stalled.clone());

    let scheduler = scheduler_for(&deps);
    let reclaimed = scheduler.reclaim_stale().await.unwrap();
    assert_eq!(reclaimed, 1);
    assert!(deps.store.get(stalled.id).unwrap().last_attempt_at.is_none());

    // Nothing left to reclaim on a second pass.
    assert_eq!(scheduler.reclaim_stale().await.unwrap(), 0);
}

#[tokio::test]
async fn background_loop_processes_and_stops_cleanly() {
    let deps = TestDependencies::new();
    let lecture = lecture_with_audio("looped", Utc::now());
    deps.store.insert_lecture(lecture.clone());

    let config = SchedulerConfig {
        poll_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let scheduler = scheduler_with_config(&deps, config);

    scheduler.start().await;
    assert!(scheduler.is_running());

    // Starting again is a warned no-op, not a second loop.
    scheduler.start().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.stop().await;
    assert!(!scheduler.is_running());

    assert!(deps.store.get(lecture.id).unwrap().is_processed);

    let status = scheduler.status().await.unwrap();
    assert!(!status.running);
    assert_eq!(status.total_lectures, 1);
    assert_eq!(status.processed_lectures, 1);
    assert_eq!(status.unprocessed_with_audio, 0);
}
