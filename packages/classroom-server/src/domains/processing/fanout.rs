use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use super::{LectureStore, TaskDescriptor};
use crate::domains::tasks::NewTask;

/// Materializes extracted task descriptors as persisted task rows.
///
/// Recipients are all student-role users at fan-out time (live query):
/// D descriptors and S students yield exactly D*S tasks. No enrollment
/// model exists, so every student receives every task.
pub struct TaskFanout {
    store: Arc<dyn LectureStore>,
}

impl TaskFanout {
    pub fn new(store: Arc<dyn LectureStore>) -> Self {
        Self { store }
    }

    /// Create one task per (descriptor, student) pair. Returns how many
    /// rows were created. Zero students is not an error.
    pub async fn fan_out(
        &self,
        lecture_id: Uuid,
        descriptors: &[TaskDescriptor],
    ) -> Result<u64> {
        if descriptors.is_empty() {
            return Ok(0);
        }

        let students = self.store.find_students().await?;
        if students.is_empty() {
            tracing::warn!(
                lecture_id = %lecture_id,
                descriptors = descriptors.len(),
                "no students to assign extracted tasks to"
            );
            return Ok(0);
        }

        let mut tasks = Vec::with_capacity(descriptors.len() * students.len());
        for descriptor in descriptors {
            let priority = descriptor.normalized_priority();
            let due_date = descriptor.normalized_due_date();

            for student in &students {
                tasks.push(NewTask {
                    title: descriptor.title_or_default(),
                    description: descriptor.description.clone(),
                    lecture_id,
                    assigned_to_id: student.id,
                    priority,
                    due_date,
                    is_ai_generated: true,
                });
            }
        }

        let created = self.store.insert_tasks(&tasks).await?;

        tracing::info!(
            lecture_id = %lecture_id,
            descriptors = descriptors.len(),
            students = students.len(),
            created,
            "fanned out extracted tasks"
        );

        Ok(created)
    }
}
