pub mod models;

pub use models::{NewTask, Task, TaskPriority, TaskStatus};
