pub mod models;

pub use models::{Lecture, LectureCounts};
