mod lecture;

pub use lecture::{Lecture, LectureCounts};
