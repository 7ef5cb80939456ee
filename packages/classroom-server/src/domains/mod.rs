pub mod lectures;
pub mod processing;
pub mod tasks;
pub mod users;
