pub mod course;
pub mod course_prerequisite;
pub mod course_result;
pub mod registration;
pub mod user;
