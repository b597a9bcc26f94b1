pub mod auth;
pub mod course;
pub mod grading;
pub mod registration;
pub mod results;
pub mod user;
