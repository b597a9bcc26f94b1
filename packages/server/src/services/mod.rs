//! The registration and grading engine.
//!
//! Services borrow a connection and open their own transactions, so they can
//! be driven from handlers and from tests alike. The acting user's id is
//! always passed in explicitly.

mod catalog;
mod enrollment;
mod error;
mod grading;

pub use catalog::{CatalogService, CourseChanges, NewCourse};
pub use enrollment::{EnrolledStudent, EnrollmentService};
pub use error::EngineError;
pub use grading::{GradeSubmission, GradingService};
