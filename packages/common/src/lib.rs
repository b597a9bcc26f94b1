pub mod grade;
pub mod prerequisite_graph;
pub mod registration_status;
pub mod role;

pub use grade::{LetterGrade, MarksOutOfRange};
pub use prerequisite_graph::{CycleDetected, PrerequisiteGraph};
pub use registration_status::RegistrationStatus;
pub use role::{Identity, Role, permission};
