pub mod auth;
pub mod course;
pub mod registration;
pub mod result;
pub mod shared;
pub mod user;
