pub mod core;
pub mod courses;
pub mod export;
pub mod payments;
pub mod reports;
pub mod snapshot;
pub mod students;
