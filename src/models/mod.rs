pub mod import_state;
pub mod job;
pub mod report;
