pub mod api;
pub mod imports;
pub mod poller;
pub mod reports;
