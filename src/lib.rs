//! Adtech reporting client
//!
//! This library talks to the adtech reporting API: it uploads CSV files of
//! advertising metrics and follows the resulting import jobs to completion,
//! and it reads the dashboard summary and builds, exports and saves ad-hoc
//! reports.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
