pub mod attempt_log;
pub mod attempt_service;
pub mod auth_service;
pub mod chart_service;
pub mod content_service;
pub mod grading_service;
pub mod history_service;
pub mod progress_service;
