pub mod auth;
pub mod health;
pub mod history;
pub mod progress;
pub mod quiz;
