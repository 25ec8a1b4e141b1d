pub mod attempt;
pub mod progress;
pub mod question;
pub mod user;
