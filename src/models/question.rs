use serde::{Deserialize, Serialize};

/// One multiple-choice question as stored by the content provider and as
/// exchanged with the client. `correct` is the designated option's text,
/// compared by exact equality at grading time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
}
