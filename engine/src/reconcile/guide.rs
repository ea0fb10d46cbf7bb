//! Guided question sequence
//!
//! A fixed, ordered list of prompts that steers the user through data capture
//! one topic at a time. The last prompt is the review prompt; once the session
//! reaches the second-to-last prompt the next merge always forces completion.

use sdk::errors::EngineError;

/// Fixed ordered list of prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidedQuestions {
    questions: Vec<String>,
}

impl GuidedQuestions {
    /// Build a question sequence
    ///
    /// # Errors
    /// Returns `EngineError::Config` if the list is empty or contains a blank prompt.
    pub fn new(questions: Vec<String>) -> Result<Self, EngineError> {
        if questions.is_empty() {
            return Err(EngineError::Config(
                "guide.questions must contain at least one prompt".to_string(),
            ));
        }

        if let Some(pos) = questions.iter().position(|q| q.trim().is_empty()) {
            return Err(EngineError::Config(format!(
                "guide.questions[{}] is blank",
                pos
            )));
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Index of the final (review) prompt
    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    /// Once `questionIndex` reaches this value a merge always completes
    pub fn forced_completion_index(&self) -> usize {
        self.last_index().saturating_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(String::as_str)
    }
}
