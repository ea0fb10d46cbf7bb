//! Completeness evaluation and question advance
//!
//! A record is complete when the extractor says so, when it holds the
//! required data (party name, party id, at least one line item), or when the
//! guided sequence has reached its forced-completion index. The last clause
//! keeps a session from looping through questions forever.

use sdk::errors::EngineError;
use sdk::types::Record;

use super::guide::GuidedQuestions;
use super::machine::{next_phase, Action, Phase};
use super::session::Session;

/// Why (or why not) a record counts as complete after a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    /// Extractor's `complete` hint
    pub hinted: bool,
    /// Party name, party id and at least one line item are present
    pub all_data_present: bool,
    /// Question index reached `lastIndex - 1`
    pub forced: bool,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.hinted || self.all_data_present || self.forced
    }
}

/// Evaluate completeness for the record as it stands after a merge
pub fn evaluate(
    record: &Record,
    hinted: bool,
    question_index: usize,
    guide: &GuidedQuestions,
) -> Completeness {
    Completeness {
        hinted,
        all_data_present: record.has_required_data(),
        forced: question_index >= guide.forced_completion_index(),
    }
}

/// Move to the next question, or to review once complete
///
/// Only valid while the session is processing an extraction result.
pub fn advance_question(
    session: &mut Session,
    completeness: Completeness,
) -> Result<Phase, EngineError> {
    let complete = completeness.is_complete();
    let next = next_phase(session.phase, &Action::ExtractionSucceeded { complete })?;

    if !complete {
        session.question_index += 1;
    }
    session.phase = next;

    Ok(next)
}
