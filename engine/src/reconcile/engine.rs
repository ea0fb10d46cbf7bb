//! Reconciliation engine
//!
//! Owns one `Session` and applies capture events, extraction results and user
//! actions to it. Every method is synchronous and performs no I/O: the caller
//! runs the extractor between `on_capture` and `merge`/`fail_extraction`.
//! Because only one extraction can be pending at a time, an action that does
//! not fit the current phase is rejected with `EngineError::InvalidTransition`
//! and leaves the session untouched.

use sdk::capture::{Artifact, CaptureEvent};
use sdk::errors::EngineError;
use sdk::types::{PartialResult, Record};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::completion::{advance_question, evaluate};
use super::guide::GuidedQuestions;
use super::machine::{next_phase, Action, Phase};
use super::merge::merge_record;
use super::session::{Session, SessionSnapshot};
use crate::extraction::ExtractionRequest;

/// What happens to the record when a session is reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Always start over with an empty record
    #[default]
    Discard,
    /// Keep the record when resetting out of `Error`
    PreserveRecord,
}

/// Result of feeding a capture event to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Artifact accepted; run this request and report back
    Extract(ExtractionRequest),
    /// Empty artifact; nothing to extract
    Skipped,
    /// Capture failed; the session is now in `Error`
    Failed,
    /// User cancelled; the session went back to where it was
    Aborted,
}

pub struct ReconciliationEngine {
    guide: GuidedQuestions,
    reset_policy: ResetPolicy,
    session: Session,
}

impl ReconciliationEngine {
    pub fn new(guide: GuidedQuestions, reset_policy: ResetPolicy) -> Self {
        Self {
            guide,
            reset_policy,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn guide(&self) -> &GuidedQuestions {
        &self.guide
    }

    /// Prompt for the current question index
    pub fn current_question(&self) -> Option<&str> {
        self.guide.get(self.session.question_index)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session.id,
            started_at: self.session.started_at,
            phase: self.session.phase,
            record: self.session.record.clone(),
            question_index: self.session.question_index,
            current_question: self.current_question().map(String::from),
            last_error: self.session.last_error.clone(),
        }
    }

    /// Begin a capture from `Idle`, `Guided` or `Review`
    pub fn start(&mut self) -> Result<Phase, EngineError> {
        let resume = self.session.phase;
        let phase = self.transition(Action::Start)?;
        self.session.resume_phase = resume;
        Ok(phase)
    }

    /// Apply a capture event
    pub fn on_capture(&mut self, event: CaptureEvent) -> Result<CaptureOutcome, EngineError> {
        match event {
            CaptureEvent::ArtifactCaptured(artifact) => self.on_artifact(artifact),
            CaptureEvent::CaptureFailed { message } => {
                self.transition(Action::CaptureFailed)?;
                warn!(session_id = %self.session.id, "Capture failed: {}", message);
                self.session.last_error = Some(message);
                Ok(CaptureOutcome::Failed)
            }
            CaptureEvent::CaptureAborted => {
                let resume = self.session.resume_phase;
                self.transition(Action::CaptureAborted { resume })?;
                Ok(CaptureOutcome::Aborted)
            }
        }
    }

    fn on_artifact(&mut self, artifact: Artifact) -> Result<CaptureOutcome, EngineError> {
        if artifact.is_empty() {
            let question_index = self.session.question_index;
            self.transition(Action::EmptyArtifact { question_index })?;
            debug!(session_id = %self.session.id, "Empty {} artifact skipped", artifact.modality());
            return Ok(CaptureOutcome::Skipped);
        }

        self.transition(Action::Artifact)?;

        Ok(CaptureOutcome::Extract(ExtractionRequest {
            artifact,
            current_record: self.session.record.clone(),
            current_question: self.current_question().map(String::from),
        }))
    }

    /// Merge a successful extraction and advance the guided sequence
    ///
    /// # Errors
    /// `InvalidTransition` unless an extraction is pending.
    pub fn merge(&mut self, partial: PartialResult) -> Result<Phase, EngineError> {
        self.ensure_phase(Phase::Processing, "merge")?;

        let from = self.session.phase;
        merge_record(&mut self.session.record, &partial);

        let completeness = evaluate(
            &self.session.record,
            partial.complete,
            self.session.question_index,
            &self.guide,
        );
        let to = advance_question(&mut self.session, completeness)?;

        info!(
            session_id = %self.session.id,
            items_added = partial.item_count(),
            question_index = self.session.question_index,
            hinted = completeness.hinted,
            all_data_present = completeness.all_data_present,
            forced = completeness.forced,
            "Merged extraction result ({} -> {})",
            from,
            to
        );

        Ok(to)
    }

    /// Record a failed extraction; the message must already be user-safe
    pub fn fail_extraction(&mut self, message: impl Into<String>) -> Result<Phase, EngineError> {
        let phase = self.transition(Action::ExtractionFailed)?;
        self.session.last_error = Some(message.into());
        Ok(phase)
    }

    /// Accept the reviewed record
    pub fn confirm(&mut self) -> Result<Record, EngineError> {
        self.transition(Action::Confirm)?;
        info!(
            session_id = %self.session.id,
            items = self.session.record.line_items.len(),
            "Record finalized"
        );
        Ok(self.session.record.clone())
    }

    /// Start a new session; the previous one is discarded
    pub fn reset(&mut self) -> Result<Phase, EngineError> {
        let from = self.session.phase;
        let to = next_phase(from, &Action::Reset)?;

        let carried = match (from, self.reset_policy) {
            (Phase::Error, ResetPolicy::PreserveRecord) => std::mem::take(&mut self.session.record),
            _ => Record::default(),
        };

        let previous = self.session.id;
        self.session = Session::with_record(carried);
        debug!(
            previous_session = %previous,
            session_id = %self.session.id,
            "Session reset from {}",
            from
        );

        Ok(to)
    }

    fn ensure_phase(&self, expected: Phase, action: &str) -> Result<(), EngineError> {
        if self.session.phase == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                phase: self.session.phase.to_string(),
                action: action.to_string(),
            })
        }
    }

    fn transition(&mut self, action: Action) -> Result<Phase, EngineError> {
        let from = self.session.phase;
        let to = next_phase(from, &action)?;
        self.session.phase = to;
        debug!(
            session_id = %self.session.id,
            action = action.name(),
            "Phase {} -> {}",
            from,
            to
        );
        Ok(to)
    }
}
