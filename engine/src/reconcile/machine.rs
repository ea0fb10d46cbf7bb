//! Session phase transition table

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the user to start
    Idle,
    /// Capture adapter is listening or the camera is open
    Capturing,
    /// Extraction request in flight
    Processing,
    /// Waiting for the answer to the current guided question
    Guided,
    /// Record is complete enough to review
    Review,
    /// Record confirmed; terminal until reset
    Finalized,
    /// Capture or extraction failed; terminal until reset
    Error,
}

impl Phase {
    /// Phases that can only be left through an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finalized | Phase::Error)
    }

    /// Phases a new capture may be started from
    pub fn can_start_capture(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Guided | Phase::Review)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Capturing => "capturing",
            Phase::Processing => "processing",
            Phase::Guided => "guided",
            Phase::Review => "review",
            Phase::Finalized => "finalized",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Things that move a session between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    /// Empty or whitespace-only artifact
    EmptyArtifact { question_index: usize },
    Artifact,
    ExtractionSucceeded { complete: bool },
    ExtractionFailed,
    CaptureFailed,
    /// `resume` is the phase the capture was started from
    CaptureAborted { resume: Phase },
    Confirm,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::EmptyArtifact { .. } => "empty_artifact",
            Action::Artifact => "artifact",
            Action::ExtractionSucceeded { .. } => "extraction_succeeded",
            Action::ExtractionFailed => "extraction_failed",
            Action::CaptureFailed => "capture_failed",
            Action::CaptureAborted { .. } => "capture_aborted",
            Action::Confirm => "confirm",
            Action::Reset => "reset",
        }
    }
}

/// Resolve the phase reached by applying `action` in `phase`
///
/// # Errors
/// Returns `EngineError::InvalidTransition` for any pair not in the table.
pub fn next_phase(phase: Phase, action: &Action) -> Result<Phase, EngineError> {
    use Phase::*;

    let next = match (phase, action) {
        (Idle | Guided | Review, Action::Start) => Capturing,

        (Capturing, Action::EmptyArtifact { question_index: 0 }) => Idle,
        (Capturing, Action::EmptyArtifact { .. }) => Guided,
        (Capturing, Action::Artifact) => Processing,
        (Capturing, Action::CaptureFailed) => Error,
        (Capturing, Action::CaptureAborted { resume }) if resume.can_start_capture() => *resume,

        (Processing, Action::ExtractionSucceeded { complete: true }) => Review,
        (Processing, Action::ExtractionSucceeded { complete: false }) => Guided,
        (Processing, Action::ExtractionFailed) => Error,

        (Review, Action::Confirm) => Finalized,

        (Idle | Guided | Review | Error | Finalized, Action::Reset) => Idle,

        _ => {
            return Err(EngineError::InvalidTransition {
                phase: phase.to_string(),
                action: action.name().to_string(),
            })
        }
    };

    Ok(next)
}
