//! Capture artifacts and the events capture adapters emit

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture modality of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Photographed receipt or invoice
    Camera,
    /// Dictated transcript
    Speech,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Camera => write!(f, "camera"),
            Modality::Speech => write!(f, "speech"),
        }
    }
}

/// Raw output of one capture
#[derive(Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Encoded image, one per capture
    Image { bytes: Vec<u8>, mime_type: String },
    /// Speech-to-text transcript
    Transcript(String),
}

impl Artifact {
    /// Create a transcript artifact
    pub fn transcript(text: impl Into<String>) -> Self {
        Artifact::Transcript(text.into())
    }

    /// Create an image artifact
    pub fn image(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Artifact::Image {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Whitespace-only transcripts and zero-byte images carry nothing to extract
    pub fn is_empty(&self) -> bool {
        match self {
            Artifact::Image { bytes, .. } => bytes.is_empty(),
            Artifact::Transcript(text) => text.trim().is_empty(),
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            Artifact::Image { .. } => Modality::Camera,
            Artifact::Transcript(_) => Modality::Speech,
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Image { bytes, mime_type } => f
                .debug_struct("Image")
                .field("len", &bytes.len())
                .field("mime_type", mime_type)
                .finish(),
            Artifact::Transcript(text) => f.debug_tuple("Transcript").field(text).finish(),
        }
    }
}

/// Discrete events a capture adapter hands to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// An artifact was produced (possibly empty)
    ArtifactCaptured(Artifact),
    /// The device or source could not be used
    CaptureFailed { message: String },
    /// The user stopped the capture before anything was produced
    CaptureAborted,
}
