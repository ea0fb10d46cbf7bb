use async_trait::async_trait;
use sdk::capture::{Artifact, CaptureEvent, Modality};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::CaptureAdapter;

/// MIME type for a supported receipt image, by file extension
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Receipt photos read from files, one per capture
pub struct ImageFileCapture {
    pending: VecDeque<PathBuf>,
}

impl ImageFileCapture {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    async fn load(path: &Path) -> CaptureEvent {
        let Some(mime_type) = mime_type_for(path) else {
            return CaptureEvent::CaptureFailed {
                message: format!(
                    "unsupported image type '{}' (expected JPEG, PNG, WebP or HEIC)",
                    path.display()
                ),
            };
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
                CaptureEvent::ArtifactCaptured(Artifact::image(bytes, mime_type))
            }
            Err(e) => CaptureEvent::CaptureFailed {
                message: format!("could not read '{}': {}", path.display(), e),
            },
        }
    }
}

#[async_trait]
impl CaptureAdapter for ImageFileCapture {
    fn modality(&self) -> Modality {
        Modality::Camera
    }

    async fn capture(&mut self) -> CaptureEvent {
        match self.pending.pop_front() {
            Some(path) => Self::load(&path).await,
            None => CaptureEvent::CaptureAborted,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}
