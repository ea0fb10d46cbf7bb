use async_trait::async_trait;
use sdk::capture::{Artifact, CaptureEvent, Modality};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::CaptureAdapter;

/// Dictation from a line-oriented reader, one line per utterance
///
/// End of input means the user stopped dictating (`CaptureAborted`); a read
/// error means the source is unusable (`CaptureFailed`).
pub struct LineTranscriptCapture<R> {
    reader: R,
    exhausted: bool,
}

impl<R: AsyncBufRead + Unpin + Send> LineTranscriptCapture<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    /// Next raw line without the trailing newline, `None` at end of input
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}

/// Capture event for one dictated line
pub fn utterance(line: impl Into<String>) -> CaptureEvent {
    CaptureEvent::ArtifactCaptured(Artifact::transcript(line))
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> CaptureAdapter for LineTranscriptCapture<R> {
    fn modality(&self) -> Modality {
        Modality::Speech
    }

    async fn capture(&mut self) -> CaptureEvent {
        match self.read_line().await {
            Ok(Some(line)) => utterance(line),
            Ok(None) => CaptureEvent::CaptureAborted,
            Err(e) => {
                self.exhausted = true;
                CaptureEvent::CaptureFailed {
                    message: format!("could not read dictation input: {}", e),
                }
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
