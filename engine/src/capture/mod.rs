//! Capture adapters
//!
//! Adapters turn an input device into discrete `CaptureEvent`s. The terminal
//! build reads dictation one line per utterance (standing in for a
//! speech-to-text engine) and receipt photos from image files.

use async_trait::async_trait;
use sdk::capture::{CaptureEvent, Modality};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

mod image;
mod transcript;

pub use image::{mime_type_for, ImageFileCapture};
pub use transcript::{utterance, LineTranscriptCapture};

/// Capacity of the channel between an adapter and the session driver
pub const CAPTURE_BUFFER_SIZE: usize = 8;

#[async_trait]
pub trait CaptureAdapter: Send {
    fn modality(&self) -> Modality;

    /// Produce the next event; waits for the user or device
    async fn capture(&mut self) -> CaptureEvent;

    /// No further events will be produced
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Forward adapter events to `tx` until the adapter is exhausted or the
/// receiver goes away
pub fn spawn_capture_loop<A>(mut adapter: A, tx: mpsc::Sender<CaptureEvent>) -> JoinHandle<()>
where
    A: CaptureAdapter + 'static,
{
    tokio::spawn(async move {
        while !adapter.is_exhausted() {
            let event = adapter.capture().await;
            if tx.send(event).await.is_err() {
                tracing::debug!("Capture receiver closed, stopping {} capture", adapter.modality());
                break;
            }
        }
    })
}
