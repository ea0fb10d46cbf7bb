//! Session driver
//!
//! Glues the synchronous reconciliation engine to the async world: it runs
//! the injected extractor between `on_capture` and `merge`, bounds every call
//! with a timeout, and publishes what happened on the message bus.

use sdk::capture::CaptureEvent;
use sdk::errors::EngineError;
use sdk::types::Record;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::extraction::{ExtractionError, ExtractionRequest, Extractor};
use crate::message_bus::{MessageBus, SessionEvent};
use crate::reconcile::{CaptureOutcome, Phase, ReconciliationEngine, SessionSnapshot};
use crate::secrets::scrub;

pub struct SessionDriver {
    engine: ReconciliationEngine,
    extractor: Arc<dyn Extractor>,
    bus: MessageBus,
    timeout: Duration,
}

impl SessionDriver {
    pub fn new(
        engine: ReconciliationEngine,
        extractor: Arc<dyn Extractor>,
        bus: MessageBus,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            extractor,
            bus,
            timeout,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.engine.snapshot()
    }

    /// Open a capture
    pub async fn start(&mut self) -> Result<Phase, EngineError> {
        let phase = self.engine.start()?;
        self.bus.publish(SessionEvent::CaptureStarted).await;
        self.publish_phase().await;
        Ok(phase)
    }

    /// Run one capture event through extraction and merge
    ///
    /// Extraction failures do not surface as `Err`: they move the session to
    /// `Error` with a scrubbed message. `Err` means the event did not fit the
    /// current phase.
    pub async fn handle_capture(&mut self, event: CaptureEvent) -> Result<Phase, EngineError> {
        match self.engine.on_capture(event)? {
            CaptureOutcome::Extract(request) => {
                self.bus
                    .publish(SessionEvent::ExtractionStarted {
                        extractor: self.extractor.name().to_string(),
                    })
                    .await;
                self.publish_phase().await;
                self.extract_and_merge(request).await?;
            }
            CaptureOutcome::Failed => {
                let message = self.engine.session().last_error().unwrap_or_default();
                let message = scrub(message);
                self.bus
                    .publish(SessionEvent::SessionFailed { message })
                    .await;
            }
            CaptureOutcome::Skipped | CaptureOutcome::Aborted => {}
        }

        self.publish_phase().await;
        Ok(self.engine.phase())
    }

    async fn extract_and_merge(&mut self, request: ExtractionRequest) -> Result<(), EngineError> {
        let outcome = tokio::time::timeout(self.timeout, self.extractor.extract(&request)).await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(self.timeout.as_secs())),
        };

        match result {
            Ok(partial) => {
                self.engine.merge(partial)?;
            }
            Err(err) => {
                let message = scrub(&err.to_string());
                warn!(
                    extractor = self.extractor.name(),
                    session_id = %self.engine.session().id(),
                    "Extraction failed: {}",
                    message
                );
                self.engine.fail_extraction(message.clone())?;
                self.bus
                    .publish(SessionEvent::SessionFailed { message })
                    .await;
            }
        }

        Ok(())
    }

    /// Accept the record in review
    pub async fn confirm(&mut self) -> Result<Record, EngineError> {
        let record = self.engine.confirm()?;
        self.publish_phase().await;
        self.bus
            .publish(SessionEvent::SessionFinalized {
                record: record.clone(),
            })
            .await;
        Ok(record)
    }

    pub async fn reset(&mut self) -> Result<Phase, EngineError> {
        let phase = self.engine.reset()?;
        self.publish_phase().await;
        Ok(phase)
    }

    /// Consume capture events until the channel closes or the session
    /// reaches a terminal phase
    ///
    /// A capture is opened automatically before each event.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<CaptureEvent>,
    ) -> Result<SessionSnapshot, EngineError> {
        while !self.engine.phase().is_terminal() {
            let Some(event) = events.recv().await else {
                break;
            };

            if self.engine.phase().can_start_capture() {
                self.start().await?;
            }
            self.handle_capture(event).await?;
        }

        info!(
            session_id = %self.engine.session().id(),
            phase = %self.engine.phase(),
            "Capture loop finished"
        );
        Ok(self.engine.snapshot())
    }

    /// Publish the current snapshot without changing anything
    pub async fn announce(&self) {
        self.publish_phase().await;
    }

    async fn publish_phase(&self) {
        self.bus
            .publish(SessionEvent::PhaseChanged {
                snapshot: Box::new(self.engine.snapshot()),
            })
            .await;
    }
}
