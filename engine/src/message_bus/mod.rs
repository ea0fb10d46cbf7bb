//! Session event bus
//!
//! The session driver publishes what happened; presentation (terminal
//! renderer, JSON printer, tests) subscribes. The driver never calls
//! presentation code directly.
//!
//! Channels are bounded. A subscriber that falls more than
//! `CHANNEL_BUFFER_SIZE` events behind misses events instead of stalling the
//! session, and subscribers whose receiver was dropped are pruned on publish.

use sdk::types::Record;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::reconcile::SessionSnapshot;

/// Channel buffer size for bounded channels
pub const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event kinds a subscriber can filter on
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    CaptureStarted,
    ExtractionStarted,
    PhaseChanged,
    SessionFailed,
    SessionFinalized,
    /// Subscribe to every event type
    All,
}

/// Events published by the session driver
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Capture adapter is listening or the camera is open
    CaptureStarted,
    /// An artifact was accepted and sent to the extractor
    ExtractionStarted { extractor: String },
    /// Session state after any transition
    PhaseChanged { snapshot: Box<SessionSnapshot> },
    /// Capture or extraction failed; message is safe to show
    SessionFailed { message: String },
    /// The user confirmed the record
    SessionFinalized { record: Record },
}

impl SessionEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            SessionEvent::CaptureStarted => EventType::CaptureStarted,
            SessionEvent::ExtractionStarted { .. } => EventType::ExtractionStarted,
            SessionEvent::PhaseChanged { .. } => EventType::PhaseChanged,
            SessionEvent::SessionFailed { .. } => EventType::SessionFailed,
            SessionEvent::SessionFinalized { .. } => EventType::SessionFinalized,
        }
    }
}

type Subscribers = HashMap<EventType, Vec<mpsc::Sender<SessionEvent>>>;

/// Pub/sub bus for session events
#[derive(Clone, Default)]
pub struct MessageBus {
    channels: Arc<Mutex<Subscribers>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event type, or `EventType::All`
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Deliver an event to its type's subscribers and to `All` subscribers
    pub async fn publish(&self, event: SessionEvent) {
        let mut channels = self.channels.lock().await;
        let event_type = event.event_type();

        for key in [event_type, EventType::All] {
            if let Some(subscribers) = channels.get_mut(&key) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!("Subscriber lagging, dropped {:?} event", event_type);
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }

    /// Number of live subscriptions across all event types
    pub async fn subscriber_count(&self) -> usize {
        self.channels.lock().await.values().map(Vec::len).sum()
    }
}
