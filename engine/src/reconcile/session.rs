//! Session state and read-only snapshots

use chrono::{DateTime, Utc};
use sdk::types::Record;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::machine::Phase;

/// One capture session, owned by the reconciliation engine
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) record: Record,
    pub(crate) question_index: usize,
    pub(crate) phase: Phase,
    /// Phase to return to if the current capture is aborted
    pub(crate) resume_phase: Phase,
    pub(crate) last_error: Option<String>,
}

impl Session {
    /// Fresh session: empty record, first question, idle
    pub fn new() -> Self {
        Self::with_record(Record::default())
    }

    /// Fresh session seeded with an existing record
    pub fn with_record(record: Record) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            record,
            question_index: 0,
            phase: Phase::Idle,
            resume_phase: Phase::Idle,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// What the presentation layer sees after every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub phase: Phase,
    pub record: Record,
    pub question_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.question_index(), 0);
        assert!(session.record().is_empty());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(Session::new().id(), Session::new().id());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let session = Session::new();
        let snapshot = SessionSnapshot {
            session_id: session.id(),
            started_at: session.started_at(),
            phase: session.phase(),
            record: session.record().clone(),
            question_index: 0,
            current_question: Some("¿Cliente?".to_string()),
            last_error: None,
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["phase"], "idle");
        assert_eq!(value["questionIndex"], 0);
        assert_eq!(value["currentQuestion"], "¿Cliente?");
        assert!(value.get("lastError").is_none());
        assert!(value["record"]["lineItems"].as_array().unwrap().is_empty());
    }
}
