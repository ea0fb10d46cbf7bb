//! Incremental record reconciliation
//!
//! Turns a stream of partial extraction results into one coherent invoice
//! record, driven by a guided question sequence and a session state machine.

pub mod completion;
pub mod engine;
pub mod guide;
pub mod machine;
pub mod merge;
pub mod session;

pub use completion::{advance_question, evaluate, Completeness};
pub use engine::{CaptureOutcome, ReconciliationEngine, ResetPolicy};
pub use guide::GuidedQuestions;
pub use machine::{next_phase, Action, Phase};
pub use merge::merge_record;
pub use session::{Session, SessionSnapshot};
