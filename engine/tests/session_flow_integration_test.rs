//! End-to-end session flows through the driver
//!
//! Extraction is scripted, so these tests exercise the full
//! capture → extract → merge → transition cycle without network access.

use facturo_engine::driver::SessionDriver;
use facturo_engine::extraction::{ExtractionError, Extractor, ScriptedExtractor};
use facturo_engine::message_bus::{EventType, MessageBus, SessionEvent};
use facturo_engine::reconcile::{GuidedQuestions, Phase, ReconciliationEngine, ResetPolicy};
use sdk::capture::{Artifact, CaptureEvent};
use sdk::errors::{EngineError, FacturoErrorExt};
use sdk::types::{LineItem, PartialParty, PartialResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn four_questions() -> GuidedQuestions {
    GuidedQuestions::new(vec![
        "¿Cliente?".to_string(),
        "¿Artículos?".to_string(),
        "¿Notas?".to_string(),
        "Revisá la factura.".to_string(),
    ])
    .unwrap()
}

fn driver_with(extractor: Arc<dyn Extractor>, policy: ResetPolicy) -> SessionDriver {
    SessionDriver::new(
        ReconciliationEngine::new(four_questions(), policy),
        extractor,
        MessageBus::new(),
        Duration::from_secs(2),
    )
}

fn said(text: &str) -> CaptureEvent {
    CaptureEvent::ArtifactCaptured(Artifact::transcript(text))
}

fn items_only(description: &str) -> PartialResult {
    PartialResult {
        line_items: Some(vec![LineItem::new(description, 1.0, 5.0)]),
        ..Default::default()
    }
}

fn acme_with_bolts() -> PartialResult {
    PartialResult {
        party: Some(PartialParty {
            name: Some("Acme".to_string()),
            id: Some("123".to_string()),
            address: None,
        }),
        line_items: Some(vec![LineItem::new("Bolt", 10.0, 2.0)]),
        notes: None,
        complete: false,
    }
}

#[tokio::test]
async fn test_all_data_present_goes_to_review() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([acme_with_bolts()]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    driver.start().await.unwrap();
    let phase = driver.handle_capture(said("Acme 123, diez bulones a dos")).await.unwrap();

    assert_eq!(phase, Phase::Review);
    let snapshot = driver.snapshot();
    assert_eq!(snapshot.record.party.name.as_deref(), Some("Acme"));
    assert_eq!(snapshot.record.party.id.as_deref(), Some("123"));
    assert_eq!(snapshot.record.line_items.len(), 1);
    assert_eq!(snapshot.question_index, 0);
}

#[tokio::test]
async fn test_two_item_merges_stay_guided() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([
        items_only("Bolt"),
        items_only("Nut"),
    ]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("un bulón")).await.unwrap(), Phase::Guided);
    assert_eq!(driver.snapshot().question_index, 1);

    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("una tuerca")).await.unwrap(), Phase::Guided);
    let snapshot = driver.snapshot();
    assert_eq!(snapshot.question_index, 2);
    assert_eq!(snapshot.current_question.as_deref(), Some("¿Notas?"));

    let names: Vec<_> = snapshot
        .record
        .line_items
        .iter()
        .map(|i| i.description.as_str())
        .collect();
    assert_eq!(names, ["Bolt", "Nut"]);
}

#[tokio::test]
async fn test_third_merge_is_forced_to_review() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([
        PartialResult::default(),
        PartialResult::default(),
        PartialResult::default(),
    ]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    for expected in [Phase::Guided, Phase::Guided, Phase::Review] {
        driver.start().await.unwrap();
        assert_eq!(driver.handle_capture(said("nada útil")).await.unwrap(), expected);
    }
    assert!(driver.snapshot().record.is_empty());
}

#[tokio::test]
async fn test_empty_transcript_skips_extraction() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([items_only("Bolt")]));
    let mut driver = driver_with(Arc::clone(&extractor) as Arc<dyn Extractor>, ResetPolicy::Discard);

    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("   ")).await.unwrap(), Phase::Idle);
    assert_eq!(extractor.remaining().await, 1);
    assert!(extractor.requests().await.is_empty());

    // Once past the first question an empty utterance returns to guided
    driver.start().await.unwrap();
    driver.handle_capture(said("un bulón")).await.unwrap();
    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("")).await.unwrap(), Phase::Guided);
    assert_eq!(driver.snapshot().question_index, 1);
}

#[tokio::test]
async fn test_extractor_sees_current_record_and_question() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([
        items_only("Bolt"),
        PartialResult::default(),
    ]));
    let mut driver = driver_with(Arc::clone(&extractor) as Arc<dyn Extractor>, ResetPolicy::Discard);

    for text in ["un bulón", "listo"] {
        driver.start().await.unwrap();
        driver.handle_capture(said(text)).await.unwrap();
    }

    let requests = extractor.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].current_question.as_deref(), Some("¿Cliente?"));
    assert!(requests[0].current_record.is_empty());
    assert_eq!(requests[1].current_question.as_deref(), Some("¿Artículos?"));
    assert_eq!(requests[1].current_record.line_items.len(), 1);
}

#[tokio::test]
async fn test_extraction_failure_keeps_record_and_needs_reset() {
    let extractor = Arc::new(ScriptedExtractor::new([
        Ok(items_only("Bolt")),
        Err(ExtractionError::Parse("not json".to_string())),
    ]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    driver.start().await.unwrap();
    driver.handle_capture(said("un bulón")).await.unwrap();
    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("???")).await.unwrap(), Phase::Error);

    let snapshot = driver.snapshot();
    assert_eq!(snapshot.record.line_items.len(), 1);
    assert!(snapshot.last_error.unwrap().contains("not json"));

    let err = driver.start().await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert!(!err.is_recoverable());

    assert_eq!(driver.reset().await.unwrap(), Phase::Idle);
    assert!(driver.snapshot().record.is_empty());
}

#[tokio::test]
async fn test_preserve_policy_keeps_record_across_error_reset() {
    let extractor = Arc::new(ScriptedExtractor::new([
        Ok(items_only("Bolt")),
        Err(ExtractionError::RateLimitExceeded),
    ]));
    let mut driver = driver_with(extractor, ResetPolicy::PreserveRecord);

    for text in ["un bulón", "otro"] {
        driver.start().await.unwrap();
        driver.handle_capture(said(text)).await.unwrap();
    }
    assert_eq!(driver.phase(), Phase::Error);

    let previous = driver.snapshot().session_id;
    driver.reset().await.unwrap();

    let snapshot = driver.snapshot();
    assert_ne!(snapshot.session_id, previous);
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(snapshot.question_index, 0);
    assert_eq!(snapshot.record.line_items.len(), 1);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_capture_failure_routes_to_error() {
    let extractor = Arc::new(ScriptedExtractor::from_partials(Vec::<PartialResult>::new()));
    let bus = MessageBus::new();
    let mut failures = bus.subscribe(EventType::SessionFailed).await;
    let mut driver = SessionDriver::new(
        ReconciliationEngine::new(four_questions(), ResetPolicy::Discard),
        extractor,
        bus,
        Duration::from_secs(2),
    );

    driver.start().await.unwrap();
    let phase = driver
        .handle_capture(CaptureEvent::CaptureFailed {
            message: "microphone permission denied".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(phase, Phase::Error);
    let Some(SessionEvent::SessionFailed { message }) = failures.recv().await else {
        panic!("expected failure event");
    };
    assert!(message.contains("microphone"));
}

#[tokio::test]
async fn test_aborted_capture_resumes_previous_phase() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([items_only("Bolt")]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    driver.start().await.unwrap();
    driver.handle_capture(said("un bulón")).await.unwrap();
    assert_eq!(driver.phase(), Phase::Guided);

    driver.start().await.unwrap();
    let phase = driver.handle_capture(CaptureEvent::CaptureAborted).await.unwrap();
    assert_eq!(phase, Phase::Guided);
    assert_eq!(driver.snapshot().record.line_items.len(), 1);
}

#[tokio::test]
async fn test_capture_outside_capturing_is_rejected() {
    let extractor = Arc::new(ScriptedExtractor::from_partials(Vec::<PartialResult>::new()));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    let err = driver.handle_capture(said("hola")).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert_eq!(driver.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_review_corrections_and_confirm() {
    let correction = PartialResult {
        notes: Some("Pago contado".to_string()),
        ..Default::default()
    };
    let extractor = Arc::new(ScriptedExtractor::from_partials([acme_with_bolts(), correction]));
    let bus = MessageBus::new();
    let mut finalized = bus.subscribe(EventType::SessionFinalized).await;
    let mut driver = SessionDriver::new(
        ReconciliationEngine::new(four_questions(), ResetPolicy::Discard),
        extractor,
        bus,
        Duration::from_secs(2),
    );

    driver.start().await.unwrap();
    driver.handle_capture(said("Acme")).await.unwrap();
    driver.start().await.unwrap();
    assert_eq!(driver.handle_capture(said("agregá nota")).await.unwrap(), Phase::Review);

    let record = driver.confirm().await.unwrap();
    assert_eq!(record.notes, "Pago contado");
    assert_eq!(record.total(), 20.0);
    assert_eq!(driver.phase(), Phase::Finalized);

    let Some(SessionEvent::SessionFinalized { record: published }) = finalized.recv().await
    else {
        panic!("expected finalized event");
    };
    assert_eq!(published, record);

    assert!(driver.start().await.is_err());
    assert_eq!(driver.reset().await.unwrap(), Phase::Idle);
}

#[tokio::test]
async fn test_run_consumes_channel_until_review() {
    let extractor = Arc::new(ScriptedExtractor::from_partials([
        PartialResult {
            party: acme_with_bolts().party,
            ..Default::default()
        },
        items_only("Bolt"),
        items_only("never merged"),
    ]));
    let mut driver = driver_with(extractor, ResetPolicy::Discard);

    let (tx, rx) = mpsc::channel(8);
    for text in ["Acme 123", "un bulón"] {
        tx.send(said(text)).await.unwrap();
    }
    drop(tx);

    let snapshot = driver.run(rx).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Review);
    assert_eq!(snapshot.record.line_items.len(), 1);
}
