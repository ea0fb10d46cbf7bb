//! Command handlers for CLI operations
//!
//! - dictate: interactive guided session from stdin
//! - scan: extract an invoice from receipt photos
//! - replay: merge recorded extraction results offline
//! - key: manage the extraction API key
//! - config: show, locate and validate configuration

use anyhow::{bail, Context, Result};
use sdk::errors::FacturoErrorExt;
use sdk::types::{PartialResult, Record};
use serde_json::json;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::capture::{
    spawn_capture_loop, utterance, ImageFileCapture, LineTranscriptCapture, CAPTURE_BUFFER_SIZE,
};
use crate::cli::{ConfigAction, KeyAction};
use crate::config::{Config, DisplayConfig};
use crate::driver::SessionDriver;
use crate::export::{write_json, ApiSubmitter};
use crate::extraction::{Extractor, GeminiExtractor, ScriptedExtractor};
use crate::message_bus::{EventType, MessageBus, SessionEvent};
use crate::reconcile::{Phase, ReconciliationEngine, SessionSnapshot};
use crate::render::{phase_banner, render_snapshot};
use crate::secrets::{resolve_api_key, KeySource, SecretManager, SecretString, API_KEY_ENTRY, SERVICE_NAME};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// In-band commands understood by `dictate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationCommand {
    Confirm,
    Reset,
    Quit,
}

impl DictationCommand {
    /// `None` for anything that is not a known `:command`
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            ":done" | ":confirm" => Some(Self::Confirm),
            ":reset" => Some(Self::Reset),
            ":quit" | ":q" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn extraction_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.extraction.timeout_secs)
}

/// Gemini extractor with the API key from env or keychain
pub fn build_extractor(config: &Config) -> Result<Arc<dyn Extractor>> {
    let manager = SecretManager::new(SERVICE_NAME);
    let (api_key, source) = resolve_api_key(&config.extraction, &manager)?;
    tracing::debug!("API key source: {:?}", source);

    let extractor = GeminiExtractor::new(
        config.extraction.gemini.clone(),
        api_key,
        extraction_timeout(config),
    )
    .context("Failed to create Gemini client")?;

    Ok(Arc::new(extractor))
}

fn build_driver(
    config: &Config,
    extractor: Arc<dyn Extractor>,
    bus: MessageBus,
) -> Result<SessionDriver> {
    let engine = ReconciliationEngine::new(config.guided_questions()?, config.reset_policy());
    Ok(SessionDriver::new(
        engine,
        extractor,
        bus,
        extraction_timeout(config),
    ))
}

/// Print session events as they arrive
///
/// Text mode shows a one-line banner while capturing or processing and the
/// full invoice view otherwise; JSON mode prints every snapshot on its own line.
pub async fn spawn_presenter(
    bus: &MessageBus,
    format: OutputFormat,
    display: DisplayConfig,
) -> JoinHandle<()> {
    let mut events = bus.subscribe(EventType::All).await;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match (format, event) {
                (OutputFormat::Json, SessionEvent::PhaseChanged { snapshot }) => {
                    match serde_json::to_string(&snapshot) {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::warn!("Could not encode snapshot: {}", e),
                    }
                }
                (OutputFormat::Text, SessionEvent::PhaseChanged { snapshot }) => {
                    if matches!(snapshot.phase, Phase::Capturing | Phase::Processing) {
                        println!("... {}", phase_banner(&snapshot));
                    } else {
                        println!("{}", render_snapshot(&snapshot, &display));
                    }
                }
                (OutputFormat::Text, SessionEvent::SessionFinalized { record }) => {
                    println!(
                        "Factura confirmada: {} artículo(s), total {}",
                        record.line_items.len(),
                        crate::render::format_amount(record.total(), &display.currency_symbol)
                    );
                }
                _ => {}
            }
            let _ = std::io::stdout().flush();
        }
    })
}

/// Write the finalized record and optionally submit it downstream
async fn finalize(
    record: &Record,
    snapshot: &SessionSnapshot,
    config: &Config,
    output: Option<PathBuf>,
    submit: bool,
    format: OutputFormat,
) -> Result<()> {
    let dir = output.unwrap_or_else(|| config.core.export_dir.clone());
    let path = write_json(record, &dir, snapshot.session_id, config.export.pretty)?;

    let mut submitted_to = None;
    if submit {
        let submitter = ApiSubmitter::from_config(&config.export, extraction_timeout(config))?
            .context("--submit requires export.endpoint in config.toml")?;
        submitter.submit(record).await?;
        submitted_to = Some(submitter.endpoint().to_string());
    }

    match format {
        OutputFormat::Text => {
            println!("✓ Invoice saved to {}", path.display());
            if let Some(endpoint) = submitted_to {
                println!("✓ Submitted to {}", endpoint);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "finalized",
                "path": path,
                "submittedTo": submitted_to,
                "record": record,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
    }
    Ok(())
}

/// Interactive guided dictation
pub async fn handle_dictate(
    config: &Config,
    format: OutputFormat,
    output: Option<PathBuf>,
    submit: bool,
) -> Result<()> {
    let extractor = build_extractor(config)?;
    let bus = MessageBus::new();
    let presenter = spawn_presenter(&bus, format, config.display.clone()).await;
    let mut driver = build_driver(config, extractor, bus.clone())?;
    let mut input = LineTranscriptCapture::new(BufReader::new(tokio::io::stdin()));

    if format == OutputFormat::Text {
        eprintln!("Comandos: :done confirma, :reset empieza de nuevo, :quit sale sin guardar");
    }
    driver.announce().await;

    let mut finalized = None;
    loop {
        let line = match input.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                if driver.phase().can_start_capture() {
                    driver.start().await?;
                    driver
                        .handle_capture(sdk::capture::CaptureEvent::CaptureFailed {
                            message: format!("could not read dictation input: {}", e),
                        })
                        .await?;
                }
                break;
            }
        };

        match DictationCommand::parse(&line) {
            Some(DictationCommand::Confirm) => match driver.confirm().await {
                Ok(record) => {
                    finalized = Some((record, driver.snapshot()));
                    break;
                }
                Err(e) => eprintln!("{}", e.user_hint()),
            },
            Some(DictationCommand::Reset) => {
                if let Err(e) = driver.reset().await {
                    eprintln!("{}", e.user_hint());
                }
            }
            Some(DictationCommand::Quit) => break,
            None => {
                if driver.phase().is_terminal() {
                    eprintln!("La sesión terminó. Escribí :reset para empezar otra o :quit para salir.");
                    continue;
                }
                driver.start().await?;
                driver.handle_capture(utterance(line)).await?;
            }
        }
    }

    drop(driver);
    drop(bus);
    presenter.await.ok();

    match finalized {
        Some((record, snapshot)) => finalize(&record, &snapshot, config, output, submit, format).await,
        None => {
            tracing::info!("Dictation ended without a finalized invoice");
            Ok(())
        }
    }
}

/// Extract an invoice from receipt photos
pub async fn handle_scan(
    config: &Config,
    format: OutputFormat,
    images: Vec<PathBuf>,
    output: Option<PathBuf>,
    submit: bool,
) -> Result<()> {
    let extractor = build_extractor(config)?;
    let bus = MessageBus::new();
    let presenter = spawn_presenter(&bus, format, config.display.clone()).await;
    let mut driver = build_driver(config, extractor, bus.clone())?;

    let (tx, rx) = mpsc::channel(CAPTURE_BUFFER_SIZE);
    let capture = spawn_capture_loop(ImageFileCapture::new(images), tx);

    let snapshot = driver.run(rx).await?;
    capture.await.ok();

    let result = match snapshot.phase {
        Phase::Review => Ok(driver.confirm().await?),
        Phase::Error => Err(anyhow::anyhow!(
            "Scan failed: {}",
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        )),
        _ => Err(anyhow::anyhow!(
            "The receipts did not contain a complete invoice. Try another photo or use `facturo dictate`."
        )),
    };

    let snapshot = driver.snapshot();
    drop(driver);
    drop(bus);
    presenter.await.ok();

    let record = result?;
    finalize(&record, &snapshot, config, output, submit, format).await
}

/// Load recorded partial results from a JSON array file
pub fn load_partials(path: &Path) -> Result<Vec<PartialResult>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let partials: Vec<PartialResult> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of partial results", path.display()))?;
    Ok(partials)
}

/// Merge recorded partial results through a real session, without network
pub async fn replay_partials(config: &Config, partials: Vec<PartialResult>) -> Result<SessionSnapshot> {
    let count = partials.len();
    let extractor = Arc::new(ScriptedExtractor::from_partials(partials));
    let mut driver = build_driver(config, extractor, MessageBus::new())?;

    for i in 0..count {
        if !driver.phase().can_start_capture() {
            break;
        }
        driver.start().await?;
        driver
            .handle_capture(utterance(format!("replay #{}", i + 1)))
            .await?;
    }

    Ok(driver.snapshot())
}

pub async fn handle_replay(file: PathBuf, config: &Config, format: OutputFormat) -> Result<()> {
    let partials = load_partials(&file)?;
    tracing::info!("Replaying {} partial result(s)", partials.len());

    let snapshot = replay_partials(config, partials).await?;

    match format {
        OutputFormat::Text => println!("{}", render_snapshot(&snapshot, &config.display)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }
    Ok(())
}

pub async fn handle_key(action: KeyAction, config: &Config, format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(SERVICE_NAME);

    match action {
        KeyAction::Set => {
            eprint!("Enter API key: ");
            std::io::stderr().flush().ok();
            let mut input = String::new();
            std::io::stdin()
                .read_line(&mut input)
                .context("Failed to read API key")?;

            manager.set_secret(API_KEY_ENTRY, &SecretString::new(input.trim()))?;
            println!("✓ API key stored in the OS keychain");
        }
        KeyAction::Status => {
            let source = resolve_api_key(&config.extraction, &manager)
                .ok()
                .map(|(_, source)| source);
            let label = match source {
                Some(KeySource::Environment) => format!("environment (${})", config.extraction.api_key_env),
                Some(KeySource::Keychain) => "OS keychain".to_string(),
                None => "not configured".to_string(),
            };

            match format {
                OutputFormat::Text => println!("API key: {}", label),
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "configured": source.is_some(), "source": label })
                ),
            }
        }
        KeyAction::Clear => {
            manager.delete_secret(API_KEY_ENTRY)?;
            println!("✓ API key removed from the OS keychain");
        }
    }
    Ok(())
}

pub async fn handle_config(
    action: ConfigAction,
    config: &Config,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    match action {
        ConfigAction::Show => match format {
            OutputFormat::Text => {
                let text = toml::to_string_pretty(config).context("Failed to encode config")?;
                println!("{}", text);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        },
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Validate => {
            // Loading already validated; re-check the file on disk in case it changed
            let reloaded = Config::load_from_path(&path)
                .with_context(|| format!("Invalid configuration at {}", path.display()))?;
            let questions = reloaded.guided_questions()?.len();
            match format {
                OutputFormat::Text => {
                    println!("✓ Configuration is valid ({})", path.display());
                    println!("  Guided questions: {}", questions);
                }
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "valid": true, "path": path, "questions": questions })
                ),
            }
        }
    }
    Ok(())
}

/// Fail early when the export endpoint is needed but missing
pub fn ensure_submit_configured(config: &Config, submit: bool) -> Result<()> {
    if submit && config.export.endpoint.is_none() {
        bail!("--submit requires export.endpoint in config.toml");
    }
    Ok(())
}
