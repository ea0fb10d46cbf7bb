//! Finalized record export
//!
//! A confirmed record leaves the engine either as a JSON file on disk or as a
//! POST to a downstream billing API. Both use the exact record wire format
//! (`party`, `lineItems`, `notes`).

use sdk::errors::EngineError;
use sdk::types::Record;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::secrets::SecretString;

/// Serialize a record in its wire format
pub fn to_json(record: &Record, pretty: bool) -> Result<String, EngineError> {
    let json = if pretty {
        serde_json::to_string_pretty(record)?
    } else {
        serde_json::to_string(record)?
    };
    Ok(json)
}

/// Write `invoice-<session-id>.json` into `dir`, creating it if needed
pub fn write_json(
    record: &Record,
    dir: &Path,
    session_id: Uuid,
    pretty: bool,
) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        EngineError::Export(format!("could not create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(format!("invoice-{}.json", session_id));
    std::fs::write(&path, to_json(record, pretty)?)
        .map_err(|e| EngineError::Export(format!("could not write {}: {}", path.display(), e)))?;

    tracing::info!("Exported invoice to {}", path.display());
    Ok(path)
}

/// Sends finalized records to a downstream billing API
pub struct ApiSubmitter {
    endpoint: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl ApiSubmitter {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Network(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            token,
            client,
        })
    }

    /// Submitter for the configured endpoint, `None` if no endpoint is set
    pub fn from_config(
        config: &ExportConfig,
        timeout: Duration,
    ) -> Result<Option<Self>, EngineError> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };
        let token = config.token_env.as_deref().and_then(SecretString::from_env);
        Self::new(endpoint.clone(), token, timeout).map(Some)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the record; any non-2xx response is an export failure
    pub async fn submit(&self, record: &Record) -> Result<(), EngineError> {
        let mut request = self.client.post(&self.endpoint).json(record);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Export(format!(
                "{} responded with {}",
                self.endpoint, status
            )));
        }

        tracing::info!(
            items = record.line_items.len(),
            "Submitted invoice to {}",
            self.endpoint
        );
        Ok(())
    }
}
