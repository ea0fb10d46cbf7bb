use async_trait::async_trait;
use base64::Engine as _;
use sdk::capture::Artifact;
use sdk::types::PartialResult;
use serde_json::{json, Value};
use std::time::Duration;

use super::prompt::{build_prompt, response_schema};
use super::{parse_partial_result, ExtractionError, ExtractionRequest, Extractor};
use crate::config::GeminiConfig;
use crate::secrets::SecretString;

/// Gemini `generateContent` client
///
/// Constructed with an explicit API key; there is no shared global client and
/// no built-in credential.
pub struct GeminiExtractor {
    config: GeminiConfig,
    api_key: SecretString,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(
        config: GeminiConfig,
        api_key: SecretString,
        timeout: Duration,
    ) -> super::Result<Self> {
        if api_key.is_blank() {
            return Err(ExtractionError::AuthenticationFailed(
                "API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            timeout,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_payload(request: &ExtractionRequest) -> Value {
        let mut parts = Vec::new();

        if let Artifact::Image { bytes, mime_type } = &request.artifact {
            parts.push(json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(bytes),
                }
            }));
        }
        parts.push(json!({ "text": build_prompt(request) }));

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        })
    }
}

/// Concatenated text of the first candidate
fn candidate_text(data: &Value) -> super::Result<String> {
    if let Some(reason) = data
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ExtractionError::Blocked(reason.to_string()));
    }

    let candidate = data
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| ExtractionError::Blocked("no candidates in response".to_string()))?;

    if candidate.get("finishReason").and_then(Value::as_str) == Some("SAFETY") {
        return Err(ExtractionError::Blocked("SAFETY".to_string()));
    }

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractionError::Parse("No parts in candidate content".to_string()))?;

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect())
}

#[async_trait]
impl Extractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, request: &ExtractionRequest) -> super::Result<PartialResult> {
        let payload = Self::build_payload(request);

        tracing::debug!(
            model = %self.config.model,
            modality = %request.artifact.modality(),
            "Sending extraction request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout(self.timeout.as_secs())
                } else {
                    ExtractionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                400 | 404 => ExtractionError::InvalidRequest(text),
                401 | 403 => ExtractionError::AuthenticationFailed(text),
                429 => ExtractionError::RateLimitExceeded,
                _ => ExtractionError::ProviderUnavailable(format!(
                    "Gemini API error ({}): {}",
                    status, text
                )),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let text = candidate_text(&data)?;
        parse_partial_result(&text)
    }
}
