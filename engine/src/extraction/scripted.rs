use async_trait::async_trait;
use sdk::types::PartialResult;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use super::{ExtractionError, ExtractionRequest, Extractor};

/// Extractor that plays back prerecorded results in order
///
/// Backs the offline `replay` command and the session tests. Once the script
/// runs out every call fails with `ProviderUnavailable`.
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<super::Result<PartialResult>>>,
    seen: Mutex<Vec<ExtractionRequest>>,
}

impl ScriptedExtractor {
    pub fn new(script: impl IntoIterator<Item = super::Result<PartialResult>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Script made only of successful results
    pub fn from_partials(partials: impl IntoIterator<Item = PartialResult>) -> Self {
        Self::new(partials.into_iter().map(Ok))
    }

    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }

    /// Requests received so far, oldest first
    pub async fn requests(&self) -> Vec<ExtractionRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, request: &ExtractionRequest) -> super::Result<PartialResult> {
        self.seen.lock().await.push(request.clone());
        self.script.lock().await.pop_front().unwrap_or_else(|| {
            Err(ExtractionError::ProviderUnavailable(
                "script exhausted".to_string(),
            ))
        })
    }
}
