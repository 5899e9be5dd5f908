/// External evidence collaborators.
///
/// The pipeline only knows the `EvidenceFetcher` seam; real literature API
/// clients live behind it and are out of scope here. `FileFetcher` replays a
/// recorded evidence file, which is what the CLI and tests use.
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::error::AppError;
use crate::model::{Source, SourceEvidence};

#[async_trait]
pub trait EvidenceFetcher: Send + Sync {
    async fn fetch(&self, query: &str, source: Source) -> Result<SourceEvidence, AppError>;
}

/// Replay fetcher backed by a JSON file of the form
/// `{"pubmed": {...}, "guidelines": {...}}`, keyed by source name.
/// Unknown source names in the file are logged and skipped.
pub struct FileFetcher {
    by_source: HashMap<Source, SourceEvidence>,
}

impl FileFetcher {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Fetch(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let named: HashMap<String, SourceEvidence> = serde_json::from_str(raw)
            .map_err(|e| AppError::Fetch(format!("malformed evidence file: {e}")))?;

        let mut by_source = HashMap::new();
        for (name, evidence) in named {
            match name.parse::<Source>() {
                Ok(source) => {
                    by_source.insert(source, evidence);
                }
                Err(e) => warn!(error = %e, "skipping unknown source in evidence file"),
            }
        }
        Ok(Self { by_source })
    }

    /// Sources present in the file, in allow-list order.
    pub fn sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.by_source.contains_key(s))
            .collect()
    }
}

#[async_trait]
impl EvidenceFetcher for FileFetcher {
    async fn fetch(&self, _query: &str, source: Source) -> Result<SourceEvidence, AppError> {
        self.by_source
            .get(&source)
            .cloned()
            .ok_or_else(|| AppError::Fetch(format!("no recorded evidence for source {source}")))
    }
}
