use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{FetchRequest, SourceFetcher, decode_event_array};
use crate::error::{DatebookError, DatebookResult};
use crate::event::EventInput;

/// Events given up front. The range is ignored.
#[derive(Debug, Clone)]
pub struct ArrayFetcher {
    events: Vec<EventInput>,
}

impl ArrayFetcher {
    pub fn new(events: Vec<EventInput>) -> Self {
        ArrayFetcher { events }
    }
}

#[async_trait]
impl SourceFetcher for ArrayFetcher {
    fn kind(&self) -> &'static str {
        "array"
    }

    fn ignores_range(&self) -> bool {
        true
    }

    async fn fetch(&self, _request: &FetchRequest) -> DatebookResult<Vec<EventInput>> {
        Ok(self.events.clone())
    }
}

/// A JSON array of events read from disk. Behaves like an array source.
#[derive(Debug, Clone)]
pub struct JsonFileFetcher {
    path: PathBuf,
}

impl JsonFileFetcher {
    pub fn new(path: PathBuf) -> Self {
        JsonFileFetcher { path }
    }
}

#[async_trait]
impl SourceFetcher for JsonFileFetcher {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn ignores_range(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &FetchRequest) -> DatebookResult<Vec<EventInput>> {
        debug!(source = %request.source_id, path = %self.path.display(), "Reading event file");
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DatebookError::Fetch(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let origin = self.path.display().to_string();
        decode_event_array(&content, &origin)
            .map_err(|e| DatebookError::Fetch(format!("Invalid event file {origin}: {e}")))
    }
}
