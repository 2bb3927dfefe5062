use std::path::PathBuf;

use anyhow::Context;
use futures::future::BoxFuture;
use tracing::debug;

use super::SourceError;
use crate::cache::PlacesRetriever;
use crate::models::Place;

/// Reads the full place list from a JSON file on every retrieval.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<Place>, SourceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let places: Vec<Place> = serde_json::from_str(&contents)?;
        debug!(path = %self.path.display(), count = places.len(), "Loaded places file");
        Ok(places)
    }
}

impl PlacesRetriever for JsonFileSource {
    fn retrieve(&self) -> BoxFuture<'_, anyhow::Result<Vec<Place>>> {
        Box::pin(async move {
            self.load()
                .await
                .with_context(|| format!("Failed to load places from {}", self.path.display()))
        })
    }
}
