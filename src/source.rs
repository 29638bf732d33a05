use crate::content::health;
use crate::content::ContentData;
use anyhow::Context;
use std::path::PathBuf;

/// The read-only production content document. Read on first use and kept
/// for the rest of the process; a failed read is not cached.
#[derive(Debug)]
pub struct ProductionSource {
    path: PathBuf,
    cache: Option<ContentData>,
}

impl ProductionSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path, cache: None }
    }

    pub fn load(&mut self) -> anyhow::Result<ContentData> {
        if let Some(content) = &self.cache {
            return Ok(content.clone());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.to_string_lossy()))?;
        let decoded = ContentData::from_json_str(&raw)
            .with_context(|| format!("{} does not match the content schema", self.path.to_string_lossy()))?;

        let content = health::repair(&decoded);
        if !content.shares_all(&decoded) {
            tracing::warn!("repaired inconsistent references in production content");
        }
        tracing::info!(
            courses = content.courses.len(),
            modules = content.modules.len(),
            items = content.items.len(),
            "production content loaded"
        );
        self.cache = Some(content.clone());
        Ok(content)
    }
}
