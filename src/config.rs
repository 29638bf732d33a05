use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "app.config.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub expiry_hours: i64,
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_hours: 8,
            storage_key: "lws_session".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftConfig {
    pub storage_key: String,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            storage_key: "lws_draft_content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentConfig {
    /// Relative to the workspace.
    pub path: String,
    pub passcodes_path: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: "content/index.json".to_string(),
            passcodes_path: "passcodes.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: "exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub app_name: String,
    pub session: SessionConfig,
    pub draft: DraftConfig,
    pub content: ContentConfig,
    pub export: ExportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Learn with Smile".to_string(),
            session: SessionConfig::default(),
            draft: DraftConfig::default(),
            content: ContentConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `app.config.json` from the workspace. A missing file yields the
    /// defaults; a malformed one is an error.
    pub fn load(workspace: &Path) -> anyhow::Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        let cfg: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("{} is invalid", path.to_string_lossy()))?;
        Ok(cfg)
    }

    pub fn content_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.content.path)
    }

    pub fn passcodes_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.content.passcodes_path)
    }

    pub fn export_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.export.dir)
    }
}
