use std::path::PathBuf;

use crate::auth::{PasscodeEntry, SessionStore};
use crate::config::AppConfig;
use crate::draft::DraftStore;
use crate::editor::Editor;
use crate::source::ProductionSource;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub drafts: DraftStore,
    pub source: Option<ProductionSource>,
    pub passcodes: Vec<PasscodeEntry>,
    /// Opened on the first editor request of an admin session.
    pub editor: Option<Editor>,
}

impl AppState {
    pub fn new() -> Self {
        let config = AppConfig::default();
        Self {
            workspace: None,
            db: None,
            sessions: SessionStore::new(
                config.session.storage_key.clone(),
                config.session.expiry_hours,
            ),
            drafts: DraftStore::new(config.draft.storage_key.clone()),
            config,
            source: None,
            passcodes: Vec::new(),
            editor: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
