use crate::auth::{self, SessionStore};
use crate::config::AppConfig;
use crate::db;
use crate::draft::DraftStore;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::now_ms;
use crate::ipc::types::{AppState, Request};
use crate::source::ProductionSource;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = state
        .db
        .as_ref()
        .and_then(|conn| state.sessions.get(conn, now_ms()))
        .map(|s| {
            json!({
                "batchKey": s.batch_key,
                "batchLabel": s.batch_label,
                "isAdmin": s.admin(),
            })
        });
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "appName": state.config.app_name,
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "session": session,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let config = match AppConfig::load(&path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    let conn = match db::open_db(&path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "storage_failed", format!("{e:#}"), None),
    };

    // A missing or unreadable passcode list leaves every login failing; the
    // workspace still opens.
    let passcodes_path = config.passcodes_path(&path);
    let passcodes = match auth::load_passcodes(&passcodes_path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "no usable passcode list");
            Vec::new()
        }
    };

    state.sessions = SessionStore::new(
        config.session.storage_key.clone(),
        config.session.expiry_hours,
    );
    state.drafts = DraftStore::new(config.draft.storage_key.clone());
    state.source = Some(ProductionSource::new(config.content_path(&path)));
    state.passcodes = passcodes;
    state.editor = None;
    state.db = Some(conn);
    state.workspace = Some(path.clone());
    state.config = config;

    tracing::info!(
        workspace = %path.to_string_lossy(),
        passcodes = state.passcodes.len(),
        "workspace selected"
    );
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "appName": state.config.app_name,
            "passcodes": state.passcodes.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
