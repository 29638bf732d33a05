use crate::auth::SessionData;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde::de::DeserializeOwned;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_index(req: &Request, key: &str) -> Result<usize, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a non-negative integer", key),
                None,
            )
        })
}

/// Decodes `params[key]` into `T`, reporting serde's message as `bad_params`.
pub fn required_obj<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn current_session(state: &AppState, req: &Request) -> Result<SessionData, serde_json::Value> {
    let conn = db_conn(state, req)?;
    state
        .sessions
        .get(conn, now_ms())
        .ok_or_else(|| err(&req.id, "not_authenticated", "log in first", None))
}

pub fn require_admin(state: &AppState, req: &Request) -> Result<SessionData, serde_json::Value> {
    let session = current_session(state, req)?;
    if !session.admin() {
        return Err(err(
            &req.id,
            "forbidden",
            "editor access requires an admin session",
            None,
        ));
    }
    Ok(session)
}
