use crate::auth::{LoginOutcome, SessionData};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_ms};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn session_json(session: &SessionData) -> serde_json::Value {
    json!({
        "batchKey": session.batch_key,
        "batchLabel": session.batch_label,
        "expiresAt": session.expires_at,
        "isAdmin": session.admin(),
    })
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    // A non-string passcode is treated as blank.
    let passcode = req
        .params
        .get("passcode")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match state.sessions.login(conn, &state.passcodes, passcode, now_ms()) {
        Ok(LoginOutcome::Granted(session)) => {
            ok(&req.id, json!({ "session": session_json(&session) }))
        }
        Ok(LoginOutcome::Denied(message)) => err(&req.id, "auth_failed", message, None),
        Err(e) => err(&req.id, "storage_failed", format!("{e:#}"), None),
    }
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let session = state.sessions.get(conn, now_ms());
    ok(
        &req.id,
        json!({ "session": session.as_ref().map(session_json) }),
    )
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(e) = state.sessions.clear(conn) {
        return err(&req.id, "storage_failed", format!("{e:#}"), None);
    }
    tracing::info!("logged out");
    ok(&req.id, json!({ "loggedOut": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
