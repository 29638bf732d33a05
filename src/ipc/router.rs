use super::handlers;
use super::helpers::now_ms;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let resp = dispatch(state, &req);
    settle_editor(state);
    resp
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::content::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::editor::try_handle(state, req) {
        return resp;
    }

    tracing::debug!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Writes the draft if the request left the working copy dirty.
fn settle_editor(state: &mut AppState) {
    let (Some(conn), Some(editor)) = (state.db.as_ref(), state.editor.as_mut()) else {
        return;
    };
    if let Err(e) = editor.settle(conn, &state.drafts, now_ms()) {
        tracing::warn!(error = %e, "draft auto-save failed");
    }
}
