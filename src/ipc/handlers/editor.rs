use crate::content::ops::{NewCourse, NewItem, NewModule};
use crate::content::query;
use crate::content::{health, Batch, ContentItem, Course, Module};
use crate::draft::DraftStore;
use crate::editor::Editor;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{now_ms, optional_str, require_admin, required_index, required_obj, required_str};
use crate::ipc::types::{AppState, Request};
use crate::source::ProductionSource;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

/// Borrowed pieces of the app state an editor request works with.
struct EditorCtx<'a> {
    kv: &'a Connection,
    drafts: &'a DraftStore,
    source: &'a mut ProductionSource,
    editor: &'a mut Editor,
    workspace: Option<&'a PathBuf>,
    export_dir: &'a str,
}

fn no_workspace(req: &Request) -> serde_json::Value {
    err(&req.id, "no_workspace", "select a workspace first", None)
}

/// Gates on an admin session, then opens the working copy if this is the
/// first editor request since the workspace was selected.
fn editor_ctx<'a>(state: &'a mut AppState, req: &Request) -> Result<EditorCtx<'a>, serde_json::Value> {
    require_admin(state, req)?;
    let AppState {
        workspace,
        db,
        config,
        drafts,
        source,
        editor,
        ..
    } = state;
    let kv = db.as_ref().ok_or_else(|| no_workspace(req))?;
    let source = source.as_mut().ok_or_else(|| no_workspace(req))?;
    let opened = match editor.take() {
        Some(e) => e,
        None => Editor::open(kv, drafts, source)
            .map_err(|e| err(&req.id, "content_load_failed", format!("{e:#}"), None))?,
    };
    Ok(EditorCtx {
        kv,
        drafts,
        source,
        editor: editor.insert(opened),
        workspace: workspace.as_ref(),
        export_dir: &config.export.dir,
    })
}

fn status_json(ctx: &EditorCtx<'_>) -> serde_json::Value {
    json!({
        "isDirty": ctx.editor.is_dirty(),
        "lastSaved": ctx.editor.last_saved(),
        "hasDraft": ctx.drafts.has(ctx.kv),
        "draftBytes": ctx.drafts.size_bytes(ctx.kv),
    })
}

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    // Always re-read: a draft written by another process wins over the
    // in-memory copy.
    state.editor = None;
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, status_json(&ctx))
}

fn handle_content(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "content": ctx.editor.content() }))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, status_json(&ctx))
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let input: NewCourse = match required_obj(req, "course") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let batch_key = match required_str(req, "batchKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_id = ctx.editor.create_course(input, &batch_key);
    tracing::info!(course = %course_id, batch = %batch_key, "course created");
    ok(&req.id, json!({ "courseId": course_id, "changed": true }))
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course: Course = match required_obj(req, "course") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.edit_course(course);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.remove_course(&course_id);
    if changed {
        tracing::info!(course = %course_id, "course deleted");
    }
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_courses_duplicate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let copy = ctx.editor.duplicate_course(&course_id);
    ok(
        &req.id,
        json!({ "courseId": copy, "changed": copy.is_some() }),
    )
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

fn handle_modules_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let input: NewModule = match required_obj(req, "module") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let module_id = ctx.editor.create_module(input);
    ok(
        &req.id,
        json!({ "moduleId": module_id, "changed": module_id.is_some() }),
    )
}

fn handle_modules_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module: Module = match required_obj(req, "module") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.edit_module(module);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_modules_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.remove_module(&module_id);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_modules_duplicate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let copy = ctx.editor.duplicate_module(&module_id);
    ok(
        &req.id,
        json!({ "moduleId": copy, "changed": copy.is_some() }),
    )
}

fn handle_modules_reorder(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let from = match required_index(req, "fromIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match required_index(req, "toIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.reorder_modules(&course_id, from, to);
    let modules = ctx
        .editor
        .content()
        .course(&course_id)
        .map(|c| c.modules.clone())
        .unwrap_or_default();
    ok(&req.id, json!({ "changed": changed, "modules": modules }))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

fn handle_items_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let input: NewItem = match required_obj(req, "item") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let item_id = ctx.editor.create_item(input);
    ok(
        &req.id,
        json!({ "itemId": item_id, "changed": item_id.is_some() }),
    )
}

fn handle_items_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item: ContentItem = match required_obj(req, "item") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.edit_item(item);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_items_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.remove_item(&item_id);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_items_duplicate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let copy = ctx.editor.duplicate_item(&item_id);
    ok(
        &req.id,
        json!({ "itemId": copy, "changed": copy.is_some() }),
    )
}

fn handle_items_reorder(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let from = match required_index(req, "fromIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match required_index(req, "toIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.reorder_items(&module_id, from, to);
    let items = ctx
        .editor
        .content()
        .module(&module_id)
        .map(|m| m.items.clone())
        .unwrap_or_default();
    ok(&req.id, json!({ "changed": changed, "items": items }))
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

fn handle_batches_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match required_str(req, "batchKey") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e,
    };
    if key.is_empty() {
        return err(&req.id, "bad_params", "batchKey must not be empty", None);
    }
    let batch: Batch = match required_obj(req, "batch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.create_batch(&key, batch);
    ok(&req.id, json!({ "batchKey": key, "changed": changed }))
}

fn handle_batches_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match required_str(req, "batchKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let batch: Batch = match required_obj(req, "batch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.edit_batch(&key, batch);
    ok(&req.id, json!({ "changed": changed }))
}

fn handle_batches_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match required_str(req, "batchKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed = ctx.editor.remove_batch(&key);
    ok(&req.id, json!({ "changed": changed }))
}

// ---------------------------------------------------------------------------
// Draft lifecycle
// ---------------------------------------------------------------------------

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctx.editor.save(ctx.kv, ctx.drafts, now_ms()) {
        return err(&req.id, "storage_failed", format!("{e:#}"), None);
    }
    ok(&req.id, status_json(&ctx))
}

fn handle_discard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctx.editor.discard(ctx.kv, ctx.drafts) {
        return err(&req.id, "storage_failed", format!("{e:#}"), None);
    }
    tracing::info!("draft discarded");
    ok(&req.id, status_json(&ctx))
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctx.editor.reset_to_production(ctx.kv, ctx.drafts, ctx.source) {
        return err(&req.id, "content_load_failed", format!("{e:#}"), None);
    }
    ok(&req.id, status_json(&ctx))
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_override = optional_str(req, "outDir").map(PathBuf::from);
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let out_dir = match (out_override, ctx.workspace) {
        (Some(dir), _) => dir,
        (None, Some(ws)) => ws.join(ctx.export_dir),
        (None, None) => return no_workspace(req),
    };
    // Export names carry the UTC date.
    let today = chrono::Utc::now().date_naive();
    match ctx.editor.export(&out_dir, today) {
        Ok(path) => {
            tracing::info!(path = %path.to_string_lossy(), "content exported");
            ok(&req.id, json!({ "path": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

fn handle_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let search = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let hits = query::search_all(ctx.editor.content(), &search);
    ok(&req.id, json!({ "hits": hits }))
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let issues = health::check(ctx.editor.content());
    let draft_kb = ctx.drafts.size_bytes(ctx.kv) as f64 / 1024.0;
    ok(
        &req.id,
        json!({
            "issues": issues,
            "draftSizeKb": (draft_kb * 10.0).round() / 10.0,
        }),
    )
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctx = match editor_ctx(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "stats": query::stats(ctx.editor.content()) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "editor.open" => Some(handle_open(state, req)),
        "editor.content" => Some(handle_content(state, req)),
        "editor.status" => Some(handle_status(state, req)),
        "editor.courses.create" => Some(handle_courses_create(state, req)),
        "editor.courses.update" => Some(handle_courses_update(state, req)),
        "editor.courses.delete" => Some(handle_courses_delete(state, req)),
        "editor.courses.duplicate" => Some(handle_courses_duplicate(state, req)),
        "editor.modules.create" => Some(handle_modules_create(state, req)),
        "editor.modules.update" => Some(handle_modules_update(state, req)),
        "editor.modules.delete" => Some(handle_modules_delete(state, req)),
        "editor.modules.duplicate" => Some(handle_modules_duplicate(state, req)),
        "editor.modules.reorder" => Some(handle_modules_reorder(state, req)),
        "editor.items.create" => Some(handle_items_create(state, req)),
        "editor.items.update" => Some(handle_items_update(state, req)),
        "editor.items.delete" => Some(handle_items_delete(state, req)),
        "editor.items.duplicate" => Some(handle_items_duplicate(state, req)),
        "editor.items.reorder" => Some(handle_items_reorder(state, req)),
        "editor.batches.create" => Some(handle_batches_create(state, req)),
        "editor.batches.update" => Some(handle_batches_update(state, req)),
        "editor.batches.delete" => Some(handle_batches_delete(state, req)),
        "editor.save" => Some(handle_save(state, req)),
        "editor.discard" => Some(handle_discard(state, req)),
        "editor.reset" => Some(handle_reset(state, req)),
        "editor.export" => Some(handle_export(state, req)),
        "editor.search" => Some(handle_search(state, req)),
        "editor.health" => Some(handle_health(state, req)),
        "editor.stats" => Some(handle_stats(state, req)),
        _ => None,
    }
}
