//! Read-only viewer queries over production content, scoped to the batch of
//! the current session. Admin sessions may name any batch via `batchKey` and
//! read any course, module, or item by id.

use crate::auth::SessionData;
use crate::content::query::{self, ItemFilters};
use crate::content::{ContentData, ItemType};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{current_session, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const DEFAULT_RECENT_LIMIT: usize = 5;

struct Viewer {
    session: SessionData,
    batch_key: String,
    content: ContentData,
}

impl Viewer {
    fn sees_course(&self, course_id: &str) -> bool {
        self.session.admin() || query::batch_has_course(&self.content, &self.batch_key, course_id)
    }
}

fn viewer(state: &mut AppState, req: &Request) -> Result<Viewer, serde_json::Value> {
    let session = current_session(state, req)?;
    let batch_key = match optional_str(req, "batchKey") {
        Some(key) if session.admin() => key,
        _ => session.batch_key.clone(),
    };
    let Some(source) = state.source.as_mut() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let content = source
        .load()
        .map_err(|e| err(&req.id, "content_load_failed", format!("{e:#}"), None))?;
    Ok(Viewer {
        session,
        batch_key,
        content,
    })
}

fn not_found(req: &Request, what: &str, id: &str) -> serde_json::Value {
    err(
        &req.id,
        "not_found",
        format!("{} not found", what),
        Some(json!({ "id": id })),
    )
}

fn handle_batch_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::batch(&v.content, &v.batch_key) {
        Some(batch) => ok(&req.id, json!({ "batchKey": v.batch_key, "batch": batch })),
        None => not_found(req, "batch", &v.batch_key),
    }
}

fn handle_batch_courses(state: &mut AppState, req: &Request) -> serde_json::Value {
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let courses = query::batch_courses(&v.content, &v.batch_key);
    ok(&req.id, json!({ "courses": courses }))
}

fn handle_course_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match v.content.course(&course_id) {
        Some(course) if v.sees_course(&course_id) => ok(&req.id, json!({ "course": course })),
        _ => not_found(req, "course", &course_id),
    }
}

fn handle_course_modules(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !v.sees_course(&course_id) {
        return ok(&req.id, json!({ "modules": [] }));
    }
    let modules = query::course_modules(&v.content, &course_id);
    ok(&req.id, json!({ "modules": modules }))
}

fn handle_module_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match v.content.module(&module_id) {
        Some(module) if v.sees_course(&module.course_id) => {
            ok(&req.id, json!({ "module": module }))
        }
        _ => not_found(req, "module", &module_id),
    }
}

fn handle_module_items(state: &mut AppState, req: &Request) -> serde_json::Value {
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let visible = v
        .content
        .module(&module_id)
        .map(|m| v.sees_course(&m.course_id))
        .unwrap_or(false);
    if !visible {
        return ok(&req.id, json!({ "items": [] }));
    }
    let items = query::module_items(&v.content, &module_id);
    ok(&req.id, json!({ "items": items }))
}

fn handle_item_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(item) = v.content.item(&item_id) else {
        return not_found(req, "item", &item_id);
    };
    let course_id = query::item_course_id(&v.content, item);
    match course_id {
        Some(cid) if v.sees_course(cid) => ok(
            &req.id,
            json!({ "item": item, "courseId": cid }),
        ),
        _ => not_found(req, "item", &item_id),
    }
}

fn handle_items_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = match req.params.get("limit") {
        None | Some(serde_json::Value::Null) => DEFAULT_RECENT_LIMIT,
        Some(raw) => match raw.as_u64() {
            Some(n) => n as usize,
            None => return err(&req.id, "bad_params", "limit must be a non-negative integer", None),
        },
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let items = query::recent_items(&v.content, &v.batch_key, limit);
    ok(&req.id, json!({ "items": items }))
}

fn handle_items_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let search = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let kind = match optional_str(req, "type") {
        None => None,
        Some(raw) => match ItemType::parse(&raw) {
            Some(k) => Some(k),
            None => {
                let allowed: Vec<&str> = ItemType::ALL.iter().map(|t| t.as_str()).collect();
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown item type: {}", raw),
                    Some(json!({ "allowed": allowed })),
                );
            }
        },
    };
    let filters = ItemFilters {
        kind,
        tag: optional_str(req, "tag"),
    };
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let items = query::search_items(&v.content, &v.batch_key, &search, &filters);
    ok(&req.id, json!({ "items": items }))
}

fn handle_tags_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let v = match viewer(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "tags": query::all_tags(&v.content, &v.batch_key) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "content.batch.get" => Some(handle_batch_get(state, req)),
        "content.batch.courses" => Some(handle_batch_courses(state, req)),
        "content.course.get" => Some(handle_course_get(state, req)),
        "content.course.modules" => Some(handle_course_modules(state, req)),
        "content.module.get" => Some(handle_module_get(state, req)),
        "content.module.items" => Some(handle_module_items(state, req)),
        "content.item.get" => Some(handle_item_get(state, req)),
        "content.items.recent" => Some(handle_items_recent(state, req)),
        "content.items.search" => Some(handle_items_search(state, req)),
        "content.tags.list" => Some(handle_tags_list(state, req)),
        _ => None,
    }
}
