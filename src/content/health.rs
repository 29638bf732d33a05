use super::model::{ContentData, ItemType};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthIssue {
    pub severity: Severity,
    pub message: String,
    pub detail: String,
}

impl HealthIssue {
    fn warning(message: String, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            detail: detail.into(),
        }
    }

    fn error(message: String, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            detail: detail.into(),
        }
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

/// Editorial problems (missing urls, empty containers) followed by broken
/// references.
pub fn check(content: &ContentData) -> Vec<HealthIssue> {
    let mut issues = Vec::new();

    for item in content.items.values() {
        if item.kind.needs_url() && is_blank(&item.url) {
            issues.push(HealthIssue::warning(
                format!("\"{}\" missing URL", item.title),
                item.kind.as_str(),
            ));
        }
        if item.kind == ItemType::Youtube && is_blank(&item.embed_url) {
            issues.push(HealthIssue::warning(
                format!("\"{}\" missing embed URL", item.title),
                "youtube",
            ));
        }
        if item.kind == ItemType::Quiz
            && item.quiz_questions.as_ref().map(|q| q.is_empty()).unwrap_or(true)
        {
            issues.push(HealthIssue::error(
                format!("\"{}\" has no questions", item.title),
                "quiz",
            ));
        }
    }
    for module in content.modules.values() {
        if module.items.is_empty() {
            issues.push(HealthIssue::warning(
                format!("Module \"{}\" is empty", module.title),
                "0 items",
            ));
        }
    }
    for course in content.courses.values() {
        if course.modules.is_empty() {
            issues.push(HealthIssue::warning(
                format!("Course \"{}\" has no modules", course.title),
                "empty",
            ));
        }
    }

    issues.extend(dangling_references(content));
    issues
}

pub fn dangling_references(content: &ContentData) -> Vec<HealthIssue> {
    let mut issues = Vec::new();
    for (key, batch) in content.batches.iter() {
        for id in batch.courses.iter().filter(|id| !content.courses.contains_key(*id)) {
            issues.push(HealthIssue::error(
                format!("Batch \"{}\" lists unknown course {}", key, id),
                "reference",
            ));
        }
    }
    for course in content.courses.values() {
        for id in course.modules.iter().filter(|id| !content.modules.contains_key(*id)) {
            issues.push(HealthIssue::error(
                format!("Course \"{}\" lists unknown module {}", course.title, id),
                "reference",
            ));
        }
    }
    for module in content.modules.values() {
        if !content.courses.contains_key(&module.course_id) {
            issues.push(HealthIssue::error(
                format!("Module \"{}\" belongs to unknown course {}", module.title, module.course_id),
                "reference",
            ));
        }
        for id in module.items.iter().filter(|id| !content.items.contains_key(*id)) {
            issues.push(HealthIssue::error(
                format!("Module \"{}\" lists unknown item {}", module.title, id),
                "reference",
            ));
        }
    }
    for item in content.items.values() {
        if !content.modules.contains_key(&item.module_id) {
            issues.push(HealthIssue::error(
                format!("Item \"{}\" belongs to unknown module {}", item.title, item.module_id),
                "reference",
            ));
        }
    }
    issues
}

fn has_repeats(ids: &[String]) -> bool {
    let mut seen = HashSet::new();
    ids.iter().any(|id| !seen.insert(id))
}

/// Brings a decoded graph in line with the referential invariants: dangling
/// child ids are scrubbed, modules/items whose parent is gone are dropped,
/// and module `order` is renumbered to list position. A graph that already
/// satisfies the invariants comes back sharing every collection.
pub fn repair(content: &ContentData) -> ContentData {
    let mut next = content.clone();

    let live_modules: HashSet<String> = content
        .modules
        .values()
        .filter(|m| {
            content
                .courses
                .get(&m.course_id)
                .map(|c| c.modules.contains(&m.id))
                .unwrap_or(false)
        })
        .map(|m| m.id.clone())
        .collect();
    let live_items: HashSet<String> = content
        .items
        .values()
        .filter(|i| {
            live_modules.contains(&i.module_id)
                && content
                    .modules
                    .get(&i.module_id)
                    .map(|m| m.items.contains(&i.id))
                    .unwrap_or(false)
        })
        .map(|i| i.id.clone())
        .collect();

    if live_items.len() != content.items.len() {
        Arc::make_mut(&mut next.items).retain(|id, _| live_items.contains(id));
    }

    let lists_item = |module_id: &str, item_id: &str| {
        live_items.contains(item_id)
            && content.items.get(item_id).map(|i| i.module_id == module_id).unwrap_or(false)
    };
    let modules_dirty = content.modules.values().any(|m| {
        !live_modules.contains(&m.id)
            || m.items.iter().any(|i| !lists_item(m.id.as_str(), i.as_str()))
            || has_repeats(&m.items)
    });
    if modules_dirty {
        let modules = Arc::make_mut(&mut next.modules);
        modules.retain(|id, _| live_modules.contains(id));
        for m in modules.values_mut() {
            let mut seen = HashSet::new();
            let id = m.id.clone();
            m.items.retain(|i| lists_item(id.as_str(), i.as_str()) && seen.insert(i.clone()));
        }
    }

    // A module appears once, in the list of the course it names.
    let lists_module = |course_id: &str, module_id: &str| {
        live_modules.contains(module_id)
            && content.modules.get(module_id).map(|m| m.course_id == course_id).unwrap_or(false)
    };
    let courses_dirty = content.courses.values().any(|c| {
        has_repeats(&c.modules)
            || c.modules.iter().enumerate().any(|(idx, m)| {
                !lists_module(c.id.as_str(), m.as_str())
                    || content.modules.get(m).map(|m| m.order != idx as u32 + 1).unwrap_or(false)
            })
    });
    if courses_dirty {
        let courses = Arc::make_mut(&mut next.courses);
        for c in courses.values_mut() {
            let mut seen = HashSet::new();
            let id = c.id.clone();
            c.modules.retain(|m| lists_module(id.as_str(), m.as_str()) && seen.insert(m.clone()));
        }
        let lists: Vec<Vec<String>> = courses.values().map(|c| c.modules.clone()).collect();
        let modules = Arc::make_mut(&mut next.modules);
        for list in lists {
            for (idx, id) in list.iter().enumerate() {
                if let Some(m) = modules.get_mut(id) {
                    m.order = idx as u32 + 1;
                }
            }
        }
    }

    if content
        .batches
        .values()
        .any(|b| b.courses.iter().any(|c| !content.courses.contains_key(c)))
    {
        for b in Arc::make_mut(&mut next.batches).values_mut() {
            b.courses.retain(|c| content.courses.contains_key(c));
        }
    }
    next
}
