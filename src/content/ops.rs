//! Copy-on-write mutations over [`ContentData`].
//!
//! Every function takes the current graph by reference and returns a new one.
//! Only the collections a mutation touches are re-allocated; the rest stay
//! shared with the input. Unknown ids leave the graph untouched, so
//! `result.shares_all(input)` is the "nothing changed" test.

use super::ids::fresh_id;
use super::model::{
    Batch, ContentData, ContentItem, Course, CourseLevel, CourseStatus, ItemType, Module,
    QuizQuestion, QuizSettings,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

const COPY_SUFFIX: &str = " (Copy)";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<CourseLevel>,
    #[serde(default)]
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModule {
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub module_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ItemType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub audio_duration: Option<String>,
    #[serde(default)]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
    #[serde(default)]
    pub quiz_settings: Option<QuizSettings>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaults to the creation time.
    #[serde(default)]
    pub published_at: Option<String>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Sets `order` to the 1-based position of every module in `ids`.
fn renumber_modules(modules: &mut Arc<BTreeMap<String, Module>>, ids: &[String]) {
    let stale = ids.iter().enumerate().any(|(idx, id)| {
        modules
            .get(id)
            .map(|m| m.order != idx as u32 + 1)
            .unwrap_or(false)
    });
    if !stale {
        return;
    }
    let modules = Arc::make_mut(modules);
    for (idx, id) in ids.iter().enumerate() {
        if let Some(m) = modules.get_mut(id) {
            m.order = idx as u32 + 1;
        }
    }
}

/// List-splice move. Returns false when either index is out of bounds.
fn splice_move(list: &mut Vec<String>, from: usize, to: usize) -> bool {
    if from >= list.len() || to >= list.len() {
        return false;
    }
    let moved = list.remove(from);
    list.insert(to, moved);
    true
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Inserts or overwrites the batch under `key`. Course ids that do not exist
/// are dropped from its list.
pub fn put_batch(content: &ContentData, key: &str, batch: Batch) -> ContentData {
    let mut next = content.clone();
    let mut batch = batch;
    let mut seen = HashSet::new();
    batch
        .courses
        .retain(|id| content.courses.contains_key(id) && seen.insert(id.clone()));
    Arc::make_mut(&mut next.batches).insert(key.to_string(), batch);
    next
}

pub fn update_batch(content: &ContentData, key: &str, batch: Batch) -> ContentData {
    if !content.batches.contains_key(key) {
        return content.clone();
    }
    put_batch(content, key, batch)
}

pub fn delete_batch(content: &ContentData, key: &str) -> ContentData {
    let mut next = content.clone();
    if content.batches.contains_key(key) {
        Arc::make_mut(&mut next.batches).remove(key);
    }
    next
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// Creates a course and appends it to `batch_key`'s list when that batch
/// exists. Returns the new graph and the course id.
pub fn add_course(content: &ContentData, input: NewCourse, batch_key: &str) -> (ContentData, String) {
    let mut next = content.clone();
    let id = fresh_id("course", &content.courses);
    let course = Course {
        id: id.clone(),
        title: input.title,
        description: input.description,
        thumbnail: input.thumbnail,
        instructor: input.instructor,
        duration: input.duration,
        modules: Vec::new(),
        category: input.category,
        level: input.level,
        status: input.status,
    };
    Arc::make_mut(&mut next.courses).insert(id.clone(), course);
    if content.batches.contains_key(batch_key) {
        if let Some(batch) = Arc::make_mut(&mut next.batches).get_mut(batch_key) {
            batch.courses.push(id.clone());
        }
    }
    (next, id)
}

/// Replaces the stored course's fields. The stored module list is kept.
pub fn update_course(content: &ContentData, course: Course) -> ContentData {
    let mut next = content.clone();
    let Some(existing) = content.courses.get(&course.id) else {
        return next;
    };
    let mut course = course;
    course.modules = existing.modules.clone();
    if &course == existing {
        return next;
    }
    Arc::make_mut(&mut next.courses).insert(course.id.clone(), course);
    next
}

/// Removes the course, its modules, their items, and every batch reference.
pub fn delete_course(content: &ContentData, course_id: &str) -> ContentData {
    let mut next = content.clone();
    let Some(course) = content.courses.get(course_id) else {
        return next;
    };

    let module_ids: HashSet<&String> = course
        .modules
        .iter()
        .chain(
            content
                .modules
                .values()
                .filter(|m| m.course_id == course_id)
                .map(|m| &m.id),
        )
        .collect();
    let item_ids: HashSet<&String> = module_ids
        .iter()
        .filter_map(|mid| content.modules.get(*mid))
        .flat_map(|m| m.items.iter())
        .chain(
            content
                .items
                .values()
                .filter(|i| module_ids.contains(&i.module_id))
                .map(|i| &i.id),
        )
        .collect();

    if !item_ids.is_empty() {
        let items = Arc::make_mut(&mut next.items);
        for id in &item_ids {
            items.remove(*id);
        }
    }
    if module_ids.iter().any(|id| content.modules.contains_key(*id)) {
        let modules = Arc::make_mut(&mut next.modules);
        for id in &module_ids {
            modules.remove(*id);
        }
    }
    Arc::make_mut(&mut next.courses).remove(course_id);

    if content
        .batches
        .values()
        .any(|b| b.courses.iter().any(|c| c == course_id))
    {
        for batch in Arc::make_mut(&mut next.batches).values_mut() {
            batch.courses.retain(|c| c != course_id);
        }
    }
    next
}

/// Deep-copies a course with its modules and items under fresh ids and adds
/// the copy to every batch that lists the original.
pub fn duplicate_course(content: &ContentData, course_id: &str) -> Option<(ContentData, String)> {
    let source = content.courses.get(course_id)?.clone();
    let mut next = content.clone();

    let new_course_id = fresh_id("course", &content.courses);
    let mut new_module_ids = Vec::with_capacity(source.modules.len());
    for module_id in &source.modules {
        let Some(module) = content.modules.get(module_id).cloned() else {
            continue;
        };
        let new_module_id = clone_module_into(&mut next, module, &new_course_id, None);
        new_module_ids.push(new_module_id);
    }

    let copy = Course {
        id: new_course_id.clone(),
        title: format!("{}{}", source.title, COPY_SUFFIX),
        modules: new_module_ids,
        ..source
    };
    Arc::make_mut(&mut next.courses).insert(new_course_id.clone(), copy);

    if content
        .batches
        .values()
        .any(|b| b.courses.iter().any(|c| c == course_id))
    {
        for batch in Arc::make_mut(&mut next.batches).values_mut() {
            if batch.courses.iter().any(|c| c == course_id) {
                batch.courses.push(new_course_id.clone());
            }
        }
    }
    Some((next, new_course_id))
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// Appends a module to its course. `None` when the course does not exist.
pub fn add_module(content: &ContentData, input: NewModule) -> Option<(ContentData, String)> {
    let course = content.courses.get(&input.course_id)?;
    let mut next = content.clone();
    let id = fresh_id("module", &content.modules);
    let module = Module {
        id: id.clone(),
        course_id: input.course_id.clone(),
        title: input.title,
        description: input.description,
        order: course.modules.len() as u32 + 1,
        items: Vec::new(),
    };
    Arc::make_mut(&mut next.modules).insert(id.clone(), module);
    if let Some(course) = Arc::make_mut(&mut next.courses).get_mut(&input.course_id) {
        course.modules.push(id.clone());
    }
    Some((next, id))
}

/// Replaces the stored module's fields. Parent, position and item list are kept.
pub fn update_module(content: &ContentData, module: Module) -> ContentData {
    let mut next = content.clone();
    let Some(existing) = content.modules.get(&module.id) else {
        return next;
    };
    let module = Module {
        course_id: existing.course_id.clone(),
        order: existing.order,
        items: existing.items.clone(),
        ..module
    };
    if &module == existing {
        return next;
    }
    Arc::make_mut(&mut next.modules).insert(module.id.clone(), module);
    next
}

/// Removes the module and its items, unlinks it from its course, and
/// renumbers the remaining siblings.
pub fn delete_module(content: &ContentData, module_id: &str) -> ContentData {
    let mut next = content.clone();
    let Some(module) = content.modules.get(module_id) else {
        return next;
    };

    let item_ids: HashSet<&String> = module
        .items
        .iter()
        .chain(
            content
                .items
                .values()
                .filter(|i| i.module_id == module_id)
                .map(|i| &i.id),
        )
        .collect();
    if !item_ids.is_empty() {
        let items = Arc::make_mut(&mut next.items);
        for id in &item_ids {
            items.remove(*id);
        }
    }
    Arc::make_mut(&mut next.modules).remove(module_id);

    let course_ids: Vec<String> = content
        .courses
        .values()
        .filter(|c| c.id == module.course_id || c.modules.iter().any(|m| m == module_id))
        .map(|c| c.id.clone())
        .collect();
    for course_id in course_ids {
        let remaining = {
            let courses = Arc::make_mut(&mut next.courses);
            let Some(course) = courses.get_mut(&course_id) else {
                continue;
            };
            course.modules.retain(|m| m != module_id);
            course.modules.clone()
        };
        renumber_modules(&mut next.modules, &remaining);
    }
    next
}

/// Deep-copies a module and its items and appends the copy as the last
/// module of the same course.
pub fn duplicate_module(content: &ContentData, module_id: &str) -> Option<(ContentData, String)> {
    let source = content.modules.get(module_id)?.clone();
    let course = content.courses.get(&source.course_id)?;
    let mut next = content.clone();
    let course_id = course.id.clone();
    let order = course.modules.len() as u32 + 1;

    let new_id = clone_module_into(&mut next, source, &course_id, Some(order));
    if let Some(course) = Arc::make_mut(&mut next.courses).get_mut(&course_id) {
        course.modules.push(new_id.clone());
    }
    Some((next, new_id))
}

/// Inserts a copy of `module` (and copies of its items) into `next` under
/// `course_id`. A `Some(order)` marks a top-level copy: the title gets the
/// copy suffix and the position is overridden. Does not link the module into
/// any course list.
fn clone_module_into(
    next: &mut ContentData,
    module: Module,
    course_id: &str,
    order: Option<u32>,
) -> String {
    let new_module_id = fresh_id("module", &next.modules);
    let mut new_item_ids = Vec::with_capacity(module.items.len());
    for item_id in &module.items {
        let Some(item) = next.items.get(item_id).cloned() else {
            continue;
        };
        let new_item_id = fresh_id("item", &next.items);
        let copy = ContentItem {
            id: new_item_id.clone(),
            module_id: new_module_id.clone(),
            ..item
        };
        Arc::make_mut(&mut next.items).insert(new_item_id.clone(), copy);
        new_item_ids.push(new_item_id);
    }

    let title = match order {
        Some(_) => format!("{}{}", module.title, COPY_SUFFIX),
        None => module.title.clone(),
    };
    let copy = Module {
        id: new_module_id.clone(),
        course_id: course_id.to_string(),
        title,
        order: order.unwrap_or(module.order),
        items: new_item_ids,
        ..module
    };
    Arc::make_mut(&mut next.modules).insert(new_module_id.clone(), copy);
    new_module_id
}

/// Moves the module at `from` to `to` within the course and renumbers every
/// module's `order`. Out-of-range indices leave the graph unchanged.
pub fn reorder_modules_in_course(
    content: &ContentData,
    course_id: &str,
    from: usize,
    to: usize,
) -> ContentData {
    let mut next = content.clone();
    let Some(course) = content.courses.get(course_id) else {
        return next;
    };
    let mut modules = course.modules.clone();
    if !splice_move(&mut modules, from, to) {
        return next;
    }
    if modules != course.modules {
        if let Some(course) = Arc::make_mut(&mut next.courses).get_mut(course_id) {
            course.modules = modules.clone();
        }
    }
    renumber_modules(&mut next.modules, &modules);
    next
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Appends an item to its module. `None` when the module does not exist.
pub fn add_item(content: &ContentData, input: NewItem) -> Option<(ContentData, String)> {
    if !content.modules.contains_key(&input.module_id) {
        return None;
    }
    let mut next = content.clone();
    let id = fresh_id("item", &content.items);
    let item = ContentItem {
        id: id.clone(),
        module_id: input.module_id.clone(),
        title: input.title,
        description: input.description,
        kind: input.kind,
        url: input.url,
        embed_url: input.embed_url,
        instructions: input.instructions,
        due_date: input.due_date,
        audio_duration: input.audio_duration,
        quiz_questions: input.quiz_questions,
        quiz_settings: input.quiz_settings,
        tags: dedup_tags(input.tags),
        published_at: input.published_at.unwrap_or_else(now_iso),
    };
    Arc::make_mut(&mut next.items).insert(id.clone(), item);
    if let Some(module) = Arc::make_mut(&mut next.modules).get_mut(&input.module_id) {
        module.items.push(id.clone());
    }
    Some((next, id))
}

/// Replaces the stored item's fields. The parent module is kept.
pub fn update_item(content: &ContentData, item: ContentItem) -> ContentData {
    let mut next = content.clone();
    let Some(existing) = content.items.get(&item.id) else {
        return next;
    };
    let item = ContentItem {
        module_id: existing.module_id.clone(),
        tags: dedup_tags(item.tags),
        ..item
    };
    if &item == existing {
        return next;
    }
    Arc::make_mut(&mut next.items).insert(item.id.clone(), item);
    next
}

pub fn delete_item(content: &ContentData, item_id: &str) -> ContentData {
    let mut next = content.clone();
    let Some(item) = content.items.get(item_id) else {
        return next;
    };
    Arc::make_mut(&mut next.items).remove(item_id);
    if content
        .modules
        .values()
        .any(|m| m.items.iter().any(|i| i == item_id))
    {
        for module in Arc::make_mut(&mut next.modules).values_mut() {
            if module.id == item.module_id || module.items.iter().any(|i| i == item_id) {
                module.items.retain(|i| i != item_id);
            }
        }
    }
    next
}

/// Copies an item under a fresh id and appends it to the same module.
pub fn duplicate_item(content: &ContentData, item_id: &str) -> Option<(ContentData, String)> {
    let source = content.items.get(item_id)?.clone();
    if !content.modules.contains_key(&source.module_id) {
        return None;
    }
    let mut next = content.clone();
    let new_id = fresh_id("item", &content.items);
    let module_id = source.module_id.clone();
    let copy = ContentItem {
        id: new_id.clone(),
        title: format!("{}{}", source.title, COPY_SUFFIX),
        ..source
    };
    Arc::make_mut(&mut next.items).insert(new_id.clone(), copy);
    if let Some(module) = Arc::make_mut(&mut next.modules).get_mut(&module_id) {
        module.items.push(new_id.clone());
    }
    Some((next, new_id))
}

/// Moves the item at `from` to `to` within the module. Out-of-range indices
/// leave the graph unchanged.
pub fn reorder_items_in_module(
    content: &ContentData,
    module_id: &str,
    from: usize,
    to: usize,
) -> ContentData {
    let mut next = content.clone();
    let Some(module) = content.modules.get(module_id) else {
        return next;
    };
    let mut items = module.items.clone();
    if !splice_move(&mut items, from, to) || items == module.items {
        return next;
    }
    if let Some(module) = Arc::make_mut(&mut next.modules).get_mut(module_id) {
        module.items = items;
    }
    next
}
