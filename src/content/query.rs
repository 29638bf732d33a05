use super::model::{Batch, ContentData, ContentItem, Course, CourseLevel, ItemType, Module};
use chrono::DateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const EDITOR_SEARCH_MIN_CHARS: usize = 2;
const EDITOR_SEARCH_MAX_HITS: usize = 10;

pub fn batch(content: &ContentData, key: &str) -> Option<Batch> {
    content.batch(key).cloned()
}

/// Courses in the batch's list order. Dangling ids are skipped.
pub fn batch_courses<'a>(content: &'a ContentData, batch_key: &str) -> Vec<&'a Course> {
    let Some(batch) = content.batch(batch_key) else {
        return Vec::new();
    };
    batch
        .courses
        .iter()
        .filter_map(|id| content.course(id))
        .collect()
}

pub fn batch_has_course(content: &ContentData, batch_key: &str, course_id: &str) -> bool {
    content
        .batch(batch_key)
        .map(|b| b.courses.iter().any(|c| c == course_id))
        .unwrap_or(false)
}

pub fn course_modules<'a>(content: &'a ContentData, course_id: &str) -> Vec<&'a Module> {
    let Some(course) = content.course(course_id) else {
        return Vec::new();
    };
    let mut modules: Vec<&Module> = course
        .modules
        .iter()
        .filter_map(|id| content.module(id))
        .collect();
    modules.sort_by_key(|m| m.order);
    modules
}

pub fn module_items<'a>(content: &'a ContentData, module_id: &str) -> Vec<&'a ContentItem> {
    let Some(module) = content.module(module_id) else {
        return Vec::new();
    };
    module
        .items
        .iter()
        .filter_map(|id| content.item(id))
        .collect()
}

/// Every item reachable from the batch, walking course → module → item lists.
fn batch_items<'a>(content: &'a ContentData, batch_key: &str) -> Vec<&'a ContentItem> {
    batch_courses(content, batch_key)
        .into_iter()
        .flat_map(|course| course.modules.iter())
        .filter_map(|mid| content.module(mid))
        .flat_map(|module| module.items.iter())
        .filter_map(|iid| content.item(iid))
        .collect()
}

/// Course id of the module an item belongs to, if the chain resolves.
pub fn item_course_id<'a>(content: &'a ContentData, item: &ContentItem) -> Option<&'a str> {
    content
        .module(&item.module_id)
        .map(|m| m.course_id.as_str())
}

fn published_millis(item: &ContentItem) -> Option<i64> {
    DateTime::parse_from_rfc3339(item.published_at.trim())
        .ok()
        .map(|d| d.timestamp_millis())
}

/// Newest first. Items with an unreadable `publishedAt` sort last.
pub fn recent_items<'a>(
    content: &'a ContentData,
    batch_key: &str,
    limit: usize,
) -> Vec<&'a ContentItem> {
    let mut items = batch_items(content, batch_key);
    items.sort_by(|a, b| published_millis(b).cmp(&published_millis(a)));
    items.truncate(limit);
    items
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub kind: Option<ItemType>,
    pub tag: Option<String>,
}

fn matches_query(item: &ContentItem, query_lower: &str) -> bool {
    item.title.to_lowercase().contains(query_lower)
        || item.description.to_lowercase().contains(query_lower)
        || item
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(query_lower))
}

pub fn search_items<'a>(
    content: &'a ContentData,
    batch_key: &str,
    query: &str,
    filters: &ItemFilters,
) -> Vec<&'a ContentItem> {
    let query_lower = query.to_lowercase();
    batch_items(content, batch_key)
        .into_iter()
        .filter(|item| filters.kind.map(|k| item.kind == k).unwrap_or(true))
        .filter(|item| {
            filters
                .tag
                .as_ref()
                .map(|tag| item.tags.contains(tag))
                .unwrap_or(true)
        })
        .filter(|item| query.is_empty() || matches_query(item, &query_lower))
        .collect()
}

pub fn all_tags(content: &ContentData, batch_key: &str) -> Vec<String> {
    batch_items(content, batch_key)
        .into_iter()
        .flat_map(|item| item.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Course,
    Module,
    Item,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: HitKind,
    pub id: String,
    pub title: String,
    pub subtitle: String,
}

fn level_label(level: Option<CourseLevel>) -> Option<&'static str> {
    level.map(|l| match l {
        CourseLevel::Beginner => "Beginner",
        CourseLevel::Intermediate => "Intermediate",
        CourseLevel::Advanced => "Advanced",
    })
}

/// Editor-wide search over every course, module and item.
pub fn search_all(content: &ContentData, query: &str) -> Vec<SearchHit> {
    if query.chars().count() < EDITOR_SEARCH_MIN_CHARS {
        return Vec::new();
    }
    let q = query.to_lowercase();
    let mut hits = Vec::new();

    for c in content.courses.values() {
        if c.title.to_lowercase().contains(&q) || c.description.to_lowercase().contains(&q) {
            let subtitle = match level_label(c.level) {
                Some(level) => format!("{} • {}", c.instructor, level),
                None => c.instructor.clone(),
            };
            hits.push(SearchHit {
                kind: HitKind::Course,
                id: c.id.clone(),
                title: c.title.clone(),
                subtitle,
            });
        }
    }
    for m in content.modules.values() {
        if m.title.to_lowercase().contains(&q) || m.description.to_lowercase().contains(&q) {
            hits.push(SearchHit {
                kind: HitKind::Module,
                id: m.id.clone(),
                title: m.title.clone(),
                subtitle: content
                    .course(&m.course_id)
                    .map(|c| c.title.clone())
                    .unwrap_or_default(),
            });
        }
    }
    for i in content.items.values() {
        if matches_query(i, &q) {
            hits.push(SearchHit {
                kind: HitKind::Item,
                id: i.id.clone(),
                title: i.title.clone(),
                subtitle: i.kind.as_str().to_string(),
            });
        }
    }

    hits.truncate(EDITOR_SEARCH_MAX_HITS);
    hits
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    pub id: String,
    pub title: String,
    pub modules: usize,
    pub items: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub courses: usize,
    pub modules: usize,
    pub items: usize,
    pub batches: usize,
    pub items_by_type: BTreeMap<&'static str, usize>,
    pub per_course: Vec<CourseStats>,
}

pub fn stats(content: &ContentData) -> ContentStats {
    let mut items_by_type = BTreeMap::new();
    for item in content.items.values() {
        *items_by_type.entry(item.kind.as_str()).or_insert(0) += 1;
    }
    let per_course = content
        .courses
        .values()
        .map(|c| {
            let modules = course_modules(content, &c.id);
            CourseStats {
                id: c.id.clone(),
                title: c.title.clone(),
                modules: modules.len(),
                items: modules.iter().map(|m| m.items.len()).sum(),
            }
        })
        .collect();
    ContentStats {
        courses: content.courses.len(),
        modules: content.modules.len(),
        items: content.items.len(),
        batches: content.batches.len(),
        items_by_type,
        per_course,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> ContentData {
        serde_json::from_value(json!({
            "batches": {
                "b1": { "name": "Morning", "description": "", "courses": ["c1", "ghost"] },
                "b2": { "name": "Evening", "description": "", "courses": ["c2"] }
            },
            "courses": {
                "c1": { "id": "c1", "title": "Algebra", "description": "Numbers", "thumbnail": "",
                        "instructor": "Diaz", "duration": "", "modules": ["m2", "m1"], "level": "Beginner" },
                "c2": { "id": "c2", "title": "Biology", "description": "Cells", "thumbnail": "",
                        "instructor": "Okafor", "duration": "", "modules": ["m3"] }
            },
            "modules": {
                "m1": { "id": "m1", "courseId": "c1", "title": "Linear", "description": "", "order": 1, "items": ["i1", "i2"] },
                "m2": { "id": "m2", "courseId": "c1", "title": "Quadratic", "description": "", "order": 2, "items": ["i3"] },
                "m3": { "id": "m3", "courseId": "c2", "title": "Cells", "description": "", "order": 1, "items": ["i4"] }
            },
            "items": {
                "i1": { "id": "i1", "moduleId": "m1", "title": "Slopes", "description": "Rise over run",
                        "type": "pdf", "tags": ["graphs", "week-1"], "publishedAt": "2025-01-01T00:00:00Z" },
                "i2": { "id": "i2", "moduleId": "m1", "title": "Intercepts", "description": "",
                        "type": "youtube", "tags": ["graphs"], "publishedAt": "2025-03-01T00:00:00Z" },
                "i3": { "id": "i3", "moduleId": "m2", "title": "Parabolas", "description": "Curves",
                        "type": "quiz", "tags": ["week-2"], "publishedAt": "2025-02-01T00:00:00Z" },
                "i4": { "id": "i4", "moduleId": "m3", "title": "Mitosis", "description": "",
                        "type": "video", "tags": ["lab"], "publishedAt": "2025-04-01T00:00:00Z" }
            }
        }))
        .expect("fixture")
    }

    fn ids<T>(rows: &[&T], f: impl Fn(&T) -> &str) -> Vec<String> {
        rows.iter().map(|r| f(*r).to_string()).collect()
    }

    #[test]
    fn unknown_ids_yield_empty_results() {
        let c = fixture();
        assert!(batch_courses(&c, "nope").is_empty());
        assert!(course_modules(&c, "nope").is_empty());
        assert!(module_items(&c, "nope").is_empty());
        assert!(recent_items(&c, "nope", 5).is_empty());
        assert!(all_tags(&c, "nope").is_empty());
        assert!(batch(&c, "nope").is_none());
    }

    #[test]
    fn batch_courses_skip_dangling_ids() {
        let c = fixture();
        assert_eq!(ids(&batch_courses(&c, "b1"), |x| x.id.as_str()), vec!["c1"]);
        assert!(batch_has_course(&c, "b1", "c1"));
        assert!(!batch_has_course(&c, "b1", "c2"));
    }

    #[test]
    fn course_modules_follow_order_field() {
        let c = fixture();
        assert_eq!(ids(&course_modules(&c, "c1"), |m| m.id.as_str()), vec!["m1", "m2"]);
        assert_eq!(ids(&module_items(&c, "m1"), |i| i.id.as_str()), vec!["i1", "i2"]);
    }

    #[test]
    fn recent_items_are_newest_first_and_batch_scoped() {
        let c = fixture();
        assert_eq!(ids(&recent_items(&c, "b1", 5), |i| i.id.as_str()), vec!["i2", "i3", "i1"]);
        assert_eq!(ids(&recent_items(&c, "b1", 1), |i| i.id.as_str()), vec!["i2"]);
    }

    #[test]
    fn search_applies_query_and_filters() {
        let c = fixture();
        let none = ItemFilters::default();
        assert_eq!(ids(&search_items(&c, "b1", "GRAPH", &none), |i| i.id.as_str()), vec!["i1", "i2"]);
        assert_eq!(ids(&search_items(&c, "b1", "curves", &none), |i| i.id.as_str()), vec!["i3"]);
        assert_eq!(search_items(&c, "b1", "", &none).len(), 3);
        assert!(search_items(&c, "b1", "mitosis", &none).is_empty());

        let by_type = ItemFilters { kind: Some(ItemType::Youtube), tag: None };
        assert_eq!(ids(&search_items(&c, "b1", "", &by_type), |i| i.id.as_str()), vec!["i2"]);
        let by_tag = ItemFilters { kind: None, tag: Some("week-2".into()) };
        assert_eq!(ids(&search_items(&c, "b1", "", &by_tag), |i| i.id.as_str()), vec!["i3"]);
    }

    #[test]
    fn tags_are_sorted_and_unique() {
        let c = fixture();
        assert_eq!(all_tags(&c, "b1"), vec!["graphs", "week-1", "week-2"]);
    }

    #[test]
    fn editor_search_needs_two_chars_and_spans_kinds() {
        let c = fixture();
        assert!(search_all(&c, "c").is_empty());
        let hits = search_all(&c, "cell");
        let kinds: Vec<HitKind> = hits.iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![HitKind::Course, HitKind::Module]);
        assert_eq!(hits[1].subtitle, "Biology");
        let hits = search_all(&c, "algebra");
        assert_eq!(hits[0].subtitle, "Diaz • Beginner");
    }

    #[test]
    fn stats_count_everything() {
        let s = stats(&fixture());
        assert_eq!((s.courses, s.modules, s.items, s.batches), (2, 3, 4, 2));
        assert_eq!(s.items_by_type.get("graphs"), None);
        assert_eq!(s.items_by_type.get("pdf"), Some(&1));
        let algebra = s.per_course.iter().find(|c| c.id == "c1").expect("c1");
        assert_eq!((algebra.modules, algebra.items), (2, 3));
    }
}
