use crate::content::{ContentData, DraftContentData};
use crate::db::KvStore;
use anyhow::Context;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Versioned save/load/clear of the working copy against key-value storage.
/// Knows nothing about dirtiness; callers decide when to save.
#[derive(Debug, Clone)]
pub struct DraftStore {
    key: String,
}

impl DraftStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Overwrites any stored draft. Returns what was written.
    pub fn save(
        &self,
        kv: &dyn KvStore,
        content: &ContentData,
        now_ms: i64,
    ) -> anyhow::Result<DraftContentData> {
        let draft = DraftContentData {
            content: content.clone(),
            last_modified: now_ms,
            is_draft: true,
        };
        let raw = serde_json::to_string(&draft).context("failed to serialize draft")?;
        kv.set(&self.key, &raw)?;
        tracing::debug!(bytes = raw.len(), "draft saved");
        Ok(draft)
    }

    /// `None` when nothing is stored or the stored value does not decode.
    pub fn load(&self, kv: &dyn KvStore) -> Option<DraftContentData> {
        let raw = match kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "draft read failed");
                return None;
            }
        };
        match serde_json::from_str::<DraftContentData>(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable draft");
                None
            }
        }
    }

    pub fn clear(&self, kv: &dyn KvStore) -> anyhow::Result<()> {
        kv.remove(&self.key)
    }

    pub fn has(&self, kv: &dyn KvStore) -> bool {
        matches!(kv.get(&self.key), Ok(Some(_)))
    }

    pub fn size_bytes(&self, kv: &dyn KvStore) -> usize {
        kv.get(&self.key).ok().flatten().map(|s| s.len()).unwrap_or(0)
    }
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("content-{}.json", today.format("%Y-%m-%d"))
}

/// Pretty JSON of the four collections only.
pub fn export_json(content: &ContentData) -> anyhow::Result<String> {
    serde_json::to_string_pretty(content).context("failed to serialize content export")
}

pub fn write_export(content: &ContentData, out_dir: &Path, today: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let out_path = out_dir.join(export_file_name(today));
    let body = export_json(content)?;
    std::fs::write(&out_path, format!("{body}\n"))
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ops::{add_course, add_module, NewCourse, NewModule};
    use crate::db::MemoryKv;

    fn sample() -> ContentData {
        let (c, course_id) = add_course(
            &ContentData::default(),
            NewCourse {
                title: "Statistics".into(),
                ..NewCourse::default()
            },
            "b1",
        );
        let (c, _) = add_module(
            &c,
            NewModule {
                course_id,
                title: "Means".into(),
                description: String::new(),
            },
        )
        .expect("module");
        c
    }

    #[test]
    fn load_after_save_round_trips_collections() {
        let kv = MemoryKv::default();
        let store = DraftStore::new("draft");
        let content = sample();
        store.save(&kv, &content, 1_000).expect("save");

        let loaded = store.load(&kv).expect("draft");
        assert_eq!(loaded.content, content);
        assert_eq!(loaded.last_modified, 1_000);
        assert!(loaded.is_draft);
        assert!(store.has(&kv));
        assert!(store.size_bytes(&kv) > 0);
    }

    #[test]
    fn corrupt_or_foreign_drafts_read_as_absent() {
        let kv = MemoryKv::default();
        let store = DraftStore::new("draft");
        assert!(store.load(&kv).is_none());

        kv.set("draft", "{not json").expect("set");
        assert!(store.load(&kv).is_none());

        kv.set("draft", r#"{"courses": 7}"#).expect("set");
        assert!(store.load(&kv).is_none());

        kv.set("draft", r#"{"batches": {}}"#).expect("set");
        assert!(store.load(&kv).is_none());
    }

    #[test]
    fn clear_removes_the_draft() {
        let kv = MemoryKv::default();
        let store = DraftStore::new("draft");
        store.save(&kv, &sample(), 5).expect("save");
        store.clear(&kv).expect("clear");
        assert!(!store.has(&kv));
        assert!(store.load(&kv).is_none());
        assert_eq!(store.size_bytes(&kv), 0);
    }

    #[test]
    fn export_carries_collections_without_draft_metadata() {
        let body = export_json(&sample()).expect("export");
        let v: serde_json::Value = serde_json::from_str(&body).expect("json");
        let mut keys: Vec<&String> = v.as_object().expect("object").keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["batches", "courses", "items", "modules"]);
        assert!(body.contains('\n'));
    }

    #[test]
    fn export_file_is_named_by_date() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        assert_eq!(export_file_name(day), "content-2026-03-09.json");

        let dir = std::env::temp_dir().join(format!(
            "learndesk-export-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let content = sample();
        let path = write_export(&content, &dir, day).expect("write");
        assert_eq!(path, dir.join("content-2026-03-09.json"));
        let back: ContentData =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("decode");
        assert_eq!(back, content);
    }
}
