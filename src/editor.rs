//! The admin editing session: one working copy of the content graph, the
//! dirty flag, and the last-saved marker. Mutations go through `content::ops`;
//! `settle` writes the draft when something changed since the last save.

use crate::content::health;
use crate::content::ops::{self, NewCourse, NewItem, NewModule};
use crate::content::{Batch, ContentData, ContentItem, Course, Module};
use crate::db::KvStore;
use crate::draft::{self, DraftStore};
use crate::source::ProductionSource;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Editor {
    content: ContentData,
    dirty: bool,
    /// Epoch milliseconds of the last draft write.
    last_saved: Option<i64>,
}

impl Editor {
    /// Resumes the stored draft when one decodes; otherwise starts from
    /// production content (not yet a draft). Either way the working copy is
    /// repaired before use.
    pub fn open(
        kv: &dyn KvStore,
        drafts: &DraftStore,
        source: &mut ProductionSource,
    ) -> anyhow::Result<Self> {
        if let Some(stored) = drafts.load(kv) {
            tracing::info!(last_modified = stored.last_modified, "editor resumed from draft");
            let content = health::repair(&stored.content);
            if !content.shares_all(&stored.content) {
                tracing::warn!("repaired inconsistent references in stored draft");
            }
            return Ok(Self {
                content,
                dirty: false,
                last_saved: Some(stored.last_modified),
            });
        }
        let content = source.load()?;
        tracing::info!("editor started from production content");
        Ok(Self::from_content(content))
    }

    pub fn from_content(content: ContentData) -> Self {
        Self {
            content,
            dirty: false,
            last_saved: None,
        }
    }

    pub fn content(&self) -> &ContentData {
        &self.content
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_saved(&self) -> Option<i64> {
        self.last_saved
    }

    /// Swaps in `next`; reports whether anything changed.
    fn apply(&mut self, next: ContentData) -> bool {
        if next.shares_all(&self.content) {
            return false;
        }
        self.content = next;
        self.dirty = true;
        true
    }

    fn apply_created(&mut self, created: Option<(ContentData, String)>) -> Option<String> {
        let (next, id) = created?;
        self.apply(next);
        Some(id)
    }

    pub fn create_course(&mut self, input: NewCourse, batch_key: &str) -> String {
        let (next, id) = ops::add_course(&self.content, input, batch_key);
        self.apply(next);
        id
    }

    pub fn edit_course(&mut self, course: Course) -> bool {
        let next = ops::update_course(&self.content, course);
        self.apply(next)
    }

    pub fn remove_course(&mut self, course_id: &str) -> bool {
        let next = ops::delete_course(&self.content, course_id);
        self.apply(next)
    }

    pub fn duplicate_course(&mut self, course_id: &str) -> Option<String> {
        let created = ops::duplicate_course(&self.content, course_id);
        self.apply_created(created)
    }

    pub fn create_module(&mut self, input: NewModule) -> Option<String> {
        let created = ops::add_module(&self.content, input);
        self.apply_created(created)
    }

    pub fn edit_module(&mut self, module: Module) -> bool {
        let next = ops::update_module(&self.content, module);
        self.apply(next)
    }

    pub fn remove_module(&mut self, module_id: &str) -> bool {
        let next = ops::delete_module(&self.content, module_id);
        self.apply(next)
    }

    pub fn duplicate_module(&mut self, module_id: &str) -> Option<String> {
        let created = ops::duplicate_module(&self.content, module_id);
        self.apply_created(created)
    }

    pub fn create_item(&mut self, input: NewItem) -> Option<String> {
        let created = ops::add_item(&self.content, input);
        self.apply_created(created)
    }

    pub fn edit_item(&mut self, item: ContentItem) -> bool {
        let next = ops::update_item(&self.content, item);
        self.apply(next)
    }

    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let next = ops::delete_item(&self.content, item_id);
        self.apply(next)
    }

    pub fn duplicate_item(&mut self, item_id: &str) -> Option<String> {
        let created = ops::duplicate_item(&self.content, item_id);
        self.apply_created(created)
    }

    pub fn reorder_modules(&mut self, course_id: &str, from: usize, to: usize) -> bool {
        let next = ops::reorder_modules_in_course(&self.content, course_id, from, to);
        self.apply(next)
    }

    pub fn reorder_items(&mut self, module_id: &str, from: usize, to: usize) -> bool {
        let next = ops::reorder_items_in_module(&self.content, module_id, from, to);
        self.apply(next)
    }

    pub fn create_batch(&mut self, key: &str, batch: Batch) -> bool {
        let next = ops::put_batch(&self.content, key, batch);
        self.apply(next)
    }

    pub fn edit_batch(&mut self, key: &str, batch: Batch) -> bool {
        let next = ops::update_batch(&self.content, key, batch);
        self.apply(next)
    }

    pub fn remove_batch(&mut self, key: &str) -> bool {
        let next = ops::delete_batch(&self.content, key);
        self.apply(next)
    }

    /// Auto-save hook: writes the draft only if a mutation happened since the
    /// last write. Returns whether a write took place.
    pub fn settle(&mut self, kv: &dyn KvStore, drafts: &DraftStore, now_ms: i64) -> anyhow::Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save(kv, drafts, now_ms)?;
        Ok(true)
    }

    pub fn save(&mut self, kv: &dyn KvStore, drafts: &DraftStore, now_ms: i64) -> anyhow::Result<()> {
        let saved = drafts.save(kv, &self.content, now_ms)?;
        self.last_saved = Some(saved.last_modified);
        self.dirty = false;
        Ok(())
    }

    /// Drops the stored draft. The in-memory working copy stays as it is.
    pub fn discard(&mut self, kv: &dyn KvStore, drafts: &DraftStore) -> anyhow::Result<()> {
        drafts.clear(kv)?;
        self.dirty = false;
        Ok(())
    }

    pub fn export(&self, out_dir: &Path, today: NaiveDate) -> anyhow::Result<PathBuf> {
        draft::write_export(&self.content, out_dir, today)
    }

    /// Clears the draft and reloads production content, discarding all edits.
    pub fn reset_to_production(
        &mut self,
        kv: &dyn KvStore,
        drafts: &DraftStore,
        source: &mut ProductionSource,
    ) -> anyhow::Result<()> {
        drafts.clear(kv)?;
        self.content = source.load()?;
        self.dirty = false;
        self.last_saved = None;
        tracing::info!("editor reset to production content");
        Ok(())
    }
}
