use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type Collection<T> = Arc<BTreeMap<String, T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Pdf,
    Doc,
    Ppt,
    Spreadsheet,
    Video,
    Link,
    Homework,
    Youtube,
    Audio,
    Quiz,
}

impl ItemType {
    pub const ALL: [ItemType; 10] = [
        ItemType::Pdf,
        ItemType::Doc,
        ItemType::Ppt,
        ItemType::Spreadsheet,
        ItemType::Video,
        ItemType::Link,
        ItemType::Homework,
        ItemType::Youtube,
        ItemType::Audio,
        ItemType::Quiz,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Pdf => "pdf",
            ItemType::Doc => "doc",
            ItemType::Ppt => "ppt",
            ItemType::Spreadsheet => "spreadsheet",
            ItemType::Video => "video",
            ItemType::Link => "link",
            ItemType::Homework => "homework",
            ItemType::Youtube => "youtube",
            ItemType::Audio => "audio",
            ItemType::Quiz => "quiz",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw.trim())
    }

    /// Types whose content lives behind `url`.
    pub fn needs_url(self) -> bool {
        matches!(
            self,
            ItemType::Pdf
                | ItemType::Video
                | ItemType::Doc
                | ItemType::Ppt
                | ItemType::Spreadsheet
                | ItemType::Link
                | ItemType::Audio
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_questions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_explanations: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
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
    pub modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub module_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_settings: Option<QuizSettings>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: String,
}

/// The content graph. Cloning is cheap: each collection is shared until one
/// side writes to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentData {
    #[serde(default)]
    pub batches: Collection<Batch>,
    #[serde(default)]
    pub courses: Collection<Course>,
    #[serde(default)]
    pub modules: Collection<Module>,
    #[serde(default)]
    pub items: Collection<ContentItem>,
}

impl ContentData {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn batch(&self, key: &str) -> Option<&Batch> {
        self.batches.get(key)
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.items.get(id)
    }

    /// True when `other` holds the very same collection allocations.
    pub fn shares_all(&self, other: &ContentData) -> bool {
        Arc::ptr_eq(&self.batches, &other.batches)
            && Arc::ptr_eq(&self.courses, &other.courses)
            && Arc::ptr_eq(&self.modules, &other.modules)
            && Arc::ptr_eq(&self.items, &other.items)
    }
}

/// The locally persisted working copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftContentData {
    #[serde(flatten)]
    pub content: ContentData,
    /// Epoch milliseconds.
    pub last_modified: i64,
    pub is_draft: bool,
}
