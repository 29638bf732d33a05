pub mod health;
pub mod ids;
pub mod model;
pub mod ops;
pub mod query;

pub use model::{Batch, ContentData, ContentItem, Course, DraftContentData, ItemType, Module};
