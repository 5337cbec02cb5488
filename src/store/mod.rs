//! Content storage
//!
//! The completion pipeline only talks to storage through [`ContentStore`]:
//! three selection scans, the category table, and a partial update.
//!
//! - [`SqliteContentStore`] is the production backend (sqlx + SQLite)
//! - [`MemoryContentStore`] keeps everything in memory for tests and dry runs

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A content row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub complete_datetime: Option<String>,
}

/// A category row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// Fields to write back. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

impl ContentUpdate {
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// How many records each selection pass would pick up right now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteCounts {
    pub missing_title: usize,
    pub missing_description: usize,
    pub placeholder_title: usize,
    pub total_content: usize,
    pub total_categories: usize,
}

impl IncompleteCounts {
    pub fn pending(&self) -> usize {
        self.missing_title + self.missing_description + self.placeholder_title
    }
}

/// Storage capabilities consumed by the completion pipeline
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Records with a real title but no description: `(id, title)`
    async fn select_missing_description(&self) -> Result<Vec<(i64, String)>>;

    /// Records with no title at all: `(id, description)`
    async fn select_missing_title(&self) -> Result<Vec<(i64, Option<String>)>>;

    /// Records whose title is a placeholder but that have a description
    async fn select_placeholder_title(&self) -> Result<Vec<(i64, String)>>;

    /// All known categories
    async fn select_categories(&self) -> Result<Vec<Category>>;

    /// Insert a category and return its id
    async fn insert_category(&self, title: &str) -> Result<i64>;

    /// Apply a partial update and stamp the completion time.
    /// Returns `false` when no row has that id.
    async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<bool>;

    /// Look up one record
    async fn get_content(&self, id: i64) -> Result<Option<ContentRecord>>;

    /// Per-pass counts for status reporting
    async fn count_incomplete(&self) -> Result<IncompleteCounts>;

    /// Release the underlying connection
    async fn close(&self);
}

/// True when a stored value carries no text
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// True when `title` (trimmed) is one of the placeholder values
pub fn is_placeholder(title: &str, placeholders: &[String]) -> bool {
    let title = title.trim();
    placeholders.iter().any(|p| p.trim() == title)
}

/// Which selection pass a record falls into, if any.
///
/// Both backends agree on this classification; the SQLite backend expresses
/// it in SQL and the memory backend calls it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPass {
    MissingTitle,
    MissingDescription,
    PlaceholderTitle,
}

impl SelectionPass {
    pub fn classify(record: &ContentRecord, placeholders: &[String]) -> Option<Self> {
        let description_blank = is_blank(record.description.as_deref());
        match record.title.as_deref() {
            None => Some(SelectionPass::MissingTitle),
            Some(title) if is_placeholder(title, placeholders) => {
                (!description_blank).then_some(SelectionPass::PlaceholderTitle)
            }
            Some(title) if title.trim().is_empty() => None,
            Some(_) => description_blank.then_some(SelectionPass::MissingDescription),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SelectionPass::MissingTitle => "missing title",
            SelectionPass::MissingDescription => "missing description",
            SelectionPass::PlaceholderTitle => "placeholder title",
        }
    }
}

impl std::fmt::Display for SelectionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
