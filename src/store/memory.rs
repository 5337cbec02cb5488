//! In-memory [`ContentStore`] for tests and offline experiments.
//!
//! Selection follows [`SelectionPass::classify`], so it agrees with the SQL
//! predicates of the SQLite backend.

use super::{
    Category, ContentRecord, ContentStore, ContentUpdate, IncompleteCounts, SelectionPass,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    contents: Vec<ContentRecord>,
    categories: Vec<Category>,
    next_category_id: i64,
    updates: Vec<(i64, ContentUpdate)>,
    closed: bool,
    fail_updates: bool,
}

/// In-memory content store
pub struct MemoryContentStore {
    state: Mutex<MemoryState>,
    placeholders: Vec<String>,
}

impl MemoryContentStore {
    pub fn new(placeholders: Vec<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_category_id: 1,
                ..Default::default()
            }),
            placeholders,
        }
    }

    /// Add a content row with a caller-chosen id
    pub fn with_content(self, id: i64, title: Option<&str>, description: Option<&str>) -> Self {
        self.lock().contents.push(ContentRecord {
            id,
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            category_id: None,
            complete_datetime: None,
        });
        self
    }

    /// Add a category with a caller-chosen id
    pub fn with_category(self, id: i64, title: &str) -> Self {
        {
            let mut state = self.lock();
            state.categories.push(Category {
                id,
                title: title.to_string(),
            });
            state.next_category_id = state.next_category_id.max(id + 1);
        }
        self
    }

    /// Make every subsequent `update_content` fail with a database error
    pub fn fail_updates(&self) {
        self.lock().fail_updates = true;
    }

    /// Every update applied so far, in order
    pub fn updates(&self) -> Vec<(i64, ContentUpdate)> {
        self.lock().updates.clone()
    }

    /// Current categories
    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, pass: SelectionPass) -> Vec<ContentRecord> {
        self.lock()
            .contents
            .iter()
            .filter(|c| SelectionPass::classify(c, &self.placeholders) == Some(pass))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn select_missing_description(&self) -> Result<Vec<(i64, String)>> {
        Ok(self
            .select(SelectionPass::MissingDescription)
            .into_iter()
            .map(|c| (c.id, c.title.unwrap_or_default()))
            .collect())
    }

    async fn select_missing_title(&self) -> Result<Vec<(i64, Option<String>)>> {
        Ok(self
            .select(SelectionPass::MissingTitle)
            .into_iter()
            .map(|c| (c.id, c.description))
            .collect())
    }

    async fn select_placeholder_title(&self) -> Result<Vec<(i64, String)>> {
        Ok(self
            .select(SelectionPass::PlaceholderTitle)
            .into_iter()
            .map(|c| (c.id, c.description.unwrap_or_default()))
            .collect())
    }

    async fn select_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories())
    }

    async fn insert_category(&self, title: &str) -> Result<i64> {
        let mut state = self.lock();
        let id = state.next_category_id;
        state.next_category_id += 1;
        state.categories.push(Category {
            id,
            title: title.to_string(),
        });
        Ok(id)
    }

    async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<bool> {
        let mut state = self.lock();
        if state.fail_updates {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }

        let Some(record) = state.contents.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if let Some(title) = &update.title {
            record.title = Some(title.clone());
        }
        if let Some(description) = &update.description {
            record.description = Some(description.clone());
        }
        if let Some(category_id) = update.category_id {
            record.category_id = Some(category_id);
        }
        record.complete_datetime = Some(Utc::now().to_rfc3339());

        state.updates.push((id, update.clone()));
        Ok(true)
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentRecord>> {
        Ok(self.lock().contents.iter().find(|c| c.id == id).cloned())
    }

    async fn count_incomplete(&self) -> Result<IncompleteCounts> {
        let state = self.lock();
        let mut counts = IncompleteCounts {
            total_content: state.contents.len(),
            total_categories: state.categories.len(),
            ..Default::default()
        };
        for record in &state.contents {
            match SelectionPass::classify(record, &self.placeholders) {
                Some(SelectionPass::MissingTitle) => counts.missing_title += 1,
                Some(SelectionPass::MissingDescription) => counts.missing_description += 1,
                Some(SelectionPass::PlaceholderTitle) => counts.placeholder_title += 1,
                None => {}
            }
        }
        Ok(counts)
    }

    async fn close(&self) {
        self.lock().closed = true;
    }
}
