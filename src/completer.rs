//! Completion orchestration
//!
//! A batch run loads the category snapshot once, then walks the three
//! selection passes in order (missing title, missing description, placeholder
//! title). Each record is carried through
//! `Selected -> Prompted -> Parsed -> Resolved -> Written` before the next one
//! starts, or stops as `Failed` with the record left untouched. Records with
//! nothing to complete from are `Defaulted` without an inference call.

use crate::category::{CategoryResolver, CategorySnapshot, Resolution};
use crate::config::CompletionConfig;
use crate::error::{Error, Result};
use crate::extract::{extract, ParsedCompletion};
use crate::inference::{InferenceClient, Reply};
use crate::progress::{advance_progress, finish_progress, start_pass_progress};
use crate::prompt::completion_prompt;
use crate::store::{is_blank, ContentStore, ContentUpdate, SelectionPass};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use unicode_segmentation::UnicodeSegmentation;

const PASS_ORDER: [SelectionPass; 3] = [
    SelectionPass::MissingTitle,
    SelectionPass::MissingDescription,
    SelectionPass::PlaceholderTitle,
];

/// Batch run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process at most this many records per pass
    pub limit: Option<usize>,
}

/// Batch run statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionStats {
    pub records_selected: usize,
    pub records_updated: usize,
    pub records_defaulted: usize,
    pub records_failed: usize,
    pub categories_created: usize,
    pub errors: Vec<String>,
}

impl CompletionStats {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Written { .. } => self.records_updated += 1,
            RecordOutcome::Defaulted { .. } => self.records_defaulted += 1,
            RecordOutcome::Failed { .. } => self.records_failed += 1,
            RecordOutcome::Skipped { .. } => {}
        }
    }
}

/// Last state a record reached before it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Selected,
    Prompted,
    Parsed,
    Resolved,
}

/// Category written to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub id: i64,
    pub title: String,
    /// True when this run inserted the category
    pub created: bool,
}

/// Terminal state of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Written {
        content_id: i64,
        title: Option<String>,
        description: Option<String>,
        category: Option<CategoryAssignment>,
    },
    Defaulted {
        content_id: i64,
        title: String,
    },
    Failed {
        content_id: i64,
        stage: Stage,
        reason: String,
    },
    /// Nothing was missing (single-record runs only)
    Skipped {
        content_id: i64,
    },
}

impl RecordOutcome {
    fn failed(content_id: i64, stage: Stage, reason: impl Into<String>) -> Self {
        RecordOutcome::Failed {
            content_id,
            stage,
            reason: reason.into(),
        }
    }
}

/// A selected record and the fields its pass treats as known
#[derive(Debug, Clone)]
struct PendingRecord {
    id: i64,
    pass: SelectionPass,
    title: Option<String>,
    description: Option<String>,
}

/// Drives completion for one run. Owns the category snapshot.
pub struct Completer<'a> {
    store: &'a dyn ContentStore,
    inference: &'a dyn InferenceClient,
    config: &'a CompletionConfig,
    resolver: CategoryResolver,
    snapshot: CategorySnapshot,
    categories_created: usize,
}

impl<'a> Completer<'a> {
    /// Load the category snapshot and get ready to process records
    pub async fn load(
        store: &'a dyn ContentStore,
        inference: &'a dyn InferenceClient,
        config: &'a CompletionConfig,
    ) -> Result<Self> {
        let snapshot = CategorySnapshot::new(store.select_categories().await?);
        debug!("Loaded {} categories", snapshot.len());

        Ok(Self {
            store,
            inference,
            config,
            resolver: CategoryResolver::from_config(config),
            snapshot,
            categories_created: 0,
        })
    }

    /// Run every selection pass. Storage errors abort the current pass only.
    pub async fn run_passes(&mut self, options: &RunOptions) -> CompletionStats {
        let mut stats = CompletionStats::default();

        for pass in PASS_ORDER {
            if let Err(e) = self.run_pass(pass, options, &mut stats).await {
                error!(pass = %pass, "Pass aborted: {}", e);
                stats.errors.push(format!("{} pass: {}", pass, e));
            }
        }

        stats.categories_created = self.categories_created;
        stats
    }

    async fn run_pass(
        &mut self,
        pass: SelectionPass,
        options: &RunOptions,
        stats: &mut CompletionStats,
    ) -> Result<()> {
        let mut records = self.select(pass).await?;
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        info!(pass = %pass, "Selected {} records", records.len());
        stats.records_selected += records.len();

        let pb = start_pass_progress(records.len(), pass.label());
        for record in &records {
            let outcome = match self.complete_record(record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    finish_progress(pb);
                    return Err(e);
                }
            };
            report(&outcome);
            stats.record(&outcome);
            advance_progress(&pb);
        }
        finish_progress(pb);

        Ok(())
    }

    async fn select(&self, pass: SelectionPass) -> Result<Vec<PendingRecord>> {
        let records = match pass {
            SelectionPass::MissingTitle => self
                .store
                .select_missing_title()
                .await?
                .into_iter()
                .map(|(id, description)| PendingRecord {
                    id,
                    pass,
                    title: None,
                    description,
                })
                .collect(),
            SelectionPass::MissingDescription => self
                .store
                .select_missing_description()
                .await?
                .into_iter()
                .map(|(id, title)| PendingRecord {
                    id,
                    pass,
                    title: Some(title),
                    description: None,
                })
                .collect(),
            SelectionPass::PlaceholderTitle => self
                .store
                .select_placeholder_title()
                .await?
                .into_iter()
                .map(|(id, description)| PendingRecord {
                    id,
                    pass,
                    title: None,
                    description: Some(description),
                })
                .collect(),
        };
        Ok(records)
    }

    /// Complete a single record by id, whatever pass it falls into
    pub async fn complete_one(&mut self, id: i64) -> Result<RecordOutcome> {
        let record = self
            .store
            .get_content(id)
            .await?
            .ok_or(Error::ContentNotFound(id))?;

        let Some(pass) = SelectionPass::classify(&record, &self.config.placeholder_titles) else {
            return Ok(RecordOutcome::Skipped { content_id: id });
        };

        let pending = match pass {
            SelectionPass::MissingTitle | SelectionPass::PlaceholderTitle => PendingRecord {
                id,
                pass,
                title: None,
                description: record.description,
            },
            SelectionPass::MissingDescription => PendingRecord {
                id,
                pass,
                title: record.title,
                description: None,
            },
        };

        let outcome = self.complete_record(&pending).await?;
        report(&outcome);
        Ok(outcome)
    }

    async fn complete_record(&mut self, record: &PendingRecord) -> Result<RecordOutcome> {
        let id = record.id;

        if record.pass == SelectionPass::MissingTitle && is_blank(record.description.as_deref())
        {
            let title = self.config.default_title.clone();
            let update = ContentUpdate::title_only(title.clone());
            if !self.store.update_content(id, &update).await? {
                return Ok(RecordOutcome::failed(id, Stage::Selected, "record no longer exists"));
            }
            return Ok(RecordOutcome::Defaulted {
                content_id: id,
                title,
            });
        }

        debug!(content_id = id, pass = %record.pass, "Prompting model");
        let prompt = completion_prompt(record.title.as_deref(), record.description.as_deref());
        let text = match self.inference.submit_prompt(&prompt).await {
            Reply::Text(text) => text,
            other => return Ok(RecordOutcome::failed(id, Stage::Prompted, other.to_string())),
        };

        let Some(parsed) = extract(&text) else {
            return Ok(RecordOutcome::failed(
                id,
                Stage::Prompted,
                "reply held no usable JSON object",
            ));
        };

        let (title, description) = self.new_fields(record, &parsed);
        if title.is_none() && description.is_none() && parsed.category.trim().is_empty() {
            return Ok(RecordOutcome::failed(
                id,
                Stage::Parsed,
                "reply did not fill any missing field",
            ));
        }

        let category = self.resolve_category(&parsed.category).await?;

        let update = ContentUpdate {
            title: title.clone().or_else(|| record.title.clone()),
            description: description.clone().or_else(|| record.description.clone()),
            category_id: category.as_ref().map(|c| c.id),
        };
        if !self.store.update_content(id, &update).await? {
            return Ok(RecordOutcome::failed(id, Stage::Resolved, "record no longer exists"));
        }

        Ok(RecordOutcome::Written {
            content_id: id,
            title,
            description,
            category,
        })
    }

    /// Generated values for the fields this record is missing.
    /// Fields the record already has are never taken from the reply.
    fn new_fields(
        &self,
        record: &PendingRecord,
        parsed: &ParsedCompletion,
    ) -> (Option<String>, Option<String>) {
        let title = match record.pass {
            SelectionPass::MissingDescription => None,
            _ => non_empty(&parsed.title)
                .map(|title| truncate_title(title, self.config.max_title_length)),
        };
        let description = match record.pass {
            SelectionPass::MissingDescription => non_empty(&parsed.description).map(str::to_string),
            _ => None,
        };
        (title, description)
    }

    async fn resolve_category(&mut self, name: &str) -> Result<Option<CategoryAssignment>> {
        match self.resolver.resolve(name, &self.snapshot) {
            Resolution::Blank => Ok(None),
            Resolution::Existing(category) => Ok(Some(CategoryAssignment {
                id: category.id,
                title: category.title,
                created: false,
            })),
            Resolution::Create(title) => {
                let id = self.store.insert_category(&title).await?;
                self.snapshot.register(id, &title);
                self.categories_created += 1;
                info!(category_id = id, "Created category '{}'", title);
                Ok(Some(CategoryAssignment {
                    id,
                    title,
                    created: true,
                }))
            }
        }
    }
}

/// Full batch run: load the snapshot, run every pass, and close storage on
/// every exit path
pub async fn run_batch(
    store: &dyn ContentStore,
    inference: &dyn InferenceClient,
    config: &CompletionConfig,
    options: &RunOptions,
) -> Result<CompletionStats> {
    let result = match Completer::load(store, inference, config).await {
        Ok(mut completer) => Ok(completer.run_passes(options).await),
        Err(e) => Err(e),
    };
    store.close().await;
    result
}

/// Complete one record by id, closing storage afterwards
pub async fn complete_single(
    store: &dyn ContentStore,
    inference: &dyn InferenceClient,
    config: &CompletionConfig,
    id: i64,
) -> Result<RecordOutcome> {
    let result = match Completer::load(store, inference, config).await {
        Ok(mut completer) => completer.complete_one(id).await,
        Err(e) => Err(e),
    };
    store.close().await;
    result
}

fn report(outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Written {
            content_id,
            category,
            ..
        } => match category {
            Some(category) => info!(
                content_id,
                category_id = category.id,
                "✓ Content {} updated (category: {})",
                content_id,
                category.title
            ),
            None => info!(content_id, "✓ Content {} updated", content_id),
        },
        RecordOutcome::Defaulted { content_id, title } => info!(
            content_id,
            "✓ Content {} has nothing to complete from, set title to '{}'", content_id, title
        ),
        RecordOutcome::Failed {
            content_id,
            stage,
            reason,
        } => warn!(
            content_id,
            stage = ?stage,
            "✗ Content {} not updated: {}",
            content_id,
            reason
        ),
        RecordOutcome::Skipped { content_id } => {
            info!(content_id, "Content {} has nothing missing", content_id)
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Longest prefix of `text` of at most `max` characters that ends on a
/// grapheme boundary
fn truncate_title(text: &str, max: usize) -> String {
    let mut title = String::new();
    let mut chars = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if chars + len > max {
            break;
        }
        title.push_str(grapheme);
        chars += len;
    }
    title.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order, then answers `NoAnswer`
    #[derive(Default)]
    struct ScriptedInference {
        replies: Mutex<VecDeque<Reply>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedInference {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn json(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Reply::Text(r.to_string())).collect())
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedInference {
        async fn submit_prompt(&self, prompt: &str) -> Reply {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::NoAnswer)
        }
    }

    fn store() -> MemoryContentStore {
        MemoryContentStore::new(crate::config::default_placeholder_titles())
    }

    #[tokio::test]
    async fn test_missing_title_record_gets_title_and_new_category() {
        let description = "An article about renewable energy trends";
        let store = store()
            .with_category(40, "Technology")
            .with_category(41, "Health")
            .with_content(7, None, Some(description));
        let inference = ScriptedInference::json(&[
            r#"{"Title": "Renewable Energy Trends", "Description": "Rewritten", "Category": "Energy"}"#,
        ]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(
            store.updates(),
            vec![(
                7,
                ContentUpdate {
                    title: Some("Renewable Energy Trends".to_string()),
                    description: Some(description.to_string()),
                    category_id: Some(42),
                }
            )]
        );
        assert!(store
            .categories()
            .iter()
            .any(|c| c.id == 42 && c.title == "Energy"));
        assert_eq!(stats.records_selected, 1);
        assert_eq!(stats.records_updated, 1);
        assert_eq!(stats.categories_created, 1);
        assert!(store.is_closed());

        let prompts = inference.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Description: An article about renewable energy trends"));
        assert!(!prompts[0].contains("Title: "));
    }

    #[tokio::test]
    async fn test_nothing_to_complete_from_gets_default_title() {
        let store = store()
            .with_content(3, None, None)
            .with_content(4, None, Some("   "));
        let inference = ScriptedInference::default();
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert!(inference.prompts().is_empty());
        assert_eq!(
            store.updates(),
            vec![
                (3, ContentUpdate::title_only("Untitled Content")),
                (4, ContentUpdate::title_only("Untitled Content")),
            ]
        );
        assert_eq!(stats.records_defaulted, 2);
        assert_eq!(stats.records_updated, 0);
    }

    #[tokio::test]
    async fn test_unusable_replies_leave_records_untouched() {
        let store = store()
            .with_content(1, None, Some("first"))
            .with_content(2, None, Some("second"))
            .with_content(3, None, Some("third"));
        let inference = ScriptedInference::new(vec![
            Reply::NoAnswer,
            Reply::TransportFailure("connection refused".to_string()),
            Reply::Text("I cannot help with that.".to_string()),
        ]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert!(store.updates().is_empty());
        assert_eq!(stats.records_failed, 3);
        assert!(stats.errors.is_empty());
        assert_eq!(inference.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_known_title_is_kept() {
        let store = store()
            .with_category(1, "Technology")
            .with_content(5, Some("Solar Panels"), None);
        let inference = ScriptedInference::json(&[
            r#"{"Title": "Something Else", "Description": "How photovoltaic panels work.", "Category": "tech"}"#,
        ]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(
            store.updates(),
            vec![(
                5,
                ContentUpdate {
                    title: Some("Solar Panels".to_string()),
                    description: Some("How photovoltaic panels work.".to_string()),
                    category_id: Some(1),
                }
            )]
        );
        assert_eq!(stats.categories_created, 0);
        assert!(inference.prompts()[0].contains("Title: Solar Panels"));
    }

    #[tokio::test]
    async fn test_placeholder_title_replaced_and_truncated() {
        let long_title = "e\u{301}".repeat(120);
        let store = store().with_content(9, Some("None"), Some("A long story"));
        let reply = format!(r#"{{"Title": "{}", "Category": ""}}"#, long_title);
        let inference = ScriptedInference::json(&[reply.as_str()]);
        let config = CompletionConfig::default();

        run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let title = updates[0].1.title.clone().unwrap();
        assert!(title.chars().count() <= 100);
        assert_eq!(title, "e\u{301}".repeat(50));
        assert_eq!(updates[0].1.description.as_deref(), Some("A long story"));
        assert_eq!(updates[0].1.category_id, None);
    }

    #[tokio::test]
    async fn test_new_category_is_created_once_per_run() {
        let store = store()
            .with_category(1, "Technology")
            .with_category(2, "Health")
            .with_content(10, None, Some("Gene expression in quantum systems"))
            .with_content(11, None, Some("Photosynthesis and coherence"));
        let inference = ScriptedInference::json(&[
            r#"{"Title": "Quantum Genes", "Category": "Quantum Biology"}"#,
            r#"{"Title": "Quantum Leaves", "Category": "quantum biology"}"#,
        ]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(store.categories().len(), 3);
        assert_eq!(stats.categories_created, 1);
        let updates = store.updates();
        assert_eq!(updates[0].1.category_id, Some(3));
        assert_eq!(updates[1].1.category_id, Some(3));
    }

    #[tokio::test]
    async fn test_reply_filling_nothing_is_a_failure() {
        let store = store().with_content(5, Some("Solar Panels"), None);
        let inference = ScriptedInference::json(&[r#"{"Title": "Solar Panels"}"#]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        assert!(store.updates().is_empty());
        assert_eq!(stats.records_failed, 1);
    }

    #[tokio::test]
    async fn test_storage_error_aborts_pass_but_not_run() {
        let store = store()
            .with_content(1, None, Some("first"))
            .with_content(2, None, Some("second"))
            .with_content(3, Some("Solar"), None);
        store.fail_updates();
        let inference = ScriptedInference::json(&[
            r#"{"Title": "One", "Category": ""}"#,
            r#"{"Description": "About solar", "Category": ""}"#,
        ]);
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions::default())
            .await
            .unwrap();

        // one attempt per pass, the second record of the first pass is never reached
        assert_eq!(inference.prompts().len(), 2);
        assert_eq!(stats.errors.len(), 2);
        assert!(stats.errors[0].starts_with("missing title pass"));
        assert!(stats.errors[1].starts_with("missing description pass"));
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_limit_caps_each_pass() {
        let store = store()
            .with_content(1, None, Some("first"))
            .with_content(2, None, Some("second"))
            .with_content(3, Some("Solar"), None);
        let inference = ScriptedInference::default();
        let config = CompletionConfig::default();

        let stats = run_batch(&store, &inference, &config, &RunOptions { limit: Some(1) })
            .await
            .unwrap();

        assert_eq!(stats.records_selected, 2);
        assert_eq!(inference.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_complete_single_record() {
        let store = store()
            .with_category(1, "Health")
            .with_content(4, Some("Untitled Content"), Some("Daily stretching routines"))
            .with_content(5, Some("Done"), Some("Already complete"));
        let inference = ScriptedInference::json(&[
            r#"{"Title": "Stretching Basics", "Description": "x", "Category": "Health"}"#,
        ]);
        let config = CompletionConfig::default();

        let mut completer = Completer::load(&store, &inference, &config).await.unwrap();
        let outcome = completer.complete_one(4).await.unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Written {
                content_id: 4,
                title: Some("Stretching Basics".to_string()),
                description: None,
                category: Some(CategoryAssignment {
                    id: 1,
                    title: "Health".to_string(),
                    created: false,
                }),
            }
        );

        let outcome = completer.complete_one(5).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Skipped { content_id: 5 });

        let missing = completer.complete_one(99).await;
        assert!(matches!(missing, Err(Error::ContentNotFound(99))));
    }

    #[test]
    fn test_truncate_title_counts_characters() {
        assert_eq!(truncate_title("Short", 100), "Short");
        assert_eq!(truncate_title("abc def", 4), "abc");
        assert_eq!(truncate_title(&"a".repeat(150), 100), "a".repeat(100));
        // each flag is two characters and is never split
        assert_eq!(truncate_title("🇫🇷🇩🇪🇮🇹", 5), "🇫🇷🇩🇪");
        // a combining sequence that would straddle the limit is dropped whole
        assert_eq!(truncate_title("abe\u{301}", 3), "ab");
    }
}
