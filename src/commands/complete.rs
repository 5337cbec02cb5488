//! Complete command - run the completion flow for one record

use super::{inference_client, open_store};
use crate::completer::{complete_single, RecordOutcome};
use crate::config::Config;
use crate::error::Result;
use tracing::info;

/// Complete the record with the given id
pub async fn cmd_complete(
    config: &Config,
    content_id: i64,
    session: Option<String>,
) -> Result<RecordOutcome> {
    info!(content_id, "Completing single record");

    let client = inference_client(config, session)?;
    let store = open_store(config).await?;
    complete_single(&store, &client, &config.completion, content_id).await
}

/// Print a single-record outcome to console
pub fn print_record_outcome(outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Written {
            content_id,
            title,
            description,
            category,
        } => {
            println!("✓ Content {} updated", content_id);
            if let Some(title) = title {
                println!("  Title: {}", title);
            }
            if let Some(description) = description {
                println!("  Description: {}", description);
            }
            if let Some(category) = category {
                let note = if category.created { " (new)" } else { "" };
                println!("  Category: {} [{}]{}", category.title, category.id, note);
            }
        }
        RecordOutcome::Defaulted { content_id, title } => {
            println!("✓ Content {} set to default title '{}'", content_id, title);
        }
        RecordOutcome::Failed {
            content_id, reason, ..
        } => {
            println!("✗ Content {} not updated: {}", content_id, reason);
        }
        RecordOutcome::Skipped { content_id } => {
            println!("Content {} has no missing fields", content_id);
        }
    }
}
