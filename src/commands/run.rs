//! Run command - batch completion over every selection pass

use super::{inference_client, open_store};
use crate::completer::{run_batch, CompletionStats, RunOptions};
use crate::config::Config;
use crate::error::Result;
use tracing::info;

/// Run command options
#[derive(Debug, Clone, Default)]
pub struct RunCommandOptions {
    /// Session hash override
    pub session: Option<String>,
    /// Maximum records per pass
    pub limit: Option<usize>,
}

/// Execute a batch completion run
pub async fn cmd_run(config: &Config, options: RunCommandOptions) -> Result<CompletionStats> {
    info!("Starting completion run");

    let client = inference_client(config, options.session)?;
    let store = open_store(config).await?;

    let run_options = RunOptions {
        limit: options.limit,
    };
    run_batch(&store, &client, &config.completion, &run_options).await
}

/// Print run statistics to console
pub fn print_completion_stats(stats: &CompletionStats) {
    println!("\n📝 Completion Run Complete\n");
    println!("Records selected: {}", stats.records_selected);
    println!("Records updated: {}", stats.records_updated);
    println!("Default titles set: {}", stats.records_defaulted);
    println!("Records failed: {}", stats.records_failed);
    println!("Categories created: {}", stats.categories_created);

    if !stats.errors.is_empty() {
        println!("\nErrors:");
        for error in &stats.errors {
            println!("- {}", error);
        }
    }
}
