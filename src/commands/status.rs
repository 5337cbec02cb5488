//! Status command implementation

use super::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::store::{ContentStore, IncompleteCounts};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub inference_url: String,
    pub session_hash: Option<String>,
    pub counts: IncompleteCounts,
}

/// Get system status
pub async fn cmd_status(config: &Config) -> Result<StatusInfo> {
    info!("Getting status");

    let store = open_store(config).await?;
    let counts = store.count_incomplete().await;
    store.close().await;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        inference_url: config.inference.base_url.clone(),
        session_hash: config.inference.session_hash.clone(),
        counts: counts?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 content-completer Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nInference:");
    println!("  URL: {}", status.inference_url);
    println!(
        "  Session: {}",
        status.session_hash.as_deref().unwrap_or("fresh per run")
    );
    println!("\nContent:");
    println!("  Records: {}", status.counts.total_content);
    println!("  Categories: {}", status.counts.total_categories);
    println!("\nAwaiting completion:");
    println!("  Missing title: {}", status.counts.missing_title);
    println!("  Missing description: {}", status.counts.missing_description);
    println!("  Placeholder title: {}", status.counts.placeholder_title);
    println!("  Total: {}", status.counts.pending());
}
