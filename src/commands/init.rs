//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{ContentStore, SqliteContentStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Where init wrote its files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitInfo {
    pub config_path: String,
    pub db_path: String,
}

/// Write a default config file and create the content database schema
pub async fn cmd_init(base_dir: PathBuf, config_path: PathBuf, force: bool) -> Result<InitInfo> {
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(config_path.display().to_string()));
    }

    info!("Initializing content-completer in {:?}", base_dir);

    let mut config = Config::default();
    config.init_paths(Some(base_dir));
    config.paths.config_file = config_path;
    config.save()?;

    let store = SqliteContentStore::connect(&config).await?;
    store.ensure_schema().await?;
    store.close().await;

    Ok(InitInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
    })
}
