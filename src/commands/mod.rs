//! CLI commands implementation

pub mod ask;
pub mod categories;
pub mod complete;
pub mod init;
pub mod run;
pub mod status;

pub use ask::*;
pub use categories::*;
pub use complete::*;
pub use init::*;
pub use run::*;
pub use status::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::inference::{new_session_hash, GradioClient};
use crate::store::SqliteContentStore;
use tracing::info;

/// Open the configured content database. It must have been created by `init`.
pub async fn open_store(config: &Config) -> Result<SqliteContentStore> {
    if !config.paths.db_file.exists() {
        return Err(Error::NotInitialized);
    }
    SqliteContentStore::connect(config).await
}

/// Build the inference client for one run.
///
/// The session hash comes from the command line, then the config file, and is
/// otherwise minted fresh.
pub fn inference_client(config: &Config, session: Option<String>) -> Result<GradioClient> {
    let session_hash = session
        .or_else(|| config.inference.session_hash.clone())
        .unwrap_or_else(new_session_hash);
    info!("Using inference session {}", session_hash);
    GradioClient::new(&config.inference, session_hash)
}
