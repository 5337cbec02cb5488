use super::{Category, ContentRecord, ContentStore, ContentUpdate, IncompleteCounts, SCHEMA_SQL};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

const MISSING_TITLE_WHERE: &str = "title IS NULL";

/// SQLite-backed content store
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
    placeholders: Vec<String>,
}

impl SqliteContentStore {
    /// Open the content database described by the configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(
            &config.paths.db_file,
            config.completion.placeholder_titles.clone(),
        )
        .await
    }

    /// Open (creating if needed) a content database at `db_path`
    pub async fn open(db_path: &Path, placeholders: Vec<String>) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        // One connection: records are processed strictly one after another
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            placeholders: placeholders.iter().map(|p| p.trim().to_string()).collect(),
        };

        if !store.is_initialized().await? {
            store.ensure_schema().await?;
        }

        Ok(store)
    }

    /// Create tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        info!("Initializing content database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if the content table exists
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='pure_content'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    /// Insert a content row (seeding and tests)
    pub async fn insert_content(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        category_id: Option<i64>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO pure_content (title, description, category_id) VALUES (?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// `TRIM(title) IN (?, ...)`, or a constant false when no placeholders are configured
    fn placeholder_match(&self) -> String {
        if self.placeholders.is_empty() {
            return "0".to_string();
        }
        let marks = vec!["?"; self.placeholders.len()].join(", ");
        format!("TRIM(title) IN ({})", marks)
    }

    fn missing_description_where(&self) -> String {
        format!(
            "title IS NOT NULL AND TRIM(title) <> '' AND NOT ({}) \
             AND (description IS NULL OR TRIM(description) = '')",
            self.placeholder_match()
        )
    }

    fn placeholder_title_where(&self) -> String {
        format!(
            "title IS NOT NULL AND {} \
             AND description IS NOT NULL AND TRIM(description) <> ''",
            self.placeholder_match()
        )
    }

    async fn count_where(&self, clause: &str, bind_placeholders: bool) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM pure_content WHERE {}", clause);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if bind_placeholders {
            for p in &self.placeholders {
                query = query.bind(p);
            }
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn select_missing_description(&self) -> Result<Vec<(i64, String)>> {
        let sql = format!(
            "SELECT id, title FROM pure_content WHERE {} ORDER BY id",
            self.missing_description_where()
        );
        let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
        for p in &self.placeholders {
            query = query.bind(p);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn select_missing_title(&self) -> Result<Vec<(i64, Option<String>)>> {
        let sql = format!(
            "SELECT id, description FROM pure_content WHERE {} ORDER BY id",
            MISSING_TITLE_WHERE
        );
        let rows = sqlx::query_as::<_, (i64, Option<String>)>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn select_placeholder_title(&self) -> Result<Vec<(i64, String)>> {
        let sql = format!(
            "SELECT id, description FROM pure_content WHERE {} ORDER BY id",
            self.placeholder_title_where()
        );
        let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
        for p in &self.placeholders {
            query = query.bind(p);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn select_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, title FROM content_categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn insert_category(&self, title: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO content_categories (title) VALUES (?)")
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pure_content SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                category_id = COALESCE(?, category_id),
                complete_datetime = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.category_id)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(
            "SELECT id, title, description, category_id, complete_datetime FROM pure_content WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn count_incomplete(&self) -> Result<IncompleteCounts> {
        let missing_title = self.count_where(MISSING_TITLE_WHERE, false).await?;
        let missing_description = self
            .count_where(&self.missing_description_where(), true)
            .await?;
        let placeholder_title = self
            .count_where(&self.placeholder_title_where(), true)
            .await?;

        let total_content: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pure_content")
            .fetch_one(&self.pool)
            .await?;
        let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(IncompleteCounts {
            missing_title,
            missing_description,
            placeholder_title,
            total_content: total_content as usize,
            total_categories: total_categories as usize,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Content database connection closed");
    }
}
