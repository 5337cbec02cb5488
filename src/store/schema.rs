//! SQLite schema definition

/// SQL schema for the content database
pub const SCHEMA_SQL: &str = r#"
-- Categories: the vocabulary content is filed under
CREATE TABLE IF NOT EXISTS content_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL
);

-- Content items awaiting (or done with) completion
CREATE TABLE IF NOT EXISTS pure_content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    description TEXT,
    category_id INTEGER REFERENCES content_categories(id),
    complete_datetime TEXT
);

CREATE INDEX IF NOT EXISTS idx_content_title ON pure_content(title);
CREATE INDEX IF NOT EXISTS idx_content_category ON pure_content(category_id);
"#;
