//! Categories command - list the category vocabulary

use super::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::store::{Category, ContentStore};

/// List all known categories
pub async fn cmd_categories(config: &Config) -> Result<Vec<Category>> {
    let store = open_store(config).await?;
    let categories = store.select_categories().await;
    store.close().await;
    categories
}

/// Print categories to console
pub fn print_categories(categories: &[Category]) {
    println!("\n🏷️  Categories\n");

    if categories.is_empty() {
        println!("No categories yet. They are created during 'content-completer run'.");
        return;
    }

    for category in categories {
        println!("{:>6}  {}", category.id, category.title);
    }
}
