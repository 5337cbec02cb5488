//! Category resolution against the known category vocabulary
//!
//! A suggested category name is matched case-insensitively: exact match
//! first, then fuzzy candidates above a similarity cutoff, then substring
//! containment in either direction. When nothing matches the caller creates
//! the category and registers it in the run's [`CategorySnapshot`], so the
//! same name never produces a second row within one run.

use crate::config::CompletionConfig;
use crate::store::Category;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Known categories for one batch run, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct CategorySnapshot {
    categories: Vec<Category>,
    by_folded: HashMap<String, usize>,
}

impl CategorySnapshot {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut snapshot = Self::default();
        for category in categories {
            snapshot.register(category.id, &category.title);
        }
        snapshot
    }

    /// Add a category. When two titles fold to the same key the first one stays.
    pub fn register(&mut self, id: i64, title: &str) {
        let folded = fold(title);
        let index = self.categories.len();
        self.categories.push(Category {
            id,
            title: title.to_string(),
        });
        self.by_folded.entry(folded).or_insert(index);
    }

    /// Category whose title equals `title` ignoring case
    pub fn get(&self, title: &str) -> Option<&Category> {
        self.by_folded
            .get(&fold(title))
            .map(|&index| &self.categories[index])
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Folded titles in registration order, one per distinct key.
    /// Blank titles are left out: they would contain every name.
    fn folded_titles(&self) -> Vec<&str> {
        let mut titles: Vec<(&str, usize)> = self
            .by_folded
            .iter()
            .filter(|(folded, _)| !folded.is_empty())
            .map(|(folded, &index)| (folded.as_str(), index))
            .collect();
        titles.sort_by_key(|&(_, index)| index);
        titles.into_iter().map(|(folded, _)| folded).collect()
    }
}

/// Result of resolving a category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An existing category matched
    Existing(Category),
    /// Nothing matched; create a category with this (trimmed, original-cased) title
    Create(String),
    /// The name was blank; leave the record's category alone
    Blank,
}

/// Matches free-text category names against a snapshot
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    cutoff: f64,
    max_close_matches: usize,
}

impl CategoryResolver {
    pub fn new(cutoff: f64, max_close_matches: usize) -> Self {
        Self {
            cutoff,
            max_close_matches,
        }
    }

    pub fn from_config(config: &CompletionConfig) -> Self {
        Self::new(config.category_match_cutoff, config.max_close_matches)
    }

    pub fn resolve(&self, name: &str, snapshot: &CategorySnapshot) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return Resolution::Blank;
        }

        if let Some(category) = snapshot.get(name) {
            return Resolution::Existing(category.clone());
        }

        let target = fold(name);
        let known = snapshot.folded_titles();

        let close = self.close_matches(&target, &known);
        let partial = known
            .iter()
            .copied()
            .filter(|candidate| candidate.contains(target.as_str()) || target.contains(candidate));

        let mut seen = Vec::new();
        for candidate in close.into_iter().chain(partial) {
            if !seen.contains(&candidate) {
                seen.push(candidate);
            }
        }

        match seen.first().and_then(|best| snapshot.get(best)) {
            Some(category) => Resolution::Existing(category.clone()),
            None => Resolution::Create(name.to_string()),
        }
    }

    /// Up to `max_close_matches` candidates scoring at least the cutoff,
    /// best first; ties go to the lexicographically greater title
    pub fn close_matches<'a>(&self, target: &str, candidates: &[&'a str]) -> Vec<&'a str> {
        let mut scored: Vec<(f64, &'a str)> = candidates
            .iter()
            .map(|&candidate| (similarity(target, candidate), candidate))
            .filter(|(score, _)| *score >= self.cutoff)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.cmp(a.1))
        });
        scored.truncate(self.max_close_matches);
        scored.into_iter().map(|(_, candidate)| candidate).collect()
    }
}

/// Normalized similarity in `[0, 1]`: Sørensen–Dice over character bigrams
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
}

fn fold(title: &str) -> String {
    title.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(i64, &str)]) -> CategorySnapshot {
        CategorySnapshot::new(
            entries
                .iter()
                .map(|&(id, title)| Category {
                    id,
                    title: title.to_string(),
                })
                .collect(),
        )
    }

    fn resolver() -> CategoryResolver {
        CategoryResolver::from_config(&CompletionConfig::default())
    }

    fn existing(id: i64, title: &str) -> Resolution {
        Resolution::Existing(Category {
            id,
            title: title.to_string(),
        })
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let snap = snapshot(&[(1, "Technology"), (2, "Health")]);
        assert_eq!(resolver().resolve("technology", &snap), existing(1, "Technology"));
        assert_eq!(resolver().resolve("  HEALTH ", &snap), existing(2, "Health"));
    }

    #[test]
    fn test_exact_match_beats_better_fuzzy_candidates() {
        // "Tech" is a substring of "Technology" but the exact entry must win
        let snap = snapshot(&[(1, "Technology"), (2, "Tech")]);
        assert_eq!(resolver().resolve("TECH", &snap), existing(2, "Tech"));
    }

    #[test]
    fn test_prefix_resolves_to_longer_title() {
        let snap = snapshot(&[(1, "Technology")]);
        assert_eq!(resolver().resolve("Tech", &snap), existing(1, "Technology"));
    }

    #[test]
    fn test_substring_in_either_direction() {
        let snap = snapshot(&[(1, "Art"), (2, "Travel")]);
        assert_eq!(resolver().resolve("Modern Art", &snap), existing(1, "Art"));
        assert_eq!(resolver().resolve("Trav", &snap), existing(2, "Travel"));
    }

    #[test]
    fn test_fuzzy_match_catches_misspelling() {
        let snap = snapshot(&[(1, "Technology"), (2, "Health")]);
        assert_eq!(resolver().resolve("Tecnology", &snap), existing(1, "Technology"));
        assert_eq!(resolver().resolve("Helth", &snap), existing(2, "Health"));
    }

    #[test]
    fn test_unmatched_name_requests_creation() {
        let snap = snapshot(&[(1, "Technology"), (2, "Health")]);
        assert_eq!(
            resolver().resolve(" Quantum Biology ", &snap),
            Resolution::Create("Quantum Biology".to_string())
        );
        assert_eq!(
            resolver().resolve("Energy", &snap),
            Resolution::Create("Energy".to_string())
        );
    }

    #[test]
    fn test_registered_category_is_found_later_in_run() {
        let mut snap = snapshot(&[(1, "Technology"), (2, "Health")]);
        let resolver = resolver();

        let Resolution::Create(title) = resolver.resolve("Quantum Biology", &snap) else {
            panic!("expected creation");
        };
        snap.register(3, &title);

        assert_eq!(
            resolver.resolve("quantum biology", &snap),
            existing(3, "Quantum Biology")
        );
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_blank_name() {
        let snap = snapshot(&[(1, "Technology")]);
        assert_eq!(resolver().resolve("   ", &snap), Resolution::Blank);
    }

    #[test]
    fn test_empty_snapshot_creates() {
        let snap = CategorySnapshot::default();
        assert!(snap.is_empty());
        assert_eq!(
            resolver().resolve("Science", &snap),
            Resolution::Create("Science".to_string())
        );
    }

    #[test]
    fn test_close_matches_ranked_and_capped() {
        let resolver = CategoryResolver::new(0.4, 2);
        let candidates = ["sport", "sports", "spots", "cooking"];
        let matches = resolver.close_matches("sports", &candidates);
        assert_eq!(matches, vec!["sports", "sport"]);
    }

    #[test]
    fn test_fuzzy_candidates_come_before_substring_candidates() {
        // "Art" is contained in the suggestion and registered first, but scores low
        let snap = snapshot(&[(1, "Art"), (2, "Artificial Intelligence")]);
        assert_eq!(
            resolver().resolve("Artificial Intelligence Research", &snap),
            existing(2, "Artificial Intelligence")
        );
    }

    #[test]
    fn test_blank_category_title_never_matches() {
        let snap = snapshot(&[(1, "Technology"), (2, " ")]);
        assert_eq!(
            resolver().resolve("Quantum Biology", &snap),
            Resolution::Create("Quantum Biology".to_string())
        );
        assert_eq!(resolver().resolve("tech", &snap), existing(1, "Technology"));
    }

    #[test]
    fn test_duplicate_titles_keep_first_id() {
        let snap = snapshot(&[(5, "News"), (9, "news")]);
        assert_eq!(resolver().resolve("NEWS", &snap), existing(5, "News"));
    }
}
