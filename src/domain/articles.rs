//! Blog article metadata and the category filter vocabulary.

use time::Date;

/// Category value that matches every article.
pub const ALL_CATEGORIES: &str = "all";

/// Metadata for a single published article.
///
/// Article prose is not part of this type; the site renders it separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: u32,
    pub title: String,
    pub summary: String,
    pub label: String,
    pub slug: String,
    pub author: String,
    pub keyword: String,
    pub published: Date,
    pub image: String,
    pub read_time: u32,
    /// View count carried over from before live counters existed.
    pub baseline_views: u64,
    pub tags: Vec<String>,
}

impl Article {
    /// Case-insensitive substring match on title or summary. The query is used
    /// as typed, so surrounding spaces must match too; an empty query matches.
    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle) || self.summary.to_lowercase().contains(&needle)
    }

    /// `all` matches everything; otherwise any tag must equal `category` ignoring case.
    pub fn matches_category(&self, category: &str) -> bool {
        let category = category.trim();
        if category.is_empty() || category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return true;
        }
        let wanted = category.to_lowercase();
        self.tags.iter().any(|tag| tag.to_lowercase() == wanted)
    }

    pub fn shared_tag_count(&self, other: &Article) -> usize {
        self.tags
            .iter()
            .filter(|tag| {
                other
                    .tags
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(tag))
            })
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub value: String,
}
