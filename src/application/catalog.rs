//! Read-only article catalog with the listing page's search and filter rules.

use std::cmp::Reverse;

use thiserror::Error;

use crate::domain::articles::{Article, Category};

pub const DEFAULT_RELATED_LIMIT: usize = 5;
pub const MAX_RELATED_LIMIT: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no article with slug `{slug}`")]
    UnknownArticle { slug: String },
}

/// Listing filter; `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    articles: Vec<Article>,
    categories: Vec<Category>,
}

impl CatalogService {
    /// Articles are kept newest first; equal dates fall back to ascending id.
    pub fn new(mut articles: Vec<Article>, categories: Vec<Category>) -> Self {
        articles.sort_by(|a, b| b.published.cmp(&a.published).then(a.id.cmp(&b.id)));
        Self {
            articles,
            categories,
        }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn all(&self) -> &[Article] {
        &self.articles
    }

    pub fn list(&self, query: &ArticleQuery) -> Vec<&Article> {
        let search = query.search.as_deref().unwrap_or_default();
        let category = query.category.as_deref().unwrap_or_default();
        self.articles
            .iter()
            .filter(|article| article.matches_search(search) && article.matches_category(category))
            .collect()
    }

    pub fn featured(&self) -> Option<&Article> {
        self.articles.first()
    }

    pub fn find(&self, slug: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.slug == slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.find(slug).is_some()
    }

    /// Other articles ranked by shared tags, then recency.
    pub fn related(&self, slug: &str, limit: usize) -> Result<Vec<&Article>, CatalogError> {
        let anchor = self.find(slug).ok_or_else(|| CatalogError::UnknownArticle {
            slug: slug.to_string(),
        })?;

        let mut ranked: Vec<(usize, usize, &Article)> = self
            .articles
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.slug != anchor.slug)
            .map(|(position, candidate)| (anchor.shared_tag_count(candidate), position, candidate))
            .collect();
        // `position` preserves the newest-first order among equally related articles.
        ranked.sort_by_key(|(shared, position, _)| (Reverse(*shared), *position));

        Ok(ranked
            .into_iter()
            .take(limit.min(MAX_RELATED_LIMIT))
            .map(|(_, _, article)| article)
            .collect())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}
