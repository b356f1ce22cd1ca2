//! Loads article metadata and categories from a TOML catalog file.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use time::Date;
use time::macros::format_description;
use tracing::info;

use crate::application::catalog::CatalogService;
use crate::domain::articles::{Article, Category};
use crate::domain::views::is_valid_slug;

use super::error::InfraError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<CategoryRecord>,
    #[serde(default)]
    articles: Vec<ArticleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryRecord {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArticleRecord {
    id: u32,
    title: String,
    summary: String,
    label: String,
    slug: String,
    author: String,
    #[serde(default)]
    keyword: String,
    published: String,
    image: String,
    read_time: u32,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    tags: Vec<String>,
}

pub async fn load_catalog(path: &Path) -> Result<CatalogService, InfraError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
        InfraError::catalog(format!("failed to read `{}`: {err}", path.display()))
    })?;
    let catalog = parse_catalog(&contents)
        .map_err(|err| InfraError::catalog(format!("{}: {err}", path.display())))?;
    info!(
        target = "folio::catalog",
        path = %path.display(),
        articles = catalog.len(),
        categories = catalog.categories().len(),
        "article catalog loaded"
    );
    Ok(catalog)
}

/// Parse and validate catalog TOML. Errors are plain messages naming the offending entry.
pub fn parse_catalog(contents: &str) -> Result<CatalogService, String> {
    let file: CatalogFile = toml::from_str(contents).map_err(|err| err.to_string())?;

    let mut slugs = HashSet::new();
    let mut ids = HashSet::new();
    let mut articles = Vec::with_capacity(file.articles.len());
    for record in file.articles {
        if !is_valid_slug(&record.slug) {
            return Err(format!("article {} has invalid slug `{}`", record.id, record.slug));
        }
        if !slugs.insert(record.slug.clone()) {
            return Err(format!("duplicate article slug `{}`", record.slug));
        }
        if !ids.insert(record.id) {
            return Err(format!("duplicate article id {}", record.id));
        }
        let published = parse_date(&record.published).ok_or_else(|| {
            format!(
                "article `{}` has invalid published date `{}` (expected YYYY-MM-DD)",
                record.slug, record.published
            )
        })?;

        articles.push(Article {
            id: record.id,
            title: record.title,
            summary: record.summary,
            label: record.label,
            slug: record.slug,
            author: record.author,
            keyword: record.keyword,
            published,
            image: record.image,
            read_time: record.read_time,
            baseline_views: record.views,
            tags: record.tags,
        });
    }

    let categories = file
        .categories
        .into_iter()
        .map(|record| Category {
            name: record.name,
            value: record.value,
        })
        .collect();

    Ok(CatalogService::new(articles, categories))
}

fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}
