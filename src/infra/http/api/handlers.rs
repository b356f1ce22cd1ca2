use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use folio_api_types::{
    ArticleList, ArticleSummary, CategoryEntry, CategoryList, SubscribeRequest,
    SubscribeResponse, ViewCountResponse,
};
use serde::Deserialize;

use crate::application::catalog::{ArticleQuery, DEFAULT_RELATED_LIMIT};
use crate::domain::articles::Article;
use crate::infra::http::ClientIp;

use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery};
use super::state::ApiState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
}

/// `views` is the catalog baseline; single-article handlers replace it with the live total.
fn article_to_api(article: &Article) -> ArticleSummary {
    ArticleSummary {
        id: article.id,
        title: article.title.clone(),
        summary: article.summary.clone(),
        label: article.label.clone(),
        slug: article.slug.clone(),
        author: article.author.clone(),
        keyword: article.keyword.clone(),
        published: article.published.to_string(),
        image: article.image.clone(),
        read_time: article.read_time,
        views: article.baseline_views,
        tags: article.tags.clone(),
    }
}

pub async fn subscribe(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.subscriptions.subscribe(&payload.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            email: outcome.email.into_inner(),
            welcome_sent: outcome.welcome_sent,
        }),
    ))
}

pub async fn record_view(
    State(state): State<ApiState>,
    Extension(client_ip): Extension<ClientIp>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recorded = state.views.record_view(&slug, client_ip.0).await?;
    let baseline = state
        .catalog
        .find(&slug)
        .map(|article| article.baseline_views)
        .unwrap_or_default();
    let live = recorded
        .total
        .and_then(|total| u64::try_from(total).ok())
        .unwrap_or_default();

    Ok(Json(ViewCountResponse {
        slug,
        views: baseline.saturating_add(live),
    }))
}

pub async fn view_count(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.views.view_count(&slug).await?;
    Ok(Json(ViewCountResponse { slug, views }))
}

pub async fn list_articles(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items: Vec<ArticleSummary> = state
        .catalog
        .list(&ArticleQuery {
            search: query.q,
            category: query.category,
        })
        .into_iter()
        .map(article_to_api)
        .collect();

    Ok(Json(ArticleList {
        total: items.len(),
        items,
    }))
}

pub async fn featured_article(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .catalog
        .featured()
        .ok_or_else(|| ApiError::not_found("No articles published"))?;
    let views = state.views.view_count(&article.slug).await?;

    Ok(Json(ArticleSummary {
        views,
        ..article_to_api(article)
    }))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .catalog
        .find(&slug)
        .ok_or_else(|| ApiError::not_found("Unknown article").with_detail(format!("slug={slug}")))?;
    let views = state.views.view_count(&slug).await?;

    Ok(Json(ArticleSummary {
        views,
        ..article_to_api(article)
    }))
}

pub async fn related_articles(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    ApiQuery(query): ApiQuery<RelatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RELATED_LIMIT);
    if limit == 0 {
        return Err(ApiError::bad_request(
            "limit must be positive",
            Some(format!("limit={limit}")),
        ));
    }

    let items: Vec<ArticleSummary> = state
        .catalog
        .related(&slug, limit)?
        .into_iter()
        .map(article_to_api)
        .collect();

    Ok(Json(ArticleList {
        total: items.len(),
        items,
    }))
}

pub async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .catalog
        .categories()
        .iter()
        .map(|category| CategoryEntry {
            name: category.name.clone(),
            value: category.value.clone(),
        })
        .collect();
    Ok(Json(CategoryList { items }))
}
