//! Request and response bodies exchanged over the folio public API.
//!
//! The server serialises these types directly, so site frontends and scripts
//! can depend on this crate instead of re-declaring the JSON shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscribeResponse {
    pub email: String,
    /// `false` when the address was stored but the welcome email could not be delivered.
    pub welcome_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewCountResponse {
    pub slug: String,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleSummary {
    pub id: u32,
    pub title: String,
    pub summary: String,
    pub label: String,
    pub slug: String,
    pub author: String,
    pub keyword: String,
    /// Calendar date formatted as `YYYY-MM-DD`.
    pub published: String,
    pub image: String,
    pub read_time: u32,
    /// Catalog baseline on listings; baseline plus the live counter on
    /// single-article responses.
    pub views: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleList {
    pub items: Vec<ArticleSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryList {
    pub items: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
