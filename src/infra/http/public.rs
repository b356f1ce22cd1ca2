use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{error::HttpError, sitemap::SitemapService, store::KeyValueStore};

use super::{
    RouterState,
    middleware::{log_responses, set_request_context},
    store_health_response,
};

#[derive(Clone)]
pub struct HttpState {
    pub sitemap: Arc<SitemapService>,
    pub store: Arc<dyn KeyValueStore>,
}

pub fn build_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/_health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(state, set_request_context))
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    xml_response(state.sitemap.sitemap_xml(), "application/xml")
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    plain_response(state.sitemap.robots_txt())
}

async fn health(State(state): State<HttpState>) -> Response {
    store_health_response(state.store.ping().await)
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|err| {
            HttpError::new(
                "infra::http::public",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to build response",
                err.to_string(),
            )
            .into_response()
        })
}

fn plain_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|err| {
            HttpError::new(
                "infra::http::public",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to build response",
                err.to_string(),
            )
            .into_response()
        })
}
