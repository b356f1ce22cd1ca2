pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let rate_state = state.clone();

    Router::new()
        .route(
            "/api/subscribe",
            post(handlers::subscribe).route_layer(axum_middleware::from_fn_with_state(
                rate_state,
                middleware::subscribe_rate_limit,
            )),
        )
        .route("/api/blogs", get(handlers::list_articles))
        .route("/api/blogs/featured", get(handlers::featured_article))
        .route("/api/blogs/{slug}", get(handlers::get_article))
        .route(
            "/api/blogs/{slug}/views",
            get(handlers::view_count).post(handlers::record_view),
        )
        .route("/api/blogs/{slug}/related", get(handlers::related_articles))
        .route("/api/categories", get(handlers::list_categories))
        .with_state(state.clone())
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(state, set_request_context))
}
