pub mod api;
mod middleware;
mod public;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router};
pub use middleware::{ClientIp, ClientIpPolicy, client_ip_from_headers};
pub use public::{HttpState, build_router};

use crate::application::error::HttpError;
use crate::application::store::StoreError;
use axum::Router;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

fn store_health_response(result: Result<(), StoreError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::store_health",
            StatusCode::SERVICE_UNAVAILABLE,
            "Key-value store unavailable",
            &err,
        )
        .into_response(),
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
    pub client_ip: ClientIpPolicy,
}

impl FromRef<RouterState> for ClientIpPolicy {
    fn from_ref(state: &RouterState) -> Self {
        state.client_ip
    }
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Public site routes and the JSON API on one router.
pub fn build_app(state: RouterState) -> Router {
    build_router(state.clone())
        .merge(build_api_router(state.clone()))
        .with_state(state)
}
