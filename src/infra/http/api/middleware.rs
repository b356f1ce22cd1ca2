use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::infra::http::ClientIp;

use super::error::ApiError;
use super::state::ApiState;

pub async fn subscribe_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let key = request
        .extensions()
        .get::<ClientIp>()
        .copied()
        .unwrap_or(ClientIp(None))
        .bucket_key();

    if state.rate_limiter.allow(&key, &path).is_none() {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    next.run(request).await
}
