use crate::application::catalog::CatalogError;
use crate::application::error::ErrorReport;
use crate::application::subscriptions::SubscriptionError;
use crate::application::views::ViewError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_api_types::{ApiErrorBody, ApiErrorMessage};

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INVALID_EMAIL: &str = "invalid_email";
    pub const ALREADY_SUBSCRIBED: &str = "already_subscribed";
    pub const INVALID_SLUG: &str = "invalid_slug";
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    /// Internal diagnostic for the logs; never sent to the client.
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::InvalidEmail(inner) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_EMAIL,
                "Please provide a valid email address",
                Some(inner.to_string()),
            ),
            SubscriptionError::AlreadySubscribed { .. } => ApiError::new(
                StatusCode::CONFLICT,
                codes::ALREADY_SUBSCRIBED,
                "This email is already subscribed",
                None,
            ),
            SubscriptionError::Store(inner) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::STORE_UNAVAILABLE,
                "Subscription service is temporarily unavailable",
                None,
            )
            .with_detail(inner.to_string()),
        }
    }
}

impl From<ViewError> for ApiError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::UnknownArticle { slug } => {
                ApiError::not_found("Unknown article").with_detail(format!("slug={slug}"))
            }
            ViewError::InvalidSlug(inner) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_SLUG,
                "Invalid article slug",
                Some(inner.to_string()),
            ),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownArticle { slug } => {
                ApiError::not_found("Unknown article").with_detail(format!("slug={slug}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let diagnostic = self
            .detail
            .clone()
            .or_else(|| self.hint.clone())
            .unwrap_or_else(|| self.message.to_string());
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {diagnostic}", self.code),
        )
        .attach(&mut response);
        response
    }
}
