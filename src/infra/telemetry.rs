use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_BLOG_VIEWS: &str = "folio_blog_views_total";
pub const METRIC_VIEW_STORE_ERRORS: &str = "folio_view_store_errors_total";
pub const METRIC_SUBSCRIPTIONS: &str = "folio_subscriptions_total";
pub const METRIC_MAIL_SENT: &str = "folio_mail_sent_total";
pub const METRIC_MAIL_FAILED: &str = "folio_mail_failed_total";
pub const METRIC_MAIL_SEND_MS: &str = "folio_mail_send_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_BLOG_VIEWS,
            Unit::Count,
            "Total number of recorded blog page views."
        );
        describe_counter!(
            METRIC_VIEW_STORE_ERRORS,
            Unit::Count,
            "View counter increments that failed against the key-value store."
        );
        describe_counter!(
            METRIC_SUBSCRIPTIONS,
            Unit::Count,
            "New newsletter subscriptions."
        );
        describe_counter!(
            METRIC_MAIL_SENT,
            Unit::Count,
            "Emails accepted by the mail provider."
        );
        describe_counter!(
            METRIC_MAIL_FAILED,
            Unit::Count,
            "Emails that failed to render or were rejected by the mail provider."
        );
        describe_histogram!(
            METRIC_MAIL_SEND_MS,
            Unit::Milliseconds,
            "Mail provider request latency in milliseconds."
        );
    });
}
