use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Portfolio blog backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Print every subscribed email address.
    Subscribers(SubscribersArgs),
    /// Email a new-article notification to every subscriber.
    Notify(NotifyArgs),
    /// Print the displayed view count of an article.
    Views(ViewsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    Memory,
    Upstash,
}

impl StoreBackendArg {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackendArg::Memory => "memory",
            StoreBackendArg::Upstash => "upstash",
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverride {
    /// Override the key-value store backend.
    #[arg(long = "store-backend", value_name = "BACKEND", value_enum)]
    pub store_backend: Option<StoreBackendArg>,

    /// Override the key-value store REST URL.
    #[arg(long = "store-url", value_name = "URL")]
    pub store_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Resolve client addresses from proxy headers instead of the socket peer.
    #[arg(
        long = "server-trust-forwarded-headers",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub server_trust_forwarded_headers: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the public site URL used in sitemap and email links.
    #[arg(long = "site-host-url", value_name = "URL")]
    pub site_host_url: Option<String>,

    /// Override the article catalog file.
    #[arg(long = "catalog-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub catalog_path: Option<PathBuf>,

    /// Toggle the per-viewer view counter.
    #[arg(
        long = "views-track-viewer-ip",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub views_track_viewer_ip: Option<bool>,

    /// Override the subscribe rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the subscribe rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct SubscribersArgs {
    #[command(flatten)]
    pub store: StoreOverride,
}

#[derive(Debug, Args, Clone)]
pub struct NotifyArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Slug of the article to announce.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Maximum number of emails in flight.
    #[arg(long = "concurrency", value_name = "COUNT")]
    pub concurrency: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ViewsArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Slug of the article to inspect.
    #[arg(value_name = "SLUG")]
    pub slug: String,
}
