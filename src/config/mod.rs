//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::subscriber::SubscriberEmail;

pub use cli::{
    CliArgs, Command, NotifyArgs, ServeArgs, ServeOverrides, StoreBackendArg, StoreOverride,
    SubscribersArgs, ViewsArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITE_HOST_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_NAME: &str = "Folio";
const DEFAULT_CATALOG_PATH: &str = "content/articles.toml";
const DEFAULT_MAIL_ENDPOINT: &str = "https://api.resend.com";
const DEFAULT_MAIL_FROM: &str = "Folio <onboarding@resend.dev>";
const DEFAULT_NOTIFY_CONCURRENCY: u32 = 4;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 5;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub site: SiteSettings,
    pub catalog: CatalogSettings,
    pub store: StoreSettings,
    pub mail: MailSettings,
    pub views: ViewSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`. Only safe
    /// behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Public origin of the website, without a trailing slash.
    pub host_url: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum StoreSettings {
    Memory,
    Upstash { url: Url, token: SecretString },
}

impl StoreSettings {
    /// Whether other processes see the same counters and subscriber set.
    pub fn is_shared(&self) -> bool {
        matches!(self, StoreSettings::Upstash { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    /// `None` leaves outgoing mail disabled.
    pub api_key: Option<SecretString>,
    pub endpoint: Url,
    pub from: String,
    pub cc: Vec<String>,
    pub notify_concurrency: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub track_viewer_ip: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("mail.cc"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Subscribers(args)) => raw.apply_store_override(&args.store),
        Some(Command::Notify(args)) => {
            raw.apply_store_override(&args.store);
            if let Some(concurrency) = args.concurrency {
                raw.mail.notify_concurrency = Some(concurrency);
            }
        }
        Some(Command::Views(args)) => raw.apply_store_override(&args.store),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    site: RawSiteSettings,
    catalog: RawCatalogSettings,
    store: RawStoreSettings,
    mail: RawMailSettings,
    views: RawViewSettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(trust) = overrides.server_trust_forwarded_headers {
            self.server.trust_forwarded_headers = Some(trust);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.site_host_url.as_ref() {
            self.site.host_url = Some(url.clone());
        }
        if let Some(path) = overrides.catalog_path.as_ref() {
            self.catalog.path = Some(path.clone());
        }
        if let Some(track) = overrides.views_track_viewer_ip {
            self.views.track_viewer_ip = Some(track);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }

        self.apply_store_override(&overrides.store);
    }

    fn apply_store_override(&mut self, overrides: &StoreOverride) {
        if let Some(backend) = overrides.store_backend {
            self.store.backend = Some(backend.as_str().to_string());
        }
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            site,
            catalog,
            store,
            mail,
            views,
            rate_limit,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let site = build_site_settings(site)?;
        let catalog = build_catalog_settings(catalog)?;
        let store = build_store_settings(store)?;
        let mail = build_mail_settings(mail)?;
        let views = ViewSettings {
            track_viewer_ip: views.track_viewer_ip.unwrap_or(true),
        };
        let rate_limit = build_rate_limit_settings(rate_limit)?;

        Ok(Self {
            server,
            logging,
            site,
            catalog,
            store,
            mail,
            views,
            rate_limit,
        })
    }
}

impl Settings {
    /// Operator commands read what a running server wrote, which a
    /// process-local memory store can never contain.
    pub fn require_shared_store(&self, command: &str) -> Result<(), LoadError> {
        if self.store.is_shared() {
            return Ok(());
        }
        Err(LoadError::invalid(
            "store.backend",
            format!(
                "`{command}` needs store.backend = \"upstash\"; the memory store starts empty in every process"
            ),
        ))
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        trust_forwarded_headers: server.trust_forwarded_headers.unwrap_or(true),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw_url = non_blank(site.host_url).unwrap_or_else(|| DEFAULT_SITE_HOST_URL.to_string());
    let url = parse_http_url(&raw_url, "site.host_url")?;
    let name = non_blank(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());

    Ok(SiteSettings {
        host_url: url.as_str().trim_end_matches('/').to_string(),
        name,
    })
}

fn build_catalog_settings(catalog: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let path = catalog
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid("catalog.path", "path must not be empty"));
    }
    Ok(CatalogSettings { path })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let backend = non_blank(store.backend).unwrap_or_else(|| "memory".to_string());
    match backend.to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreSettings::Memory),
        "upstash" => {
            let raw_url = non_blank(store.url).ok_or_else(|| {
                LoadError::invalid("store.url", "required when store.backend = \"upstash\"")
            })?;
            let url = parse_http_url(&raw_url, "store.url")?;
            let token = non_blank(store.token).ok_or_else(|| {
                LoadError::invalid("store.token", "required when store.backend = \"upstash\"")
            })?;
            Ok(StoreSettings::Upstash {
                url,
                token: SecretString::from(token),
            })
        }
        other => Err(LoadError::invalid(
            "store.backend",
            format!("unknown backend `{other}` (expected memory or upstash)"),
        )),
    }
}

fn build_mail_settings(mail: RawMailSettings) -> Result<MailSettings, LoadError> {
    let api_key = non_blank(mail.api_key).map(SecretString::from);

    let raw_endpoint =
        non_blank(mail.endpoint).unwrap_or_else(|| DEFAULT_MAIL_ENDPOINT.to_string());
    let endpoint = parse_http_url(&raw_endpoint, "mail.endpoint")?;

    let from = non_blank(mail.from).unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

    let mut cc = Vec::new();
    for raw in mail.cc.unwrap_or_default() {
        if raw.trim().is_empty() {
            continue;
        }
        let email = SubscriberEmail::parse(&raw)
            .map_err(|err| LoadError::invalid("mail.cc", err.to_string()))?;
        cc.push(email.into_inner());
    }

    let concurrency = mail
        .notify_concurrency
        .unwrap_or(DEFAULT_NOTIFY_CONCURRENCY);
    let notify_concurrency = non_zero_u32(concurrency.into(), "mail.notify_concurrency")?;

    Ok(MailSettings {
        api_key,
        endpoint,
        from,
        cc,
        notify_concurrency,
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "rate_limit.max_requests")?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    trust_forwarded_headers: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    host_url: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMailSettings {
    api_key: Option<String>,
    endpoint: Option<String>,
    from: Option<String>,
    cc: Option<Vec<String>>,
    notify_concurrency: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewSettings {
    track_viewer_ip: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_http_url(raw: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("`{raw}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "URL scheme must be http or https"));
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
