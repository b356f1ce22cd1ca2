use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc, time::Duration};

use folio::{
    application::{
        catalog::CatalogService,
        error::AppError,
        mailer::Mailer,
        sitemap::SitemapService,
        store::KeyValueStore,
        subscriptions::{SubscriptionError, SubscriptionService},
        views::{ViewError, ViewService},
    },
    config,
    infra::{
        catalog_source,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState, ClientIpPolicy, HttpState, RouterState},
        kv::{MemoryStore, UpstashStore},
        mail::{ResendMailer, UnconfiguredMailer},
        telemetry,
    },
    presentation::email::EmailBranding,
};
use reqwest::Client;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let operator_command = match &command {
        config::Command::Serve(_) => None,
        config::Command::Subscribers(_) => Some("subscribers"),
        config::Command::Notify(_) => Some("notify"),
        config::Command::Views(_) => Some("views"),
    };
    if let Some(name) = operator_command {
        settings
            .require_shared_store(name)
            .map_err(|err| AppError::validation(err.to_string()))?;
    }

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Subscribers(_) => run_subscribers(settings).await,
        config::Command::Notify(args) => run_notify(settings, args).await,
        config::Command::Views(args) => run_views(settings, args).await,
    }
}

struct ApplicationContext {
    catalog: Arc<CatalogService>,
    store: Arc<dyn KeyValueStore>,
    subscriptions: Arc<SubscriptionService>,
    views: Arc<ViewService>,
}

async fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(OUTBOUND_TIMEOUT)
        .build()
        .map_err(|err| InfraError::configuration(format!("failed to build HTTP client: {err}")))?;

    let catalog = Arc::new(catalog_source::load_catalog(&settings.catalog.path).await?);
    let store = build_store(&settings.store, client.clone());
    let mailer = build_mailer(&settings.mail, client);

    let branding = EmailBranding {
        site_name: settings.site.name.clone(),
        site_url: settings.site.host_url.clone(),
    };
    let subscriptions = Arc::new(SubscriptionService::new(
        store.clone(),
        mailer,
        branding,
        settings.mail.cc.clone(),
    ));
    let views = Arc::new(ViewService::new(
        catalog.clone(),
        store.clone(),
        settings.views.track_viewer_ip,
    ));

    Ok(ApplicationContext {
        catalog,
        store,
        subscriptions,
        views,
    })
}

fn build_store(settings: &config::StoreSettings, client: Client) -> Arc<dyn KeyValueStore> {
    match settings {
        config::StoreSettings::Memory => {
            warn!(
                target = "folio::bootstrap",
                "using in-memory store; counters and subscribers are lost on restart"
            );
            Arc::new(MemoryStore::new())
        }
        config::StoreSettings::Upstash { url, token } => {
            info!(
                target = "folio::bootstrap",
                host = url.host_str().unwrap_or_default(),
                "using Upstash store"
            );
            Arc::new(UpstashStore::new(client, url.clone(), token.clone()))
        }
    }
}

fn build_mailer(settings: &config::MailSettings, client: Client) -> Arc<dyn Mailer> {
    match settings.api_key.as_ref() {
        Some(api_key) => Arc::new(ResendMailer::new(
            client,
            settings.endpoint.clone(),
            api_key.clone(),
            settings.from.clone(),
        )),
        None => {
            warn!(
                target = "folio::bootstrap",
                "mail.api_key is not set; outgoing email is disabled"
            );
            Arc::new(UnconfiguredMailer)
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
        settings.rate_limit.max_requests.get(),
    ));
    let prune_handle = {
        let limiter = rate_limiter.clone();
        let period = Duration::from_secs(limiter.retry_after_secs());
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                limiter.prune();
            }
        })
    };

    let sitemap = Arc::new(SitemapService::new(
        app.catalog.clone(),
        settings.site.host_url.clone(),
    ));
    let router_state = RouterState {
        http: HttpState {
            sitemap,
            store: app.store.clone(),
        },
        api: ApiState {
            subscriptions: app.subscriptions.clone(),
            views: app.views.clone(),
            catalog: app.catalog.clone(),
            rate_limiter,
        },
        client_ip: ClientIpPolicy {
            trust_forwarded_headers: settings.server.trust_forwarded_headers,
        },
    };

    let result = serve_http(&settings, router_state).await;

    prune_handle.abort();
    let _ = prune_handle.await;

    result
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_app(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "folio::bootstrap",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        trigger.notify_one();
    })
    .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "folio::bootstrap",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "folio::bootstrap", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "folio::bootstrap", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target = "folio::bootstrap", "shutdown signal received");
}

fn subscription_error_to_app(err: SubscriptionError) -> AppError {
    match err {
        SubscriptionError::Store(inner) => InfraError::store(inner.to_string()).into(),
        other => AppError::unexpected(other.to_string()),
    }
}

fn view_error_to_app(err: ViewError) -> AppError {
    match err {
        ViewError::UnknownArticle { .. } => AppError::NotFound,
        ViewError::InvalidSlug(inner) => AppError::from(inner),
    }
}

async fn run_subscribers(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let subscribers = app
        .subscriptions
        .subscribers()
        .await
        .map_err(subscription_error_to_app)?;

    for email in &subscribers {
        println!("{email}");
    }
    info!(
        target = "folio::cli",
        count = subscribers.len(),
        "listed subscribers"
    );
    Ok(())
}

async fn run_notify(settings: config::Settings, args: config::NotifyArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let article = app
        .catalog
        .find(&args.slug)
        .ok_or_else(|| AppError::validation(format!("no article with slug `{}`", args.slug)))?;

    let concurrency = usize::try_from(settings.mail.notify_concurrency.get()).unwrap_or(1);
    let report = app
        .subscriptions
        .notify_subscribers(article, concurrency)
        .await
        .map_err(subscription_error_to_app)?;

    println!("sent {} notification(s), {} failed", report.sent, report.failed);
    if report.failed > 0 {
        return Err(InfraError::mail(format!(
            "{} of {} notifications failed",
            report.failed,
            report.sent + report.failed
        ))
        .into());
    }
    Ok(())
}

async fn run_views(settings: config::Settings, args: config::ViewsArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let views = app
        .views
        .view_count(&args.slug)
        .await
        .map_err(view_error_to_app)?;

    println!("{}\t{views}", args.slug);
    Ok(())
}
