use std::io::Write;

use clap::Parser;
use secrecy::ExposeSecret;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_use_memory_store_and_disabled_mail() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(matches!(settings.store, StoreSettings::Memory));
    assert!(settings.mail.api_key.is_none());
    assert_eq!(settings.mail.endpoint.as_str(), "https://api.resend.com/");
    assert_eq!(settings.mail.notify_concurrency.get(), DEFAULT_NOTIFY_CONCURRENCY);
    assert!(settings.views.track_viewer_ip);
    assert_eq!(settings.site.host_url, DEFAULT_SITE_HOST_URL);
    assert_eq!(
        settings.rate_limit.max_requests.get(),
        DEFAULT_RATE_LIMIT_MAX_REQUESTS as u32
    );
}

#[test]
fn forwarded_headers_are_trusted_unless_disabled() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert!(settings.server.trust_forwarded_headers);

    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        server_trust_forwarded_headers: Some(false),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.server.trust_forwarded_headers);
}

#[test]
fn cli_parses_trust_forwarded_headers_flag() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-trust-forwarded-headers",
        "false",
    ]);
    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_trust_forwarded_headers, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn operator_commands_require_a_shared_store() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let err = settings
        .require_shared_store("subscribers")
        .expect_err("memory store");
    assert!(matches!(err, LoadError::Invalid { key: "store.backend", .. }));
    assert!(err.to_string().contains("`subscribers`"));

    let mut raw = RawSettings::default();
    raw.store.backend = Some("upstash".to_string());
    raw.store.url = Some("https://eu1-example.upstash.io".to_string());
    raw.store.token = Some("token".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.require_shared_store("notify").is_ok());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn upstash_backend_requires_url_and_token() {
    let mut raw = RawSettings::default();
    raw.store.backend = Some("upstash".to_string());
    raw.store.url = Some("https://eu1-example.upstash.io".to_string());

    let err = Settings::from_raw(raw.clone()).expect_err("missing token");
    assert!(matches!(err, LoadError::Invalid { key: "store.token", .. }));

    raw.store.token = Some("  secret-token ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    match settings.store {
        StoreSettings::Upstash { url, token } => {
            assert_eq!(url.host_str(), Some("eu1-example.upstash.io"));
            assert_eq!(token.expose_secret(), "secret-token");
        }
        StoreSettings::Memory => panic!("expected upstash backend"),
    }
}

#[test]
fn unknown_store_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.store.backend = Some("sqlite".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(err, LoadError::Invalid { key: "store.backend", .. }));
}

#[test]
fn mail_cc_addresses_are_validated_and_normalised() {
    let mut raw = RawSettings::default();
    raw.mail.cc = Some(vec![" Owner@Example.com".to_string(), String::new()]);
    let settings = Settings::from_raw(raw.clone()).expect("valid settings");
    assert_eq!(settings.mail.cc, vec!["owner@example.com".to_string()]);

    raw.mail.cc = Some(vec!["not an email".to_string()]);
    let err = Settings::from_raw(raw).expect_err("invalid cc");
    assert!(matches!(err, LoadError::Invalid { key: "mail.cc", .. }));
}

#[test]
fn site_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.site.host_url = Some("ftp://example.com".to_string());
    let err = Settings::from_raw(raw.clone()).expect_err("bad scheme");
    assert!(matches!(err, LoadError::Invalid { key: "site.host_url", .. }));

    raw.site.host_url = Some("https://portfolio.example.com/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.host_url, "https://portfolio.example.com");
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.rate_limit.max_requests = Some(0);
    assert!(matches!(
        Settings::from_raw(raw).expect_err("zero limit"),
        LoadError::Invalid {
            key: "rate_limit.max_requests",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.mail.notify_concurrency = Some(0);
    assert!(matches!(
        Settings::from_raw(raw).expect_err("zero concurrency"),
        LoadError::Invalid {
            key: "mail.notify_concurrency",
            ..
        }
    ));
}

#[test]
fn config_file_layer_is_applied() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    write!(
        file,
        r#"
[server]
port = 8088

[site]
host_url = "https://folio.example.com"
name = "Example Folio"

[views]
track_viewer_ip = false

[mail]
cc = ["owner@example.com"]
"#
    )
    .expect("write tmp");

    let args = CliArgs::parse_from([
        "folio",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.site.name, "Example Folio");
    assert!(!settings.views.track_viewer_ip);
    assert_eq!(settings.mail.cc, vec!["owner@example.com".to_string()]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_notify_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "notify",
        "--store-backend",
        "upstash",
        "--concurrency",
        "8",
        "zustand-typescript-nextjs",
    ]);

    match args.command.expect("notify command") {
        Command::Notify(notify) => {
            assert_eq!(notify.slug, "zustand-typescript-nextjs");
            assert_eq!(notify.concurrency, Some(8));
            assert_eq!(notify.store.store_backend, Some(StoreBackendArg::Upstash));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_views_and_subscribers_arguments() {
    let args = CliArgs::parse_from(["folio", "views", "getting-started-with-redis"]);
    match args.command.expect("views command") {
        Command::Views(views) => assert_eq!(views.slug, "getting-started-with-redis"),
        _ => panic!("wrong command parsed"),
    }

    let args = CliArgs::parse_from(["folio", "subscribers", "--store-url", "https://kv.example"]);
    match args.command.expect("subscribers command") {
        Command::Subscribers(subscribers) => {
            assert_eq!(
                subscribers.store.store_url.as_deref(),
                Some("https://kv.example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--views-track-viewer-ip=false",
        "--catalog-path",
        "/srv/folio/articles.toml",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.views_track_viewer_ip, Some(false));
            assert_eq!(
                serve.overrides.catalog_path.as_deref(),
                Some(std::path::Path::new("/srv/folio/articles.toml"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
