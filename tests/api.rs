use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use folio::application::catalog::CatalogService;
use folio::application::mailer::{DeliveryReceipt, MailError, Mailer, OutgoingEmail};
use folio::application::sitemap::SitemapService;
use folio::application::store::{KeyValueStore, SUBSCRIBERS_KEY, StoreError};
use folio::application::subscriptions::SubscriptionService;
use folio::application::views::ViewService;
use folio::infra::catalog_source::parse_catalog;
use folio::infra::http::{
    ApiRateLimiter, ApiState, ClientIpPolicy, HttpState, RouterState, build_app,
};
use folio::infra::kv::MemoryStore;
use folio::presentation::email::EmailBranding;

const CATALOG: &str = r#"
[[categories]]
name = "All"
value = "all"

[[categories]]
name = "Database"
value = "database"

[[articles]]
id = 5
title = "Getting Started with Redis"
summary = "Fast in-memory data storage for caching."
label = "Database"
slug = "getting-started-with-redis"
author = "Site Author"
keyword = "redis tutorial"
published = "2025-07-05"
image = "/redis.png"
read_time = 9
views = 323
tags = ["Redis", "Database", "Caching"]

[[articles]]
id = 7
title = "How to Use Prisma with Node.js"
summary = "Type-safe database access."
label = "Backend"
slug = "how-to-use-prisma-with-nodejs"
author = "Site Author"
keyword = "prisma nodejs"
published = "2025-07-18"
image = "/prisma.png"
read_time = 10
views = 485
tags = ["Prisma", "ORM", "Database", "Backend"]

[[articles]]
id = 101
title = "Prisma ORM is Moving from Rust to TypeScript"
summary = "Query engine rewrite explained."
label = "ORM"
slug = "prisma-orm-rust-to-typescript-rewrite"
author = "Site Author"
keyword = "prisma typescript engine"
published = "2025-08-15"
image = "/prisma_rt_to_ts.svg"
read_time = 9
views = 477
tags = ["Updates", "Backend", "ORM"]
"#;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        let mut sent = self.sent.lock().expect("mailer lock");
        sent.push(email);
        Ok(DeliveryReceipt {
            id: format!("msg-{}", sent.len()),
        })
    }
}

struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn set_contains(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
    async fn set_add(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
    async fn set_members(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
    async fn incr(&self, _: &str) -> Result<i64, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
    async fn get_counter(&self, _: &str) -> Result<Option<i64>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

struct TestApp {
    router: Router,
    store: Arc<dyn KeyValueStore>,
    mailer: Arc<RecordingMailer>,
}

fn build_test_app(store: Arc<dyn KeyValueStore>, max_subscribe_requests: u32) -> TestApp {
    build_test_app_with(store, max_subscribe_requests, CATALOG, true)
}

fn build_test_app_with(
    store: Arc<dyn KeyValueStore>,
    max_subscribe_requests: u32,
    catalog_toml: &str,
    trust_forwarded_headers: bool,
) -> TestApp {
    let catalog = Arc::new(parse_catalog(catalog_toml).expect("catalog"));
    let mailer = Arc::new(RecordingMailer::default());
    let branding = EmailBranding {
        site_name: "Example Folio".to_string(),
        site_url: "https://folio.example.com".to_string(),
    };

    let state = RouterState {
        http: HttpState {
            sitemap: Arc::new(SitemapService::new(
                catalog.clone(),
                "https://folio.example.com",
            )),
            store: store.clone(),
        },
        api: ApiState {
            subscriptions: Arc::new(SubscriptionService::new(
                store.clone(),
                mailer.clone(),
                branding,
                vec!["owner@example.com".to_string()],
            )),
            views: Arc::new(ViewService::new(catalog.clone(), store.clone(), true)),
            catalog,
            rate_limiter: Arc::new(ApiRateLimiter::new(
                Duration::from_secs(60),
                max_subscribe_requests,
            )),
        },
        client_ip: ClientIpPolicy {
            trust_forwarded_headers,
        },
    };

    TestApp {
        router: build_app(state),
        store,
        mailer,
    }
}

fn memory_app() -> TestApp {
    build_test_app(Arc::new(MemoryStore::new()), 50)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn subscribe_request(email: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(serde_json::json!({ "email": email }).to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn subscribe_creates_subscriber_and_sends_welcome() {
    let app = memory_app();

    let (status, body) = send(
        &app.router,
        subscribe_request("Reader@Example.com", "203.0.113.10"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "reader@example.com");
    assert_eq!(body["welcome_sent"], true);
    assert!(
        app.store
            .set_contains(SUBSCRIBERS_KEY, "reader@example.com")
            .await
            .expect("store")
    );

    let sent = app.mailer.sent.lock().expect("mailer lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.as_ref(), "reader@example.com");
    assert_eq!(sent[0].cc, vec!["owner@example.com".to_string()]);
}

#[tokio::test]
async fn duplicate_subscription_returns_conflict() {
    let app = memory_app();

    let (first, _) = send(&app.router, subscribe_request("a@example.com", "203.0.113.1")).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) =
        send(&app.router, subscribe_request("A@example.com", "203.0.113.1")).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "already_subscribed");
    assert_eq!(app.mailer.sent.lock().expect("mailer lock").len(), 1);
}

#[tokio::test]
async fn invalid_email_returns_bad_request() {
    let app = memory_app();

    let (status, body) = send(&app.router, subscribe_request("nope", "203.0.113.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_email");
    assert!(body["error"]["hint"].is_string());
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let app = build_test_app(Arc::new(DownStore), 50);

    let (status, body) =
        send(&app.router, subscribe_request("a@example.com", "203.0.113.1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "store_unavailable");
    assert!(body["error"].get("hint").is_none());

    let (health, _) = send(&app.router, get("/_health")).await;
    assert_eq!(health, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn subscribe_is_rate_limited_per_client() {
    let app = build_test_app(Arc::new(MemoryStore::new()), 2);

    for n in 0..2 {
        let (status, _) = send(
            &app.router,
            subscribe_request(&format!("reader{n}@example.com"), "198.51.100.1"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(subscribe_request("reader9@example.com", "198.51.100.1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("60")
    );

    let (other_client, _) = send(
        &app.router,
        subscribe_request("reader9@example.com", "198.51.100.2"),
    )
    .await;
    assert_eq!(other_client, StatusCode::CREATED);
}

#[tokio::test]
async fn recording_views_counts_on_top_of_baseline() {
    let app = memory_app();
    let record = || {
        Request::builder()
            .method("POST")
            .uri("/api/blogs/getting-started-with-redis/views")
            .header("x-real-ip", "192.0.2.44")
            .body(Body::empty())
            .expect("request")
    };

    let (status, body) = send(&app.router, record()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "getting-started-with-redis");
    assert_eq!(body["views"], 324);

    let (_, body) = send(&app.router, record()).await;
    assert_eq!(body["views"], 325);

    let (status, body) = send(&app.router, get("/api/blogs/getting-started-with-redis/views")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views"], 325);

    assert_eq!(
        app.store
            .get_counter("blog:view:getting-started-with-redis:ip:192.0.2.44")
            .await
            .expect("counter"),
        Some(2)
    );
}

#[tokio::test]
async fn views_for_unknown_articles_are_not_found() {
    let app = memory_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/blogs/does-not-exist/views")
        .body(Body::empty())
        .expect("request");

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn views_survive_store_outage() {
    let app = build_test_app(Arc::new(DownStore), 50);
    let request = Request::builder()
        .method("POST")
        .uri("/api/blogs/how-to-use-prisma-with-nodejs/views")
        .body(Body::empty())
        .expect("request");

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views"], 485);
}

#[tokio::test]
async fn listing_filters_by_search_and_category() {
    let app = memory_app();

    let (status, body) = send(&app.router, get("/api/blogs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["slug"], "prisma-orm-rust-to-typescript-rewrite");
    assert_eq!(body["items"][0]["views"], 477);
    assert_eq!(body["items"][0]["keyword"], "prisma typescript engine");

    let (_, body) = send(&app.router, get("/api/blogs?q=PRISMA&category=database")).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["slug"], "how-to-use-prisma-with-nodejs");

    let (_, body) = send(&app.router, get("/api/blogs?category=all")).await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn featured_detail_related_and_categories() {
    let app = memory_app();

    let record = Request::builder()
        .method("POST")
        .uri("/api/blogs/prisma-orm-rust-to-typescript-rewrite/views")
        .body(Body::empty())
        .expect("request");
    send(&app.router, record).await;

    let (_, featured) = send(&app.router, get("/api/blogs/featured")).await;
    assert_eq!(featured["slug"], "prisma-orm-rust-to-typescript-rewrite");
    assert_eq!(featured["views"], 478);
    assert_eq!(featured["keyword"], "prisma typescript engine");

    let (status, detail) = send(&app.router, get("/api/blogs/how-to-use-prisma-with-nodejs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["keyword"], "prisma nodejs");
    assert_eq!(detail["views"], 485);
    assert_eq!(detail["published"], "2025-07-18");

    let (_, related) = send(
        &app.router,
        get("/api/blogs/how-to-use-prisma-with-nodejs/related?limit=1"),
    )
    .await;
    assert_eq!(related["total"], 1);
    assert_eq!(related["items"][0]["slug"], "prisma-orm-rust-to-typescript-rewrite");

    let (status, _) = send(&app.router, get("/api/blogs/missing/related")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, categories) = send(&app.router, get("/api/categories")).await;
    assert_eq!(categories["items"][1]["value"], "database");
}

#[tokio::test]
async fn sitemap_robots_and_health() {
    let app = memory_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/sitemap.xml"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/xml")
    );
    let (_, body) = send(&app.router, get("/sitemap.xml")).await;
    let xml = body.as_str().expect("xml text");
    assert!(xml.contains("<loc>https://folio.example.com/blogs/getting-started-with-redis</loc>"));
    assert!(xml.contains("<loc>https://folio.example.com/meet</loc>"));

    let (_, robots) = send(&app.router, get("/robots.txt")).await;
    assert_eq!(
        robots,
        "User-agent: *\nAllow: /\nSitemap: https://folio.example.com/sitemap.xml\n"
    );

    let (health, _) = send(&app.router, get("/_health")).await;
    assert_eq!(health, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_subscribe_bodies_get_json_bad_request() {
    let app = memory_app();

    let missing_field = Request::builder()
        .method("POST")
        .uri("/api/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .expect("request");
    let (status, body) = send(&app.router, missing_field).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["hint"].as_str().unwrap_or_default().contains("email"));

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/api/subscribe")
        .body(Body::from(r#"{"email":"a@example.com"}"#))
        .expect("request");
    let (status, body) = send(&app.router, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let not_json = Request::builder()
        .method("POST")
        .uri("/api/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("email=a@example.com"))
        .expect("request");
    let (status, body) = send(&app.router, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    assert!(app.mailer.sent.lock().expect("mailer lock").is_empty());
}

fn tagged_catalog(count: u32) -> String {
    let mut toml = String::from("[[categories]]\nname = \"All\"\nvalue = \"all\"\n");
    for id in 1..=count {
        toml.push_str(&format!(
            r#"
[[articles]]
id = {id}
title = "Rust note {id}"
summary = "Short note."
label = "Rust"
slug = "rust-note-{id}"
author = "Site Author"
published = "2025-01-{day:02}"
image = "/rust.png"
read_time = 3
tags = ["Rust"]
"#,
            day = (id % 28) + 1,
        ));
    }
    toml
}

#[tokio::test]
async fn related_limit_defaults_caps_and_rejects_bad_values() {
    let app = build_test_app_with(Arc::new(MemoryStore::new()), 50, &tagged_catalog(30), true);

    let (status, body) = send(&app.router, get("/api/blogs/rust-note-1/related")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);

    let (_, body) = send(&app.router, get("/api/blogs/rust-note-1/related?limit=100")).await;
    assert_eq!(body["total"], 20);

    let (_, body) = send(&app.router, get("/api/blogs/rust-note-1/related?limit=7")).await;
    assert_eq!(body["total"], 7);
    let items = body["items"].as_array().expect("items");
    assert!(items.iter().all(|item| item["slug"] != "rust-note-1"));

    let (status, body) = send(&app.router, get("/api/blogs/rust-note-1/related?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = send(&app.router, get("/api/blogs/rust-note-1/related?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn untrusted_proxy_headers_do_not_split_rate_limit_buckets() {
    let app = build_test_app_with(Arc::new(MemoryStore::new()), 1, CATALOG, false);

    let (first, _) = send(&app.router, subscribe_request("a@example.com", "198.51.100.1")).await;
    assert_eq!(first, StatusCode::CREATED);

    let (spoofed, body) =
        send(&app.router, subscribe_request("b@example.com", "198.51.100.2")).await;
    assert_eq!(spoofed, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "rate_limited");

    let record = Request::builder()
        .method("POST")
        .uri("/api/blogs/getting-started-with-redis/views")
        .header("x-forwarded-for", "192.0.2.99")
        .body(Body::empty())
        .expect("request");
    send(&app.router, record).await;
    assert_eq!(
        app.store
            .get_counter("blog:view:getting-started-with-redis:ip:192.0.2.99")
            .await
            .expect("counter"),
        None
    );
}
