//! Sitemap service for sitemap.xml and robots.txt generation.

use std::sync::Arc;

use time::{Date, OffsetDateTime};

use crate::application::catalog::CatalogService;

/// Site routes that exist outside the article catalog.
const STATIC_ROUTES: &[(&str, &str)] = &[("/", "1.0"), ("/meet", "0.9"), ("/blogs", "0.9")];

const ARTICLE_PRIORITY: &str = "0.8";

#[derive(Clone)]
pub struct SitemapService {
    catalog: Arc<CatalogService>,
    host_url: String,
}

impl SitemapService {
    pub fn new(catalog: Arc<CatalogService>, host_url: impl Into<String>) -> Self {
        Self {
            catalog,
            host_url: host_url.into(),
        }
    }

    pub fn sitemap_xml(&self) -> String {
        self.sitemap_xml_at(OffsetDateTime::now_utc().date())
    }

    /// Render the sitemap with `today` as the static routes' `lastmod`.
    pub fn sitemap_xml_at(&self, today: Date) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for (path, priority) in STATIC_ROUTES {
            xml.push_str(&sitemap_entry(&self.host_url, path, today, "monthly", priority));
        }
        for article in self.catalog.all() {
            xml.push_str(&sitemap_entry(
                &self.host_url,
                &format!("/blogs/{}", article.slug),
                article.published,
                "weekly",
                ARTICLE_PRIORITY,
            ));
        }
        xml.push_str("</urlset>\n");
        xml
    }

    pub fn robots_txt(&self) -> String {
        let sitemap_url = canonical_url(&self.host_url, "/sitemap.xml");
        format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
    }
}

fn sitemap_entry(base: &str, path: &str, lastmod: Date, changefreq: &str, priority: &str) -> String {
    let loc = escape_xml(&canonical_url(base, path));
    format!(
        "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><changefreq>{changefreq}</changefreq><priority>{priority}</priority></url>\n"
    )
}

/// Join `path` onto the site root; the root itself is returned without a trailing slash.
pub fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
