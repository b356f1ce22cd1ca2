//! Key derivation for blog view counters.
//!
//! Counters live in the external key-value store under
//! `blog:view:{slug}:total` and, when viewer tracking is on,
//! `blog:view:{slug}:ip:{ip}`.

use std::net::IpAddr;

use super::error::DomainError;

const VIEW_KEY_PREFIX: &str = "blog:view";
const MAX_SLUG_LEN: usize = 200;

/// Returns `true` when `slug` is non-empty lower-case ASCII alphanumerics and dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Counter keys for a single article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewKeys {
    slug: String,
}

impl ViewKeys {
    pub fn for_slug(slug: &str) -> Result<Self, DomainError> {
        if !is_valid_slug(slug) {
            return Err(DomainError::validation(
                "slug",
                format!("`{slug}` is not a valid article slug"),
            ));
        }
        Ok(Self {
            slug: slug.to_string(),
        })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn total(&self) -> String {
        format!("{VIEW_KEY_PREFIX}:{}:total", self.slug)
    }

    pub fn per_viewer(&self, viewer: IpAddr) -> String {
        // Map IPv4-in-IPv6 back to IPv4 so dual-stack proxies do not split a viewer.
        let viewer = match viewer {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
            other => other,
        };
        format!("{VIEW_KEY_PREFIX}:{}:ip:{viewer}", self.slug)
    }
}
