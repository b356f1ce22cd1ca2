//! Blog view counters layered on the key-value store.

use std::net::IpAddr;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::warn;

use crate::application::catalog::CatalogService;
use crate::application::store::KeyValueStore;
use crate::domain::error::DomainError;
use crate::domain::views::ViewKeys;
use crate::infra::telemetry::{METRIC_BLOG_VIEWS, METRIC_VIEW_STORE_ERRORS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("no article with slug `{slug}`")]
    UnknownArticle { slug: String },
    #[error(transparent)]
    InvalidSlug(#[from] DomainError),
}

/// Result of a recorded view; `total` is `None` when the store could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRecorded {
    pub total: Option<i64>,
}

#[derive(Clone)]
pub struct ViewService {
    catalog: Arc<CatalogService>,
    store: Arc<dyn KeyValueStore>,
    track_viewer_ip: bool,
}

impl ViewService {
    pub fn new(
        catalog: Arc<CatalogService>,
        store: Arc<dyn KeyValueStore>,
        track_viewer_ip: bool,
    ) -> Self {
        Self {
            catalog,
            store,
            track_viewer_ip,
        }
    }

    pub async fn record_view(
        &self,
        slug: &str,
        viewer: Option<IpAddr>,
    ) -> Result<ViewRecorded, ViewError> {
        let keys = self.keys_for(slug)?;

        let total = match self.store.incr(&keys.total()).await {
            Ok(total) => {
                counter!(METRIC_BLOG_VIEWS).increment(1);
                Some(total)
            }
            Err(err) => {
                counter!(METRIC_VIEW_STORE_ERRORS).increment(1);
                warn!(
                    target = "folio::views",
                    slug = %slug,
                    error = %err,
                    "failed to increment view counter"
                );
                None
            }
        };

        if self.track_viewer_ip
            && let Some(viewer) = viewer
            && let Err(err) = self.store.incr(&keys.per_viewer(viewer)).await
        {
            counter!(METRIC_VIEW_STORE_ERRORS).increment(1);
            warn!(
                target = "folio::views",
                slug = %slug,
                viewer = %viewer,
                error = %err,
                "failed to increment per-viewer counter"
            );
        }

        Ok(ViewRecorded { total })
    }

    /// Baseline views from the catalog plus the live counter.
    pub async fn view_count(&self, slug: &str) -> Result<u64, ViewError> {
        let keys = self.keys_for(slug)?;
        let baseline = self
            .catalog
            .find(slug)
            .map(|article| article.baseline_views)
            .unwrap_or_default();

        let live = match self.store.get_counter(&keys.total()).await {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                warn!(
                    target = "folio::views",
                    slug = %slug,
                    error = %err,
                    "failed to read view counter; showing baseline"
                );
                0
            }
        };

        Ok(baseline.saturating_add(u64::try_from(live).unwrap_or_default()))
    }

    fn keys_for(&self, slug: &str) -> Result<ViewKeys, ViewError> {
        let keys = ViewKeys::for_slug(slug)?;
        if !self.catalog.contains(slug) {
            return Err(ViewError::UnknownArticle {
                slug: slug.to_string(),
            });
        }
        Ok(keys)
    }
}
