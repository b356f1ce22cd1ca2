use std::sync::Arc;

use crate::application::catalog::CatalogService;
use crate::application::subscriptions::SubscriptionService;
use crate::application::views::ViewService;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub subscriptions: Arc<SubscriptionService>,
    pub views: Arc<ViewService>,
    pub catalog: Arc<CatalogService>,
    /// Guards the subscribe route only.
    pub rate_limiter: Arc<ApiRateLimiter>,
}
