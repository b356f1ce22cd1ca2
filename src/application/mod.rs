//! Application services and the seams they depend on.

pub mod catalog;
pub mod error;
pub mod mailer;
pub mod sitemap;
pub mod store;
pub mod subscriptions;
pub mod views;
