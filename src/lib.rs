//! Backend for a portfolio site: blog view counters, newsletter subscriptions,
//! transactional mail, and the read-only article catalog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
