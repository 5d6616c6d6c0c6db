//! GitHub REST adapter for the remote issue tracker port.

pub mod client;
pub mod models;
pub mod pagination;

pub use client::{GitHubClient, RateLimiter};
