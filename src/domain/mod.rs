//! Domain layer for the TeamBoard issue cache
//!
//! This module contains the cached record types, configuration model,
//! error taxonomy and the port traits implemented by adapters.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
