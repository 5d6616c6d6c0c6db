//! Infrastructure adapters for external systems.

pub mod github;
pub mod mock_tracker;
pub mod sqlite;
