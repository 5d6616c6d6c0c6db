//! Port trait definitions (Hexagonal Architecture)
//!
//! - IssueStore: the local record cache
//! - IssueTracker: the remote tracker API
//!
//! The sync engine and board service depend only on these traits.

pub mod issue_store;
pub mod issue_tracker;

pub use issue_store::{IssueStore, StoreCounts};
pub use issue_tracker::IssueTracker;
