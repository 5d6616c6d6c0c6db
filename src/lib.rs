//! TeamBoard - a kanban board over GitHub issues.
//!
//! The crate keeps a local SQLite cache of the issues in a set of
//! repositories. Workflow state comes from labels, and dependencies
//! between issues are declared in comments as `TB-REQUIRE(#42)` or
//! `TB-RELATE(owner/repo#7)` annotations. The cache is refreshed
//! incrementally from the newest `updated_at` it already holds.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the store/tracker ports
//! - **Service Layer** (`services`): sync engine, board operations and the
//!   pure helpers (classifier, annotation parser, paginator)
//! - **Adapters** (`adapters`): SQLite store, GitHub REST client, in-memory tracker
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Comment, Config, Credential, Issue, IssueId, TaskLink, TrackerTarget, WorkflowState,
};
pub use domain::ports::{IssueStore, IssueTracker, StoreCounts};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BoardService, SyncEngine, SyncOutcome, SyncReport, SyncSettings, SyncState};
