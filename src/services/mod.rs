//! Application services: sync, board operations and the pure helpers they share.

pub mod annotation_parser;
pub mod board_service;
pub mod paginator;
pub mod state_classifier;
pub mod sync_engine;

pub use annotation_parser::{
    extract_annotations, links_from_comment, parse_reference, Annotation, AnnotationAction,
    IssueReference,
};
pub use board_service::{Board, BoardService, Card, CardDetail, Column, CreatedLabel};
pub use paginator::{paginate, PaginationSummary};
pub use state_classifier::{classify, Classification};
pub use sync_engine::{SyncEngine, SyncOutcome, SyncReport, SyncSettings, SyncState};
