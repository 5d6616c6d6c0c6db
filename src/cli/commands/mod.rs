//! CLI command implementations.

pub mod board;
pub mod create;
pub mod init;
pub mod labels;
pub mod move_card;
pub mod sync;
