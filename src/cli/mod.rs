//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, GlobalArgs};

use crate::domain::errors::DomainError;

/// Report a failed command and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let kind = err.downcast_ref::<DomainError>().map(|e| match e {
        DomainError::Config(_) => "config",
        DomainError::Auth(_) => "auth",
        DomainError::Transport(_) => "transport",
        DomainError::MalformedReference(_) => "malformed_reference",
        DomainError::Store(_) => "store",
        DomainError::Serialization(_) => "serialization",
        DomainError::NotFound(_) => "not_found",
    });

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "kind": kind,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
