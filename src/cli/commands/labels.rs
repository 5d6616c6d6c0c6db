//! `teamboard labels`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::services::CreatedLabel;

#[derive(Args, Debug)]
pub struct LabelsArgs {}

#[derive(Debug, Serialize)]
pub struct LabelsOutput {
    pub created: Vec<CreatedLabel>,
}

impl CommandOutput for LabelsOutput {
    fn to_human(&self) -> String {
        if self.created.is_empty() {
            return "All workflow state labels already exist.".to_string();
        }
        let mut lines = vec![format!("Created {} label(s):", self.created.len())];
        lines.extend(
            self.created
                .iter()
                .map(|c| format!("  {} in {}", c.label, c.target)),
        );
        lines.join("\n")
    }
}

pub async fn execute(_args: LabelsArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let credential = ctx.session_credential()?;
    let created = ctx.board.ensure_state_labels(&credential).await?;
    output(&LabelsOutput { created }, global.json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TrackerTarget;

    #[test]
    fn test_labels_output_human() {
        assert_eq!(
            LabelsOutput { created: vec![] }.to_human(),
            "All workflow state labels already exist."
        );
        let out = LabelsOutput {
            created: vec![CreatedLabel {
                target: TrackerTarget::new("acme", "board"),
                label: "Done".to_string(),
            }],
        };
        assert!(out.to_human().contains("Done in acme/board"));
    }
}
