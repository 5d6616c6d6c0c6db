//! `teamboard sync` and `teamboard refresh`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::domain::models::Issue;
use crate::services::SyncOutcome;

#[derive(Args, Debug)]
pub struct SyncArgs {}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// API URL of the issue, e.g. https://api.github.com/repos/owner/repo/issues/42
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SyncOutput(pub SyncOutcome);

impl CommandOutput for SyncOutput {
    fn to_human(&self) -> String {
        match &self.0 {
            SyncOutcome::AlreadyRunning => "A sync is already running; nothing to do.".to_string(),
            SyncOutcome::Completed(report) => {
                let window = report
                    .since
                    .map_or_else(|| "full sync".to_string(), |since| format!("since {}", since.to_rfc3339()));
                let mut lines = vec![format!(
                    "Synced {} repositor{} ({window}) in {} ms",
                    report.targets,
                    if report.targets == 1 { "y" } else { "ies" },
                    report.duration_ms
                )];
                lines.push(format!("  Issues:      {}", report.issues));
                lines.push(format!("  Comments:    {}", report.comments));
                lines.push(format!("  Task links:  {}", report.task_links));
                if report.skipped_pull_requests > 0 {
                    lines.push(format!("  Skipped PRs: {}", report.skipped_pull_requests));
                }
                lines.join("\n")
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshOutput {
    pub id: String,
    pub number: Option<u64>,
    pub title: String,
    pub state: Option<String>,
    pub is_project: bool,
}

impl From<&Issue> for RefreshOutput {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.to_string(),
            number: issue.number(),
            title: issue.title().to_string(),
            state: issue.state.clone(),
            is_project: issue.is_project,
        }
    }
}

impl CommandOutput for RefreshOutput {
    fn to_human(&self) -> String {
        format!(
            "Refreshed #{} {} [{}] (id {})",
            self.number.map_or_else(|| "?".to_string(), |n| n.to_string()),
            self.title,
            self.state.as_deref().unwrap_or("unfiled"),
            self.id
        )
    }
}

pub async fn execute(_args: SyncArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let outcome = ctx.engine.start_sync().await?;
    output(&SyncOutput(outcome), global.json);
    Ok(())
}

pub async fn execute_refresh(args: RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let credential = ctx.session_credential()?;
    let issue = ctx.engine.refresh_issue(&credential, &args.url).await?;
    output(&RefreshOutput::from(&issue), global.json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SyncReport;

    #[test]
    fn test_sync_output_human() {
        let report = SyncReport {
            targets: 2,
            issues: 5,
            comments: 9,
            task_links: 1,
            ..SyncReport::default()
        };
        let text = SyncOutput(SyncOutcome::Completed(report)).to_human();
        assert!(text.starts_with("Synced 2 repositories (full sync)"));
        assert!(text.contains("Issues:      5"));
        assert!(!text.contains("Skipped PRs"));
    }

    #[test]
    fn test_sync_output_json_is_tagged() {
        let json = SyncOutput(SyncOutcome::AlreadyRunning).to_json();
        assert_eq!(json["outcome"], "already_running");
    }
}
