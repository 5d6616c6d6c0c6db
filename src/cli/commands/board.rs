//! `teamboard board` and `teamboard show`.

use anyhow::Result;
use clap::Args;
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::services::{Board, CardDetail};

const TITLE_WIDTH: usize = 36;

#[derive(Args, Debug)]
pub struct BoardArgs {}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Card to show: #number, owner/repo#number or a cached issue id
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct BoardOutput(pub Board);

impl CommandOutput for BoardOutput {
    fn to_human(&self) -> String {
        let columns = &self.0.columns;
        if columns.is_empty() {
            return "No workflow states configured.".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.iter().map(|c| {
                Cell::new(format!("{} ({})", c.state, c.cards.len())).add_attribute(Attribute::Bold)
            }));

        let depth = columns.iter().map(|c| c.cards.len()).max().unwrap_or(0);
        for row in 0..depth {
            table.add_row(columns.iter().map(|column| {
                column.cards.get(row).map_or_else(String::new, |card| {
                    let number = card.number.map_or_else(String::new, |n| format!("#{n} "));
                    let marker = if card.is_project { "* " } else { "" };
                    format!("{marker}{number}{}", truncate(&card.title, TITLE_WIDTH))
                })
            }));
        }

        table.to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct CardOutput(pub CardDetail);

impl CommandOutput for CardOutput {
    fn to_human(&self) -> String {
        let detail = &self.0;
        let issue = &detail.issue;
        let mut lines = vec![format!(
            "#{} {}",
            issue.number().map_or_else(|| "?".to_string(), |n| n.to_string()),
            issue.title()
        )];
        lines.push(format!("  Id:       {}", issue.id));
        lines.push(format!("  State:    {}", issue.state.as_deref().unwrap_or("unfiled")));
        lines.push(format!("  Project:  {}", if issue.is_project { "yes" } else { "no" }));
        lines.push(format!("  Updated:  {}", issue.last_updated.to_rfc3339()));
        if let Some(url) = issue.html_url() {
            lines.push(format!("  Link:     {url}"));
        }

        if !detail.links.is_empty() {
            lines.push(format!("\nTask links ({}):", detail.links.len()));
            for link in &detail.links {
                let kind = if link.required { "requires" } else { "relates to" };
                lines.push(format!("  {kind} {}", link.task));
            }
        }

        lines.push(format!("\nComments ({}):", detail.comments.len()));
        for comment in &detail.comments {
            let author = comment
                .raw
                .pointer("/user/login")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown");
            lines.push(format!("  [{author}] {}", truncate(comment.body().trim(), 72)));
        }

        lines.join("\n")
    }
}

pub async fn execute(_args: BoardArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let board = ctx.board.board().await?;
    output(&BoardOutput(board), global.json);
    Ok(())
}

pub async fn execute_show(args: ShowArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let id = ctx.resolve_card(&args.id)?;
    let detail = ctx.board.card(&id).await?;
    output(&CardOutput(detail), global.json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::IssueId;
    use crate::services::{Card, Column};

    fn card(number: u64, title: &str, is_project: bool) -> Card {
        Card {
            id: IssueId::from_url(&format!("https://api.github.com/repos/acme/board/issues/{number}")),
            number: Some(number),
            title: title.to_string(),
            is_project,
        }
    }

    #[test]
    fn test_board_renders_columns_side_by_side() {
        let board = Board {
            columns: vec![
                Column {
                    state: "Backlog".to_string(),
                    color: "ededed".to_string(),
                    cards: vec![card(1, "Epic", true), card(2, "Child", false)],
                },
                Column {
                    state: "Done".to_string(),
                    color: "0e8a16".to_string(),
                    cards: vec![card(3, "Shipped", false)],
                },
            ],
        };

        let text = BoardOutput(board).to_human();
        assert!(text.contains("Backlog (2)"));
        assert!(text.contains("Done (1)"));
        assert!(text.contains("* #1 Epic"));
        assert!(text.contains("#3 Shipped"));
    }

    #[test]
    fn test_empty_board() {
        let text = BoardOutput(Board { columns: vec![] }).to_human();
        assert_eq!(text, "No workflow states configured.");
    }
}
