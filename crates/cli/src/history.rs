//! `examdesk history`: view and prune the server's audit log.
//!
//! Rows are listed newest first and numbered from 1; `history rm N` removes
//! the row shown as N.

use clap::Subcommand;
use serde::Serialize;

use examdesk_gateway::GatewayClient;
use examdesk_history::{
    display_time, operation_label, summarize, HistoryError, HistoryView, NormalizedHistoryEntry,
};

use crate::exit_codes::*;
use crate::prompt::{require_confirmation, Prompter};
use crate::util;
use crate::CliError;

/// Width cap for every column except the summary.
const MAX_COLUMN: usize = 24;

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Delete the whole audit log
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Delete one entry by its listed position (1 = newest)
    Rm {
        position: usize,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    position: usize,
    time: String,
    operation: &'a str,
    label: &'a str,
    summary: String,
    payload: &'a Option<serde_json::Map<String, serde_json::Value>>,
}

impl<'a> HistoryRow<'a> {
    fn new(position: usize, entry: &'a NormalizedHistoryEntry) -> Self {
        Self {
            position,
            time: display_time(&entry.time),
            operation: entry.operation.as_str(),
            label: operation_label(&entry.operation),
            summary: summarize(entry),
            payload: &entry.payload,
        }
    }
}

pub fn cmd_history(
    client: &GatewayClient,
    command: Option<HistoryCommands>,
    json: bool,
    assume_yes: bool,
) -> Result<(), CliError> {
    let mut view = HistoryView::new();
    match command {
        None => {
            view.refresh(client).map_err(CliError::history)?;
            print_history(&view, json)
        }
        Some(HistoryCommands::Clear { yes }) => {
            let mut prompter = Prompter::stdio();
            require_confirmation(&mut prompter, yes || assume_yes, "Bạn có chắc chắn muốn xóa toàn bộ lịch sử?")?;
            view.clear(client).map_err(CliError::history)?;
            println!("Đã xóa toàn bộ lịch sử.");
            Ok(())
        }
        Some(HistoryCommands::Rm { position, yes }) => {
            if position == 0 {
                return Err(CliError::args("positions start at 1"));
            }
            view.refresh(client).map_err(CliError::history)?;
            let index = position - 1;
            let summary = view
                .entries()
                .get(index)
                .map(summarize)
                .ok_or_else(|| CliError::history(HistoryError::Position { position: index, len: view.len() }))?;

            let mut prompter = Prompter::stdio();
            prompter.note(&summary);
            require_confirmation(&mut prompter, yes || assume_yes, "Bạn có chắc chắn muốn xóa mục lịch sử này?")?;

            match view.remove_at(client, index) {
                Ok(()) => {
                    println!("Đã xóa: {summary}");
                    Ok(())
                }
                // the delete went through; only the reload failed
                Err(HistoryError::Fetch(e)) => {
                    println!("Đã xóa: {summary}");
                    Err(CliError::gateway(e).with_hint("entry was deleted, but the log could not be reloaded"))
                }
                Err(e) => Err(CliError::history(e)),
            }
        }
    }
}

fn print_history(view: &HistoryView, json: bool) -> Result<(), CliError> {
    let rows: Vec<HistoryRow> = view
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| HistoryRow::new(i + 1, entry))
        .collect();

    if json {
        let body = serde_json::to_string_pretty(&rows).map_err(|e| CliError::io(e.to_string()))?;
        println!("{body}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("Chưa có lịch sử thao tác.");
        return Ok(());
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| vec![r.position.to_string(), r.time.clone(), r.label.to_string(), r.summary.clone()])
        .collect();
    print!("{}", util::format_table(&["#", "Thời gian", "Thao tác", "Chi tiết"], &cells, MAX_COLUMN));
    Ok(())
}

impl CliError {
    pub fn history(err: HistoryError) -> Self {
        match err {
            HistoryError::Fetch(e) | HistoryError::Mutation(e) => Self::gateway(e),
            HistoryError::Position { position, len } => Self {
                code: EXIT_USAGE,
                message: format!("no history entry at position {} ({len} listed)", position + 1),
                hint: Some("run `examdesk history` to see positions".into()),
            },
        }
    }
}
