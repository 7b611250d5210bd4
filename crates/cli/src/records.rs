//! Record commands: `create`, `delete`, `read`, `update`.
//!
//! `examdesk create`   stage N new records, then commit them in order
//! `examdesk delete`   stage N (SBD, Year) keys, confirm, then delete in order
//! `examdesk read`     list records for an identifier, optionally one year
//! `examdesk update`   edit one record's columns by identifier and year

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::Value;

use examdesk_gateway::{value_text, EntityDraft, GatewayClient, StudentRecord};
use examdesk_wizard::{
    lookup, BatchWizard, CommitError, Lookup, Phase, UpdateSession, WizardError, WizardKind,
};

use crate::exit_codes::*;
use crate::prompt::{require_confirmation, Prompter};
use crate::util;
use crate::CliError;

// ── create / delete ─────────────────────────────────────────────────

pub fn cmd_batch(
    client: &GatewayClient,
    kind: WizardKind,
    count: Option<usize>,
    input: Option<&Path>,
    yes: bool,
) -> Result<(), CliError> {
    let mut prompter = Prompter::stdio();
    let mut wizard = BatchWizard::new(kind);

    match input {
        Some(path) => {
            let drafts = read_drafts(path, kind)?;
            if let Some(n) = count.filter(|n| *n != drafts.len()) {
                return Err(CliError::args(format!(
                    "--count {n} does not match {} record(s) in {}",
                    drafts.len(),
                    path.display()
                )));
            }
            wizard.size(drafts.len()).map_err(CliError::wizard)?;
            for (i, draft) in drafts.into_iter().enumerate() {
                wizard
                    .next_with(draft)
                    .map_err(|e| CliError::wizard(e).with_hint(format!("record {} in input file", i + 1)))?;
            }
        }
        None => {
            let n = match count {
                Some(n) => n,
                None => {
                    let answer = prompter.ask("Số lượng thí sinh")?;
                    answer.trim().parse::<usize>().map_err(|_| {
                        CliError::args(format!("not a record count: {:?}", answer.trim()))
                    })?
                }
            };
            wizard.size(n).map_err(CliError::wizard)?;
            collect_interactively(&mut wizard, &mut prompter)?;
        }
    }

    finish_batch(client, &mut wizard, &mut prompter, yes)
}

/// Prompt every field of every draft. A rejected draft is asked for again.
fn collect_interactively<R: BufRead, W: Write>(
    wizard: &mut BatchWizard,
    prompter: &mut Prompter<R, W>,
) -> Result<(), CliError> {
    while wizard.phase() == Phase::Collecting {
        prompter.note(&format!("Thí sinh {}/{}", wizard.index() + 1, wizard.target()));
        for field in wizard.kind().fields() {
            let value = prompter.ask(field)?;
            wizard.set_field(field, value).map_err(CliError::wizard)?;
        }
        if let Err(e) = wizard.next() {
            match e {
                WizardError::Validation { .. } => eprintln!("error: {e}"),
                other => return Err(CliError::wizard(other)),
            }
        }
    }
    Ok(())
}

fn finish_batch<R: BufRead, W: Write>(
    client: &GatewayClient,
    wizard: &mut BatchWizard,
    prompter: &mut Prompter<R, W>,
    yes: bool,
) -> Result<(), CliError> {
    if wizard.phase() == Phase::Empty {
        println!("Không có thí sinh nào.");
        return Ok(());
    }

    if wizard.requires_confirmation() {
        let question = format!("Xóa {} thí sinh?", wizard.target());
        require_confirmation(prompter, yes, &question)?;
    }
    wizard.confirm().map_err(CliError::wizard)?;

    match wizard.commit(client) {
        Ok(_) => {
            println!("{}", match wizard.kind() {
                WizardKind::Create => "Đã thêm thành công tất cả thí sinh!",
                WizardKind::Delete => "Đã xóa thành công tất cả thí sinh!",
            });
            Ok(())
        }
        Err(WizardError::Commit(CommitError { index, error })) => {
            let total = wizard.staged().len();
            let code = if index > 0 { EXIT_PARTIAL_COMMIT } else { gateway_exit_code(&error) };
            Err(CliError {
                code,
                message: format!("record {} of {total} failed: {error}", index + 1),
                hint: Some(format!("{index} of {total} record(s) were committed; nothing was rolled back")),
            })
        }
        Err(other) => Err(CliError::wizard(other)),
    }
}

/// Drafts from a JSON array of objects. Numbers are accepted as field text.
fn read_drafts(path: &Path, kind: WizardKind) -> Result<Vec<EntityDraft>, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("{}: {}", path.display(), e)))?;
    parse_drafts(&text, kind).map_err(|e| {
        let hint = e.hint.clone();
        CliError { message: format!("{}: {}", path.display(), e.message), hint, ..e }
    })
}

fn parse_drafts(text: &str, kind: WizardKind) -> Result<Vec<EntityDraft>, CliError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CliError::args(e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| CliError::args("expected a JSON array of records"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| CliError::args(format!("record {} is not an object", i + 1)))?;
            let mut draft = kind.empty_draft();
            for (field, value) in obj {
                if !draft.set(field, value_text(value).unwrap_or_default()) {
                    return Err(CliError::args(format!("record {}: unknown field {:?}", i + 1, field))
                        .with_hint(format!("fields: {}", kind.fields().join(", "))));
                }
            }
            Ok(draft)
        })
        .collect()
}

// ── read ────────────────────────────────────────────────────────────

pub fn cmd_read(
    client: &GatewayClient,
    id: &str,
    year: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let records = match lookup(client, id, year).map_err(CliError::wizard)? {
        Lookup::Found(records) => records,
        Lookup::NotFound => return Err(not_found(id, year)),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &records).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(out).map_err(|e| CliError::io(e.to_string()))
    } else {
        write_records_csv(&mut out, &records)
    }
}

/// CSV with the union of all record columns, in first-seen order.
fn write_records_csv<W: Write>(out: W, records: &[StudentRecord]) -> Result<(), CliError> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for (key, _) in record.columns() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&columns).map_err(|e| CliError::io(e.to_string()))?;
    for record in records {
        let row = columns
            .iter()
            .map(|c| record.get(c).and_then(value_text).unwrap_or_default());
        writer.write_record(row).map_err(|e| CliError::io(e.to_string()))?;
    }
    writer.flush().map_err(|e| CliError::io(e.to_string()))
}

// ── update ──────────────────────────────────────────────────────────

pub fn cmd_update(
    client: &GatewayClient,
    id: &str,
    year: &str,
    assignments: &[String],
    json: bool,
) -> Result<(), CliError> {
    if assignments.is_empty() {
        return Err(CliError::args("nothing to update")
            .with_hint("pass one or more --set FIELD=VALUE"));
    }
    let assignments = assignments
        .iter()
        .map(|a| util::parse_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;

    let mut session = UpdateSession::new();
    if session.search(client, id, year).map_err(CliError::wizard)? == Lookup::NotFound {
        return Err(not_found(id, Some(year)));
    }
    for (field, value) in assignments {
        session.set_field(&field, value).map_err(CliError::wizard)?;
    }

    let sent = session.submit(client).map_err(CliError::wizard)?;
    if json {
        let body = serde_json::to_string_pretty(&sent).map_err(|e| CliError::io(e.to_string()))?;
        println!("{body}");
    } else {
        println!("Cập nhật thành công!");
    }
    Ok(())
}

fn not_found(id: &str, year: Option<&str>) -> CliError {
    let message = match year.filter(|y| !y.trim().is_empty()) {
        Some(year) => format!("Không tìm thấy thí sinh SBD {id}, năm {year}"),
        None => format!("Không tìm thấy thí sinh SBD {id}"),
    };
    CliError { code: EXIT_NOT_FOUND, message, hint: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drafts_from_json() {
        let drafts = parse_drafts(
            r#"[{"SBD": "A1", "Year": 2019}, {"SBD": 7, "Year": "2020"}]"#,
            WizardKind::Delete,
        )
        .unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].get("Year"), Some("2019"));
        assert_eq!(drafts[1].get("SBD"), Some("7"));
    }

    #[test]
    fn drafts_reject_unknown_fields() {
        let err = parse_drafts(r#"[{"SBD": "A1", "Toán": 9}]"#, WizardKind::Delete).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.message.contains("Toán"));
        assert!(parse_drafts(r#"{"SBD": "A1"}"#, WizardKind::Delete).is_err());
    }

    #[test]
    fn interactive_retry_after_missing_year() {
        let mut wizard = BatchWizard::new(WizardKind::Delete);
        wizard.size(1).unwrap();
        let mut prompter = Prompter::new("A1\n\nA1\n2019\n".as_bytes(), Vec::new(), false);
        collect_interactively(&mut wizard, &mut prompter).unwrap();
        assert_eq!(wizard.phase(), Phase::ReadyToCommit);
        assert_eq!(wizard.staged()[0].get("Year"), Some("2019"));
    }

    #[test]
    fn interactive_eof_cancels() {
        let mut wizard = BatchWizard::new(WizardKind::Create);
        wizard.size(1).unwrap();
        let mut prompter = Prompter::new("1001\n".as_bytes(), Vec::new(), false);
        let err = collect_interactively(&mut wizard, &mut prompter).unwrap_err();
        assert_eq!(err.code, EXIT_CANCELLED);
    }

    #[test]
    fn csv_uses_column_union() {
        let records = vec![
            StudentRecord(json!({"Số Báo Danh": "A1", "Năm": 2018, "Toán": 7.5}).as_object().unwrap().clone()),
            StudentRecord(json!({"Số Báo Danh": "A1", "Năm": 2019, "Văn": null}).as_object().unwrap().clone()),
        ];
        let mut buf = Vec::new();
        write_records_csv(&mut buf, &records).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Số Báo Danh,Năm,Toán,Văn\nA1,2018,7.5,\nA1,2019,,\n"
        );
    }
}
