//! Dataset commands: `save`, `clean`, `provinces`, `chart`.
//!
//! `examdesk save`        download the updated dataset as Updated_Data.csv
//! `examdesk clean 1|2`   clean a dataset server-side, save Cleaned_Data.csv
//! `examdesk provinces`   list province codes
//! `examdesk chart KIND`  print aggregate chart data as JSON

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use examdesk_gateway::{
    ChartKind, CleanSource, ExportResult, GatewayClient, CLEANED_DATA_FILE, UPDATED_DATA_FILE,
};

use crate::util;
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ChartArg {
    Bar,
    Line,
    Pie,
    Area,
    Histogram,
    Heatmap,
}

pub fn cmd_save(client: &GatewayClient, out_dir: &Path) -> Result<(), CliError> {
    let result = client.save_export().map_err(CliError::gateway)?;
    write_export(client, result, UPDATED_DATA_FILE, out_dir)?;
    println!("Đã lưu dữ liệu thành công!");
    Ok(())
}

pub fn cmd_clean(client: &GatewayClient, source: CleanSource, out_dir: &Path) -> Result<(), CliError> {
    let result = client.clean(source).map_err(CliError::gateway)?;
    write_export(client, result, CLEANED_DATA_FILE, out_dir)?;
    println!("Đã làm sạch dữ liệu từ {source}.");
    Ok(())
}

/// Save the returned CSV, or print the server link when only a link came back.
fn write_export(
    client: &GatewayClient,
    result: ExportResult,
    filename: &'static str,
    out_dir: &Path,
) -> Result<Option<PathBuf>, CliError> {
    if result.data.is_none() {
        if let Some(link) = result.download_url.as_deref() {
            println!("{}", client.absolute_url(link));
            return Ok(None);
        }
    }

    let file = result.into_file(filename).map_err(CliError::gateway)?;
    let path = file.write_into(out_dir).map_err(CliError::gateway)?;
    eprintln!("wrote {}", path.display());
    Ok(Some(path))
}

pub fn cmd_provinces(client: &GatewayClient, json: bool) -> Result<(), CliError> {
    let provinces = client.provinces().map_err(CliError::gateway)?;
    if json {
        let body = serde_json::to_string_pretty(&provinces).map_err(|e| CliError::io(e.to_string()))?;
        println!("{body}");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = provinces
        .iter()
        .map(|p| vec![p.code.clone(), p.name.clone()])
        .collect();
    print!("{}", util::format_table(&["MaTinh", "TenTinh"], &rows, 8));
    Ok(())
}

pub fn cmd_chart(
    client: &GatewayClient,
    kind: ChartArg,
    subject: Option<String>,
    year: Option<String>,
) -> Result<(), CliError> {
    let kind = chart_kind(kind, subject, year)?;
    let data = client.chart_data(&kind).map_err(CliError::gateway)?;
    let body = serde_json::to_string_pretty(&data).map_err(|e| CliError::io(e.to_string()))?;
    println!("{body}");
    Ok(())
}

fn chart_kind(kind: ChartArg, subject: Option<String>, year: Option<String>) -> Result<ChartKind, CliError> {
    let required = |value: Option<String>, flag: &str| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CliError::args(format!("{kind:?} chart requires {flag}").to_lowercase()))
    };
    Ok(match kind {
        ChartArg::Bar => ChartKind::Bar,
        ChartArg::Line => ChartKind::Line,
        ChartArg::Pie => ChartKind::Pie,
        ChartArg::Area => ChartKind::Area,
        ChartArg::Histogram => ChartKind::Histogram {
            subject: required(subject, "--subject")?,
            year: required(year, "--year")?,
        },
        ChartArg::Heatmap => ChartKind::Heatmap {
            year: required(year, "--year")?,
        },
    })
}
