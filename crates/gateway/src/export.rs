//! Export and clean downloads.
//!
//! Both endpoints answer with raw CSV text in `data`. The text is written to
//! a file with a fixed name so downstream tooling can find it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::GatewayError;

/// File name for `POST /save` output.
pub const UPDATED_DATA_FILE: &str = "Updated_Data.csv";
/// File name for `POST /clean/{source}` output.
pub const CLEANED_DATA_FILE: &str = "Cleaned_Data.csv";

/// Response body of the export and clean endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExportResult {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ExportResult {
    /// Wrap the CSV text into a named file. Fails if the server sent no data.
    pub fn into_file(self, filename: &'static str) -> Result<ExportFile, GatewayError> {
        match self.data {
            Some(contents) => Ok(ExportFile { filename, contents }),
            None => Err(GatewayError::Decode("no data received".into())),
        }
    }
}

/// CSV text plus the fixed name it is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: &'static str,
    pub contents: String,
}

impl ExportFile {
    /// Write into `dir`, replacing any previous file of the same name.
    pub fn write_into(&self, dir: &Path) -> Result<PathBuf, GatewayError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| GatewayError::Io(format!("{}: {}", dir.display(), e)))?;
        let path = dir.join(self.filename);
        std::fs::write(&path, self.contents.as_bytes())
            .map_err(|e| GatewayError::Io(format!("{}: {}", path.display(), e)))?;
        log::info!("wrote {} ({} bytes)", path.display(), self.contents.len());
        Ok(path)
    }
}

/// Which dataset the server cleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanSource {
    /// The dataset with this session's updates applied.
    UpdatedData,
    /// The original upload.
    RawData,
}

impl CleanSource {
    pub fn as_segment(&self) -> &'static str {
        match self {
            Self::UpdatedData => "1",
            Self::RawData => "2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpdatedData => "Update Data",
            Self::RawData => "Raw Data",
        }
    }
}

impl FromStr for CleanSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::UpdatedData),
            "2" => Ok(Self::RawData),
            other => Err(format!("unknown clean source '{other}' (expected 1 or 2)")),
        }
    }
}

impl fmt::Display for CleanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
