//! Timestamped JSON files for backups and bulk operation reports.
//!
//! Every file holds a `{timestamp, type, data}` envelope and is named
//! `<type>_<YYYYMMDD_HHMMSS>.json`, so a plain filename sort is chronological.
//! A second write within the same second gets a `_N` suffix instead of
//! replacing the first file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Timestamp layout used in filenames and envelopes.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const MAX_SUFFIX: u32 = 1000;

/// On-disk envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope<T> {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: T,
}

/// Location of a written report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub timestamp: String,
}

/// Writes envelopes into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize `data` into a new file stamped with the current local time.
    pub fn write<T: Serialize>(&self, kind: &str, data: &T) -> Result<WrittenReport, Error> {
        self.write_at(kind, data, Local::now())
    }

    /// Same as [`write`](Self::write) with an explicit timestamp.
    ///
    /// The file is written to a temporary name in the target directory and
    /// renamed into place, so readers never see a partial report.
    pub fn write_at<T: Serialize>(&self, kind: &str, data: &T, at: DateTime<Local>) -> Result<WrittenReport, Error> {
        validate_kind(kind)?;
        std::fs::create_dir_all(&self.dir)?;

        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        let envelope = ReportEnvelope { timestamp: timestamp.clone(), kind: kind.to_string(), data };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, &envelope)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;

        for n in 0..MAX_SUFFIX {
            let name = if n == 0 { format!("{kind}_{timestamp}.json") } else { format!("{kind}_{timestamp}_{n}.json") };
            let path = self.dir.join(name);
            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "wrote report");
                    return Ok(WrittenReport { path, timestamp });
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
                Err(e) => return Err(e.error.into()),
            }
        }

        Err(Error::InvalidInput(format!("too many {kind} reports for timestamp {timestamp}")))
    }

    /// Read an envelope back.
    pub fn read<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<ReportEnvelope<T>, Error> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Files of the given type, oldest first.
    pub fn list(&self, kind: &str) -> Result<Vec<PathBuf>, Error> {
        validate_kind(kind)?;
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{kind}_");
        let mut found: Vec<(String, u32, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.strip_prefix(&prefix))
            else {
                continue;
            };
            let Some(stamp) = stem.get(..15) else { continue };
            if chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_err() {
                continue;
            }
            let suffix = match &stem[15..] {
                "" => 0,
                rest => match rest.strip_prefix('_').and_then(|n| n.parse().ok()) {
                    Some(n) => n,
                    None => continue,
                },
            };
            found.push((stamp.to_string(), suffix, path));
        }

        found.sort();
        Ok(found.into_iter().map(|(_, _, path)| path).collect())
    }
}

fn validate_kind(kind: &str) -> Result<(), Error> {
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(Error::InvalidInput(format!("report type must be lowercase ascii: {kind:?}")));
    }
    Ok(())
}
