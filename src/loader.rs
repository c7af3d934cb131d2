//! CSV batch loaders for the clean-data and detection tables.
//!
//! Both loaders follow the same flow: normalize headers, check the expected
//! columns, read rows (skipping the ones that fail to parse), clean, then hand
//! the rows to [`db::append_rows`].

use crate::clean;
use crate::db::{self, AppendReport, Pool};
use crate::model::{CleanData, DetectionData};
use anyhow::{Context, Result};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const CLEAN_DATA_COLUMNS: &[&str] = &[
    "channel_title",
    "channel_username",
    "id",
    "message",
    "date",
    "media_path",
];

pub const DETECTION_COLUMNS: &[&str] = &[
    "xmin_val",
    "ymin",
    "xmax_val",
    "ymax",
    "confidence",
    "class",
    "name",
    "image_name",
];

/// Alternate header spellings seen in detector exports.
const DETECTION_ALIASES: &[(&str, &str)] = &[("xmin", "xmin_val"), ("xmax", "xmax_val")];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("CSV file does not contain all expected columns {expected:?} (missing {missing:?})")]
    MissingColumns {
        expected: Vec<String>,
        missing: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub media_root: Option<PathBuf>,
}

impl LoadOptions {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            media_root: None,
        }
    }
}

/// Counters for one loader run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub read: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub media_cleared: usize,
    pub inserted: u64,
    pub chunks: usize,
}

impl LoadReport {
    /// Rows handed to the table whose key was already present.
    pub fn skipped_existing(&self) -> u64 {
        let offered = self.read - self.invalid - self.duplicates;
        (offered as u64).saturating_sub(self.inserted)
    }

    fn absorb(&mut self, append: AppendReport) {
        self.inserted = append.inserted;
        self.chunks = append.chunks;
    }
}

/// A clean-data CSV row before cleaning.
#[derive(Debug, Deserialize)]
struct CleanDataRecord {
    channel_title: String,
    channel_username: String,
    id: i64,
    message: String,
    date: String,
    #[serde(default)]
    media_path: Option<String>,
}

/// `Channel Title` and `channel_title` name the same column.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn normalized_headers(headers: &StringRecord, aliases: &[(&str, &str)]) -> StringRecord {
    headers
        .iter()
        .map(|h| {
            let h = normalize_header(h);
            aliases
                .iter()
                .find(|(from, _)| *from == h)
                .map(|(_, to)| to.to_string())
                .unwrap_or(h)
        })
        .collect()
}

fn check_columns(headers: &StringRecord, expected: &[&str]) -> Result<(), LoadError> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(LoadError::MissingColumns {
        expected: expected.iter().map(|c| c.to_string()).collect(),
        missing,
    })
}

/// Read every row of `path` as `T` after header normalization and the column check.
/// Rows that fail to deserialize are logged and counted, not fatal.
fn read_records<T: DeserializeOwned>(
    path: &Path,
    expected: &[&str],
    aliases: &[(&str, &str)],
) -> Result<(Vec<T>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open CSV {}", path.display()))?;

    let headers = normalized_headers(reader.headers()?, aliases);
    check_columns(&headers, expected)?;
    reader.set_headers(headers);

    let mut rows = Vec::new();
    let mut invalid = 0;
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                invalid += 1;
                let line = err.position().map(|p| p.line());
                warn!(line, %err, "skipping malformed CSV row");
            }
        }
    }
    Ok((rows, invalid))
}

/// Turn a raw record into a storable row, or `None` when a required field is blank
/// or the date cannot be parsed.
fn clean_record(rec: CleanDataRecord) -> Option<(CleanData, Option<String>)> {
    if rec.channel_title.trim().is_empty() || rec.channel_username.trim().is_empty() {
        return None;
    }
    let date = clean::parse_timestamp(&rec.date)?;
    Some((
        CleanData {
            id: rec.id,
            channel_title: rec.channel_title,
            channel_username: rec.channel_username,
            message: clean::remove_emojis(&rec.message),
            date,
            media_path: None,
        },
        rec.media_path,
    ))
}

/// Load a scraped-messages CSV into `cleandata`.
///
/// Duplicate ids keep their first row, emojis are stripped from `message`, and
/// media paths that do not name an existing file are stored as `NULL`. Ids already
/// present in the table are left untouched.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_clean_data(pool: &Pool, path: &Path, opts: &LoadOptions) -> Result<LoadReport> {
    let (mut records, mut invalid) =
        read_records::<CleanDataRecord>(path, CLEAN_DATA_COLUMNS, &[])?;
    let mut report = LoadReport {
        read: records.len() + invalid,
        ..Default::default()
    };
    // first row per id wins, even when that row is later rejected
    report.duplicates = clean::dedup_by_key(&mut records, |rec| rec.id);

    let mut rows = Vec::with_capacity(records.len());
    for rec in records {
        let id = rec.id;
        match clean_record(rec) {
            Some(pair) => rows.push(pair),
            None => {
                invalid += 1;
                warn!(id, "skipping row with missing required field or bad date");
            }
        }
    }
    report.invalid = invalid;

    let media_root = opts.media_root.as_deref();
    let rows: Vec<CleanData> = rows
        .into_iter()
        .map(|(mut row, raw_media)| {
            row.media_path = clean::validate_media_path(raw_media.as_deref(), media_root);
            let had_media = raw_media.as_deref().is_some_and(|m| !m.trim().is_empty());
            if had_media && row.media_path.is_none() {
                report.media_cleared += 1;
            }
            row
        })
        .collect();

    let append = db::append_rows(pool, &rows, opts.batch_size).await?;
    report.absorb(append);
    info!(
        read = report.read,
        invalid = report.invalid,
        duplicates = report.duplicates,
        media_cleared = report.media_cleared,
        inserted = report.inserted,
        "clean data loaded"
    );
    Ok(report)
}

/// Load detector output into `detect_data`. Fails before writing anything when a
/// column is missing.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_detections(pool: &Pool, path: &Path, opts: &LoadOptions) -> Result<LoadReport> {
    let (rows, invalid) =
        read_records::<DetectionData>(path, DETECTION_COLUMNS, DETECTION_ALIASES)?;
    let mut report = LoadReport {
        read: rows.len() + invalid,
        invalid,
        ..Default::default()
    };

    let append = db::append_rows(pool, &rows, opts.batch_size).await?;
    report.absorb(append);
    info!(
        read = report.read,
        invalid = report.invalid,
        inserted = report.inserted,
        chunks = report.chunks,
        "detections loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("Channel Title"), "channel_title");
        assert_eq!(normalize_header(" Media  Path "), "media_path");
        assert_eq!(normalize_header("\u{feff}ID"), "id");
        assert_eq!(normalize_header("xmin_val"), "xmin_val");
    }

    #[test]
    fn aliases_apply_after_normalization() {
        let raw = StringRecord::from(vec!["XMIN", "ymin", "xmax", "ymax"]);
        let got = normalized_headers(&raw, DETECTION_ALIASES);
        assert_eq!(got, StringRecord::from(vec!["xmin_val", "ymin", "xmax_val", "ymax"]));
    }

    #[test]
    fn missing_columns_are_listed() {
        let headers = StringRecord::from(vec!["xmin_val", "ymin", "name"]);
        let err = check_columns(&headers, DETECTION_COLUMNS).unwrap_err();
        let LoadError::MissingColumns { expected, missing } = err;
        assert_eq!(expected.len(), 8);
        assert_eq!(
            missing,
            vec!["xmax_val", "ymax", "confidence", "class", "image_name"]
        );
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let rec = CleanDataRecord {
            channel_title: " ".into(),
            channel_username: "@x".into(),
            id: 1,
            message: "m".into(),
            date: "2024-01-01 00:00:00".into(),
            media_path: None,
        };
        assert!(clean_record(rec).is_none());

        let rec = CleanDataRecord {
            channel_title: "X".into(),
            channel_username: "@x".into(),
            id: 1,
            message: "hi 😀".into(),
            date: "not a date".into(),
            media_path: None,
        };
        assert!(clean_record(rec).is_none());
    }
}
