//! Row models returned by repositories and the contract for bulk appends.
//!
//! Keep these structs focused on table columns. Cleaning and validation
//! live in higher layers.

use crate::model::{CleanData, DetectionData};
use chrono::{DateTime, Utc};
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Sqlite};

/// A `cleandata` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct CleanDataRow {
    pub id: i64,
    pub channel_title: String,
    pub channel_username: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub media_path: Option<String>,
}

impl From<CleanDataRow> for CleanData {
    fn from(row: CleanDataRow) -> Self {
        Self {
            id: row.id,
            channel_title: row.channel_title,
            channel_username: row.channel_username,
            message: row.message,
            date: row.date,
            media_path: row.media_path,
        }
    }
}

/// A `detect_data` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct DetectionRow {
    pub xmin_val: f64,
    pub ymin: f64,
    pub xmax_val: f64,
    pub ymax: f64,
    pub confidence: f64,
    #[sqlx(rename = "class")]
    pub class_id: i32,
    pub name: String,
    pub image_name: String,
}

impl From<DetectionRow> for DetectionData {
    fn from(row: DetectionRow) -> Self {
        Self {
            xmin_val: row.xmin_val,
            ymin: row.ymin,
            xmax_val: row.xmax_val,
            ymax: row.ymax,
            confidence: row.confidence,
            class_id: row.class_id,
            name: row.name,
            image_name: row.image_name,
        }
    }
}

/// A record that can be appended in bulk with one multi-row `INSERT`.
///
/// `COLUMNS` and the values pushed by [`BulkRow::push_values`] must line up.
pub trait BulkRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Appended verbatim after the `VALUES` list, e.g. `ON CONFLICT(id) DO NOTHING`.
    const ON_CONFLICT: Option<&'static str> = None;

    fn push_values(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>);
}

/// Outcome of one bulk append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub offered: usize,
    pub inserted: u64,
    pub chunks: usize,
}

impl BulkRow for CleanData {
    const TABLE: &'static str = "cleandata";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "channel_title",
        "channel_username",
        "message",
        "date",
        "media_path",
    ];
    const ON_CONFLICT: Option<&'static str> = Some("ON CONFLICT(id) DO NOTHING");

    fn push_values(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.channel_title.clone())
            .push_bind(self.channel_username.clone())
            .push_bind(self.message.clone())
            .push_bind(self.date)
            .push_bind(self.media_path.clone());
    }
}

impl BulkRow for DetectionData {
    const TABLE: &'static str = "detect_data";
    const COLUMNS: &'static [&'static str] = &[
        "xmin_val",
        "ymin",
        "xmax_val",
        "ymax",
        "confidence",
        "class",
        "name",
        "image_name",
    ];

    fn push_values(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.xmin_val)
            .push_bind(self.ymin)
            .push_bind(self.xmax_val)
            .push_bind(self.ymax)
            .push_bind(self.confidence)
            .push_bind(self.class_id)
            .push_bind(self.name.clone())
            .push_bind(self.image_name.clone());
    }
}
