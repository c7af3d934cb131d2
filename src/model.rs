use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields shared by the create request and the stored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCleanData {
    pub channel_title: String,
    pub channel_username: String,
    pub message: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub media_path: Option<String>,
}

impl NewCleanData {
    /// Channel fields must carry text; JSON typing already covers presence.
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_title.trim().is_empty() {
            return Err("channel_title must be non-empty".into());
        }
        if self.channel_username.trim().is_empty() {
            return Err("channel_username must be non-empty".into());
        }
        Ok(())
    }
}

/// A stored clean-data record as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanData {
    pub id: i64,
    pub channel_title: String,
    pub channel_username: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub media_path: Option<String>,
}

/// Offset/limit query for list endpoints. Missing values fall back to config.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    /// Resolve into `(skip, limit)` with `limit` clamped to `max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(default_limit).min(max_limit);
        (skip as i64, limit as i64)
    }
}

/// One bounding box emitted by the object detector for a source image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionData {
    #[serde(alias = "xmin")]
    pub xmin_val: f64,
    pub ymin: f64,
    #[serde(alias = "xmax")]
    pub xmax_val: f64,
    pub ymax: f64,
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_id: i32,
    pub name: String,
    pub image_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_path_may_be_omitted() {
        let body = r#"{"channel_title":"Lobelia","channel_username":"@lobelia4cosmetics","message":"hi","date":"2024-10-01T08:30:00Z"}"#;
        let parsed: NewCleanData = serde_json::from_str(body).unwrap();
        assert!(parsed.media_path.is_none());
        parsed.validate().unwrap();
    }

    #[test]
    fn blank_channel_is_invalid() {
        let body = r#"{"channel_title":" ","channel_username":"@x","message":"","date":"2024-10-01T08:30:00Z"}"#;
        let parsed: NewCleanData = serde_json::from_str(body).unwrap();
        assert!(parsed.validate().unwrap_err().contains("channel_title"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let body = r#"{"channel_title":"Lobelia","message":"hi","date":"2024-10-01T08:30:00Z"}"#;
        assert!(serde_json::from_str::<NewCleanData>(body).is_err());
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination::default();
        assert_eq!(p.resolve(10, 100), (0, 10));

        let p = Pagination { skip: Some(20), limit: Some(5000) };
        assert_eq!(p.resolve(10, 100), (20, 100));
    }

    #[test]
    fn detection_class_uses_wire_name() {
        let d = DetectionData {
            xmin_val: 1.0,
            ymin: 2.0,
            xmax_val: 3.0,
            ymax: 4.0,
            confidence: 0.9,
            class_id: 39,
            name: "bottle".into(),
            image_name: "a.jpg".into(),
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["class"], 39);
    }
}
