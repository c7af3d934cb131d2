//! Cleaning steps applied to scraped rows before they are appended.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

// Emoticons, symbols & pictographs, transport & map symbols, regional indicator flags.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\u{1F1E0}-\u{1F1FF}]+")
        .expect("static emoji pattern")
});

/// Strip emoji runs from `text`. Everything outside the emoji blocks is kept as-is.
pub fn remove_emojis(text: &str) -> String {
    EMOJI_RE.replace_all(text, "").into_owned()
}

/// Keep the first row for every key, preserving order. Returns the number dropped.
pub fn dedup_by_key<T, K, F>(rows: &mut Vec<T>, mut key: F) -> usize
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    rows.retain(|row| seen.insert(key(row)));
    before - rows.len()
}

/// Returns the path unchanged when it names an existing regular file, otherwise `None`.
///
/// Relative paths are checked against `media_root` when one is given.
pub fn validate_media_path(raw: Option<&str>, media_root: Option<&Path>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let path = Path::new(raw);
    let resolved = match media_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    };
    if resolved.is_file() {
        Some(raw.to_string())
    } else {
        None
    }
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse the timestamp shapes produced by the scraper and by pandas exports.
/// Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn strips_emoji_blocks_only() {
        assert_eq!(remove_emojis("Sale 😀😀 today 🚀!"), "Sale  today !");
        assert_eq!(remove_emojis("flag 🇪🇹 end"), "flag  end");
        assert_eq!(remove_emojis("pin 📌 here"), "pin  here");
        // outside the stripped ranges
        assert_eq!(remove_emojis("check ✅ ☎"), "check ✅ ☎");
        assert_eq!(remove_emojis("ዋጋ 500 ብር"), "ዋጋ 500 ብር");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut rows = vec![(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e")];
        let dropped = dedup_by_key(&mut rows, |r| r.0);
        assert_eq!(dropped, 2);
        assert_eq!(rows, vec![(1, "a"), (2, "b"), (3, "d")]);
    }

    #[test]
    fn media_path_must_exist() {
        let td = tempdir().unwrap();
        let img = td.path().join("photo_12.jpg");
        std::fs::write(&img, b"jpg").unwrap();
        let img_str = img.to_string_lossy().to_string();

        assert_eq!(validate_media_path(Some(&img_str), None), Some(img_str.clone()));
        assert_eq!(validate_media_path(Some("  "), None), None);
        assert_eq!(validate_media_path(None, None), None);
        assert_eq!(
            validate_media_path(Some(&td.path().join("gone.jpg").to_string_lossy()), None),
            None
        );
        // directories are not media files
        assert_eq!(validate_media_path(Some(&td.path().to_string_lossy()), None), None);
    }

    #[test]
    fn relative_media_path_uses_root() {
        let td = tempdir().unwrap();
        std::fs::create_dir_all(td.path().join("photos")).unwrap();
        std::fs::write(td.path().join("photos/a.jpg"), b"x").unwrap();

        assert_eq!(
            validate_media_path(Some("photos/a.jpg"), Some(td.path())),
            Some("photos/a.jpg".to_string())
        );
        assert_eq!(validate_media_path(Some("photos/b.jpg"), Some(td.path())), None);
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let want = Utc.with_ymd_and_hms(2024, 10, 3, 7, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2024-10-03T07:15:00Z"), Some(want));
        assert_eq!(parse_timestamp("2024-10-03 07:15:00+00:00"), Some(want));
        assert_eq!(parse_timestamp("2024-10-03 10:15:00+03:00"), Some(want));
        assert_eq!(parse_timestamp("2024-10-03 07:15:00"), Some(want));
        assert_eq!(parse_timestamp("2024-10-03T07:15:00"), Some(want));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
