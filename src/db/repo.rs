use super::model::{AppendReport, BulkRow, CleanDataRow, DetectionRow};
use crate::model::{CleanData, DetectionData, NewCleanData};
use anyhow::{Context, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

/// Default chunk size for [`append_rows`].
pub const DEFAULT_BATCH_SIZE: usize = 500;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open database {}", normalized))?;
    if !normalized.starts_with("sqlite::memory") {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&pool)
            .await?;
    }
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Rebuild in sqlite:// form; create the file on first use.
    let mut rebuilt = format!("sqlite://{}", expanded_path);
    match query_part {
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_clean_data(pool: &Pool, new: &NewCleanData) -> Result<CleanData> {
    let row: CleanDataRow = sqlx::query_as(
        "INSERT INTO cleandata (channel_title, channel_username, message, date, media_path) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, channel_title, channel_username, message, date, media_path",
    )
    .bind(&new.channel_title)
    .bind(&new.channel_username)
    .bind(&new.message)
    .bind(new.date)
    .bind(new.media_path.as_deref())
    .fetch_one(pool)
    .await
    .context("failed to insert clean data")?;
    Ok(row.into())
}

#[instrument(skip(pool))]
pub async fn get_clean_data(pool: &Pool, id: i64) -> Result<Option<CleanData>> {
    let row: Option<CleanDataRow> = sqlx::query_as(
        "SELECT id, channel_title, channel_username, message, date, media_path \
         FROM cleandata WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

#[instrument(skip(pool))]
pub async fn list_clean_data(pool: &Pool, skip: i64, limit: i64) -> Result<Vec<CleanData>> {
    let rows: Vec<CleanDataRow> = sqlx::query_as(
        "SELECT id, channel_title, channel_username, message, date, media_path \
         FROM cleandata ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_clean_data(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cleandata")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[instrument(skip(pool))]
pub async fn list_detections(pool: &Pool, skip: i64, limit: i64) -> Result<Vec<DetectionData>> {
    let rows: Vec<DetectionRow> = sqlx::query_as(
        "SELECT xmin_val, ymin, xmax_val, ymax, confidence, class, name, image_name \
         FROM detect_data ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_detections(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM detect_data")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// SQLite's default cap on bound variables in one statement.
const MAX_BIND_VARS: usize = 32766;

/// Append `rows` to `R::TABLE` in chunks of `batch_size`, one transaction per chunk.
///
/// A chunk wider than the bind-variable cap is written as several `INSERT`s inside
/// its transaction. A failed chunk aborts the append; earlier chunks stay committed.
#[instrument(skip_all, fields(table = R::TABLE, rows = rows.len(), batch_size = batch_size))]
pub async fn append_rows<R: BulkRow>(
    pool: &Pool,
    rows: &[R],
    batch_size: usize,
) -> Result<AppendReport> {
    let batch_size = batch_size.max(1);
    let rows_per_stmt = batch_size.min(MAX_BIND_VARS / R::COLUMNS.len().max(1)).max(1);
    let mut report = AppendReport {
        offered: rows.len(),
        ..Default::default()
    };

    for (index, chunk) in rows.chunks(batch_size).enumerate() {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;
        for part in chunk.chunks(rows_per_stmt) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                R::TABLE,
                R::COLUMNS.join(", ")
            ));
            qb.push_values(part, |mut b, row| row.push_values(&mut b));
            if let Some(clause) = R::ON_CONFLICT {
                qb.push(" ");
                qb.push(clause);
            }

            let done = qb
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to append chunk {} into {}", index, R::TABLE))?;
            inserted += done.rows_affected();
        }
        tx.commit().await?;

        report.inserted += inserted;
        report.chunks += 1;
        debug!(chunk = index, inserted, "appended chunk");
    }

    Ok(report)
}
