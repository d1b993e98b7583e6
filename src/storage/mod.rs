//! SQLite storage layer -- schema, report queries, migrations.

pub mod schema;

use anyhow::Result;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

use crate::model::{Location, Report, Sentiment, SentimentLabel};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Row};

/// Save a raw report to the database. Upstream ingestion and the CLI both
/// come through here.
pub fn save_report(pool: &Pool, report: &Report) -> Result<()> {
    let conn = pool.get()?;

    let categories_json = serde_json::to_string(&report.categories)?;
    let (sentiment_label, sentiment_score) = match report.sentiment {
        Some(s) => (Some(s.label.as_str()), Some(s.score)),
        None => (None, None),
    };

    conn.execute(
        "INSERT INTO reports (id, text, created_at, priority, categories_json,
                              sentiment_label, sentiment_score, lat, lng, processed, incident_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            report.id,
            report.text,
            report.created_at.to_rfc3339(),
            report.priority,
            categories_json,
            sentiment_label,
            sentiment_score,
            report.location.map(|l| l.lat),
            report.location.map(|l| l.lng),
            report.processed as i64,
            report.incident_id,
        ],
    )?;

    Ok(())
}

/// Fetch unprocessed reports created within the trailing window, oldest first.
pub fn fetch_unprocessed(pool: &Pool, window_hours: i64, now: DateTime<Utc>) -> Result<Vec<Report>> {
    let conn = pool.get()?;
    let cutoff = (now - Duration::hours(window_hours)).to_rfc3339();

    let mut stmt = conn.prepare(
        "SELECT id, text, created_at, priority, categories_json,
                sentiment_label, sentiment_score, lat, lng, processed, incident_id
         FROM reports
         WHERE processed = 0 AND created_at >= ?1
         ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![cutoff], report_from_row)?;

    let mut reports = Vec::new();
    for r in rows {
        reports.push(r?);
    }
    Ok(reports)
}

/// Mark a report as consumed by an incident. Reapplying the same link is a
/// no-op at the row level.
pub fn mark_processed(pool: &Pool, report_id: &str, incident_id: &str) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE reports SET processed = 1, incident_id = ?2 WHERE id = ?1",
        params![report_id, incident_id],
    )?;
    Ok(())
}

pub(crate) fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    let created_raw: String = row.get(2)?;
    let categories_raw: String = row.get(4)?;
    let sentiment_label: Option<String> = row.get(5)?;
    let sentiment_score: Option<f64> = row.get(6)?;
    let lat: Option<f64> = row.get(7)?;
    let lng: Option<f64> = row.get(8)?;

    let sentiment = match (sentiment_label, sentiment_score) {
        (Some(label_raw), Some(score)) => {
            SentimentLabel::parse(&label_raw).map(|label| Sentiment { label, score })
        }
        _ => None,
    };

    Ok(Report {
        id: row.get(0)?,
        text: row.get(1)?,
        created_at: DateTime::parse_from_rfc3339(&created_raw)
            .unwrap_or_default()
            .with_timezone(&Utc),
        priority: row.get(3)?,
        categories: serde_json::from_str(&categories_raw).unwrap_or_default(),
        sentiment,
        location: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Location { lat, lng }),
            _ => None,
        },
        processed: row.get::<_, i64>(9)? != 0,
        incident_id: row.get(10)?,
    })
}
