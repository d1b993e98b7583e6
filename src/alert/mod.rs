//! Alert escalation, emergency contact resolution, and lifecycle.

pub mod directory;
pub mod escalate;
pub mod lifecycle;
pub mod notify;

use crate::detect::incident::parse_rfc3339;
use crate::model::{Alert, AlertStatus, Location};
use crate::storage::Pool;
use anyhow::Result;
use rusqlite::{params, Row};

const SELECT_ALERT: &str = "SELECT id, incident_id, created_at, severity, summary, lat, lng,
        contacts_json, status, acknowledged_at, acknowledged_by, resolved_at,
        resolution_notes FROM alerts";

/// Fetch one alert by id.
pub fn get_alert(pool: &Pool, alert_id: &str) -> Result<Option<Alert>> {
    use rusqlite::OptionalExtension;
    let conn = pool.get()?;
    let alert = conn
        .query_row(
            &format!("{SELECT_ALERT} WHERE id = ?1"),
            params![alert_id],
            alert_from_row,
        )
        .optional()?;
    Ok(alert)
}

/// List alerts newest-first, optionally filtered by status.
pub fn list_recent_alerts(pool: &Pool, status: Option<&str>, limit: usize) -> Result<Vec<Alert>> {
    let conn = pool.get()?;
    let mut alerts = Vec::new();

    match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_ALERT} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit as i64], alert_from_row)?;
            for r in rows {
                alerts.push(r?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{SELECT_ALERT} ORDER BY created_at DESC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit as i64], alert_from_row)?;
            for r in rows {
                alerts.push(r?);
            }
        }
    }

    Ok(alerts)
}

pub(crate) fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let created_raw: String = row.get(2)?;
    let lat: Option<f64> = row.get(5)?;
    let lng: Option<f64> = row.get(6)?;
    let contacts_raw: String = row.get(7)?;
    let status_raw: String = row.get(8)?;
    let acknowledged_raw: Option<String> = row.get(9)?;
    let resolved_raw: Option<String> = row.get(11)?;

    Ok(Alert {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        created_at: parse_rfc3339(&created_raw),
        severity: row.get(3)?,
        summary: row.get(4)?,
        location: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Location { lat, lng }),
            _ => None,
        },
        contacts: serde_json::from_str(&contacts_raw).unwrap_or_default(),
        status: AlertStatus::parse(&status_raw),
        acknowledged_at: acknowledged_raw.as_deref().map(parse_rfc3339),
        acknowledged_by: row.get(10)?,
        resolved_at: resolved_raw.as_deref().map(parse_rfc3339),
        resolution_notes: row.get(12)?,
    })
}
