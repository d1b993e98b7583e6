//! Acknowledge / resolve operations on alerts and their incidents.

use crate::storage::Pool;
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};

/// Mark an alert as taken over by a user.
///
/// Returns whether a matching, previously-unacknowledged alert existed;
/// an unknown id is a `false`, not an error.
pub fn acknowledge(pool: &Pool, alert_id: &str, user_id: &str) -> Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE alerts
         SET status = 'acknowledged', acknowledged_at = ?2, acknowledged_by = ?3
         WHERE id = ?1 AND status != 'acknowledged'",
        params![alert_id, Utc::now().to_rfc3339(), user_id],
    )?;

    let success = changed > 0;
    if success {
        info!(alert = %alert_id, user = %user_id, "Alert acknowledged");
    } else {
        warn!(alert = %alert_id, "Alert acknowledgement failed");
    }
    Ok(success)
}

/// Resolve an alert and its linked incident together.
///
/// The alert must exist. Both updates run in one transaction, so a
/// half-resolved alert/incident pair can never be observed; success is
/// reported only when both rows changed. Acknowledgement is not a
/// precondition.
pub fn resolve(pool: &Pool, alert_id: &str, resolution_notes: &str) -> Result<bool> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let incident_id: Option<String> = tx
        .query_row(
            "SELECT incident_id FROM alerts WHERE id = ?1",
            params![alert_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(incident_id) = incident_id else {
        warn!(alert = %alert_id, "Alert not found");
        return Ok(false);
    };

    let now = Utc::now().to_rfc3339();

    let alert_changed = tx.execute(
        "UPDATE alerts
         SET status = 'resolved', resolved_at = ?2, resolution_notes = ?3
         WHERE id = ?1",
        params![alert_id, now, resolution_notes],
    )?;

    let incident_changed = tx.execute(
        "UPDATE incidents
         SET status = 'resolved', resolution = ?2, updated_at = ?3
         WHERE id = ?1",
        params![incident_id, resolution_notes, now],
    )?;

    tx.commit()?;

    let success = alert_changed > 0 && incident_changed > 0;
    if success {
        info!(alert = %alert_id, incident = %incident_id, "Alert resolved");
    } else {
        warn!(alert = %alert_id, "Alert resolution failed");
    }
    Ok(success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_pool;
    use rusqlite::params;

    fn seeded_pool() -> (tempfile::TempDir, Pool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lifecycle_test.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();

        let now = Utc::now().to_rfc3339();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO incidents (id, created_at, updated_at, summary, description,
                                    severity, severity_label, report_count, source_type)
             VALUES ('inc-1', ?1, ?1, 'Incendie rue des Lilas...', 'desc', 5, 'Critique', 3, 'geo_cluster')",
            params![now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO alerts (id, incident_id, created_at, severity, summary, status)
             VALUES ('al-1', 'inc-1', ?1, 5, 'Incendie rue des Lilas...', 'created')",
            params![now],
        )
        .unwrap();

        (dir, pool)
    }

    #[test]
    fn test_acknowledge_unknown_alert_returns_false() {
        let (_dir, pool) = seeded_pool();
        assert!(!acknowledge(&pool, "missing", "user-1").unwrap());
    }

    #[test]
    fn test_acknowledge_stamps_actor_once() {
        let (_dir, pool) = seeded_pool();
        assert!(acknowledge(&pool, "al-1", "user-1").unwrap());
        // already acknowledged
        assert!(!acknowledge(&pool, "al-1", "user-2").unwrap());

        let conn = pool.get().unwrap();
        let (status, by): (String, Option<String>) = conn
            .query_row(
                "SELECT status, acknowledged_by FROM alerts WHERE id = 'al-1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "acknowledged");
        assert_eq!(by.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_resolve_unknown_alert_returns_false() {
        let (_dir, pool) = seeded_pool();
        assert!(!resolve(&pool, "missing", "fini").unwrap());
    }

    #[test]
    fn test_resolve_without_prior_acknowledgement() {
        let (_dir, pool) = seeded_pool();
        assert!(resolve(&pool, "al-1", "Intervention terminée").unwrap());

        let conn = pool.get().unwrap();
        let alert_status: String = conn
            .query_row("SELECT status FROM alerts WHERE id = 'al-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        let (incident_status, resolution): (String, Option<String>) = conn
            .query_row(
                "SELECT status, resolution FROM incidents WHERE id = 'inc-1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();

        assert_eq!(alert_status, "resolved");
        assert_eq!(incident_status, "resolved");
        assert_eq!(resolution.as_deref(), Some("Intervention terminée"));
    }
}
