//! Alert escalation for incidents at severity 4 and above.

use crate::alert::directory::Directory;
use crate::alert::notify::Dispatch;
use crate::model::{Alert, AlertStatus, Incident};
use crate::storage::Pool;
use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Builds alerts from escalated incidents, resolves emergency contacts,
/// and drives the two best-effort outbound notifications.
pub struct AlertEscalator {
    pool: Pool,
    directory: Directory,
    dispatch: Arc<dyn Dispatch>,
}

impl AlertEscalator {
    pub fn new(pool: Pool, directory: Directory, dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            pool,
            directory,
            dispatch,
        }
    }

    /// Create and persist an alert for an incident, then notify the
    /// external collaborators. Transport failures are logged and
    /// swallowed: the emergency call gates the `notified` transition,
    /// the dashboard call affects nothing.
    pub async fn escalate(&self, incident: &Incident) -> Result<String> {
        let contacts = self.directory.contacts_for(&incident.categories);

        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            incident_id: incident.id.clone(),
            created_at: Utc::now(),
            severity: incident.severity,
            summary: incident.summary.clone(),
            location: incident.location,
            contacts,
            status: AlertStatus::Created,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolution_notes: None,
        };

        self.insert(&alert)?;
        info!(alert = %alert.id, incident = %incident.id, "Alert created");

        let payload = json!({
            "alert_id": alert.id,
            "severity": alert.severity,
            "summary": alert.summary,
            "location": alert.location,
            "contacts": alert.contacts,
            "timestamp": Utc::now().to_rfc3339(),
        });
        match self.dispatch.send_emergency(&payload).await {
            Ok(()) => {
                self.mark_notified(&alert.id)?;
                info!(alert = %alert.id, "Emergency notifications sent");
            }
            Err(e) => {
                error!(alert = %alert.id, error = %e, "Emergency notification failed");
            }
        }

        let dashboard_payload = json!({
            "type": "new_alert",
            "alert_id": alert.id,
            "incident_id": incident.id,
            "severity": alert.severity,
            "summary": alert.summary,
            "location": alert.location,
            "categories": incident.categories,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Err(e) = self.dispatch.send_dashboard_update(&dashboard_payload).await {
            error!(alert = %alert.id, error = %e, "Dashboard update failed");
        }

        Ok(alert.id)
    }

    fn insert(&self, alert: &Alert) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO alerts (id, incident_id, created_at, severity, summary, lat, lng,
                                 contacts_json, status, acknowledged_at, acknowledged_by,
                                 resolved_at, resolution_notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, NULL, NULL)",
            params![
                alert.id,
                alert.incident_id,
                alert.created_at.to_rfc3339(),
                alert.severity,
                alert.summary,
                alert.location.map(|l| l.lat),
                alert.location.map(|l| l.lng),
                serde_json::to_string(&alert.contacts)?,
                alert.status.to_string(),
            ],
        )?;
        Ok(())
    }

    fn mark_notified(&self, alert_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE alerts SET status = 'notified' WHERE id = ?1",
            params![alert_id],
        )?;
        Ok(())
    }
}
