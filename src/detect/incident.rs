use crate::alert::escalate::AlertEscalator;
use crate::detect::severity;
use crate::model::{Incident, IncidentStatus, Location, Report, SourceType};
use crate::storage::{self, Pool};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Outcome of one aggregation: the incident, plus the alert it escalated
/// into when severity reached the alert threshold.
#[derive(Debug, Clone)]
pub struct CreatedIncident {
    pub incident_id: String,
    pub alert_id: Option<String>,
}

/// Builds incident records from grouped reports and escalates the severe
/// ones. Owns its pool handle and the escalator seam so tests can
/// substitute a fake dispatcher.
pub struct IncidentAggregator {
    pool: Pool,
    escalator: AlertEscalator,
}

impl IncidentAggregator {
    pub fn new(pool: Pool, escalator: AlertEscalator) -> Self {
        Self { pool, escalator }
    }

    /// Create one incident from a non-empty group of reports.
    ///
    /// Derives the dominant categories (top 3 by frequency), the centroid
    /// of located members, a summary excerpt from the highest-priority
    /// member, and the severity level; persists the incident; marks every
    /// member report processed and linked (idempotent); and escalates
    /// synchronously when severity reaches 4.
    pub async fn create_incident(
        &self,
        reports: &[Report],
        source_type: SourceType,
    ) -> Result<CreatedIncident> {
        let now = Utc::now();
        let assessment = severity::evaluate(reports, now)?;

        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            summary: summarize(reports),
            description: format!(
                "Incident détecté via {} impliquant {} rapports",
                source_type,
                reports.len()
            ),
            severity: assessment.level,
            severity_label: assessment.label.to_string(),
            categories: dominant_categories(reports),
            location: centroid(reports),
            status: IncidentStatus::New,
            assigned_to: None,
            resolution: None,
            report_ids: reports.iter().map(|r| r.id.clone()).collect(),
            report_count: reports.len(),
            source_type,
        };

        self.insert(&incident)?;
        info!(
            incident = %incident.id,
            severity = incident.severity,
            source = %source_type,
            "Incident created"
        );

        for report in reports {
            storage::mark_processed(&self.pool, &report.id, &incident.id)?;
        }

        let alert_id = if incident.severity >= 4 {
            Some(self.escalator.escalate(&incident).await?)
        } else {
            None
        };

        Ok(CreatedIncident {
            incident_id: incident.id,
            alert_id,
        })
    }

    fn insert(&self, incident: &Incident) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO incidents (id, created_at, updated_at, summary, description,
                                    severity, severity_label, categories_json, lat, lng,
                                    status, assigned_to, resolution, report_ids_json,
                                    report_count, source_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                incident.id,
                incident.created_at.to_rfc3339(),
                incident.updated_at.to_rfc3339(),
                incident.summary,
                incident.description,
                incident.severity,
                incident.severity_label,
                serde_json::to_string(&incident.categories)?,
                incident.location.map(|l| l.lat),
                incident.location.map(|l| l.lng),
                incident.status.to_string(),
                incident.assigned_to,
                incident.resolution,
                serde_json::to_string(&incident.report_ids)?,
                incident.report_count as i64,
                incident.source_type.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, incident_id: &str) -> Result<Option<Incident>> {
        use rusqlite::OptionalExtension;
        let conn = self.pool.get()?;
        let incident = conn
            .query_row(
                &format!("{SELECT_INCIDENT} WHERE id = ?1"),
                params![incident_id],
                incident_from_row,
            )
            .optional()?;
        Ok(incident)
    }

    pub fn list_recent(&self, status: Option<&str>, limit: usize) -> Result<Vec<Incident>> {
        list_recent_incidents(&self.pool, status, limit)
    }
}

const SELECT_INCIDENT: &str = "SELECT id, created_at, updated_at, summary, description,
        severity, severity_label, categories_json, lat, lng, status, assigned_to,
        resolution, report_ids_json, report_count, source_type FROM incidents";

pub fn list_recent_incidents(
    pool: &Pool,
    status: Option<&str>,
    limit: usize,
) -> Result<Vec<Incident>> {
    let conn = pool.get()?;
    let mut incidents = Vec::new();

    match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_INCIDENT} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit as i64], incident_from_row)?;
            for r in rows {
                incidents.push(r?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{SELECT_INCIDENT} ORDER BY created_at DESC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit as i64], incident_from_row)?;
            for r in rows {
                incidents.push(r?);
            }
        }
    }

    Ok(incidents)
}

pub(crate) fn incident_from_row(row: &Row<'_>) -> rusqlite::Result<Incident> {
    let created_raw: String = row.get(1)?;
    let updated_raw: String = row.get(2)?;
    let categories_raw: String = row.get(7)?;
    let lat: Option<f64> = row.get(8)?;
    let lng: Option<f64> = row.get(9)?;
    let status_raw: String = row.get(10)?;
    let report_ids_raw: String = row.get(13)?;
    let source_raw: String = row.get(15)?;

    Ok(Incident {
        id: row.get(0)?,
        created_at: parse_rfc3339(&created_raw),
        updated_at: parse_rfc3339(&updated_raw),
        summary: row.get(3)?,
        description: row.get(4)?,
        severity: row.get(5)?,
        severity_label: row.get(6)?,
        categories: serde_json::from_str(&categories_raw).unwrap_or_default(),
        location: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Location { lat, lng }),
            _ => None,
        },
        status: IncidentStatus::parse(&status_raw),
        assigned_to: row.get(11)?,
        resolution: row.get(12)?,
        report_ids: serde_json::from_str(&report_ids_raw).unwrap_or_default(),
        report_count: row.get::<_, i64>(14)? as usize,
        source_type: SourceType::parse(&source_raw),
    })
}

pub(crate) fn parse_rfc3339(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .unwrap_or_default()
        .with_timezone(&Utc)
}

/// Top 3 categories by frequency across all member reports; ties keep
/// first-encountered order.
fn dominant_categories(reports: &[Report]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for report in reports {
        for category in &report.categories {
            if !counts.contains_key(category) {
                order.push(category.clone());
            }
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(usize, String)> = order.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| counts[&b.1].cmp(&counts[&a.1]).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(3).map(|(_, c)| c).collect()
}

/// Mean of member coordinates, when any member is located.
fn centroid(reports: &[Report]) -> Option<Location> {
    let locations: Vec<Location> = reports.iter().filter_map(|r| r.location).collect();
    if locations.is_empty() {
        return None;
    }
    let count = locations.len() as f64;
    Some(Location {
        lat: locations.iter().map(|l| l.lat).sum::<f64>() / count,
        lng: locations.iter().map(|l| l.lng).sum::<f64>() / count,
    })
}

/// Excerpt of the highest-priority member's text; first among ties.
fn summarize(reports: &[Report]) -> String {
    let mut top = &reports[0];
    for report in &reports[1..] {
        if report.priority > top.priority {
            top = report;
        }
    }
    let excerpt: String = top.text.chars().take(100).collect();
    format!("{excerpt}...")
}
