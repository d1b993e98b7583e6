//! End-to-end engine scenarios against a temporary database, with the
//! outbound transport replaced by fakes.

use anyhow::Result;
use chrono::{Duration, Utc};
use crisiswatch::alert::directory::Directory;
use crisiswatch::alert::escalate::AlertEscalator;
use crisiswatch::alert::notify::Dispatch;
use crisiswatch::alert::{self, lifecycle};
use crisiswatch::detect::engine::CrisisEngine;
use crisiswatch::detect::geo;
use crisiswatch::detect::incident::IncidentAggregator;
use crisiswatch::detect::outlier::OutlierDetector;
use crisiswatch::model::{
    AlertStatus, IncidentStatus, Location, Report, Sentiment, SentimentLabel, SourceType,
};
use crisiswatch::storage::{self, Pool};
use std::sync::{Arc, Mutex};

/// Records every outbound payload and always reports success.
#[derive(Default)]
struct RecordingDispatch {
    emergencies: Mutex<Vec<serde_json::Value>>,
    dashboard_updates: Mutex<Vec<serde_json::Value>>,
}

#[async_trait::async_trait]
impl Dispatch for RecordingDispatch {
    async fn send_emergency(&self, payload: &serde_json::Value) -> Result<()> {
        self.emergencies.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn send_dashboard_update(&self, payload: &serde_json::Value) -> Result<()> {
        self.dashboard_updates.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Simulates an unreachable collaborator.
struct FailingDispatch;

#[async_trait::async_trait]
impl Dispatch for FailingDispatch {
    async fn send_emergency(&self, _payload: &serde_json::Value) -> Result<()> {
        anyhow::bail!("connection refused")
    }

    async fn send_dashboard_update(&self, _payload: &serde_json::Value) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

fn engine_with(
    pool: Pool,
    dispatch: Arc<dyn Dispatch>,
) -> CrisisEngine {
    let escalator = AlertEscalator::new(pool.clone(), Directory::fallback(), dispatch);
    let aggregator = IncidentAggregator::new(pool.clone(), escalator);
    CrisisEngine::new(pool, aggregator, OutlierDetector::default())
}

fn temp_pool() -> (tempfile::TempDir, Pool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.db");
    let pool = storage::open_pool(path.to_str().unwrap()).unwrap();
    (dir, pool)
}

/// The rue des Lilas fire: three close, high-priority, keyword-bearing
/// reports with negative sentiment.
fn fire_reports() -> Vec<Report> {
    let now = Utc::now();
    let specs = [
        (
            "report1",
            "Il y a un gros incendie dans l'immeuble au 15 rue des Lilas ! Urgent !",
            5i64,
            -0.9,
            (45.7578, 4.8320),
            0i64,
        ),
        (
            "report2",
            "Je vois des flammes sortir du toit, c'est le feu rue des Lilas !",
            4,
            -0.8,
            (45.7580, 4.8318),
            5,
        ),
        (
            "report3",
            "Beaucoup de fumée noire, danger immédiat à côté du parc",
            4,
            -0.7,
            (45.7575, 4.8325),
            10,
        ),
    ];

    specs
        .iter()
        .map(|&(id, text, priority, score, (lat, lng), age_minutes)| Report {
            id: id.to_string(),
            text: text.to_string(),
            created_at: now - Duration::minutes(age_minutes),
            priority,
            categories: vec!["securite".to_string(), "incendie".to_string()],
            sentiment: Some(Sentiment {
                label: SentimentLabel::Negative,
                score,
            }),
            location: Some(Location { lat, lng }),
            processed: false,
            incident_id: None,
        })
        .collect()
}

#[tokio::test]
async fn test_fire_cluster_escalates_exactly_one_alert() -> Result<()> {
    let (_dir, pool) = temp_pool();
    let dispatch = Arc::new(RecordingDispatch::default());
    let engine = engine_with(pool.clone(), dispatch.clone());

    let reports = fire_reports();
    for report in &reports {
        storage::save_report(&pool, report)?;
    }

    // All three pairwise distances are under a kilometer: one cluster of 3
    let clusters = geo::cluster_by_location(&reports, 1.0);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 3);

    let created = engine
        .aggregator()
        .create_incident(&clusters[0], SourceType::GeoCluster)
        .await?;

    let incident = engine
        .aggregator()
        .get(&created.incident_id)?
        .expect("incident persisted");
    assert_eq!(incident.report_count, 3);
    assert_eq!(incident.source_type, SourceType::GeoCluster);
    assert!(incident.severity >= 4, "got severity {}", incident.severity);
    assert!(incident.categories.len() <= 3);
    assert!(incident.location.is_some());

    // Severity >= 4 escalated into exactly one alert linked back to the incident
    let alert_id = created.alert_id.expect("alert raised");
    let alerts = alert::list_recent_alerts(&pool, None, 10)?;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, alert_id);
    assert_eq!(alerts[0].incident_id, created.incident_id);

    // The fake transport accepted the notification: status moved to notified
    assert_eq!(alerts[0].status, AlertStatus::Notified);
    assert_eq!(dispatch.emergencies.lock().unwrap().len(), 1);
    assert_eq!(dispatch.dashboard_updates.lock().unwrap().len(), 1);

    // Contacts resolved from the securite + incendie categories
    let names: Vec<&str> = alerts[0].contacts.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"Pompiers"));

    // Member reports are consumed
    assert!(storage::fetch_unprocessed(&pool, 24, Utc::now())?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_batch_run_keeps_both_detection_passes() -> Result<()> {
    let (_dir, pool) = temp_pool();
    let dispatch = Arc::new(RecordingDispatch::default());
    let engine = engine_with(pool.clone(), dispatch);

    for report in &fire_reports() {
        storage::save_report(&pool, report)?;
    }

    let outcome = engine.process_reports().await?;
    assert_eq!(outcome.fetched, 3);

    // Below the training threshold the anomaly pass falls back to the
    // priority >= 4 subset -- here, all three reports
    assert_eq!(outcome.anomalies, 3);
    assert_eq!(outcome.clusters, 1);

    // Both passes fire on the same batch by design: one anomaly incident
    // plus one geo-cluster incident, each severe enough to alert
    assert_eq!(outcome.incidents.len(), 2);
    assert_eq!(outcome.alerts.len(), 2);

    // The second run sees an empty window
    let second = engine.process_reports().await?;
    assert_eq!(second.fetched, 0);
    assert!(second.incidents.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unreachable_collaborators_leave_alert_created() -> Result<()> {
    let (_dir, pool) = temp_pool();
    let engine = engine_with(pool.clone(), Arc::new(FailingDispatch));

    for report in &fire_reports() {
        storage::save_report(&pool, report)?;
    }

    let clusters = geo::cluster_by_location(&fire_reports(), 1.0);
    let created = engine
        .aggregator()
        .create_incident(&clusters[0], SourceType::GeoCluster)
        .await?;

    // Escalation itself succeeds; only the notified transition is lost
    let alert_id = created.alert_id.expect("alert raised despite transport failure");
    let alert = alert::get_alert(&pool, &alert_id)?.expect("alert persisted");
    assert_eq!(alert.status, AlertStatus::Created);

    Ok(())
}

#[tokio::test]
async fn test_resolve_without_acknowledgement_round_trip() -> Result<()> {
    let (_dir, pool) = temp_pool();
    let engine = engine_with(pool.clone(), Arc::new(RecordingDispatch::default()));

    for report in &fire_reports() {
        storage::save_report(&pool, report)?;
    }
    let clusters = geo::cluster_by_location(&fire_reports(), 1.0);
    let created = engine
        .aggregator()
        .create_incident(&clusters[0], SourceType::GeoCluster)
        .await?;
    let alert_id = created.alert_id.expect("alert raised");

    // Never acknowledged, resolved directly
    assert!(lifecycle::resolve(&pool, &alert_id, "Feu maîtrisé")?);

    let alert = alert::get_alert(&pool, &alert_id)?.expect("alert persisted");
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(alert.resolution_notes.as_deref(), Some("Feu maîtrisé"));
    assert!(alert.resolved_at.is_some());

    let incident = engine
        .aggregator()
        .get(&created.incident_id)?
        .expect("incident persisted");
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert_eq!(incident.resolution.as_deref(), Some("Feu maîtrisé"));

    // Lifecycle booleans, not errors, for unknown ids
    assert!(!lifecycle::acknowledge(&pool, "missing", "user-1")?);
    assert!(!lifecycle::resolve(&pool, "missing", "n/a")?);

    Ok(())
}
