use crate::alert::directory::Directory;
use crate::alert::escalate::AlertEscalator;
use crate::alert::notify::{Dispatch, HttpDispatch};
use crate::config::Config;
use crate::detect::geo;
use crate::detect::incident::IncidentAggregator;
use crate::detect::outlier::OutlierDetector;
use crate::model::SourceType;
use crate::storage::{self, Pool};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Minimum cluster size that becomes an incident.
const MIN_CLUSTER_SIZE: usize = 3;

/// Summary of one batch run, for logging and the API surface.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct BatchOutcome {
    pub fetched: usize,
    pub anomalies: usize,
    pub clusters: usize,
    pub incidents: Vec<String>,
    pub alerts: Vec<String>,
}

/// The periodic batch entry point: pulls the unprocessed report window
/// and drives outlier detection, spatial grouping, and aggregation.
///
/// One run executes sequentially start-to-finish. Overlapping runs are
/// excluded by the single serve-loop driving this engine, not by any
/// internal lock; already-created incidents are never rolled back.
pub struct CrisisEngine {
    pool: Pool,
    aggregator: IncidentAggregator,
    detector: OutlierDetector,
    window_hours: i64,
    max_cluster_distance_km: f64,
}

impl CrisisEngine {
    pub fn new(pool: Pool, aggregator: IncidentAggregator, detector: OutlierDetector) -> Self {
        Self {
            pool,
            aggregator,
            detector,
            window_hours: 24,
            max_cluster_distance_km: 1.0,
        }
    }

    /// Assemble the engine with its production collaborators.
    pub fn from_config(pool: Pool, config: &Config) -> Result<Self> {
        let directory = Directory::load(&config.directory_path);
        let dispatch: Arc<dyn Dispatch> = Arc::new(HttpDispatch::new(
            &config.notification_url,
            &config.dashboard_url,
        )?);
        let escalator = AlertEscalator::new(pool.clone(), directory, dispatch);
        let aggregator = IncidentAggregator::new(pool.clone(), escalator);

        let mut engine = Self::new(pool, aggregator, OutlierDetector::default());
        engine.window_hours = config.window_hours;
        Ok(engine)
    }

    pub fn aggregator(&self) -> &IncidentAggregator {
        &self.aggregator
    }

    /// Process the current window of unprocessed reports.
    ///
    /// Pass 1 turns the batch's statistical outliers into one anomaly
    /// incident. Pass 2 independently groups the same original batch by
    /// proximity and turns every cluster of 3 or more into a geo
    /// incident. The passes are deliberately not deduplicated: they are
    /// independent signals, and a report may appear in one incident of
    /// each kind.
    pub async fn process_reports(&self) -> Result<BatchOutcome> {
        info!("Starting report processing");
        let mut outcome = BatchOutcome::default();

        let reports = storage::fetch_unprocessed(&self.pool, self.window_hours, Utc::now())?;
        outcome.fetched = reports.len();
        info!(
            fetched = reports.len(),
            window_hours = self.window_hours,
            "Fetched unprocessed reports"
        );

        if reports.is_empty() {
            info!("No recent reports to process");
            return Ok(outcome);
        }

        // 1. Anomaly detection
        let anomalies = self.detector.detect(&reports);
        outcome.anomalies = anomalies.len();
        if !anomalies.is_empty() {
            info!(count = anomalies.len(), "Creating incident from anomalies");
            let created = self
                .aggregator
                .create_incident(&anomalies, SourceType::Anomaly)
                .await?;
            outcome.incidents.push(created.incident_id);
            outcome.alerts.extend(created.alert_id);
        }

        // 2. Geographic clustering
        let clusters = geo::cluster_by_location(&reports, self.max_cluster_distance_km);
        outcome.clusters = clusters.len();
        for cluster in clusters {
            if cluster.len() >= MIN_CLUSTER_SIZE {
                info!(size = cluster.len(), "Creating incident from cluster");
                let created = self
                    .aggregator
                    .create_incident(&cluster, SourceType::GeoCluster)
                    .await?;
                outcome.incidents.push(created.incident_id);
                outcome.alerts.extend(created.alert_id);
            }
        }

        info!(
            incidents = outcome.incidents.len(),
            alerts = outcome.alerts.len(),
            "Report processing finished"
        );
        Ok(outcome)
    }
}
