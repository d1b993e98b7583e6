//! Domain types shared across the engine -- reports, incidents, alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic point in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

/// Sentiment as assigned by the upstream analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f64,
}

/// A raw citizen report as delivered by the ingestion pipeline.
///
/// Missing priority defaults to 1 and missing categories to an empty set;
/// ingestion never rejects a report over absent optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub incident_id: Option<String>,
}

fn default_priority() -> i64 {
    1
}

impl Report {
    pub fn is_negative(&self) -> bool {
        matches!(
            self.sentiment,
            Some(Sentiment {
                label: SentimentLabel::Negative,
                ..
            })
        )
    }
}

/// Provenance of an incident: statistical, geographic, or operator-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Anomaly,
    GeoCluster,
    Manual,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Anomaly => write!(f, "anomaly"),
            SourceType::GeoCluster => write!(f, "geo_cluster"),
            SourceType::Manual => write!(f, "manual"),
        }
    }
}

impl SourceType {
    pub fn parse(s: &str) -> Self {
        match s {
            "anomaly" => SourceType::Anomaly,
            "geo_cluster" => SourceType::GeoCluster,
            _ => SourceType::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    New,
    Resolved,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::New => write!(f, "new"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl IncidentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "resolved" => IncidentStatus::Resolved,
            _ => IncidentStatus::New,
        }
    }
}

/// An aggregated incident built from one group of reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub severity: i64,
    pub severity_label: String,
    pub categories: Vec<String>,
    pub location: Option<Location>,
    pub status: IncidentStatus,
    pub assigned_to: Option<String>,
    pub resolution: Option<String>,
    pub report_ids: Vec<String>,
    pub report_count: usize,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Created,
    Notified,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Created => write!(f, "created"),
            AlertStatus::Notified => write!(f, "notified"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl AlertStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "notified" => AlertStatus::Notified,
            "acknowledged" => AlertStatus::Acknowledged,
            "resolved" => AlertStatus::Resolved,
            _ => AlertStatus::Created,
        }
    }
}

/// One organization to notify for a given report category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// An alert raised for an incident at severity 4 or above.
///
/// An alert always references exactly one pre-existing incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub incident_id: String,
    pub created_at: DateTime<Utc>,
    pub severity: i64,
    pub summary: String,
    pub location: Option<Location>,
    pub contacts: Vec<EmergencyContact>,
    pub status: AlertStatus,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
}
