//! Multi-factor severity scoring for candidate incidents.

use crate::detect::EngineError;
use crate::model::Report;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Keywords whose presence in a report text raises the emergency factor.
pub const EMERGENCY_KEYWORDS: [&str; 7] = [
    "urgent", "danger", "immédiat", "secours", "blessé", "feu", "accident",
];

/// The 5-level ordinal alert scale.
pub fn label_for(level: i64) -> &'static str {
    match level {
        1 => "Information",
        2 => "Attention",
        3 => "Intervention",
        4 => "Urgence",
        _ => "Critique",
    }
}

/// Outcome of a severity evaluation: the ordinal level, its label, and the
/// underlying weighted score in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct Assessment {
    pub level: i64,
    pub label: &'static str,
    pub score: f64,
}

/// Evaluate the severity of a candidate incident from its member reports.
///
/// Five factors, each normalized to [0, 1], combine under fixed weights:
/// report count (0.15), average priority (0.30), recency (0.20), negative
/// sentiment share (0.15), and emergency keyword density (0.20). The level
/// is `floor(1 + score * 4)`, always in [1, 5]. `now` is injected so
/// recency is testable.
pub fn evaluate(reports: &[Report], now: DateTime<Utc>) -> Result<Assessment, EngineError> {
    if reports.is_empty() {
        return Err(EngineError::EmptyReportSet);
    }
    let count = reports.len() as f64;

    let num_reports = (count / 2.0).min(1.0);

    let avg_priority =
        reports.iter().map(|r| r.priority as f64).sum::<f64>() / count / 5.0;

    // Recent reports weigh most; anything older than 24h contributes nothing.
    let avg_age_hours = reports
        .iter()
        .map(|r| ((now - r.created_at).num_seconds().max(0) as f64) / 3600.0)
        .sum::<f64>()
        / count;
    let recency = (1.0 - avg_age_hours / 24.0).clamp(0.0, 1.0);

    let negative_sentiment =
        reports.iter().filter(|r| r.is_negative()).count() as f64 / count;

    let mut keyword_hits = 0usize;
    for report in reports {
        let text = report.text.to_lowercase();
        keyword_hits += EMERGENCY_KEYWORDS
            .iter()
            .filter(|k| text.contains(*k))
            .count();
    }
    let emergency_keywords = (keyword_hits as f64 / (count * 2.0)).min(1.0);

    let score = num_reports * 0.15
        + avg_priority * 0.30
        + recency * 0.20
        + negative_sentiment * 0.15
        + emergency_keywords * 0.20;

    let level = ((1.0 + score * 4.0).floor() as i64).clamp(1, 5);

    debug!(level, score, "Severity evaluated");
    Ok(Assessment {
        level,
        label: label_for(level),
        score,
    })
}
