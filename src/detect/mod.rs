//! Crisis detection -- feature extraction, outlier detection, spatial
//! grouping, severity scoring, and incident aggregation.

pub mod engine;
pub mod features;
pub mod geo;
pub mod incident;
pub mod outlier;
pub mod severity;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot evaluate an empty report set")]
    EmptyReportSet,
}
