//! Report generation.
//!
//! Renders an aggregation, with metadata about how it was produced, as
//! Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::aggregator::Aggregation;
use crate::models::AggregatedResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Where the data came from (service URL or fixture path).
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Duration of the aggregation in seconds.
    pub duration_seconds: f64,
    /// Time budget of each dependent fetch.
    pub dependent_timeout_ms: u64,
}

/// How each dependent source settled, as shown to readers.
#[derive(Debug, Clone, Serialize)]
pub struct DependentStatus {
    pub comments: String,
    pub friends: String,
}

/// The complete aggregation report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub result: AggregatedResult,
    pub status: DependentStatus,
}

impl Report {
    pub fn new(metadata: ReportMetadata, aggregation: Aggregation) -> Self {
        Self {
            metadata,
            status: DependentStatus {
                comments: aggregation.comments.to_string(),
                friends: aggregation.friends.to_string(),
            },
            result: aggregation.result,
        }
    }
}
