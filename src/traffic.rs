//! Traffic light rendering: the narrow contract between drift internals
//! and the transport layer
//!
//! A pure reducer over the Drift Detector's records. Nothing here holds
//! state; transport and UI consumers get a stable shape without reaching
//! into detector internals.

use serde::{Deserialize, Serialize};

use crate::core::types::{Status, Trend};
use crate::drift::detector::{DriftRecord, WindowDrift};

/// Renderable status for one stand at one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandStatus {
    pub stand: String,
    pub status: Status,
    /// Cumulative drift driving the status
    pub drift_pct: f64,
    pub forecast_qty: i64,
    pub actual_qty: i64,
    pub trend: Trend,
}

impl StandStatus {
    pub fn from_record(record: &DriftRecord) -> Self {
        Self {
            stand: record.stand.clone(),
            status: record.status,
            drift_pct: record.cumulative_drift,
            forecast_qty: record.forecast_qty.round() as i64,
            actual_qty: record.actual_qty.round() as i64,
            trend: record.trend,
        }
    }
}

/// Venue-level rollup for consumers that want a single signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueStatus {
    pub status: Status,
    pub cumulative_drift: f64,
    pub red_stands: usize,
    pub yellow_stands: usize,
    pub green_stands: usize,
}

/// Render one window's records for transport, worst stands first.
pub fn stand_statuses(window: &WindowDrift) -> Vec<StandStatus> {
    let mut statuses: Vec<StandStatus> =
        window.records.iter().map(StandStatus::from_record).collect();
    statuses.sort_by(|a, b| {
        b.status
            .severity()
            .cmp(&a.status.severity())
            .then_with(|| {
                b.drift_pct
                    .abs()
                    .partial_cmp(&a.drift_pct.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    statuses
}

/// Aggregate stand statuses into a venue-level status (worst of all stands).
pub fn venue_status(statuses: &[StandStatus], cumulative_drift: f64) -> VenueStatus {
    let worst = statuses
        .iter()
        .map(|s| s.status)
        .max_by_key(|s| s.severity())
        .unwrap_or(Status::Green);
    VenueStatus {
        status: worst,
        cumulative_drift,
        red_stands: statuses.iter().filter(|s| s.status == Status::Red).count(),
        yellow_stands: statuses
            .iter()
            .filter(|s| s.status == Status::Yellow)
            .count(),
        green_stands: statuses
            .iter()
            .filter(|s| s.status == Status::Green)
            .count(),
    }
}

/// One-line rollup for logs and the CLI.
pub fn summary_line(window_label: &str, venue: &VenueStatus) -> String {
    format!(
        "{} | {} | R{} Y{} G{} | cum {:+.0}%",
        window_label,
        venue.status.label(),
        venue.red_stands,
        venue.yellow_stands,
        venue.green_stands,
        venue.cumulative_drift * 100.0
    )
}
