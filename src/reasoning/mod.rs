//! Drift cause classification and shift-manager alerts
//!
//! One capability interface with two implementations: a remote LLM
//! classifier and a deterministic rule-based fallback. Both produce the
//! same output shape, so downstream consumers never special-case which
//! one answered.

pub mod adapter;
pub mod remote;
pub mod rules;

pub use adapter::ReasoningAdapter;
pub use remote::RemoteClassifier;
pub use rules::RuleClassifier;

use serde::{Deserialize, Serialize};

use crate::core::types::{Archetype, Status, Trend};
use crate::drift::detector::DriftDimension;
use crate::drift::redistribute::RedistributionSuggestion;

/// Fixed cause taxonomy for drift alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    UntaggedPromo,
    StandOutage,
    Weather,
    Redistribution,
    Noise,
    Unknown,
}

impl Cause {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "untagged_promo" => Cause::UntaggedPromo,
            "stand_outage" => Cause::StandOutage,
            "weather" | "weather_effect" => Cause::Weather,
            "redistribution" | "stand_redistribution" => Cause::Redistribution,
            "noise" => Cause::Noise,
            _ => Cause::Unknown,
        }
    }
}

/// What the shift manager should do about it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    IncreasePrep,
    DecreasePrep,
    Redistribute,
    Hold,
}

/// One concrete corrective step attached to an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub stand: String,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Signed percent change to prep quantities (0 for hold/redistribute)
    pub quantity_change_pct: i32,
}

/// The classification result both implementations produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub cause: Cause,
    pub confidence: f64,
    pub alert_text: String,
    pub actions: Vec<CorrectiveAction>,
}

/// An alert raised for one stand at one window. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub stand: String,
    pub window: usize,
    pub window_label: String,
    pub status: Status,
    pub cause: Cause,
    pub confidence: f64,
    pub alert_text: String,
    pub actions: Vec<CorrectiveAction>,
}

/// Everything a classifier gets to look at for one stand-window
#[derive(Debug, Clone, Serialize)]
pub struct DriftBrief {
    pub stand: String,
    pub window: usize,
    pub window_label: String,
    pub volume_drift: f64,
    pub mix_drift: Option<f64>,
    pub timing_drift: f64,
    pub cumulative_drift: f64,
    pub dominant: DriftDimension,
    pub trend: Trend,
    pub prev_status: Status,
    pub status: Status,
    /// Stands running >= +20% this window
    pub stands_over: usize,
    /// Stands running <= -30% this window
    pub stands_under: usize,
    /// Human-readable descriptions of overrides the operator already knows about
    pub active_overrides: Vec<String>,
    /// Recent venue cumulative drift, oldest first
    pub recent_cumulative: Vec<f64>,
    /// The stand's highest-volume item this window, for prep actions
    pub top_item: Option<String>,
    /// Precomputed redistribution option, when one exists
    pub suggestion: Option<RedistributionSuggestion>,
    pub opponent: String,
    pub attendance: u32,
    pub archetype: Archetype,
}
