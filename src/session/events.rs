//! The ordered event stream a session produces
//!
//! Events are emitted by the orchestrator in strictly increasing window
//! order and consumed over a channel by whatever transport is attached.
//! Everything here is serializable so a socket or queue can carry it as-is.

use serde::Serialize;

use crate::core::types::{Game, SessionId, TimeWindow};
use crate::drift::detector::DriftStats;
use crate::reasoning::Alert;
use crate::scenario::Override;
use crate::traffic::{StandStatus, VenueStatus};

/// Game context echoed to consumers at session start
#[derive(Debug, Clone, Serialize)]
pub struct GameInfo {
    pub opponent: String,
    pub date: String,
    pub attendance: u32,
    pub archetype: crate::core::types::Archetype,
    pub is_playoff: bool,
}

impl GameInfo {
    pub fn from_game(game: &Game) -> Self {
        Self {
            opponent: game.opponent.clone(),
            date: game.date.clone(),
            attendance: game.attendance,
            archetype: game.archetype,
            is_playoff: game.is_playoff,
        }
    }
}

/// A window reference as consumers see it
#[derive(Debug, Clone, Serialize)]
pub struct WindowRef {
    pub index: usize,
    pub offset_min: i32,
    pub label: String,
}

impl WindowRef {
    pub fn from_window(window: TimeWindow) -> Self {
        Self {
            index: window.index,
            offset_min: window.offset_min,
            label: window.label(),
        }
    }
}

/// Shape of the baseline forecast, sent once at session start
#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummary {
    pub scenario: String,
    pub total_forecast_qty: f64,
    pub stand_totals: Vec<(String, f64)>,
    pub peak_window: WindowRef,
    pub prep_action_count: usize,
}

/// Post-game rollup carried by the terminal event
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub drift: DriftStats,
    pub alert_count: usize,
    /// True when the session was stopped before exhausting its windows
    pub stopped_early: bool,
    /// Narrative recap from the reasoning capability, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_game_report: Option<String>,
}

/// One session's ordered event stream
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        session: SessionId,
        game: GameInfo,
        baseline: BaselineSummary,
    },
    WindowUpdate {
        window: WindowRef,
        total_windows: usize,
        stand_statuses: Vec<StandStatus>,
        venue: VenueStatus,
        /// This window's venue-wide drift
        window_drift: f64,
        /// Venue-wide cumulative drift through this window
        cumulative_drift: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        alert: Option<Alert>,
    },
    OverrideApplied {
        #[serde(rename = "override")]
        applied: Override,
        applied_at_window: usize,
    },
    SessionError {
        component: String,
        message: String,
    },
    SessionComplete {
        summary: SessionSummary,
        alerts: Vec<Alert>,
    },
}

impl SessionEvent {
    /// Terminal events end the stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionError { .. } | SessionEvent::SessionComplete { .. }
        )
    }
}
