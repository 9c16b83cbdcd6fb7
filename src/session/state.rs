//! Per-run session state and its lifecycle
//!
//! Each replay is an explicitly constructed state value owned by one
//! orchestrator task; there are no process-wide singletons, so any number
//! of sessions can run side by side without sharing mutable state.

use std::sync::Arc;

use crate::core::types::{Game, SessionId};
use crate::forecast::provider::ForecastTable;
use crate::reasoning::Alert;
use crate::scenario::{Override, Scenario};

/// Lifecycle of a session: idle -> running -> one of three terminals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Completed,
    Stopped,
    Errored,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Stopped | SessionPhase::Errored
        )
    }
}

/// Everything one run owns. Mutated only by the orchestrator's own task,
/// created on start and dropped on stop/complete.
pub struct SessionState {
    pub id: SessionId,
    pub game: Game,
    pub scenario: Scenario,
    pub table: Arc<ForecastTable>,
    pub phase: SessionPhase,
    pub current_window: usize,
    pub skip_ai: bool,
    /// Injected overrides that have been drained into the run
    pub active_overrides: Vec<Override>,
    /// Every alert raised so far, in emission order
    pub alerts: Vec<Alert>,
}

impl SessionState {
    pub fn new(
        game: Game,
        scenario: Scenario,
        table: Arc<ForecastTable>,
        skip_ai: bool,
    ) -> Self {
        Self {
            id: SessionId::new(),
            game,
            scenario,
            table,
            phase: SessionPhase::Idle,
            current_window: 0,
            skip_ai,
            active_overrides: Vec::new(),
            alerts: Vec::new(),
        }
    }

    /// Overrides (injected plus scenario-owned) active at a window, as
    /// operator-readable strings for the reasoning brief.
    pub fn known_override_descriptions(&self, window: usize) -> Vec<String> {
        self.active_overrides
            .iter()
            .filter(|o| o.is_active(window))
            .map(|o| o.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(!SessionPhase::Idle.is_terminal());
        assert!(!SessionPhase::Running.is_terminal());
        assert!(SessionPhase::Completed.is_terminal());
        assert!(SessionPhase::Stopped.is_terminal());
        assert!(SessionPhase::Errored.is_terminal());
    }
}
