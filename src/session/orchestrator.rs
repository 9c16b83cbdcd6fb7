//! Session orchestrator: sequences the pipeline each tick
//!
//! One orchestrator instance runs at most one session at a time. A session
//! is a tokio task that walks the window axis: perturb -> detect -> render
//! -> (maybe) alert -> emit, then waits on the replay clock. All state is
//! owned by the task; the handle only touches queued control values.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::config::MonitorConfig;
use crate::core::error::{Result, RinksideError};
use crate::core::types::{Game, SessionId, WindowAxis};
use crate::drift::detector::{DriftDetector, DriftRecord, WindowDrift};
use crate::drift::redistribute::suggest_for_stand;
use crate::forecast::prep::generate_prep_plan;
use crate::forecast::provider::{ForecastProvider, ForecastTable};
use crate::reasoning::{Alert, DriftBrief, ReasoningAdapter};
use crate::scenario::perturb::{PerturbationEngine, StandActual};
use crate::scenario::{Override, Scenario};
use crate::session::clock::{ControlState, ReplayClock, TickOutcome};
use crate::session::events::{
    BaselineSummary, GameInfo, SessionEvent, SessionSummary, WindowRef,
};
use crate::session::state::{SessionPhase, SessionState};
use crate::traffic;

/// How many recent venue cumulative-drift points a reasoning brief carries
const RECENT_TRAJECTORY: usize = 5;

/// Start parameters for one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub scenario: Scenario,
    pub speed: f64,
    pub skip_ai: bool,
    pub axis: WindowAxis,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            scenario: Scenario::Normal,
            speed: 60.0,
            skip_ai: false,
            axis: WindowAxis::default(),
        }
    }
}

/// Owns the single-session-at-a-time invariant and builds sessions
pub struct Orchestrator<P: ForecastProvider> {
    cfg: MonitorConfig,
    provider: P,
    running: Arc<AtomicBool>,
}

/// Caller's grip on a running session: the event stream plus the three
/// control operations that are safe against an in-flight tick.
pub struct SessionHandle {
    pub id: SessionId,
    cfg: MonitorConfig,
    table: Arc<ForecastTable>,
    control: Arc<ControlState>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    /// Next event in order; None once the stream closes after a terminal.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Update the speed multiplier, effective at the next tick boundary.
    /// Returns the clamped value actually applied.
    pub fn set_speed(&self, speed: f64) -> Result<f64> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(RinksideError::InvalidConfig(format!(
                "speed must be a positive finite number, got {}",
                speed
            )));
        }
        let clamped = self.cfg.clamp_speed(speed);
        self.control.set_speed(clamped);
        Ok(clamped)
    }

    /// Queue an override for the next tick. Malformed overrides are
    /// rejected here, synchronously, without touching the run.
    pub fn inject(&self, o: Override) -> Result<()> {
        o.validate(&self.table)?;
        self.control.push_override(o);
        Ok(())
    }

    /// Hold the replay at the next tick boundary until resumed.
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Let a paused replay continue.
    pub fn resume(&self) {
        self.control.resume();
    }

    /// Request the session stop at the next tick boundary at the latest.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    /// Wait for the session task to finish.
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

impl<P: ForecastProvider> Orchestrator<P> {
    pub fn new(cfg: MonitorConfig, provider: P) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            provider,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start a session: idle -> running.
    ///
    /// Fails with `AlreadyRunning` while a previous session is live, with
    /// `InvalidScenario` / `ForecastUnavailable` when preconditions fail.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, game: Game, opts: SessionOptions) -> Result<SessionHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RinksideError::AlreadyRunning);
        }
        match self.build_session(game, opts) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn build_session(&self, game: Game, opts: SessionOptions) -> Result<SessionHandle> {
        let table = Arc::new(self.provider.get_forecast(&game, opts.axis)?);
        opts.scenario.validate(&table)?;

        let speed = self.cfg.clamp_speed(opts.speed);
        let control = Arc::new(ControlState::new(speed));
        let clock = ReplayClock::new(opts.axis.step_min, control.clone());
        let engine = PerturbationEngine::new(
            opts.scenario.clone(),
            game.id.seed(),
            self.cfg.noise_amplitude,
        );
        let detector = DriftDetector::new(self.cfg.clone(), table.clone());
        let adapter = ReasoningAdapter::new(&self.cfg, opts.skip_ai);
        let state = SessionState::new(game, opts.scenario, table.clone(), opts.skip_ai);
        let id = state.id;

        let (tx, rx) = mpsc::unbounded_channel();
        let cfg = self.cfg.clone();
        let running = self.running.clone();
        let task_control = control.clone();
        let join = tokio::spawn(async move {
            let _guard = RunningGuard(running);
            run_session(cfg, state, detector, engine, adapter, clock, task_control, tx).await;
        });

        Ok(SessionHandle {
            id,
            cfg: self.cfg.clone(),
            table,
            control,
            events: rx,
            join,
        })
    }
}

/// Clears the running flag when the session task exits, however it exits.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    cfg: MonitorConfig,
    mut state: SessionState,
    mut detector: DriftDetector,
    engine: PerturbationEngine,
    mut adapter: ReasoningAdapter,
    clock: ReplayClock,
    control: Arc<ControlState>,
    tx: mpsc::UnboundedSender<SessionEvent>,
) {
    let table = state.table.clone();
    let total_windows = table.axis.len();
    state.phase = SessionPhase::Running;

    tracing::info!(
        session = ?state.id,
        scenario = state.scenario.key(),
        windows = total_windows,
        "session started"
    );
    emit(&tx, session_started_event(&state, &table));

    let mut recent_cumulative: Vec<f64> = Vec::new();

    for window_idx in 0..total_windows {
        if control.stop_requested() {
            state.phase = SessionPhase::Stopped;
            break;
        }
        state.current_window = window_idx;

        // Drain injections queued during the last sleep. Activation is
        // never retroactive: windows already processed are untouched.
        for o in control.drain_overrides() {
            tracing::debug!(window = window_idx, %o, "override applied");
            emit(
                &tx,
                SessionEvent::OverrideApplied {
                    applied: o.clone(),
                    applied_at_window: window_idx,
                },
            );
            state.active_overrides.push(o);
        }

        let actuals = engine.actuals_for_window(&table, window_idx, &state.active_overrides);
        let wd = match detector.observe(window_idx, &actuals) {
            Ok(wd) => wd,
            Err(e) => {
                tracing::error!(window = window_idx, error = %e, "tick processing failed");
                state.phase = SessionPhase::Errored;
                emit(
                    &tx,
                    SessionEvent::SessionError {
                        component: "drift_detector".into(),
                        message: e.to_string(),
                    },
                );
                return;
            }
        };

        recent_cumulative.push(wd.venue_cumulative_drift);
        if recent_cumulative.len() > RECENT_TRAJECTORY {
            recent_cumulative.remove(0);
        }

        // Every stand goes through the adapter (it tracks per-stand status
        // history); at most one alert rides on the window event.
        let mut window_alerts: Vec<Alert> = Vec::new();
        for record in &wd.records {
            let brief = build_brief(
                &cfg,
                &state,
                &table,
                &wd,
                record,
                &actuals,
                &recent_cumulative,
                &adapter,
            );
            if let Some(alert) = adapter.evaluate(brief).await {
                window_alerts.push(alert);
            }
        }
        let headline = window_alerts
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
        state.alerts.extend(window_alerts);

        let statuses = traffic::stand_statuses(&wd);
        let venue = traffic::venue_status(&statuses, wd.venue_cumulative_drift);
        tracing::debug!(
            "{}",
            traffic::summary_line(&wd.window.label(), &venue)
        );
        emit(
            &tx,
            SessionEvent::WindowUpdate {
                window: WindowRef::from_window(wd.window),
                total_windows,
                stand_statuses: statuses,
                venue,
                window_drift: wd.venue_window_drift,
                cumulative_drift: wd.venue_cumulative_drift,
                alert: headline,
            },
        );

        // No sleep after the final window; exhaustion is terminal.
        if window_idx + 1 == total_windows {
            break;
        }
        match clock.wait().await {
            TickOutcome::Elapsed => {}
            TickOutcome::Stopped => {
                state.phase = SessionPhase::Stopped;
                break;
            }
        }
    }

    if state.phase != SessionPhase::Stopped {
        state.phase = SessionPhase::Completed;
    }

    let stats = detector.stats();
    let post_game_report = if !state.skip_ai {
        post_game_narrative(&cfg, &adapter, &stats, &state).await
    } else {
        None
    };

    tracing::info!(
        session = ?state.id,
        windows = stats.windows_processed,
        alerts = state.alerts.len(),
        stopped_early = state.phase == SessionPhase::Stopped,
        "session finished"
    );
    emit(
        &tx,
        SessionEvent::SessionComplete {
            summary: SessionSummary {
                drift: stats,
                alert_count: state.alerts.len(),
                stopped_early: state.phase == SessionPhase::Stopped,
                post_game_report,
            },
            alerts: state.alerts,
        },
    );
}

fn session_started_event(state: &SessionState, table: &ForecastTable) -> SessionEvent {
    let prep_plan = generate_prep_plan(table);
    let peak = table.peak_window();
    SessionEvent::SessionStarted {
        session: state.id,
        game: GameInfo::from_game(&state.game),
        baseline: BaselineSummary {
            scenario: state.scenario.key().into(),
            total_forecast_qty: table.venue_total(),
            stand_totals: table
                .stands
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), table.stand_total(i)))
                .collect(),
            peak_window: WindowRef::from_window(
                table.axis.window(peak).unwrap_or(crate::core::types::TimeWindow {
                    index: 0,
                    offset_min: table.axis.start_min,
                }),
            ),
            prep_action_count: prep_plan.len(),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn build_brief(
    cfg: &MonitorConfig,
    state: &SessionState,
    table: &ForecastTable,
    wd: &WindowDrift,
    record: &DriftRecord,
    actuals: &[StandActual],
    recent_cumulative: &[f64],
    adapter: &ReasoningAdapter,
) -> DriftBrief {
    let stand_idx = table.stand_index(&record.stand).unwrap_or(0);
    let stands_over = wd.records.iter().filter(|r| r.drift_pct >= 0.20).count();
    let stands_under = wd.records.iter().filter(|r| r.drift_pct <= -0.30).count();
    let top_item = actuals
        .get(stand_idx)
        .and_then(|a| {
            a.by_item.iter().max_by(|x, y| {
                x.qty.partial_cmp(&y.qty).unwrap_or(std::cmp::Ordering::Equal)
            })
        })
        .map(|i| i.item.clone());
    let suggestion = if record.drift_pct > 0.30 {
        suggest_for_stand(table, record.window, actuals, stand_idx, cfg.min_window_qty)
    } else {
        None
    };

    DriftBrief {
        stand: record.stand.clone(),
        window: record.window,
        window_label: wd.window.label(),
        volume_drift: record.drift_pct,
        mix_drift: record.mix_drift,
        timing_drift: record.timing_drift,
        cumulative_drift: record.cumulative_drift,
        dominant: record.dominant,
        trend: record.trend,
        prev_status: adapter.previous_status(&record.stand),
        status: record.status,
        stands_over,
        stands_under,
        active_overrides: state.known_override_descriptions(record.window),
        recent_cumulative: recent_cumulative.to_vec(),
        top_item,
        suggestion,
        opponent: state.game.opponent.clone(),
        attendance: state.game.attendance,
        archetype: state.game.archetype,
    }
}

async fn post_game_narrative(
    cfg: &MonitorConfig,
    adapter: &ReasoningAdapter,
    stats: &crate::drift::detector::DriftStats,
    state: &SessionState,
) -> Option<String> {
    let remote = adapter.remote()?;
    let timeout = std::time::Duration::from_secs_f64(cfg.reasoning_timeout_secs);
    match tokio::time::timeout(
        timeout,
        remote.post_game_report(stats, &state.alerts, &state.game.opponent),
    )
    .await
    {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            tracing::warn!("post-game report unavailable: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!("post-game report timed out");
            None
        }
    }
}

fn emit(tx: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("event consumer dropped, continuing run");
    }
}
