//! Real-time drift detection: streaming actuals vs. the baseline forecast
//!
//! The detector owns the append-only per-stand drift sequences. Each call
//! to `observe` consumes exactly the next window's actuals and produces one
//! immutable `DriftRecord` per stand; records are never revised, and the
//! trend of record k looks back only at records k-1..k-W.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::MonitorConfig;
use crate::core::error::{Result, RinksideError};
use crate::core::types::{Category, Status, TimeWindow, Trend};
use crate::forecast::provider::ForecastTable;
use crate::scenario::perturb::StandActual;

/// The three directions drift is measured along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftDimension {
    Volume,
    Mix,
    Timing,
}

/// Operational grading of a single drift signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    fn grade(magnitude: f64) -> Self {
        let abs = magnitude.abs();
        if abs >= 0.40 {
            Severity::Critical
        } else if abs >= 0.25 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

/// A graded per-window drift signal, kept for the post-game summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftSignal {
    pub stand: String,
    pub window: usize,
    pub dimension: DriftDimension,
    pub magnitude: f64,
    pub severity: Severity,
}

/// One stand's drift state at one window. Append-only, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub stand: String,
    pub window: usize,
    pub forecast_qty: f64,
    pub actual_qty: f64,
    /// Per-window volume drift: (actual - forecast) / max(forecast, eps)
    pub drift_pct: f64,
    /// L1 distance between forecast and actual category shares this window;
    /// None when the observation carries no item breakdown
    pub mix_drift: Option<f64>,
    /// Realized minus expected fraction of the game plan sold by now
    pub timing_drift: f64,
    /// Weighted-average severity across the three dimensions
    pub severity_score: f64,
    /// The dimension contributing most to the severity score
    pub dominant: DriftDimension,
    /// Running cumulative actual / cumulative forecast - 1
    pub cumulative_drift: f64,
    pub status: Status,
    pub trend: Trend,
}

/// Everything the detector produced for one window
#[derive(Debug, Clone)]
pub struct WindowDrift {
    pub window: TimeWindow,
    /// One record per stand, in the forecast table's stand order
    pub records: Vec<DriftRecord>,
    pub venue_window_drift: f64,
    pub venue_cumulative_drift: f64,
    pub venue_status: Status,
}

/// Post-game rollup of the drift trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftStats {
    pub windows_processed: usize,
    pub total_windows: usize,
    pub cumulative_drift: f64,
    pub total_actual: f64,
    pub total_forecast: f64,
    pub warning_signals: usize,
    pub critical_signals: usize,
    /// Final cumulative drift per stand, in stand order
    pub stand_cumulative: Vec<(String, f64)>,
}

struct StandTracker {
    cum_actual: f64,
    cum_forecast: f64,
    /// Whole-game forecast for this stand, fixed at session start
    total_forecast: f64,
    records: Vec<DriftRecord>,
}

/// Maintains the forecast-vs-actual comparison for one session
pub struct DriftDetector {
    cfg: MonitorConfig,
    table: Arc<ForecastTable>,
    trackers: Vec<StandTracker>,
    venue_cum_actual: f64,
    venue_cum_forecast: f64,
    next_window: usize,
    signals: Vec<DriftSignal>,
}

impl DriftDetector {
    pub fn new(cfg: MonitorConfig, table: Arc<ForecastTable>) -> Self {
        let trackers = (0..table.stands.len())
            .map(|s| StandTracker {
                cum_actual: 0.0,
                cum_forecast: 0.0,
                total_forecast: table.stand_total(s),
                records: Vec::with_capacity(table.axis.len()),
            })
            .collect();
        Self {
            cfg,
            table,
            trackers,
            venue_cum_actual: 0.0,
            venue_cum_forecast: 0.0,
            next_window: 0,
            signals: Vec::new(),
        }
    }

    /// Index of the window the detector expects next
    pub fn next_window(&self) -> usize {
        self.next_window
    }

    /// Venue-wide cumulative drift so far
    pub fn cumulative_drift(&self) -> f64 {
        ratio_drift(
            self.venue_cum_actual,
            self.venue_cum_forecast,
            self.cfg.epsilon,
        )
    }

    /// A stand's full record sequence so far
    pub fn history(&self, stand: usize) -> &[DriftRecord] {
        &self.trackers[stand].records
    }

    /// Classify a cumulative drift value against the status thresholds.
    pub fn classify(&self, drift: f64) -> Status {
        classify_status(drift, self.cfg.green_threshold, self.cfg.yellow_threshold)
    }

    /// Ingest the actuals for the next window and produce its records.
    ///
    /// Windows must arrive strictly in sequence with one observation per
    /// stand; anything else corrupts the append-only sequence and is a
    /// tick-processing error.
    pub fn observe(&mut self, window: usize, actuals: &[StandActual]) -> Result<WindowDrift> {
        if window != self.next_window {
            return Err(RinksideError::TickProcessingError {
                component: "drift_detector",
                window,
                reason: format!("expected window {}, got {}", self.next_window, window),
            });
        }
        let time_window = self.table.axis.window(window).ok_or_else(|| {
            RinksideError::TickProcessingError {
                component: "drift_detector",
                window,
                reason: "window index past the end of the axis".into(),
            }
        })?;
        if actuals.len() != self.trackers.len() {
            return Err(RinksideError::TickProcessingError {
                component: "drift_detector",
                window,
                reason: format!(
                    "expected {} stand observations, got {}",
                    self.trackers.len(),
                    actuals.len()
                ),
            });
        }

        let mut records = Vec::with_capacity(self.trackers.len());
        let mut venue_window_actual = 0.0;
        let mut venue_window_forecast = 0.0;

        for (stand_idx, actual) in actuals.iter().enumerate() {
            if actual.stand != stand_idx {
                return Err(RinksideError::TickProcessingError {
                    component: "drift_detector",
                    window,
                    reason: format!(
                        "observation order mismatch: slot {} carries stand {}",
                        stand_idx, actual.stand
                    ),
                });
            }
            let record = self.stand_record(stand_idx, window, actual);
            venue_window_actual += record.actual_qty;
            venue_window_forecast += record.forecast_qty;
            self.collect_signals(&record);
            let tracker = &mut self.trackers[stand_idx];
            tracker.cum_actual += record.actual_qty;
            tracker.cum_forecast += record.forecast_qty;
            tracker.records.push(record.clone());
            records.push(record);
        }

        self.venue_cum_actual += venue_window_actual;
        self.venue_cum_forecast += venue_window_forecast;
        self.next_window += 1;

        let venue_cumulative = self.cumulative_drift();
        Ok(WindowDrift {
            window: time_window,
            records,
            venue_window_drift: window_drift(
                venue_window_actual,
                venue_window_forecast,
                self.cfg.epsilon,
            ),
            venue_cumulative_drift: venue_cumulative,
            venue_status: self.classify(venue_cumulative),
        })
    }

    fn stand_record(&self, stand_idx: usize, window: usize, actual: &StandActual) -> DriftRecord {
        let cfg = &self.cfg;
        let tracker = &self.trackers[stand_idx];
        let forecast_qty = self.table.stand_window_qty(stand_idx, window);
        let actual_qty = actual.qty;

        let drift_pct = window_drift(actual_qty, forecast_qty, cfg.epsilon);
        let mix_drift = self.mix_drift(stand_idx, window, actual);

        // Pace: fraction of the stand's game plan realized vs. expected,
        // both against the same forecast-total denominator.
        let cum_actual = tracker.cum_actual + actual_qty;
        let cum_forecast = tracker.cum_forecast + forecast_qty;
        let timing_drift = if tracker.total_forecast > cfg.epsilon {
            (cum_actual - cum_forecast) / tracker.total_forecast
        } else {
            0.0
        };

        let cumulative_drift = ratio_drift(cum_actual, cum_forecast, cfg.epsilon);
        let status = self.classify(cumulative_drift);
        let trend = self.trend(tracker, cumulative_drift);

        let (severity_score, dominant) =
            combine_dimensions(cfg, drift_pct, mix_drift, timing_drift);

        DriftRecord {
            stand: self.table.stands[stand_idx].clone(),
            window,
            forecast_qty,
            actual_qty,
            drift_pct,
            mix_drift,
            timing_drift,
            severity_score,
            dominant,
            cumulative_drift,
            status,
            trend,
        }
    }

    fn mix_drift(&self, stand_idx: usize, window: usize, actual: &StandActual) -> Option<f64> {
        if actual.by_item.is_empty() {
            return None;
        }
        let forecast_shares = self.table.category_shares(stand_idx, window)?;
        let actual_total: f64 = actual.by_item.iter().map(|i| i.qty).sum();
        if actual_total <= 0.0 {
            return None;
        }
        let mut actual_shares: ahash::AHashMap<Category, f64> = ahash::AHashMap::new();
        for item in &actual.by_item {
            *actual_shares.entry(item.category).or_insert(0.0) += item.qty / actual_total;
        }
        let l1: f64 = Category::ALL
            .iter()
            .map(|c| {
                let f = forecast_shares.get(c).copied().unwrap_or(0.0);
                let a = actual_shares.get(c).copied().unwrap_or(0.0);
                (f - a).abs()
            })
            .sum();
        Some(l1)
    }

    fn trend(&self, tracker: &StandTracker, current_cumulative: f64) -> Trend {
        let lookback = self.cfg.trend_lookback;
        // records holds windows 0..k-1 here; the comparison target for
        // window k is the record at k - lookback.
        if tracker.records.len() < lookback {
            return Trend::Stable;
        }
        let prior = &tracker.records[tracker.records.len() - lookback];
        let delta = current_cumulative.abs() - prior.cumulative_drift.abs();
        if delta > self.cfg.trend_hysteresis {
            Trend::Worsening
        } else if delta < -self.cfg.trend_hysteresis {
            Trend::Improving
        } else {
            Trend::Stable
        }
    }

    fn collect_signals(&mut self, record: &DriftRecord) {
        // Dead windows produce huge meaningless ratios; skip grading them.
        if record.forecast_qty.max(record.actual_qty) < self.cfg.min_window_qty {
            return;
        }
        if record.drift_pct.abs() >= self.cfg.green_threshold {
            self.signals.push(DriftSignal {
                stand: record.stand.clone(),
                window: record.window,
                dimension: DriftDimension::Volume,
                magnitude: record.drift_pct,
                severity: Severity::grade(record.drift_pct),
            });
        }
        if let Some(mix) = record.mix_drift {
            if mix >= 2.0 * self.cfg.green_threshold {
                self.signals.push(DriftSignal {
                    stand: record.stand.clone(),
                    window: record.window,
                    dimension: DriftDimension::Mix,
                    magnitude: mix,
                    severity: Severity::grade(mix / 2.0),
                });
            }
        }
    }

    /// Post-game rollup across everything observed so far.
    pub fn stats(&self) -> DriftStats {
        DriftStats {
            windows_processed: self.next_window,
            total_windows: self.table.axis.len(),
            cumulative_drift: self.cumulative_drift(),
            total_actual: self.venue_cum_actual,
            total_forecast: self.venue_cum_forecast,
            warning_signals: self
                .signals
                .iter()
                .filter(|s| s.severity == Severity::Warning)
                .count(),
            critical_signals: self
                .signals
                .iter()
                .filter(|s| s.severity == Severity::Critical)
                .count(),
            stand_cumulative: self
                .trackers
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    (
                        self.table.stands[i].clone(),
                        ratio_drift(t.cum_actual, t.cum_forecast, self.cfg.epsilon),
                    )
                })
                .collect(),
        }
    }

    /// All graded signals so far, in emission order.
    pub fn signals(&self) -> &[DriftSignal] {
        &self.signals
    }
}

/// Per-window drift with the zero/zero guard: no demand, no drift.
fn window_drift(actual: f64, forecast: f64, epsilon: f64) -> f64 {
    if forecast < epsilon && actual < epsilon {
        return 0.0;
    }
    (actual - forecast) / forecast.max(epsilon)
}

/// Cumulative actual / cumulative forecast - 1, with the same guard.
fn ratio_drift(cum_actual: f64, cum_forecast: f64, epsilon: f64) -> f64 {
    if cum_forecast < epsilon && cum_actual < epsilon {
        return 0.0;
    }
    cum_actual / cum_forecast.max(epsilon) - 1.0
}

/// Threshold classification on cumulative drift magnitude.
pub fn classify_status(drift: f64, green_threshold: f64, yellow_threshold: f64) -> Status {
    let abs = drift.abs();
    if abs <= green_threshold {
        Status::Green
    } else if abs <= yellow_threshold {
        Status::Yellow
    } else {
        Status::Red
    }
}

/// Weighted average of the dimension magnitudes plus the dominant label.
///
/// Only used to pick the cause label shown to operators; status is always
/// driven by cumulative drift against the thresholds.
fn combine_dimensions(
    cfg: &MonitorConfig,
    volume: f64,
    mix: Option<f64>,
    timing: f64,
) -> (f64, DriftDimension) {
    let mut terms = vec![(DriftDimension::Volume, cfg.volume_weight, volume.abs())];
    if let Some(m) = mix {
        terms.push((DriftDimension::Mix, cfg.mix_weight, m.abs()));
    }
    terms.push((DriftDimension::Timing, cfg.timing_weight, timing.abs()));

    let weight_total: f64 = terms.iter().map(|(_, w, _)| w).sum();
    let score = if weight_total > 0.0 {
        terms.iter().map(|(_, w, m)| w * m).sum::<f64>() / weight_total
    } else {
        0.0
    };
    let dominant = terms
        .iter()
        .max_by(|a, b| {
            (a.1 * a.2)
                .partial_cmp(&(b.1 * b.2))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(d, _, _)| *d)
        .unwrap_or(DriftDimension::Volume);
    (score, dominant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Archetype, DayOfWeek, Game, GameId, WindowAxis};
    use crate::forecast::provider::{BaselineForecastProvider, ForecastProvider};
    use crate::scenario::perturb::{ItemActual, PerturbationEngine};
    use crate::scenario::Scenario;

    fn demo_table() -> Arc<ForecastTable> {
        let game = Game {
            id: GameId::new(),
            opponent: "Kelowna".into(),
            date: "2026-02-20".into(),
            day_of_week: DayOfWeek::Fri,
            puck_drop_hour: 19,
            attendance: 4000,
            archetype: Archetype::Mixed,
            is_playoff: false,
            temp_mean_c: 8.0,
            outcome: None,
        };
        Arc::new(
            BaselineForecastProvider::new()
                .get_forecast(&game, WindowAxis::default())
                .unwrap(),
        )
    }

    /// Actuals that scale each stand's forecast by a flat factor.
    fn scaled_actuals(table: &ForecastTable, window: usize, factor: f64) -> Vec<StandActual> {
        (0..table.stands.len())
            .map(|stand| {
                let by_item: Vec<ItemActual> = table
                    .items(stand, window)
                    .iter()
                    .map(|i| ItemActual {
                        item: i.item.clone(),
                        category: i.category,
                        qty: i.forecast_qty * factor,
                    })
                    .collect();
                StandActual {
                    stand,
                    window,
                    qty: by_item.iter().map(|i| i.qty).sum(),
                    by_item,
                }
            })
            .collect()
    }

    #[test]
    fn test_cumulative_drift_matches_running_totals() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let engine = PerturbationEngine::new(Scenario::Normal, 11, 0.08);

        let mut cum_actual = vec![0.0; table.stands.len()];
        let mut cum_forecast = vec![0.0; table.stands.len()];
        for window in 0..table.axis.len() {
            let actuals = engine.actuals_for_window(&table, window, &[]);
            let wd = detector.observe(window, &actuals).unwrap();
            for (s, record) in wd.records.iter().enumerate() {
                cum_actual[s] += record.actual_qty;
                cum_forecast[s] += record.forecast_qty;
                let expected = cum_actual[s] / cum_forecast[s] - 1.0;
                assert!(
                    (record.cumulative_drift - expected).abs() < 1e-9,
                    "stand {} window {}: {} vs {}",
                    s,
                    window,
                    record.cumulative_drift,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_out_of_order_window_rejected() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let actuals = scaled_actuals(&table, 0, 1.0);
        detector.observe(0, &actuals).unwrap();

        let skipped = scaled_actuals(&table, 2, 1.0);
        assert!(matches!(
            detector.observe(2, &skipped),
            Err(RinksideError::TickProcessingError { .. })
        ));
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(classify_status(0.0, 0.15, 0.30), Status::Green);
        assert_eq!(classify_status(0.15, 0.15, 0.30), Status::Green);
        assert_eq!(classify_status(-0.16, 0.15, 0.30), Status::Yellow);
        assert_eq!(classify_status(0.30, 0.15, 0.30), Status::Yellow);
        assert_eq!(classify_status(0.31, 0.15, 0.30), Status::Red);
        assert_eq!(classify_status(-0.75, 0.15, 0.30), Status::Red);
    }

    #[test]
    fn test_on_forecast_run_stays_green() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        for window in 0..table.axis.len() {
            let wd = detector
                .observe(window, &scaled_actuals(&table, window, 1.0))
                .unwrap();
            for record in &wd.records {
                assert_eq!(record.status, Status::Green);
            }
            assert_eq!(wd.venue_status, Status::Green);
        }
        assert!(detector.cumulative_drift().abs() < 1e-9);
    }

    #[test]
    fn test_doubled_demand_goes_red() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let wd = detector
            .observe(0, &scaled_actuals(&table, 0, 2.0))
            .unwrap();
        for record in &wd.records {
            assert!((record.drift_pct - 1.0).abs() < 1e-9);
            assert_eq!(record.status, Status::Red);
        }
        assert_eq!(wd.venue_status, Status::Red);
    }

    #[test]
    fn test_first_window_trend_is_stable() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let wd = detector
            .observe(0, &scaled_actuals(&table, 0, 1.8))
            .unwrap();
        for record in &wd.records {
            assert_eq!(record.trend, Trend::Stable);
        }
    }

    #[test]
    fn test_recovering_stand_trends_improving() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());

        // Big early overshoot, then exactly-on-forecast windows pull the
        // cumulative ratio back toward zero.
        detector
            .observe(0, &scaled_actuals(&table, 0, 2.0))
            .unwrap();
        let mut last = None;
        for window in 1..table.axis.len() {
            let wd = detector
                .observe(window, &scaled_actuals(&table, window, 1.0))
                .unwrap();
            last = Some(wd);
        }
        let last = last.unwrap();
        // Well past the lookback, every stand should read improving or at
        // least stable once the ratio flattens out.
        assert!(last.records.iter().all(|r| r.trend != Trend::Worsening));
    }

    #[test]
    fn test_zero_zero_guard_and_missing_breakdown() {
        // No demand, no drift: the guards return exactly zero instead of
        // dividing through the epsilon floor.
        assert_eq!(window_drift(0.0, 0.0, 1e-6), 0.0);
        assert_eq!(ratio_drift(0.0, 0.0, 1e-6), 0.0);

        // An observation without an item breakdown reports mix as unknown,
        // not as zero.
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let actuals: Vec<StandActual> = (0..table.stands.len())
            .map(|stand| StandActual {
                stand,
                window: 0,
                qty: 0.0,
                by_item: Vec::new(),
            })
            .collect();
        let wd = detector.observe(0, &actuals).unwrap();
        for record in &wd.records {
            assert!(record.mix_drift.is_none());
        }
    }

    #[test]
    fn test_mix_drift_zero_when_shares_match() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        // Flat scaling preserves category shares exactly.
        let wd = detector
            .observe(0, &scaled_actuals(&table, 0, 0.5))
            .unwrap();
        for record in &wd.records {
            let mix = record.mix_drift.expect("breakdown provided");
            assert!(mix.abs() < 1e-9, "mix drift {} on flat scaling", mix);
        }
    }

    #[test]
    fn test_timing_drift_sign_tracks_pace() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        // Selling ahead of plan: positive timing drift.
        let wd = detector
            .observe(0, &scaled_actuals(&table, 0, 1.5))
            .unwrap();
        for record in &wd.records {
            assert!(record.timing_drift > 0.0);
        }
    }

    #[test]
    fn test_dominant_dimension_volume_on_flat_spike() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        let wd = detector
            .observe(0, &scaled_actuals(&table, 0, 2.0))
            .unwrap();
        for record in &wd.records {
            assert_eq!(record.dominant, DriftDimension::Volume);
        }
    }

    #[test]
    fn test_stats_counts_signals() {
        let table = demo_table();
        let mut detector = DriftDetector::new(MonitorConfig::default(), table.clone());
        for window in 0..3 {
            detector
                .observe(window, &scaled_actuals(&table, window, 2.0))
                .unwrap();
        }
        let stats = detector.stats();
        assert_eq!(stats.windows_processed, 3);
        assert!(stats.critical_signals > 0);
        assert!((stats.cumulative_drift - 1.0).abs() < 1e-9);
    }
}
