//! Monitoring configuration with documented constants
//!
//! All tunables for the drift pipeline are collected here with explanations
//! of their purpose and how they interact with each other.

use crate::core::error::{Result, RinksideError};
use serde::{Deserialize, Serialize};

/// Configuration for the drift-detection pipeline
///
/// Defaults match the thresholds the venue has been operating with.
/// Changing them shifts alert sensitivity, not correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // === STATUS THRESHOLDS ===
    /// Cumulative drift magnitude at or below which a stand is green
    ///
    /// ±15% is within normal game-to-game variance for a single stand,
    /// so no operator attention is warranted.
    pub green_threshold: f64,

    /// Cumulative drift magnitude at or below which a stand is yellow
    ///
    /// Between green_threshold and this bound the stand is on watch;
    /// above it the stand is red and expected to trigger an alert.
    pub yellow_threshold: f64,

    // === DRIFT DIMENSION WEIGHTS ===
    /// Weight of per-window volume drift in the combined severity score
    ///
    /// Volume is weighted highest since it drives stockout/waste most
    /// directly. The combined score only picks the dominant cause label;
    /// it never overrides the status thresholds above.
    pub volume_weight: f64,

    /// Weight of category mix drift in the combined severity score
    pub mix_weight: f64,

    /// Weight of timing (pace) drift in the combined severity score
    pub timing_weight: f64,

    // === TREND DETECTION ===
    /// How many windows back to compare cumulative drift against
    ///
    /// Record k is compared to record k - trend_lookback. Windows earlier
    /// than the lookback report a stable trend by definition.
    pub trend_lookback: usize,

    /// Dead band around zero change before a trend is declared
    ///
    /// A cumulative-drift change smaller than this in either direction
    /// reads as stable, preventing trend flapping on noise.
    pub trend_hysteresis: f64,

    // === ALERTING ===
    /// Minimum windows between repeat alerts for a stand that stays red
    ///
    /// A transition into yellow/red always alerts; a stand that sits red
    /// re-alerts at most once per debounce interval.
    pub alert_debounce: usize,

    /// Wall-clock budget for one remote reasoning call, seconds
    ///
    /// Must stay well under window_duration / max speed so a slow model
    /// cannot stall the tick cadence.
    pub reasoning_timeout_secs: f64,

    // === PERTURBATION ===
    /// Half-width of the symmetric noise band applied to synthetic actuals
    ///
    /// At 0.08 each stand-window lands within ±8% of its scenario-adjusted
    /// forecast, seeded per (game, stand, window) for reproducibility.
    pub noise_amplitude: f64,

    // === GUARDS ===
    /// Denominator floor when a window forecast is near zero
    pub epsilon: f64,

    /// Minimum combined forecast+actual quantity before a window's drift
    /// is graded as a signal
    ///
    /// Dead windows (a handful of units either way) produce huge ratios
    /// that mean nothing operationally.
    pub min_window_qty: f64,

    // === CLOCK ===
    /// Lowest accepted speed multiplier
    pub min_speed: f64,

    /// Highest accepted speed multiplier
    pub max_speed: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Status thresholds (green < yellow, red above)
            green_threshold: 0.15,
            yellow_threshold: 0.30,

            // Dimension weights (volume dominates)
            volume_weight: 1.0,
            mix_weight: 0.5,
            timing_weight: 0.5,

            // Trend
            trend_lookback: 3,
            trend_hysteresis: 0.05,

            // Alerting
            alert_debounce: 5,
            reasoning_timeout_secs: 6.0,

            // Perturbation
            noise_amplitude: 0.08,

            // Guards
            epsilon: 1e-6,
            min_window_qty: 5.0,

            // Clock
            min_speed: 1.0,
            max_speed: 500.0,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.green_threshold <= 0.0 || self.yellow_threshold <= self.green_threshold {
            return Err(RinksideError::InvalidConfig(format!(
                "thresholds must satisfy 0 < green ({}) < yellow ({})",
                self.green_threshold, self.yellow_threshold
            )));
        }
        if self.volume_weight <= 0.0 || self.mix_weight < 0.0 || self.timing_weight < 0.0 {
            return Err(RinksideError::InvalidConfig(
                "volume_weight must be positive and mix/timing weights non-negative".into(),
            ));
        }
        if self.trend_lookback == 0 {
            return Err(RinksideError::InvalidConfig(
                "trend_lookback must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.noise_amplitude) {
            return Err(RinksideError::InvalidConfig(format!(
                "noise_amplitude ({}) must be in [0, 1)",
                self.noise_amplitude
            )));
        }
        if self.epsilon <= 0.0 {
            return Err(RinksideError::InvalidConfig(
                "epsilon must be positive".into(),
            ));
        }
        if self.min_speed <= 0.0 || self.max_speed < self.min_speed {
            return Err(RinksideError::InvalidConfig(format!(
                "speed bounds must satisfy 0 < min ({}) <= max ({})",
                self.min_speed, self.max_speed
            )));
        }
        if self.reasoning_timeout_secs <= 0.0 {
            return Err(RinksideError::InvalidConfig(
                "reasoning_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse a config from TOML content
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: MonitorConfig = toml::from_str(content)
            .map_err(|e| RinksideError::InvalidConfig(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Clamp a requested speed multiplier into the accepted range
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.min_speed, self.max_speed)
    }
}
