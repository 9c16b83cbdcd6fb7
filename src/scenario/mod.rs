//! Replay scenarios and mid-run overrides
//!
//! Scenarios are a closed set of variants, each carrying its own typed
//! parameters, resolved once at session start. Overrides are the smaller
//! adjustments that can be injected while a session runs.

pub mod perturb;

pub use perturb::{ItemActual, PerturbationEngine, StandActual};

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RinksideError};
use crate::forecast::provider::ForecastTable;

/// A perturbation layered on top of the scenario, active over a window range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    #[serde(flatten)]
    pub kind: OverrideKind,
    /// First window index the override applies to
    pub from_window: usize,
    /// Last window index (inclusive); None means until the end of the game
    pub to_window: Option<usize>,
}

/// The adjustment an override makes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverrideKind {
    /// A stand goes offline: its actuals drop to zero
    StandOutage { stand: String },
    /// One stand's demand is multiplied by a factor
    DemandSpike { stand: String, factor: f64 },
    /// All demand is scaled by a factor
    GlobalVolume { factor: f64 },
}

impl Override {
    pub fn is_active(&self, window: usize) -> bool {
        window >= self.from_window && self.to_window.map_or(true, |end| window <= end)
    }

    /// Reject malformed overrides before they reach a running session.
    pub fn validate(&self, table: &ForecastTable) -> Result<()> {
        if self.from_window >= table.axis.len() {
            return Err(RinksideError::InvalidScenario(format!(
                "override activation window {} is past the end of the game ({} windows)",
                self.from_window,
                table.axis.len()
            )));
        }
        if let Some(end) = self.to_window {
            if end < self.from_window {
                return Err(RinksideError::InvalidScenario(format!(
                    "override end window {} precedes activation window {}",
                    end, self.from_window
                )));
            }
        }
        match &self.kind {
            OverrideKind::StandOutage { stand } | OverrideKind::DemandSpike { stand, .. } => {
                if table.stand_index(stand).is_none() {
                    return Err(RinksideError::InvalidScenario(format!(
                        "unknown stand: {}",
                        stand
                    )));
                }
            }
            OverrideKind::GlobalVolume { .. } => {}
        }
        match &self.kind {
            OverrideKind::DemandSpike { factor, .. } | OverrideKind::GlobalVolume { factor } => {
                if !factor.is_finite() || *factor <= 0.0 {
                    return Err(RinksideError::InvalidScenario(format!(
                        "override factor must be a positive finite number, got {}",
                        factor
                    )));
                }
            }
            OverrideKind::StandOutage { .. } => {}
        }
        Ok(())
    }
}

impl std::fmt::Display for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            OverrideKind::StandOutage { stand } => write!(f, "stand_outage {}", stand)?,
            OverrideKind::DemandSpike { stand, factor } => {
                write!(f, "demand_spike {} x{:.1}", stand, factor)?
            }
            OverrideKind::GlobalVolume { factor } => {
                write!(f, "global_volume x{:.1}", factor)?
            }
        }
        match self.to_window {
            Some(end) => write!(f, " (windows {}-{})", self.from_window, end),
            None => write!(f, " (from window {})", self.from_window),
        }
    }
}

/// A replay scenario, resolved once at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum Scenario {
    /// Standard game; forecast should hold within noise
    Normal,
    /// A promotion nobody tagged in the system: one item spikes mid-game
    UntaggedPromo {
        item: String,
        factor: f64,
        from_offset_min: i32,
    },
    /// One stand goes down and another absorbs a share of its demand
    StandRedistribution {
        from_stand: String,
        to_stand: String,
        share: f64,
        from_offset_min: i32,
    },
    /// Unseasonable warmth: beer runs hot, hot drinks run cold
    WeatherSurprise { beer_factor: f64 },
    /// Playoff intensity: uniform uplift across the venue
    Playoff { uplift: f64 },
    /// Free-form override list for bespoke drills
    Custom { overrides: Vec<Override> },
}

impl Scenario {
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::UntaggedPromo { .. } => "untagged_promo",
            Scenario::StandRedistribution { .. } => "stand_redistribution",
            Scenario::WeatherSurprise { .. } => "weather_surprise",
            Scenario::Playoff { .. } => "playoff",
            Scenario::Custom { .. } => "custom",
        }
    }

    /// Build the pre-configured scenario for a catalog key.
    pub fn from_key(key: &str) -> Result<Scenario> {
        match key {
            "normal" => Ok(Scenario::Normal),
            "untagged_promo" => Ok(Scenario::UntaggedPromo {
                item: "Hot Dog".into(),
                factor: 2.5,
                from_offset_min: 20,
            }),
            "stand_redistribution" => Ok(Scenario::StandRedistribution {
                from_stand: "Main Canteen".into(),
                to_stand: "Taco Trio".into(),
                share: 0.6,
                from_offset_min: 20,
            }),
            "weather_surprise" => Ok(Scenario::WeatherSurprise { beer_factor: 1.3 }),
            "playoff" => Ok(Scenario::Playoff { uplift: 1.15 }),
            other => Err(RinksideError::InvalidScenario(format!(
                "unknown scenario key: {}",
                other
            ))),
        }
    }

    /// Check scenario parameters against the session's forecast table.
    pub fn validate(&self, table: &ForecastTable) -> Result<()> {
        match self {
            Scenario::Normal => Ok(()),
            Scenario::UntaggedPromo { item, factor, .. } => {
                if !factor.is_finite() || *factor <= 0.0 {
                    return Err(RinksideError::InvalidScenario(format!(
                        "promo factor must be positive, got {}",
                        factor
                    )));
                }
                let sold_anywhere = (0..table.stands.len()).any(|s| {
                    (0..table.axis.len())
                        .any(|w| table.items(s, w).iter().any(|i| &i.item == item))
                });
                if !sold_anywhere {
                    return Err(RinksideError::InvalidScenario(format!(
                        "promo item not sold at any stand: {}",
                        item
                    )));
                }
                Ok(())
            }
            Scenario::StandRedistribution {
                from_stand,
                to_stand,
                share,
                ..
            } => {
                for stand in [from_stand, to_stand] {
                    if table.stand_index(stand).is_none() {
                        return Err(RinksideError::InvalidScenario(format!(
                            "unknown stand: {}",
                            stand
                        )));
                    }
                }
                if from_stand == to_stand {
                    return Err(RinksideError::InvalidScenario(
                        "redistribution needs two distinct stands".into(),
                    ));
                }
                if !(0.0..=1.0).contains(share) {
                    return Err(RinksideError::InvalidScenario(format!(
                        "redistribution share must be in [0, 1], got {}",
                        share
                    )));
                }
                Ok(())
            }
            Scenario::WeatherSurprise { beer_factor } => {
                if !beer_factor.is_finite() || *beer_factor <= 0.0 {
                    return Err(RinksideError::InvalidScenario(format!(
                        "beer factor must be positive, got {}",
                        beer_factor
                    )));
                }
                Ok(())
            }
            Scenario::Playoff { uplift } => {
                if !uplift.is_finite() || *uplift <= 0.0 {
                    return Err(RinksideError::InvalidScenario(format!(
                        "playoff uplift must be positive, got {}",
                        uplift
                    )));
                }
                Ok(())
            }
            Scenario::Custom { overrides } => {
                for o in overrides {
                    o.validate(table)?;
                }
                Ok(())
            }
        }
    }
}

/// Catalog entry describing a pre-built scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// List the pre-built scenarios for the transport layer / CLI.
pub fn catalog() -> Vec<ScenarioInfo> {
    vec![
        ScenarioInfo {
            key: "normal",
            name: "Normal Game",
            description: "Standard mixed-crowd game. Forecast should hold with minor drift.",
        },
        ScenarioInfo {
            key: "untagged_promo",
            name: "Untagged Promo",
            description: "Nobody flagged the promo night. Hot dog demand spikes from INT1 on.",
        },
        ScenarioInfo {
            key: "stand_redistribution",
            name: "Stand Redistribution",
            description: "Main Canteen goes down at INT1; Taco Trio absorbs most of its demand.",
        },
        ScenarioInfo {
            key: "weather_surprise",
            name: "Weather Surprise",
            description: "Unseasonably warm day. Beer runs above forecast, hot drinks below.",
        },
        ScenarioInfo {
            key: "playoff",
            name: "Playoff Game",
            description: "High-intensity crowd, uniform demand uplift across the venue.",
        },
    ]
}
