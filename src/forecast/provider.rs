//! Baseline forecast provider and the per-session forecast table
//!
//! The provider is the black-box boundary: given a game descriptor it
//! returns a per-stand, per-item, per-window quantity forecast with a
//! low/high range. The table is produced once per session and read-only
//! during replay.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RinksideError};
use crate::core::types::{Category, Game, WindowAxis};
use crate::forecast::profiles::{
    category_bias, phase_weight, units_per_attendee, venue_stands,
};

/// Forecast for one item at one stand in one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemForecast {
    pub item: String,
    pub category: Category,
    /// Point estimate
    pub forecast_qty: f64,
    /// Lower bound of the plausible range
    pub low: f64,
    /// Upper bound of the plausible range
    pub high: f64,
}

/// The complete baseline forecast for one game
///
/// Indexed by stand position (fixed order) and window index, so all
/// iteration during replay is deterministic.
#[derive(Debug, Clone)]
pub struct ForecastTable {
    pub axis: WindowAxis,
    pub stands: Vec<String>,
    stand_index: AHashMap<String, usize>,
    /// cells[stand][window] -> per-item forecasts
    cells: Vec<Vec<Vec<ItemForecast>>>,
}

impl ForecastTable {
    pub fn new(axis: WindowAxis, stands: Vec<String>, cells: Vec<Vec<Vec<ItemForecast>>>) -> Self {
        let stand_index = stands
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self {
            axis,
            stands,
            stand_index,
            cells,
        }
    }

    pub fn stand_index(&self, name: &str) -> Option<usize> {
        self.stand_index.get(name).copied()
    }

    pub fn items(&self, stand: usize, window: usize) -> &[ItemForecast] {
        &self.cells[stand][window]
    }

    /// Total forecast quantity for one stand in one window
    pub fn stand_window_qty(&self, stand: usize, window: usize) -> f64 {
        self.cells[stand][window]
            .iter()
            .map(|i| i.forecast_qty)
            .sum()
    }

    /// Total forecast quantity across all stands in one window
    pub fn venue_window_qty(&self, window: usize) -> f64 {
        (0..self.stands.len())
            .map(|s| self.stand_window_qty(s, window))
            .sum()
    }

    /// Whole-game forecast total for one stand
    pub fn stand_total(&self, stand: usize) -> f64 {
        (0..self.axis.len())
            .map(|w| self.stand_window_qty(stand, w))
            .sum()
    }

    /// Whole-game forecast total across the venue
    pub fn venue_total(&self) -> f64 {
        (0..self.stands.len()).map(|s| self.stand_total(s)).sum()
    }

    /// Category shares of a stand's forecast in one window.
    ///
    /// Returns None when the window carries no forecast volume.
    pub fn category_shares(&self, stand: usize, window: usize) -> Option<AHashMap<Category, f64>> {
        let total = self.stand_window_qty(stand, window);
        if total <= 0.0 {
            return None;
        }
        let mut shares: AHashMap<Category, f64> = AHashMap::new();
        for item in &self.cells[stand][window] {
            *shares.entry(item.category).or_insert(0.0) += item.forecast_qty / total;
        }
        Some(shares)
    }

    /// The window index with the highest venue-wide forecast
    pub fn peak_window(&self) -> usize {
        (0..self.axis.len())
            .max_by(|&a, &b| {
                self.venue_window_qty(a)
                    .partial_cmp(&self.venue_window_qty(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0)
    }
}

/// Source of baseline forecasts
pub trait ForecastProvider {
    fn get_forecast(&self, game: &Game, axis: WindowAxis) -> Result<ForecastTable>;
}

/// Profile-backed provider: archetype curves scaled by attendance,
/// with temperature and playoff adjustments.
#[derive(Debug, Default)]
pub struct BaselineForecastProvider;

impl BaselineForecastProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastProvider for BaselineForecastProvider {
    fn get_forecast(&self, game: &Game, axis: WindowAxis) -> Result<ForecastTable> {
        if axis.is_empty() {
            return Err(RinksideError::ForecastUnavailable(
                "window axis is empty".into(),
            ));
        }
        if game.attendance == 0 {
            return Err(RinksideError::ForecastUnavailable(
                "attendance is zero, no demand baseline".into(),
            ));
        }

        let archetype = game.archetype;
        let venue_total = game.attendance as f64 * units_per_attendee(archetype);

        // Beer demand rises ~3% per degree above 8C, hot drinks inversely.
        let temp_delta = game.temp_mean_c as f64 - 8.0;
        let beer_factor = (1.0 + temp_delta * 0.03).clamp(0.7, 1.5);
        let playoff_factor = if game.is_playoff { 1.15 } else { 1.0 };

        // Count windows per phase so phase weight splits evenly inside it.
        let mut phase_counts: AHashMap<crate::core::types::GamePhase, usize> = AHashMap::new();
        for w in axis.iter() {
            *phase_counts.entry(w.phase()).or_insert(0) += 1;
        }

        let profiles = venue_stands();
        let stands: Vec<String> = profiles.iter().map(|p| p.name.to_string()).collect();
        let mut cells: Vec<Vec<Vec<ItemForecast>>> = Vec::with_capacity(profiles.len());

        for profile in &profiles {
            // Renormalise menu shares under the archetype bias so the
            // stand total stays attendance-driven.
            let biased: Vec<f64> = profile
                .menu
                .iter()
                .map(|m| m.share * category_bias(m.category, archetype))
                .collect();
            let bias_total: f64 = biased.iter().sum();

            let stand_game_total = venue_total * profile.venue_share * playoff_factor;

            let mut windows: Vec<Vec<ItemForecast>> = Vec::with_capacity(axis.len());
            for w in axis.iter() {
                let phase = w.phase();
                let per_window =
                    phase_weight(phase, archetype) / phase_counts[&phase] as f64;
                let window_total = stand_game_total * per_window;

                let items = profile
                    .menu
                    .iter()
                    .zip(&biased)
                    .map(|(m, &b)| {
                        let mut qty = window_total * b / bias_total;
                        // Temperature swing hits beer and hot drinks in
                        // opposite directions.
                        if m.category == Category::Beer {
                            qty *= beer_factor;
                        } else if m.item == "Hot Drinks" {
                            qty /= beer_factor;
                        }
                        ItemForecast {
                            item: m.item.to_string(),
                            category: m.category,
                            forecast_qty: qty,
                            low: qty * 0.8,
                            high: qty * 1.25,
                        }
                    })
                    .collect();
                windows.push(items);
            }
            cells.push(windows);
        }

        let table = ForecastTable::new(axis, stands, cells);
        if table.venue_total() <= 0.0 {
            return Err(RinksideError::ForecastUnavailable(
                "profile curves produced an empty forecast".into(),
            ));
        }
        Ok(table)
    }
}
