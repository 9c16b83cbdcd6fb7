//! Per-stand load analysis and redistribution suggestions
//!
//! When one stand runs hot on an item that other stands also sell, the
//! cheapest correction is to point the line at an underloaded stand rather
//! than scale up prep. Suggestions feed the corrective actions on alerts.

use serde::{Deserialize, Serialize};

use crate::forecast::provider::ForecastTable;
use crate::scenario::perturb::StandActual;

/// Item drift above which a stand-item counts as overloaded
const OVERLOAD_THRESHOLD: f64 = 0.30;
/// Item drift below which an alternative stand counts as having capacity
const UNDERLOAD_THRESHOLD: f64 = 0.15;

/// A concrete "send the line over there" recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedistributionSuggestion {
    pub from_stand: String,
    pub to_stand: String,
    pub item: String,
    /// Spare units at the receiving stand this window
    pub capacity: f64,
}

/// Find the best redistribution for one overloaded stand this window.
///
/// Picks the stand's most-over item, then the alternative stand selling the
/// same item with the most spare capacity. Returns None when nothing is
/// materially over or no alternative has room.
pub fn suggest_for_stand(
    table: &ForecastTable,
    window: usize,
    actuals: &[StandActual],
    stand: usize,
    min_qty: f64,
) -> Option<RedistributionSuggestion> {
    let observation = actuals.get(stand)?;

    // Most-over item at the hot stand.
    let mut worst: Option<(&str, f64)> = None;
    for item in &observation.by_item {
        let forecast: f64 = table
            .items(stand, window)
            .iter()
            .filter(|f| f.item == item.item)
            .map(|f| f.forecast_qty)
            .sum();
        if forecast <= 0.0 || item.qty < min_qty {
            continue;
        }
        let drift = (item.qty - forecast) / forecast;
        if drift > OVERLOAD_THRESHOLD && worst.map_or(true, |(_, d)| drift > d) {
            worst = Some((item.item.as_str(), drift));
        }
    }
    let (item_name, _) = worst?;

    // Alternative stand with the most spare capacity for that item.
    let mut best: Option<RedistributionSuggestion> = None;
    for (alt, alt_actual) in actuals.iter().enumerate() {
        if alt == stand {
            continue;
        }
        let alt_forecast: f64 = table
            .items(alt, window)
            .iter()
            .filter(|f| f.item == item_name)
            .map(|f| f.forecast_qty)
            .sum();
        if alt_forecast <= 0.0 {
            continue;
        }
        let alt_sold: f64 = alt_actual
            .by_item
            .iter()
            .filter(|i| i.item == item_name)
            .map(|i| i.qty)
            .sum();
        let alt_drift = (alt_sold - alt_forecast) / alt_forecast;
        if alt_drift >= UNDERLOAD_THRESHOLD {
            continue;
        }
        let capacity = alt_forecast - alt_sold;
        if capacity <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |b| capacity > b.capacity) {
            best = Some(RedistributionSuggestion {
                from_stand: table.stands[stand].clone(),
                to_stand: table.stands[alt].clone(),
                item: item_name.to_string(),
                capacity,
            });
        }
    }
    best
}
