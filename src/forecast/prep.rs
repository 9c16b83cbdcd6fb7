//! Perishability tiers and the pre-game prep plan
//!
//! Prep deliberately underpredicts: being short means slower service
//! (recoverable), being over means thrown-out food. Each tier prep-targets
//! a fraction of forecast and scales up in tier-sized increments when the
//! drift engine signals demand exceeding prep.

use serde::{Deserialize, Serialize};

use crate::forecast::provider::ForecastTable;

/// How aggressively an item's prep is shaded below forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerishabilityTier {
    /// Pre-stage well before doors; restocking is the only cost
    ShelfStable,
    /// Batch before doors, refresh at intermissions
    MediumHold,
    /// Continuous cook with stop-prep signals
    ShortLife,
}

impl PerishabilityTier {
    /// Fraction of forecast to actually prep
    pub fn prep_fraction(&self) -> f64 {
        match self {
            PerishabilityTier::ShelfStable => 0.95,
            PerishabilityTier::MediumHold => 0.85,
            PerishabilityTier::ShortLife => 0.75,
        }
    }

    /// Scale-up step when actuals exceed the prep target
    pub fn scaleup_increment(&self) -> f64 {
        match self {
            PerishabilityTier::ShelfStable => 0.10,
            PerishabilityTier::MediumHold => 0.15,
            PerishabilityTier::ShortLife => 0.20,
        }
    }
}

/// Tier lookup by item name. Unknown items default to medium hold.
pub fn tier_for_item(item: &str) -> PerishabilityTier {
    match item {
        "Candy" | "Fountain Pop" | "Cans of Beer" | "Cider & Coolers" | "Water" => {
            PerishabilityTier::ShelfStable
        }
        "Popcorn" | "Hot Dog" | "Pretzel" | "Hot Drinks" | "Draught Beer" => {
            PerishabilityTier::MediumHold
        }
        "Fries" | "Tacos" | "Pizza Slice" | "Burgers" => PerishabilityTier::ShortLife,
        _ => PerishabilityTier::MediumHold,
    }
}

/// One prep instruction for the stands crew
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepAction {
    pub stand: String,
    pub item: String,
    pub tier: PerishabilityTier,
    /// Whole-game forecast for this stand-item
    pub forecast_qty: f64,
    /// Quantity to actually prep (forecast shaded by tier)
    pub prep_qty: f64,
}

/// Build the pre-game prep plan from the baseline forecast.
///
/// One action per stand-item, ordered by stand then menu position, so the
/// plan prints in walk-the-venue order.
pub fn generate_prep_plan(table: &ForecastTable) -> Vec<PrepAction> {
    let mut plan = Vec::new();
    for (stand_idx, stand) in table.stands.iter().enumerate() {
        // Aggregate each item across all windows, preserving menu order.
        let mut items: Vec<(String, f64)> = Vec::new();
        for window in 0..table.axis.len() {
            for item in table.items(stand_idx, window) {
                match items.iter_mut().find(|(name, _)| name == &item.item) {
                    Some((_, qty)) => *qty += item.forecast_qty,
                    None => items.push((item.item.clone(), item.forecast_qty)),
                }
            }
        }
        for (item, forecast_qty) in items {
            let tier = tier_for_item(&item);
            plan.push(PrepAction {
                stand: stand.clone(),
                item,
                tier,
                forecast_qty,
                prep_qty: forecast_qty * tier.prep_fraction(),
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Archetype, DayOfWeek, Game, GameId, WindowAxis};
    use crate::forecast::provider::{BaselineForecastProvider, ForecastProvider};

    fn demo_table() -> ForecastTable {
        let game = Game {
            id: GameId::new(),
            opponent: "Seattle".into(),
            date: "2026-02-06".into(),
            day_of_week: DayOfWeek::Fri,
            puck_drop_hour: 19,
            attendance: 4000,
            archetype: Archetype::Mixed,
            is_playoff: false,
            temp_mean_c: 8.0,
            outcome: None,
        };
        BaselineForecastProvider::new()
            .get_forecast(&game, WindowAxis::default())
            .unwrap()
    }

    #[test]
    fn test_prep_always_below_forecast() {
        for action in generate_prep_plan(&demo_table()) {
            assert!(
                action.prep_qty < action.forecast_qty,
                "{} {} prepped at or above forecast",
                action.stand,
                action.item
            );
        }
    }

    #[test]
    fn test_short_life_shaded_hardest() {
        let plan = generate_prep_plan(&demo_table());
        let fries = plan
            .iter()
            .find(|a| a.item == "Fries")
            .expect("fries in plan");
        let candy = plan
            .iter()
            .find(|a| a.item == "Candy")
            .expect("candy in plan");
        assert!(
            fries.prep_qty / fries.forecast_qty < candy.prep_qty / candy.forecast_qty
        );
    }

    #[test]
    fn test_one_action_per_stand_item() {
        let table = demo_table();
        let plan = generate_prep_plan(&table);
        let mut seen = std::collections::HashSet::new();
        for action in &plan {
            assert!(
                seen.insert((action.stand.clone(), action.item.clone())),
                "duplicate action for {} {}",
                action.stand,
                action.item
            );
        }
    }
}
