//! Scenario perturbation engine
//!
//! Turns the baseline forecast into a synthetic ground-truth sales stream:
//! `actual = forecast x scenario_multiplier x noise`, with injected
//! overrides layered on top. Noise is seeded per (game, stand, window) so
//! repeated replays of the same scenario are identical.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::types::Category;
use crate::forecast::provider::ForecastTable;
use crate::scenario::{Override, OverrideKind, Scenario};

/// Observed sales for one item at one stand in one window
#[derive(Debug, Clone, PartialEq)]
pub struct ItemActual {
    pub item: String,
    pub category: Category,
    pub qty: f64,
}

/// Observed sales for one stand in one window, with item breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct StandActual {
    /// Stand position in the forecast table's fixed order
    pub stand: usize,
    pub window: usize,
    pub qty: f64,
    pub by_item: Vec<ItemActual>,
}

/// Deterministic actual-sales generator for one session
#[derive(Debug)]
pub struct PerturbationEngine {
    scenario: Scenario,
    game_seed: u64,
    noise_amplitude: f64,
}

impl PerturbationEngine {
    pub fn new(scenario: Scenario, game_seed: u64, noise_amplitude: f64) -> Self {
        Self {
            scenario,
            game_seed,
            noise_amplitude,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Overrides owned by the scenario itself (the `Custom` variant).
    pub fn scenario_overrides(&self) -> &[Override] {
        match &self.scenario {
            Scenario::Custom { overrides } => overrides,
            _ => &[],
        }
    }

    /// Generate the actuals for every stand in one window.
    ///
    /// `overrides` are the currently active injected overrides; scenario
    /// overrides are handled internally. Output order follows the table's
    /// stand order.
    pub fn actuals_for_window(
        &self,
        table: &ForecastTable,
        window: usize,
        overrides: &[Override],
    ) -> Vec<StandActual> {
        let offset_min = table
            .axis
            .window(window)
            .map(|w| w.offset_min)
            .unwrap_or(i32::MAX);

        let mut actuals: Vec<StandActual> = (0..table.stands.len())
            .map(|stand| self.base_actual(table, stand, window, offset_min))
            .collect();

        self.apply_redistribution(table, offset_min, &mut actuals);

        for o in self.scenario_overrides().iter().chain(overrides) {
            if o.is_active(window) {
                apply_override(table, &o.kind, &mut actuals);
            }
        }

        for actual in &mut actuals {
            actual.qty = actual.by_item.iter().map(|i| i.qty).sum();
        }
        actuals
    }

    /// Forecast x scenario item multipliers x seeded noise for one stand.
    fn base_actual(
        &self,
        table: &ForecastTable,
        stand: usize,
        window: usize,
        offset_min: i32,
    ) -> StandActual {
        let mut rng = ChaCha8Rng::seed_from_u64(window_seed(self.game_seed, stand, window));

        let by_item = table
            .items(stand, window)
            .iter()
            .map(|fc| {
                let mult = self.item_multiplier(&fc.item, fc.category, offset_min);
                let noise = if self.noise_amplitude > 0.0 {
                    1.0 + rng.gen_range(-self.noise_amplitude..=self.noise_amplitude)
                } else {
                    1.0
                };
                ItemActual {
                    item: fc.item.clone(),
                    category: fc.category,
                    qty: (fc.forecast_qty * mult * noise).max(0.0),
                }
            })
            .collect::<Vec<_>>();

        let qty = by_item.iter().map(|i| i.qty).sum();
        StandActual {
            stand,
            window,
            qty,
            by_item,
        }
    }

    fn item_multiplier(&self, item: &str, category: Category, offset_min: i32) -> f64 {
        match &self.scenario {
            Scenario::Normal | Scenario::StandRedistribution { .. } | Scenario::Custom { .. } => {
                1.0
            }
            Scenario::UntaggedPromo {
                item: promo_item,
                factor,
                from_offset_min,
            } => {
                if item == promo_item && offset_min >= *from_offset_min {
                    *factor
                } else {
                    1.0
                }
            }
            Scenario::WeatherSurprise { beer_factor } => {
                if category == Category::Beer {
                    *beer_factor
                } else if item == "Hot Drinks" {
                    1.0 / beer_factor
                } else {
                    1.0
                }
            }
            Scenario::Playoff { uplift } => *uplift,
        }
    }

    /// Shift a share of the donor stand's volume to the recipient once the
    /// redistribution scenario activates.
    fn apply_redistribution(
        &self,
        table: &ForecastTable,
        offset_min: i32,
        actuals: &mut [StandActual],
    ) {
        let Scenario::StandRedistribution {
            from_stand,
            to_stand,
            share,
            from_offset_min,
        } = &self.scenario
        else {
            return;
        };
        if offset_min < *from_offset_min {
            return;
        }
        let (Some(from_idx), Some(to_idx)) =
            (table.stand_index(from_stand), table.stand_index(to_stand))
        else {
            return;
        };

        let moved = actuals[from_idx].qty * share;
        if moved <= 0.0 {
            return;
        }

        // Donor loses the share evenly across its menu.
        for item in &mut actuals[from_idx].by_item {
            item.qty *= 1.0 - share;
        }
        actuals[from_idx].qty *= 1.0 - share;

        // Recipient absorbs it in proportion to its own mix.
        let recipient_total = actuals[to_idx].qty;
        if recipient_total > 0.0 {
            for item in &mut actuals[to_idx].by_item {
                item.qty += moved * (item.qty / recipient_total);
            }
        } else if let Some(first) = actuals[to_idx].by_item.first_mut() {
            first.qty += moved;
        }
        actuals[to_idx].qty += moved;
    }
}

fn apply_override(table: &ForecastTable, kind: &OverrideKind, actuals: &mut [StandActual]) {
    match kind {
        OverrideKind::GlobalVolume { factor } => {
            for actual in actuals.iter_mut() {
                for item in &mut actual.by_item {
                    item.qty *= factor;
                }
            }
        }
        OverrideKind::DemandSpike { stand, factor } => {
            if let Some(idx) = table.stand_index(stand) {
                for item in &mut actuals[idx].by_item {
                    item.qty *= factor;
                }
            }
        }
        OverrideKind::StandOutage { stand } => {
            if let Some(idx) = table.stand_index(stand) {
                for item in &mut actuals[idx].by_item {
                    item.qty = 0.0;
                }
            }
        }
    }
}

/// Mix (game, stand, window) into a noise-stream seed.
fn window_seed(game_seed: u64, stand: usize, window: usize) -> u64 {
    game_seed
        ^ (stand as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (window as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03)
}
