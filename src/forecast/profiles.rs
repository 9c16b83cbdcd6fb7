//! Built-in baseline demand profiles
//!
//! Stands in for the historical profile builder: per-archetype demand
//! curves distilled from past seasons, expressed as venue shares and
//! window weights rather than raw transaction history. The forecast
//! provider scales these by attendance and game context.

use crate::core::types::{Archetype, Category, DayOfWeek, GamePhase};

/// One item sold at a stand, with its share of that stand's volume
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub item: &'static str,
    pub category: Category,
    /// Fraction of the stand's volume this item accounts for (mixed crowd)
    pub share: f64,
}

/// A concession stand and its menu
#[derive(Debug, Clone)]
pub struct StandProfile {
    pub name: &'static str,
    /// Fraction of venue volume this stand carries (mixed crowd)
    pub venue_share: f64,
    pub menu: Vec<MenuItem>,
}

/// Units sold per attendee over a whole game, by archetype.
///
/// Beer crowds transact more per head; family crowds less, and their
/// basket skews to food and sweets.
pub fn units_per_attendee(archetype: Archetype) -> f64 {
    match archetype {
        Archetype::BeerCrowd => 1.8,
        Archetype::Mixed => 1.5,
        Archetype::Family => 1.3,
    }
}

/// Fraction of a game's total volume sold in each phase.
///
/// Demand peaks pre-game and during intermissions; play itself is quiet.
pub fn phase_weight(phase: GamePhase, archetype: Archetype) -> f64 {
    let base = match phase {
        GamePhase::PreGame => 0.22,
        GamePhase::P1 => 0.13,
        GamePhase::Int1 => 0.20,
        GamePhase::P2 => 0.11,
        GamePhase::Int2 => 0.18,
        GamePhase::P3 => 0.10,
        GamePhase::PostGame => 0.06,
    };
    // Beer crowds surge harder at the breaks, family crowds front-load.
    match archetype {
        Archetype::BeerCrowd => match phase {
            GamePhase::Int1 | GamePhase::Int2 => base * 1.10,
            GamePhase::PreGame => base * 0.92,
            _ => base,
        },
        Archetype::Family => match phase {
            GamePhase::PreGame => base * 1.12,
            GamePhase::P3 | GamePhase::PostGame => base * 0.85,
            _ => base,
        },
        Archetype::Mixed => base,
    }
}

/// Multiplier applied to an item's stand share for a given archetype.
///
/// Beer crowds roughly double alcohol share; family crowds halve it and
/// lean into food and sweets.
pub fn category_bias(category: Category, archetype: Archetype) -> f64 {
    match archetype {
        Archetype::BeerCrowd => {
            if category.is_alcohol() {
                1.35
            } else {
                0.85
            }
        }
        Archetype::Family => match category {
            c if c.is_alcohol() => 0.55,
            Category::Sweets | Category::Snacks => 1.30,
            Category::NaBev => 1.20,
            _ => 1.0,
        },
        Archetype::Mixed => 1.0,
    }
}

/// The venue's stand roster with mixed-crowd shares.
pub fn venue_stands() -> Vec<StandProfile> {
    vec![
        StandProfile {
            name: "Main Canteen",
            venue_share: 0.34,
            menu: vec![
                MenuItem { item: "Draught Beer", category: Category::Beer, share: 0.26 },
                MenuItem { item: "Hot Dog", category: Category::Food, share: 0.22 },
                MenuItem { item: "Popcorn", category: Category::Snacks, share: 0.18 },
                MenuItem { item: "Fountain Pop", category: Category::NaBev, share: 0.20 },
                MenuItem { item: "Candy", category: Category::Sweets, share: 0.14 },
            ],
        },
        StandProfile {
            name: "Fan Deck Grill",
            venue_share: 0.22,
            menu: vec![
                MenuItem { item: "Draught Beer", category: Category::Beer, share: 0.38 },
                MenuItem { item: "Burgers", category: Category::Food, share: 0.28 },
                MenuItem { item: "Fries", category: Category::Food, share: 0.22 },
                MenuItem { item: "Cider & Coolers", category: Category::WineCider, share: 0.12 },
            ],
        },
        StandProfile {
            name: "Taco Trio",
            venue_share: 0.16,
            menu: vec![
                MenuItem { item: "Tacos", category: Category::Food, share: 0.52 },
                MenuItem { item: "Cans of Beer", category: Category::Beer, share: 0.26 },
                MenuItem { item: "Fountain Pop", category: Category::NaBev, share: 0.22 },
            ],
        },
        StandProfile {
            name: "Portable Carts",
            venue_share: 0.13,
            menu: vec![
                MenuItem { item: "Cans of Beer", category: Category::Beer, share: 0.40 },
                MenuItem { item: "Hot Drinks", category: Category::NaBev, share: 0.25 },
                MenuItem { item: "Pretzel", category: Category::Snacks, share: 0.20 },
                MenuItem { item: "Candy", category: Category::Sweets, share: 0.15 },
            ],
        },
        StandProfile {
            name: "Slice Shop",
            venue_share: 0.15,
            menu: vec![
                MenuItem { item: "Pizza Slice", category: Category::Food, share: 0.58 },
                MenuItem { item: "Fountain Pop", category: Category::NaBev, share: 0.24 },
                MenuItem { item: "Cans of Beer", category: Category::Beer, share: 0.18 },
            ],
        },
    ]
}

/// Derive the expected crowd archetype from game inputs.
///
/// Playoffs and high-attendance weekend nights skew beer; matinees and
/// cold weekend days skew family; everything else is mixed.
pub fn derive_archetype(
    attendance: u32,
    puck_drop_hour: u8,
    is_playoff: bool,
    temp_mean_c: f32,
    day_of_week: DayOfWeek,
) -> Archetype {
    if is_playoff {
        return Archetype::BeerCrowd;
    }
    if attendance >= 3500 && puck_drop_hour >= 19 && day_of_week.is_weekend_night() {
        return Archetype::BeerCrowd;
    }
    if puck_drop_hour < 17 {
        return Archetype::Family;
    }
    if temp_mean_c < 3.0 && matches!(day_of_week, DayOfWeek::Sat | DayOfWeek::Sun) {
        return Archetype::Family;
    }
    Archetype::Mixed
}
