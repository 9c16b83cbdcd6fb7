//! Deterministic rule-based drift classification
//!
//! The fallback behind the remote classifier, and the only classifier when
//! a session runs with skip_ai. Maps drift-shape heuristics onto the same
//! output shape the remote produces.

use crate::forecast::prep::tier_for_item;
use crate::reasoning::{ActionKind, Cause, Classification, CorrectiveAction, DriftBrief};

/// Drift magnitude treated as within normal variance
const NOISE_BAND: f64 = 0.15;
/// Volume drift below which a stand reads as offline
const OUTAGE_FLOOR: f64 = -0.90;
/// Mix drift above which the category shape itself is the story
const MIX_SHIFT: f64 = 0.25;

#[derive(Debug, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, brief: &DriftBrief) -> Classification {
        let vol = brief.volume_drift;

        // Near-zero sales against a live forecast: the stand is down.
        if vol <= OUTAGE_FLOOR {
            let actions = redistribute_or_hold(brief);
            return Classification {
                cause: Cause::StandOutage,
                confidence: 0.9,
                alert_text: format!(
                    "{} is selling almost nothing against forecast at {}. Likely offline; \
                     redirect its line and check the stand.",
                    brief.stand, brief.window_label
                ),
                actions,
            };
        }

        // Losers and gainers at the same time: demand is moving between stands.
        if brief.stands_under >= 1 && brief.stands_over >= 1 {
            let actions = redistribute_or_hold(brief);
            return Classification {
                cause: Cause::Redistribution,
                confidence: 0.7,
                alert_text: format!(
                    "Demand is shifting between stands ({} over, {} under forecast). \
                     Rebalance staff rather than scaling prep.",
                    brief.stands_over, brief.stands_under
                ),
                actions,
            };
        }

        // Small drift on every axis: normal variance, no action.
        if vol.abs() < NOISE_BAND && brief.cumulative_drift.abs() < NOISE_BAND {
            return Classification {
                cause: Cause::Noise,
                confidence: 0.8,
                alert_text: "Drift within normal variance. No action needed.".into(),
                actions: vec![hold(brief)],
            };
        }

        // The category shape moved more than the volume did: weather story.
        if brief.mix_drift.map_or(false, |m| m >= MIX_SHIFT) && vol.abs() < 0.30 {
            return Classification {
                cause: Cause::Weather,
                confidence: 0.6,
                alert_text: format!(
                    "Category mix at {} has moved off forecast while volume holds. \
                     Consistent with weather shifting the beer / hot-drink split.",
                    brief.stand
                ),
                actions: vec![increase_prep(brief)],
            };
        }

        // A sudden single-stand surge nobody scheduled reads as a promo.
        if vol > 0.30 && brief.stands_over <= 1 && brief.active_overrides.is_empty() {
            return Classification {
                cause: Cause::UntaggedPromo,
                confidence: 0.65,
                alert_text: format!(
                    "{} is running {:+.0}% over forecast with no scheduled cause. \
                     Looks like an untagged promotion; scale up prep now.",
                    brief.stand,
                    vol * 100.0
                ),
                actions: vec![increase_prep(brief)],
            };
        }

        // Something real is happening but no heuristic owns it.
        let action = if vol > 0.0 {
            increase_prep(brief)
        } else {
            decrease_prep(brief)
        };
        Classification {
            cause: Cause::Unknown,
            confidence: 0.4,
            alert_text: format!(
                "{} is {:+.0}% vs forecast at {} (cumulative {:+.0}%). \
                 Cause unclear; adjust prep and watch the next windows.",
                brief.stand,
                vol * 100.0,
                brief.window_label,
                brief.cumulative_drift * 100.0
            ),
            actions: vec![action],
        }
    }
}

/// Prep scale-up sized by the perishability tier of the stand's top item.
fn increase_prep(brief: &DriftBrief) -> CorrectiveAction {
    let (item, pct) = tier_step(brief);
    CorrectiveAction {
        stand: brief.stand.clone(),
        action: ActionKind::IncreasePrep,
        item,
        quantity_change_pct: pct,
    }
}

fn decrease_prep(brief: &DriftBrief) -> CorrectiveAction {
    let (item, pct) = tier_step(brief);
    CorrectiveAction {
        stand: brief.stand.clone(),
        action: ActionKind::DecreasePrep,
        item,
        quantity_change_pct: -pct,
    }
}

fn hold(brief: &DriftBrief) -> CorrectiveAction {
    CorrectiveAction {
        stand: brief.stand.clone(),
        action: ActionKind::Hold,
        item: None,
        quantity_change_pct: 0,
    }
}

fn redistribute_or_hold(brief: &DriftBrief) -> Vec<CorrectiveAction> {
    match &brief.suggestion {
        Some(s) => vec![CorrectiveAction {
            stand: s.to_stand.clone(),
            action: ActionKind::Redistribute,
            item: Some(s.item.clone()),
            quantity_change_pct: 0,
        }],
        None => vec![hold(brief)],
    }
}

fn tier_step(brief: &DriftBrief) -> (Option<String>, i32) {
    match &brief.top_item {
        Some(item) => {
            let pct = (tier_for_item(item).scaleup_increment() * 100.0).round() as i32;
            (Some(item.clone()), pct)
        }
        None => (None, 15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Archetype, Status, Trend};
    use crate::drift::detector::DriftDimension;

    fn brief(volume: f64) -> DriftBrief {
        DriftBrief {
            stand: "Fan Deck Grill".into(),
            window: 6,
            window_label: "INT1 T+30".into(),
            volume_drift: volume,
            mix_drift: Some(0.05),
            timing_drift: 0.02,
            cumulative_drift: volume * 0.8,
            dominant: DriftDimension::Volume,
            trend: Trend::Worsening,
            prev_status: Status::Green,
            status: Status::Red,
            stands_over: if volume > 0.2 { 1 } else { 0 },
            stands_under: 0,
            active_overrides: Vec::new(),
            recent_cumulative: vec![0.0, 0.1],
            top_item: Some("Draught Beer".into()),
            suggestion: None,
            opponent: "Seattle".into(),
            attendance: 4000,
            archetype: Archetype::Mixed,
        }
    }

    #[test]
    fn test_near_zero_actual_is_outage() {
        let result = RuleClassifier::new().classify(&brief(-0.97));
        assert_eq!(result.cause, Cause::StandOutage);
        assert!(result.confidence >= 0.8);
    }

    #[test]
    fn test_single_stand_surge_is_untagged_promo() {
        let result = RuleClassifier::new().classify(&brief(0.8));
        assert_eq!(result.cause, Cause::UntaggedPromo);
        assert_eq!(result.actions[0].action, ActionKind::IncreasePrep);
        // Draught beer is medium hold: 15% steps
        assert_eq!(result.actions[0].quantity_change_pct, 15);
    }

    #[test]
    fn test_surge_with_known_override_is_not_promo() {
        let mut b = brief(0.8);
        b.active_overrides = vec!["demand_spike Fan Deck Grill x2.0".into()];
        let result = RuleClassifier::new().classify(&b);
        assert_ne!(result.cause, Cause::UntaggedPromo);
    }

    #[test]
    fn test_small_drift_is_noise() {
        let mut b = brief(0.08);
        b.cumulative_drift = 0.05;
        let result = RuleClassifier::new().classify(&b);
        assert_eq!(result.cause, Cause::Noise);
        assert_eq!(result.actions[0].action, ActionKind::Hold);
    }

    #[test]
    fn test_winners_and_losers_is_redistribution() {
        let mut b = brief(0.4);
        b.stands_over = 1;
        b.stands_under = 1;
        let result = RuleClassifier::new().classify(&b);
        assert_eq!(result.cause, Cause::Redistribution);
    }

    #[test]
    fn test_mix_shift_is_weather() {
        let mut b = brief(0.2);
        b.mix_drift = Some(0.35);
        b.cumulative_drift = 0.2;
        let result = RuleClassifier::new().classify(&b);
        assert_eq!(result.cause, Cause::Weather);
    }

    #[test]
    fn test_shortfall_gets_decrease_prep() {
        let mut b = brief(-0.45);
        b.cumulative_drift = -0.4;
        let result = RuleClassifier::new().classify(&b);
        assert_eq!(result.cause, Cause::Unknown);
        assert_eq!(result.actions[0].action, ActionKind::DecreasePrep);
        assert!(result.actions[0].quantity_change_pct < 0);
    }

    #[test]
    fn test_outage_uses_suggestion_when_present() {
        let mut b = brief(-0.95);
        b.suggestion = Some(crate::drift::redistribute::RedistributionSuggestion {
            from_stand: "Fan Deck Grill".into(),
            to_stand: "Main Canteen".into(),
            item: "Draught Beer".into(),
            capacity: 40.0,
        });
        let result = RuleClassifier::new().classify(&b);
        assert_eq!(result.actions[0].action, ActionKind::Redistribute);
        assert_eq!(result.actions[0].stand, "Main Canteen");
    }
}
