//! Structural pattern recognition
//!
//! Patterns combine detector output with the latest close into named,
//! scored setups with suggested actions. Recognition is rule-based over the
//! level set and zone list.

use crate::detectors::consolidation::ConsolidationZone;
use crate::detectors::levels::LevelSet;
use crate::{Breakout, Confidence, Direction};

/// Relative distance within which price counts as interacting with a level,
/// measured against the level price.
const LEVEL_PROXIMITY: f64 = 0.02;

/// A recognized structural setup.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pattern {
    pub name: String,
    pub signal: Direction,
    pub confidence: Confidence,
    /// 0.0..=1.0
    pub score: f64,
    pub description: String,
    /// Suggested course of action
    pub action: String,
    /// Concrete trade-management rules
    pub rules: Vec<String>,
}

#[inline]
fn confidence_from_strength(strength: f64) -> Confidence {
    if strength > 2.0 {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

fn support_bounce(levels: &LevelSet, close: f64) -> Option<Pattern> {
    let level = levels.nearest_support(close)?;
    if (close - level.price).abs() / level.price >= LEVEL_PROXIMITY {
        return None;
    }
    Some(Pattern {
        name: "Support Bounce".to_string(),
        signal: Direction::Bullish,
        confidence: confidence_from_strength(level.strength),
        score: level.strength / 3.0,
        description: format!("Price bouncing off support at {:.2}", level.price),
        action: "Buy with tight stop loss".to_string(),
        rules: vec![
            format!("Stop loss below {:.2}", level.price * 0.98),
            "Target: next resistance level".to_string(),
        ],
    })
}

fn resistance_test(levels: &LevelSet, close: f64) -> Option<Pattern> {
    let level = levels.nearest_resistance(close)?;
    if (close - level.price).abs() / level.price >= LEVEL_PROXIMITY {
        return None;
    }
    Some(Pattern {
        name: "Resistance Test".to_string(),
        signal: Direction::Bearish,
        confidence: confidence_from_strength(level.strength),
        score: level.strength / 3.0,
        description: format!("Price testing resistance at {:.2}", level.price),
        action: "Sell or wait for breakout".to_string(),
        rules: vec![
            format!("Breakout above {:.2} would be bullish", level.price * 1.02),
            "Rejection here would confirm resistance".to_string(),
        ],
    })
}

fn range_bound(zones: &[ConsolidationZone]) -> Option<Pattern> {
    let zone = zones.last()?;
    if zone.breakout != Breakout::Consolidating {
        return None;
    }
    Some(Pattern {
        name: "Range Bound".to_string(),
        signal: Direction::Neutral,
        confidence: Confidence::Medium,
        score: 0.7,
        description: format!(
            "Price trading in range {:.2} - {:.2}",
            zone.support, zone.resistance
        ),
        action: "Trade the range or wait for breakout".to_string(),
        rules: vec![
            format!("Buy near support at {:.2}", zone.support),
            format!("Sell near resistance at {:.2}", zone.resistance),
            "Stop loss outside the range".to_string(),
        ],
    })
}

/// Recognize patterns from the level set, zone list and latest close.
///
/// Patterns are reported in a fixed order: support bounce, resistance test,
/// range bound. Any subset may fire, including none.
pub fn recognize(levels: &LevelSet, zones: &[ConsolidationZone], close: f64) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    if close.abs() <= f64::EPSILON {
        return patterns;
    }
    patterns.extend(support_bounce(levels, close));
    patterns.extend(resistance_test(levels, close));
    patterns.extend(range_bound(zones));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::levels::Level;
    use crate::LevelKind;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn level(price: f64, strength: f64, kind: LevelKind) -> Level {
        Level {
            price,
            touches: 2,
            strength,
            kind,
        }
    }

    fn levels_with(support: Vec<Level>, resistance: Vec<Level>) -> LevelSet {
        LevelSet {
            support,
            resistance,
        }
    }

    fn zone(breakout: Breakout) -> ConsolidationZone {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ConsolidationZone {
            start_date: day,
            end_date: day + chrono::Duration::days(12),
            support: 98.0,
            resistance: 102.0,
            range_pct: 0.0408,
            duration_days: 12,
            avg_volume: 1000.0,
            breakout,
        }
    }

    #[test]
    fn test_support_bounce_fires_near_level() {
        let levels = levels_with(vec![level(99.0, 1.5, LevelKind::Support)], vec![]);
        let patterns = recognize(&levels, &[], 100.0);

        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.name, "Support Bounce");
        assert_eq!(p.signal, Direction::Bullish);
        assert_eq!(p.confidence, Confidence::Medium);
        assert_relative_eq!(p.score, 0.5);
        assert_eq!(p.description, "Price bouncing off support at 99.00");
        assert_eq!(p.rules[0], "Stop loss below 97.02");
    }

    #[test]
    fn test_support_bounce_strong_level_high_confidence() {
        let levels = levels_with(vec![level(99.0, 2.5, LevelKind::Support)], vec![]);
        let patterns = recognize(&levels, &[], 100.0);
        assert_eq!(patterns[0].confidence, Confidence::High);
    }

    #[test]
    fn test_proximity_measured_against_level_price() {
        // 2 points from a 100 support is exactly 2% of the level and does
        // not fire, even though it is under 2% of the 102 close
        let levels = levels_with(vec![level(100.0, 1.5, LevelKind::Support)], vec![]);
        assert!(recognize(&levels, &[], 102.0).is_empty());

        // 1.96 points from a 100 resistance is 1.96% of the level and
        // fires, even though it is 2% of the 98.04 close
        let levels = levels_with(vec![], vec![level(100.0, 1.5, LevelKind::Resistance)]);
        let patterns = recognize(&levels, &[], 98.04);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].name, "Resistance Test");
    }

    #[test]
    fn test_distant_levels_fire_nothing() {
        let levels = levels_with(
            vec![level(90.0, 3.0, LevelKind::Support)],
            vec![level(110.0, 3.0, LevelKind::Resistance)],
        );
        assert!(recognize(&levels, &[], 100.0).is_empty());
    }

    #[test]
    fn test_resistance_test_fires_near_level() {
        let levels = levels_with(vec![], vec![level(101.0, 2.5, LevelKind::Resistance)]);
        let patterns = recognize(&levels, &[], 100.0);

        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.name, "Resistance Test");
        assert_eq!(p.signal, Direction::Bearish);
        assert_eq!(p.confidence, Confidence::High);
        assert_eq!(p.rules[0], "Breakout above 103.02 would be bullish");
    }

    #[test]
    fn test_range_bound_needs_consolidating_last_zone() {
        let patterns = recognize(&LevelSet::default(), &[zone(Breakout::Consolidating)], 100.0);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].name, "Range Bound");
        assert_eq!(patterns[0].signal, Direction::Neutral);
        assert_relative_eq!(patterns[0].score, 0.7);

        // A resolved last zone is not a range
        let patterns = recognize(&LevelSet::default(), &[zone(Breakout::Bullish)], 100.0);
        assert!(patterns.is_empty());

        // Only the most recent zone counts
        let zones = [zone(Breakout::Consolidating), zone(Breakout::Bullish)];
        assert!(recognize(&LevelSet::default(), &zones, 100.0).is_empty());
    }

    #[test]
    fn test_multiple_patterns_in_order() {
        let levels = levels_with(
            vec![level(99.0, 1.5, LevelKind::Support)],
            vec![level(101.0, 1.5, LevelKind::Resistance)],
        );
        let patterns = recognize(&levels, &[zone(Breakout::Consolidating)], 100.0);
        let names: Vec<&str> = patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Support Bounce", "Resistance Test", "Range Bound"]);
    }

    #[test]
    fn test_zero_close_fires_nothing() {
        let levels = levels_with(vec![level(0.0, 3.0, LevelKind::Support)], vec![]);
        assert!(recognize(&levels, &[], 0.0).is_empty());
    }
}
