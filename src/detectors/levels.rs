//! Support/resistance detection: pivot extraction and level merging
//!
//! Pipeline: local extrema over a symmetric bar window become pivot
//! candidates; nearby candidates fold into merged levels; each level's touch
//! count is then recounted from scratch against the raw low/high series and
//! weak levels are dropped.

use chrono::NaiveDate;

use crate::detectors::helpers::relative_gap;
use crate::params::{AnalysisParams, RECOUNT_TOLERANCE};
use crate::{LevelKind, Ohlcv, Percent};

/// Fewest bars support/resistance detection will work with.
const MIN_BARS: usize = 20;
/// Result sets are capped at this many levels per side.
const MAX_LEVELS: usize = 5;

/// A raw local extremum, before merging.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PivotCandidate {
    pub date: NaiveDate,
    pub price: f64,
}

/// A merged support or resistance level.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Level {
    pub price: f64,
    pub touches: u32,
    /// 0.0..=3.0, derived from the recounted touches
    pub strength: f64,
    pub kind: LevelKind,
}

/// Support and resistance levels for one window, each sorted by strength
/// descending and capped at five entries.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelSet {
    pub support: Vec<Level>,
    pub resistance: Vec<Level>,
}

impl LevelSet {
    /// Support level closest to `price`.
    pub fn nearest_support(&self, price: f64) -> Option<&Level> {
        nearest(&self.support, price)
    }

    /// Resistance level closest to `price`.
    pub fn nearest_resistance(&self, price: f64) -> Option<&Level> {
        nearest(&self.resistance, price)
    }
}

fn nearest(levels: &[Level], price: f64) -> Option<&Level> {
    levels.iter().min_by(|a, b| {
        let da = (a.price - price).abs();
        let db = (b.price - price).abs();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Find pivot lows and highs over a symmetric window of `window` bars on
/// each side.
///
/// Index `i` is a pivot low when its low equals the minimum low over
/// `[i - window, i + window]`; pivot highs are symmetric on highs. Plateaus
/// can yield adjacent duplicate candidates; merging dedups them later.
/// Boundary bars without a full window are never candidates.
pub fn extract_pivots<T: Ohlcv>(bars: &[T], window: usize) -> (Vec<PivotCandidate>, Vec<PivotCandidate>) {
    let mut lows = Vec::new();
    let mut highs = Vec::new();
    if bars.len() < 2 * window + 1 {
        return (lows, highs);
    }

    for i in window..bars.len() - window {
        let neighborhood = &bars[i - window..=i + window];

        let min_low = neighborhood
            .iter()
            .map(|b| b.low())
            .fold(f64::INFINITY, f64::min);
        if bars[i].low() == min_low {
            lows.push(PivotCandidate {
                date: bars[i].date(),
                price: bars[i].low(),
            });
        }

        let max_high = neighborhood
            .iter()
            .map(|b| b.high())
            .fold(f64::NEG_INFINITY, f64::max);
        if bars[i].high() == max_high {
            highs.push(PivotCandidate {
                date: bars[i].date(),
                price: bars[i].high(),
            });
        }
    }

    (lows, highs)
}

/// Fold price-sorted candidates into merged levels.
///
/// A candidate joins the last accumulated level when its relative gap is
/// within `threshold`; the merged price is the touch-weighted average and
/// merge strength grows by 0.2 up to 3.0. Touch counts here are
/// provisional; [`detect_levels`] recounts them against the raw series.
pub fn merge_candidates(
    mut candidates: Vec<PivotCandidate>,
    threshold: Percent,
    kind: LevelKind,
) -> Vec<Level> {
    candidates.sort_by(|a, b| {
        a.price
            .partial_cmp(&b.price)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<Level> = Vec::new();
    for candidate in candidates {
        match merged.last_mut() {
            Some(last)
                if matches!(relative_gap(candidate.price, last.price),
                    Some(gap) if gap <= threshold.get()) =>
            {
                let total = last.touches + 1;
                last.price =
                    (last.price * f64::from(last.touches) + candidate.price) / f64::from(total);
                last.touches = total;
                last.strength = (last.strength + 0.2).min(3.0);
            }
            _ => merged.push(Level {
                price: candidate.price,
                touches: 1,
                strength: 1.0,
                kind,
            }),
        }
    }
    merged
}

/// Recount each level's touches over `prices` within the fixed 1% tolerance,
/// reset strength from the recount and drop levels under `min_touches`.
fn recount_touches(levels: Vec<Level>, prices: &[f64], min_touches: u32) -> Vec<Level> {
    levels
        .into_iter()
        .filter_map(|mut level| {
            let touches = prices
                .iter()
                .filter(|p| {
                    matches!(relative_gap(**p, level.price), Some(gap) if gap <= RECOUNT_TOLERANCE)
                })
                .count() as u32;
            level.touches = touches;
            level.strength = (f64::from(touches) * 0.5).min(3.0);
            (touches >= min_touches).then_some(level)
        })
        .collect()
}

/// Full support/resistance pipeline over the last `lookback_period` bars.
///
/// Returns an empty set when fewer than 20 bars are available.
pub fn detect_levels<T: Ohlcv>(bars: &[T], params: &AnalysisParams) -> LevelSet {
    if bars.len() < MIN_BARS {
        return LevelSet::default();
    }

    let (pivot_lows, pivot_highs) = extract_pivots(bars, params.pivot_window.get());

    let support = merge_candidates(pivot_lows, params.merge_threshold, LevelKind::Support);
    let resistance = merge_candidates(pivot_highs, params.merge_threshold, LevelKind::Resistance);

    let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();

    let mut support = recount_touches(support, &lows, params.min_touches);
    let mut resistance = recount_touches(resistance, &highs, params.min_touches);

    sort_by_strength(&mut support);
    sort_by_strength(&mut resistance);
    support.truncate(MAX_LEVELS);
    resistance.truncate(MAX_LEVELS);

    LevelSet {
        support,
        resistance,
    }
}

fn sort_by_strength(levels: &mut [Level]) {
    levels.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
