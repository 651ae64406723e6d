//! Trend line detection from swing points
//!
//! Strict local extrema over a two-bar margin become swing points; every
//! directionally consistent pair of swings defines a candidate line, and
//! other swings near the line's projection count as extra touches. The best
//! three lines per direction survive.

use chrono::NaiveDate;

use crate::{LineDirection, Ohlcv};

/// Fewest bars trend line detection will work with.
const MIN_BARS: usize = 30;
/// Strict-extremum margin on each side of a swing point.
const SWING_MARGIN: usize = 2;
/// Only the most recent swings per side are paired, bounding the O(n^2)
/// pair enumeration.
const MAX_SWINGS: usize = 64;
/// Relative distance below which a swing counts as touching a line
/// (strict; a swing exactly this far off is not a touch).
const TOUCH_TOLERANCE: f64 = 0.02;
/// Result sets are capped at this many lines per direction.
const MAX_LINES: usize = 3;

/// A strict local extremum used as a trend line anchor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A line through two swing points, with the number of swings near its
/// projection.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendLine {
    pub start_date: NaiveDate,
    pub start_price: f64,
    pub end_date: NaiveDate,
    pub end_price: f64,
    /// Price change per calendar day
    pub slope: f64,
    pub touches: u32,
    pub direction: LineDirection,
}

impl TrendLine {
    /// Price the line projects at `date`.
    #[inline]
    pub fn price_at(&self, date: NaiveDate) -> f64 {
        let days = (date - self.start_date).num_days() as f64;
        self.start_price + self.slope * days
    }
}

/// Ascending and descending trend lines for one window, each sorted by
/// touches descending and capped at three entries.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendLineSet {
    pub ascending: Vec<TrendLine>,
    pub descending: Vec<TrendLine>,
}

/// Strict swing lows: bars whose low is below the lows of the two bars on
/// each side. Ties never qualify, so flat plateaus yield no swings.
pub fn find_swing_lows<T: Ohlcv>(bars: &[T]) -> Vec<SwingPoint> {
    find_swings(bars, |b| b.low(), |candidate, neighbor| candidate < neighbor)
}

/// Strict swing highs, symmetric to [`find_swing_lows`] on highs.
pub fn find_swing_highs<T: Ohlcv>(bars: &[T]) -> Vec<SwingPoint> {
    find_swings(bars, |b| b.high(), |candidate, neighbor| candidate > neighbor)
}

fn find_swings<T, F, C>(bars: &[T], price: F, beats: C) -> Vec<SwingPoint>
where
    T: Ohlcv,
    F: Fn(&T) -> f64,
    C: Fn(f64, f64) -> bool,
{
    let mut swings = Vec::new();
    if bars.len() < 2 * SWING_MARGIN + 1 {
        return swings;
    }
    for i in SWING_MARGIN..bars.len() - SWING_MARGIN {
        let p = price(&bars[i]);
        let is_swing = (1..=SWING_MARGIN)
            .all(|d| beats(p, price(&bars[i - d])) && beats(p, price(&bars[i + d])));
        if is_swing {
            swings.push(SwingPoint {
                date: bars[i].date(),
                price: p,
            });
        }
    }
    swings
}

/// Build candidate lines from every directionally consistent ordered pair of
/// swings, then count how many other swings sit within tolerance of each
/// line's projection.
fn fit_lines(swings: &[SwingPoint], direction: LineDirection) -> Vec<TrendLine> {
    let swings = if swings.len() > MAX_SWINGS {
        &swings[swings.len() - MAX_SWINGS..]
    } else {
        swings
    };

    let mut lines = Vec::new();
    for i in 0..swings.len() {
        for j in i + 1..swings.len() {
            let (start, end) = (swings[i], swings[j]);
            let consistent = match direction {
                LineDirection::Ascending => end.price > start.price,
                LineDirection::Descending => end.price < start.price,
            };
            if !consistent {
                continue;
            }
            let days = (end.date - start.date).num_days();
            if days == 0 {
                continue;
            }
            let slope = (end.price - start.price) / days as f64;

            let mut line = TrendLine {
                start_date: start.date,
                start_price: start.price,
                end_date: end.date,
                end_price: end.price,
                slope,
                touches: 2,
                direction,
            };
            for other in swings {
                if other.date == start.date || other.date == end.date {
                    continue;
                }
                let predicted = line.price_at(other.date);
                if predicted <= f64::EPSILON {
                    continue;
                }
                if (other.price - predicted).abs() / predicted < TOUCH_TOLERANCE {
                    line.touches += 1;
                }
            }
            lines.push(line);
        }
    }

    lines.sort_by(|a, b| b.touches.cmp(&a.touches));
    lines.truncate(MAX_LINES);
    lines
}

/// Detect ascending lines through swing lows and descending lines through
/// swing highs.
///
/// Returns an empty set when fewer than 30 bars are available.
pub fn detect_trend_lines<T: Ohlcv>(bars: &[T]) -> TrendLineSet {
    if bars.len() < MIN_BARS {
        return TrendLineSet::default();
    }

    let lows = find_swing_lows(bars);
    let highs = find_swing_highs(bars);

    TrendLineSet {
        ascending: fit_lines(&lows, LineDirection::Ascending),
        descending: fit_lines(&highs, LineDirection::Descending),
    }
}
