//! Fibonacci retracement and extension levels
//!
//! Levels are anchored on the window's extreme high and low. Both families
//! share one mapping: price = swing_low + range * ratio, so retracements lie
//! inside the swing range and extensions above it.

use crate::Ohlcv;

/// Fewest bars Fibonacci analysis will work with.
const MIN_BARS: usize = 50;

/// Retracement ratios, ascending from the swing low.
pub const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
/// Extension ratios, ascending beyond the swing high.
pub const EXTENSION_RATIOS: [f64; 5] = [1.272, 1.414, 1.618, 2.0, 2.618];

/// Fibonacci levels for one window, each entry a `(ratio, price)` pair.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FibonacciLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    pub retracement: Vec<(f64, f64)>,
    pub extension: Vec<(f64, f64)>,
    /// Retracement level closest to the last close
    pub nearest_retracement: (f64, f64),
    /// Extension level closest to the last close
    pub nearest_extension: (f64, f64),
}

fn nearest_to(levels: &[(f64, f64)], close: f64) -> (f64, f64) {
    let mut best = levels[0];
    for level in &levels[1..] {
        if (level.1 - close).abs() < (best.1 - close).abs() {
            best = *level;
        }
    }
    best
}

/// Compute retracement and extension levels from the window's extreme
/// high/low.
///
/// Returns `None` when fewer than 50 bars are available.
pub fn compute_fibonacci<T: Ohlcv>(bars: &[T]) -> Option<FibonacciLevels> {
    if bars.len() < MIN_BARS {
        return None;
    }

    let swing_high = bars.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
    let swing_low = bars.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
    let range = swing_high - swing_low;

    let price_at = |ratio: f64| swing_low + range * ratio;
    let retracement: Vec<(f64, f64)> =
        RETRACEMENT_RATIOS.iter().map(|&r| (r, price_at(r))).collect();
    let extension: Vec<(f64, f64)> =
        EXTENSION_RATIOS.iter().map(|&r| (r, price_at(r))).collect();

    // bars is non-empty here
    let close = bars[bars.len() - 1].close();
    let nearest_retracement = nearest_to(&retracement, close);
    let nearest_extension = nearest_to(&extension, close);

    Some(FibonacciLevels {
        swing_high,
        swing_low,
        retracement,
        extension,
        nearest_retracement,
        nearest_extension,
    })
}
