//! Consolidation zone detection
//!
//! A rolling coefficient of variation over closes marks low-volatility bars;
//! long runs of marked bars become zones, and the bars just after each run
//! classify its breakout.

use chrono::NaiveDate;

use crate::detectors::helpers::{mean, quantile, std_sample};
use crate::{Breakout, Ohlcv, Percent};

/// Fewest bars zone detection will work with; also the rolling window for
/// the volatility ratio.
const ROLLING_WINDOW: usize = 20;
/// Fewest consecutive low-volatility bars that form a zone.
const MIN_RUN: usize = 10;
/// Volatility ratios under this quantile of the window's ratios count as
/// low volatility.
const LOW_VOL_QUANTILE: f64 = 0.30;
/// Bars inspected after a run to classify its breakout.
const BREAKOUT_LOOKAHEAD: usize = 5;
/// Close must clear the zone boundary by this fraction to count as a
/// breakout.
const BREAKOUT_MARGIN: f64 = 0.02;

/// A low-volatility trading range and how price left it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConsolidationZone {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Lowest low inside the zone
    pub support: f64,
    /// Highest high inside the zone
    pub resistance: f64,
    /// (resistance - support) / support
    pub range_pct: f64,
    /// Number of bars in the zone, at least 10
    pub duration_days: u32,
    pub avg_volume: f64,
    pub breakout: Breakout,
}

/// Rolling sample-std / mean of closes; `None` where the window is not yet
/// full or the mean is not safely nonzero.
fn volatility_ratios<T: Ohlcv>(bars: &[T]) -> Vec<Option<f64>> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
    (0..closes.len())
        .map(|i| {
            if i + 1 < ROLLING_WINDOW {
                return None;
            }
            let window = &closes[i + 1 - ROLLING_WINDOW..=i];
            let m = mean(window);
            if m.abs() <= f64::EPSILON {
                return None;
            }
            Some(std_sample(window) / m)
        })
        .collect()
}

/// Maximal runs of `true` with length at least `MIN_RUN`, as inclusive
/// index ranges.
fn low_vol_runs(flags: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &flag) in flags.iter().enumerate() {
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= MIN_RUN {
                    runs.push((s, i - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if flags.len() - s >= MIN_RUN {
            runs.push((s, flags.len() - 1));
        }
    }
    runs
}

fn classify_breakout<T: Ohlcv>(
    bars: &[T],
    run_end: usize,
    support: f64,
    resistance: f64,
) -> Breakout {
    if run_end + BREAKOUT_LOOKAHEAD >= bars.len() {
        return Breakout::Unresolved;
    }
    let post = &bars[run_end + 1..=run_end + BREAKOUT_LOOKAHEAD];
    let max_close = post.iter().map(|b| b.close()).fold(f64::NEG_INFINITY, f64::max);
    let min_close = post.iter().map(|b| b.close()).fold(f64::INFINITY, f64::min);

    if max_close > resistance * (1.0 + BREAKOUT_MARGIN) {
        Breakout::Bullish
    } else if min_close < support * (1.0 - BREAKOUT_MARGIN) {
        Breakout::Bearish
    } else {
        Breakout::Consolidating
    }
}

/// Detect consolidation zones, keeping runs whose full price range stays
/// within `max_range` of the zone's support.
///
/// Returns no zones when fewer than 20 bars are available.
pub fn detect_zones<T: Ohlcv>(bars: &[T], max_range: Percent) -> Vec<ConsolidationZone> {
    if bars.len() < ROLLING_WINDOW {
        return Vec::new();
    }

    let ratios = volatility_ratios(bars);
    let valid: Vec<f64> = ratios.iter().flatten().copied().collect();
    let Some(threshold) = quantile(&valid, LOW_VOL_QUANTILE) else {
        return Vec::new();
    };

    let flags: Vec<bool> = ratios
        .iter()
        .map(|r| matches!(r, Some(v) if *v < threshold))
        .collect();

    let mut zones = Vec::new();
    for (start, end) in low_vol_runs(&flags) {
        let run = &bars[start..=end];
        let support = run.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        let resistance = run.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
        if support.abs() <= f64::EPSILON {
            continue;
        }
        let range_pct = (resistance - support) / support;
        if range_pct > max_range.get() {
            continue;
        }

        let volumes: Vec<f64> = run.iter().map(|b| b.volume()).collect();
        zones.push(ConsolidationZone {
            start_date: bars[start].date(),
            end_date: bars[end].date(),
            support,
            resistance,
            range_pct,
            duration_days: (end - start + 1) as u32,
            avg_volume: mean(&volumes),
            breakout: classify_breakout(bars, end, support, resistance),
        });
    }
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PricePoint;
    use approx::assert_relative_eq;

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i)
    }

    fn bar(i: i64, close: f64) -> PricePoint {
        PricePoint {
            date: day(i),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        }
    }

    /// Mildly noisy bars followed by a flat stretch of `quiet` bars at 100,
    /// then `post` closes appended verbatim.
    fn quiet_then(noisy: usize, quiet: usize, post: &[f64]) -> Vec<PricePoint> {
        let mut bars: Vec<PricePoint> = (0..noisy)
            .map(|i| {
                let close = if i % 2 == 0 { 99.0 } else { 101.0 };
                bar(i as i64, close)
            })
            .collect();
        for i in 0..quiet {
            bars.push(bar((noisy + i) as i64, 100.0));
        }
        for (i, c) in post.iter().enumerate() {
            bars.push(bar((noisy + quiet + i) as i64, *c));
        }
        bars
    }

    fn max_range() -> Percent {
        Percent::new_const(0.03)
    }

    #[test]
    fn test_short_series_yields_empty() {
        let bars: Vec<PricePoint> = (0..19).map(|i| bar(i, 100.0)).collect();
        assert!(detect_zones(&bars, max_range()).is_empty());
    }

    #[test]
    fn test_quiet_run_becomes_zone() {
        let bars = quiet_then(40, 35, &[]);
        let zones = detect_zones(&bars, max_range());

        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_relative_eq!(zone.support, 99.5);
        assert_relative_eq!(zone.resistance, 100.5);
        assert!(zone.range_pct <= 0.03);
        // Run covers 17 bars, and even a minimal run counts 10
        assert_eq!(zone.duration_days, 17);
        assert!(zone.duration_days >= MIN_RUN as u32);
        assert_relative_eq!(zone.avg_volume, 1000.0);
        assert_eq!(zone.breakout, Breakout::Unresolved);
    }

    #[test]
    fn test_bullish_breakout() {
        // Flat at 100 then five closes at 104 (> 100.5 * 1.02)
        let bars = quiet_then(40, 35, &[104.0; 8]);
        let zones = detect_zones(&bars, max_range());

        assert!(!zones.is_empty());
        assert_eq!(zones[0].breakout, Breakout::Bullish);
    }

    #[test]
    fn test_bearish_breakout() {
        let bars = quiet_then(40, 35, &[96.0; 8]);
        let zones = detect_zones(&bars, max_range());

        assert!(!zones.is_empty());
        assert_eq!(zones[0].breakout, Breakout::Bearish);
    }

    #[test]
    fn test_drift_within_range_is_consolidating() {
        // Post closes at 101 stay inside the 2% breakout margins
        let bars = quiet_then(40, 35, &[101.0; 10]);
        let zones = detect_zones(&bars, max_range());

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].breakout, Breakout::Consolidating);
    }

    #[test]
    fn test_classify_breakout_margins() {
        // 10 quiet bars then 5 post closes; run ends at index 9
        let series = |post: f64| -> Vec<PricePoint> {
            (0..15)
                .map(|i| bar(i, if i < 10 { 100.0 } else { post }))
                .collect()
        };
        // Margin boundaries around support 99.5 / resistance 100.5
        let bars = series(102.6);
        assert_eq!(classify_breakout(&bars, 9, 99.5, 100.5), Breakout::Bullish);
        let bars = series(102.5);
        assert_eq!(
            classify_breakout(&bars, 9, 99.5, 100.5),
            Breakout::Consolidating
        );
        let bars = series(97.4);
        assert_eq!(classify_breakout(&bars, 9, 99.5, 100.5), Breakout::Bearish);
        // Run ending at the last bar cannot resolve
        let bars = series(102.6);
        assert_eq!(
            classify_breakout(&bars, 14, 99.5, 100.5),
            Breakout::Unresolved
        );
    }

    #[test]
    fn test_wide_run_rejected_by_max_range() {
        let bars = quiet_then(40, 35, &[]);
        let zones = detect_zones(&bars, Percent::new_const(0.005));
        assert!(zones.is_empty());
    }

    #[test]
    fn test_low_vol_runs_boundaries() {
        let mut flags = vec![false; 50];
        for f in flags.iter_mut().take(25).skip(10) {
            *f = true;
        }
        for f in flags.iter_mut().skip(40) {
            *f = true;
        }
        let runs = low_vol_runs(&flags);
        // Second run is only 10 long and reaches the end of the slice
        assert_eq!(runs, vec![(10, 24), (40, 49)]);
    }

    #[test]
    fn test_short_runs_ignored() {
        let mut flags = vec![false; 30];
        for f in flags.iter_mut().take(14).skip(5) {
            *f = true;
        }
        assert_eq!(low_vol_runs(&flags), vec![(5, 13)]);

        let mut flags = vec![false; 30];
        for f in flags.iter_mut().take(13).skip(5) {
            *f = true;
        }
        assert!(low_vol_runs(&flags).is_empty());
    }

    #[test]
    fn test_volatility_ratio_window() {
        let bars: Vec<PricePoint> = (0..25).map(|i| bar(i, 100.0)).collect();
        let ratios = volatility_ratios(&bars);
        assert_eq!(ratios.len(), 25);
        assert!(ratios[18].is_none());
        assert_relative_eq!(ratios[19].unwrap(), 0.0);
    }
}
