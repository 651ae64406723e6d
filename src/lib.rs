//! # Strata - Structural Price Analysis
//!
//! Derives structural features from daily OHLCV series: support/resistance
//! levels, trend lines, consolidation zones, Fibonacci levels, a volume
//! profile and a composite directional signal.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::prelude::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let points: Vec<PricePoint> = (0..120)
//!     .map(|i| {
//!         let base = 100.0 + (i as f64 * 0.35).sin() * 4.0;
//!         PricePoint {
//!             date: start + chrono::Duration::days(i),
//!             open: base,
//!             high: base + 1.5,
//!             low: base - 1.5,
//!             close: base + 0.5,
//!             volume: 10_000.0,
//!         }
//!     })
//!     .collect();
//!
//! let series = MarketSeries::new(points).unwrap();
//! let analyzer = Analyzer::default();
//! let report = analyzer.analyze(&series);
//!
//! for level in &report.levels.support {
//!     println!("support {:.2} ({} touches)", level.price, level.touches);
//! }
//! ```
//!
//! The engine is purely functional: every call operates on its own immutable
//! window of the series and nothing is cached between invocations. Data
//! retrieval, indicator libraries and presentation are external concerns.

pub mod detectors;
pub mod params;
pub mod patterns;
pub mod signal;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::consolidation::{detect_zones, ConsolidationZone},
        detectors::fibonacci::{compute_fibonacci, FibonacciLevels},
        detectors::levels::{detect_levels, extract_pivots, merge_candidates, Level, LevelSet},
        detectors::trend_lines::{detect_trend_lines, SwingPoint, TrendLine, TrendLineSet},
        detectors::volume_profile::{build_profile, VolumeProfile, VolumeStats},
        // Parameters
        params::{get_percent, get_period, AnalysisParams, ParamMeta, ParamType},
        // Patterns & signal
        patterns::{recognize, Pattern},
        signal::{score_levels, SignalLabel, SignalResult},
        // Parallel
        analyze_parallel,
        // Facade
        Analyzer,
        Breakout,
        Confidence,
        Direction,
        LevelKind,
        LineDirection,
        MarketSeries,
        Ohlcv,
        OhlcvExt,
        Percent,
        Period,
        PricePoint,
        Result,
        StructureError,
        StructureReport,
        SymbolReport,
    };
}

use chrono::NaiveDate;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, StructureError>;

/// Errors that can occur while constructing inputs or parameters.
///
/// Detection itself never fails: undersized input yields the documented
/// empty or `None` result instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StructureError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Bar dates must strictly increase (violated at index {index})")]
    NonMonotonicDates { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// A percentage expressed as a fraction of one (2% == 0.02).
///
/// Must be finite and non-negative; per-parameter ranges are enforced by
/// [`params::AnalysisParams::validate`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(StructureError::InvalidValue(
                "Percent cannot be NaN or infinite",
            ));
        }
        if value < 0.0 {
            return Err(StructureError::InvalidValue("Percent must be >= 0"));
        }
        Ok(Self(value))
    }

    /// Create a Percent from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

/// Bar-count period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(StructureError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAIT & SERIES
// ============================================================

/// Core daily-bar trait. Callers may feed their own bar types through
/// [`MarketSeries::from_bars`] or call the detector functions directly.
pub trait Ohlcv {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
    fn date(&self) -> NaiveDate;
}

/// Extension trait with computed properties for OHLCV data
pub trait OhlcvExt: Ohlcv {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate bar consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(StructureError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        let fields = [
            self.open(),
            self.high(),
            self.low(),
            self.close(),
            self.volume(),
        ];
        if fields.iter().any(|v| v.is_nan()) {
            return Err(StructureError::InvalidBar {
                index: 0,
                reason: "NaN in bar",
            });
        }
        if fields.iter().any(|v| v.is_infinite()) {
            return Err(StructureError::InvalidBar {
                index: 0,
                reason: "infinite value in bar",
            });
        }
        Ok(())
    }
}

impl<T: Ohlcv> OhlcvExt for T {}

/// One daily bar.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv for PricePoint {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Immutable, validated, date-ordered OHLCV snapshot.
///
/// Construction checks every bar (finite values, `high >= low`) and that
/// dates strictly increase. The series is never mutated after construction;
/// each analysis call works on a tail window borrowed from it.
#[derive(Debug, Clone)]
pub struct MarketSeries {
    points: Vec<PricePoint>,
}

impl MarketSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (i, p) in points.iter().enumerate() {
            p.validate().map_err(|e| match e {
                StructureError::InvalidBar { reason, .. } => {
                    StructureError::InvalidBar { index: i, reason }
                }
                other => other,
            })?;
        }
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(StructureError::NonMonotonicDates { index: i + 1 });
            }
        }
        Ok(Self { points })
    }

    /// Build a series from any bar type implementing [`Ohlcv`].
    pub fn from_bars<T: Ohlcv>(bars: &[T]) -> Result<Self> {
        let points = bars
            .iter()
            .map(|b| PricePoint {
                date: b.date(),
                open: b.open(),
                high: b.high(),
                low: b.low(),
                close: b.close(),
                volume: b.volume(),
            })
            .collect();
        Self::new(points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn bars(&self) -> &[PricePoint] {
        &self.points
    }

    /// The last `n` bars (the whole series when shorter).
    #[inline]
    pub fn window(&self, n: usize) -> &[PricePoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    #[inline]
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }
}

// ============================================================
// CORE ENUMS
// ============================================================

/// Directional bias of a pattern or signal contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Confidence bucket for a recognized pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Which side of price a level sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

/// Slope sign of a trend line
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineDirection {
    Ascending,
    Descending,
}

/// How a consolidation zone resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Breakout {
    Bullish,
    Bearish,
    Consolidating,
    /// Fewer than five bars followed the zone, so the outcome is unknown.
    Unresolved,
}

// ============================================================
// ANALYZER FACADE
// ============================================================

use detectors::consolidation::ConsolidationZone;
use detectors::fibonacci::FibonacciLevels;
use detectors::levels::LevelSet;
use detectors::trend_lines::TrendLineSet;
use detectors::volume_profile::VolumeProfile;
use params::AnalysisParams;
use patterns::Pattern;
use signal::SignalResult;

/// Everything one analysis pass derives from a series.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StructureReport {
    pub levels: LevelSet,
    pub trend_lines: TrendLineSet,
    pub zones: Vec<ConsolidationZone>,
    pub fibonacci: Option<FibonacciLevels>,
    pub volume_profile: Option<VolumeProfile>,
    pub patterns: Vec<Pattern>,
    pub signal: SignalResult,
    pub last_close: Option<f64>,
}

/// Runs all detectors over a series window and assembles a
/// [`StructureReport`]. Stateless apart from its parameters; cheap to share
/// across threads.
#[derive(Debug, Clone)]
pub struct Analyzer {
    params: AnalysisParams,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            params: AnalysisParams::default(),
        }
    }
}

impl Analyzer {
    pub fn new(params: AnalysisParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Analyze with a neutral signal seed.
    pub fn analyze(&self, series: &MarketSeries) -> StructureReport {
        self.analyze_with_seed(series, 0.0)
    }

    /// Analyze a series. `seed` is the caller's running signal score from
    /// broader indicator evidence; level proximity adjusts it.
    pub fn analyze_with_seed(&self, series: &MarketSeries, seed: f64) -> StructureReport {
        let window = series.window(self.params.lookback_period.get());
        let last_close = window.last().map(|b| b.close);

        let levels = detectors::levels::detect_levels(window, &self.params);
        let trend_lines = detectors::trend_lines::detect_trend_lines(window);
        let zones =
            detectors::consolidation::detect_zones(window, self.params.consolidation_threshold);
        let fibonacci = detectors::fibonacci::compute_fibonacci(window);
        let volume_profile = detectors::volume_profile::build_profile(window);

        let patterns = match last_close {
            Some(close) => patterns::recognize(&levels, &zones, close),
            None => Vec::new(),
        };
        let signal = signal::score_levels(&levels, last_close, seed);

        StructureReport {
            levels,
            trend_lines,
            zones,
            fibonacci,
            volume_profile,
            patterns,
            signal,
            last_close,
        }
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Report for one symbol out of a parallel batch
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub report: StructureReport,
}

/// Analyze many symbols in parallel. Safe because every call borrows its own
/// immutable window; reports come back in input order.
pub fn analyze_parallel<'a, I>(analyzer: &Analyzer, symbols: I) -> Vec<SymbolReport>
where
    I: IntoParallelIterator<Item = (&'a str, &'a MarketSeries)>,
{
    symbols
        .into_par_iter()
        .map(|(symbol, series)| SymbolReport {
            symbol: symbol.to_string(),
            report: analyzer.analyze(series),
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i)
    }

    fn point(i: i64, low: f64, high: f64, close: f64) -> PricePoint {
        PricePoint {
            date: day(i),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn make_wave(n: usize) -> Vec<PricePoint> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.4).sin() * 5.0;
                point(i as i64, base - 1.0, base + 1.0, base)
            })
            .collect()
    }

    #[test]
    fn test_percent_validation() {
        assert!(Percent::new(0.0).is_ok());
        assert!(Percent::new(0.02).is_ok());
        assert!(Percent::new(-0.01).is_err());
        assert!(Percent::new(f64::NAN).is_err());
        assert!(Percent::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let points = vec![point(1, 99.0, 101.0, 100.0), point(0, 99.0, 101.0, 100.0)];
        match MarketSeries::new(points) {
            Err(StructureError::NonMonotonicDates { index }) => assert_eq!(index, 1),
            other => panic!("expected NonMonotonicDates, got {other:?}"),
        }
    }

    #[test]
    fn test_series_rejects_equal_dates() {
        let points = vec![point(0, 99.0, 101.0, 100.0), point(0, 99.0, 101.0, 100.0)];
        assert!(MarketSeries::new(points).is_err());
    }

    #[test]
    fn test_series_rejects_inverted_bar() {
        let mut p = point(0, 99.0, 101.0, 100.0);
        p.high = 98.0;
        p.low = 99.0;
        match MarketSeries::new(vec![p]) {
            Err(StructureError::InvalidBar { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected InvalidBar, got {other:?}"),
        }
    }

    #[test]
    fn test_series_rejects_nan() {
        let mut p = point(0, 99.0, 101.0, 100.0);
        p.close = f64::NAN;
        assert!(MarketSeries::new(vec![p]).is_err());
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = MarketSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.last_close(), None);
    }

    #[test]
    fn test_window_clamps_to_len() {
        let series = MarketSeries::new(make_wave(10)).unwrap();
        assert_eq!(series.window(100).len(), 10);
        assert_eq!(series.window(4).len(), 4);
        assert_eq!(series.window(4)[0].date, day(6));
    }

    #[test]
    fn test_analyze_empty_series() {
        let series = MarketSeries::new(Vec::new()).unwrap();
        let report = Analyzer::default().analyze(&series);
        assert!(report.levels.support.is_empty());
        assert!(report.levels.resistance.is_empty());
        assert!(report.trend_lines.ascending.is_empty());
        assert!(report.zones.is_empty());
        assert!(report.fibonacci.is_none());
        assert!(report.volume_profile.is_none());
        assert!(report.patterns.is_empty());
        assert_eq!(report.last_close, None);
    }

    #[test]
    fn test_analyze_produces_report() {
        let series = MarketSeries::new(make_wave(120)).unwrap();
        let report = Analyzer::default().analyze(&series);
        assert_eq!(report.last_close, series.last_close());
        assert!(report.fibonacci.is_some());
        assert!(report.volume_profile.is_some());
    }

    #[test]
    fn test_analyze_seed_flows_into_score() {
        let series = MarketSeries::new(Vec::new()).unwrap();
        let report = Analyzer::default().analyze_with_seed(&series, 7.0);
        assert_eq!(report.signal.score, 7.0);
    }

    #[test]
    fn test_parallel_analysis_preserves_order() {
        let a = MarketSeries::new(make_wave(60)).unwrap();
        let b = MarketSeries::new(make_wave(120)).unwrap();
        let analyzer = Analyzer::default();

        let reports = analyze_parallel(&analyzer, vec![("AAA", &a), ("BBB", &b)]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].symbol, "AAA");
        assert_eq!(reports[1].symbol, "BBB");
    }

    #[test]
    fn test_from_bars_roundtrip() {
        let points = make_wave(30);
        let series = MarketSeries::from_bars(&points).unwrap();
        assert_eq!(series.bars(), &points[..]);
    }
}
