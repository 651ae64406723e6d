//! Volume-at-price profile
//!
//! Each bar's full volume lands in the histogram bin holding its close. The
//! profile yields the point of control, a 70% value area, and volume-node
//! classifications over the per-bin distribution.

use crate::detectors::helpers::{excess_kurtosis, mean, skewness, std_population};
use crate::Ohlcv;

/// Fewest bars profile construction will work with.
const MIN_BARS: usize = 20;
/// The profile covers at most this many trailing bars.
const PROFILE_SPAN: usize = 100;
/// Number of equal-width price bins.
const NUM_BINS: usize = 70;
/// Fraction of total volume the value area accumulates.
const VALUE_AREA_FRACTION: f64 = 0.70;
/// Bins under this fraction of the mean bin volume are single prints.
const SINGLE_PRINT_FRACTION: f64 = 0.3;

/// Distribution moments of the per-bin volumes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeStats {
    pub total_volume: f64,
    /// Population standard deviation of per-bin volume
    pub std_dev: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Volume-at-price histogram with derived features.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeProfile {
    /// 71 edges delimiting 70 equal-width bins over the profiled range
    pub bin_edges: Vec<f64>,
    pub volume_per_bin: Vec<f64>,
    /// Midpoint of the highest-volume bin
    pub poc_price: f64,
    pub poc_volume: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,
    /// Lower edges of bins with volume above mean + one std
    pub high_volume_nodes: Vec<f64>,
    /// Lower edges of bins with volume below mean - one std
    pub low_volume_nodes: Vec<f64>,
    /// Lower edges of bins with volume under 30% of the mean
    pub single_prints: Vec<f64>,
    pub stats: VolumeStats,
}

/// Bin index for `close`; half-open bins with the top bin inclusive.
#[inline]
fn bin_index(close: f64, lo: f64, width: f64) -> usize {
    if width <= f64::EPSILON {
        return 0;
    }
    let idx = ((close - lo) / width).floor();
    (idx.max(0.0) as usize).min(NUM_BINS - 1)
}

/// Build a volume profile over the last 100 bars of `bars`.
///
/// Returns `None` when fewer than 20 bars are available. The sum of
/// per-bin volumes always equals the total volume of the profiled bars.
pub fn build_profile<T: Ohlcv>(bars: &[T]) -> Option<VolumeProfile> {
    if bars.len() < MIN_BARS {
        return None;
    }
    let bars = &bars[bars.len().saturating_sub(PROFILE_SPAN)..];

    let lo = bars.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
    let hi = bars.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
    let width = (hi - lo) / NUM_BINS as f64;

    let bin_edges: Vec<f64> = (0..=NUM_BINS).map(|i| lo + width * i as f64).collect();
    let mut volume_per_bin = vec![0.0; NUM_BINS];
    for b in bars {
        volume_per_bin[bin_index(b.close(), lo, width)] += b.volume();
    }

    // First maximal bin wins ties
    let mut poc_bin = 0;
    for (i, v) in volume_per_bin.iter().enumerate() {
        if *v > volume_per_bin[poc_bin] {
            poc_bin = i;
        }
    }
    let poc_price = (bin_edges[poc_bin] + bin_edges[poc_bin + 1]) / 2.0;
    let poc_volume = volume_per_bin[poc_bin];

    let total_volume: f64 = volume_per_bin.iter().sum();
    let (value_area_low, value_area_high) =
        value_area(&volume_per_bin, &bin_edges, total_volume);

    let mean_volume = mean(&volume_per_bin);
    let std_dev = std_population(&volume_per_bin);
    let mut high_volume_nodes = Vec::new();
    let mut low_volume_nodes = Vec::new();
    let mut single_prints = Vec::new();
    for (i, &v) in volume_per_bin.iter().enumerate() {
        if v > mean_volume + std_dev {
            high_volume_nodes.push(bin_edges[i]);
        } else if v < mean_volume - std_dev {
            low_volume_nodes.push(bin_edges[i]);
        }
        if v < mean_volume * SINGLE_PRINT_FRACTION {
            single_prints.push(bin_edges[i]);
        }
    }

    let stats = VolumeStats {
        total_volume,
        std_dev,
        skewness: skewness(&volume_per_bin),
        kurtosis: excess_kurtosis(&volume_per_bin),
    };

    Some(VolumeProfile {
        bin_edges,
        volume_per_bin,
        poc_price,
        poc_volume,
        value_area_high,
        value_area_low,
        high_volume_nodes,
        low_volume_nodes,
        single_prints,
        stats,
    })
}

/// Greedily take bins by volume until the value-area fraction of total
/// volume is covered; the area spans the extreme edges of the taken bins,
/// which need not be contiguous.
fn value_area(volumes: &[f64], edges: &[f64], total: f64) -> (f64, f64) {
    let mut order: Vec<usize> = (0..volumes.len()).collect();
    order.sort_by(|a, b| {
        volumes[*b]
            .partial_cmp(&volumes[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let target = total * VALUE_AREA_FRACTION;
    let mut covered = 0.0;
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for i in order {
        covered += volumes[i];
        low = low.min(edges[i]);
        high = high.max(edges[i + 1]);
        if covered >= target {
            break;
        }
    }
    (low, high)
}
