//! Shared numeric helpers for the detectors
//!
//! Rolling statistics, quantiles and distribution moments. Degenerate input
//! (empty slices, zero variance) yields 0 or `None` rather than NaN so the
//! detectors stay total.

/// Arithmetic mean; 0.0 on empty input.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0.0 when fewer than two
/// values.
pub fn std_sample(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator); 0.0 on empty input.
pub fn std_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Linear-interpolated quantile (`q` in 0..=1) over an unsorted slice.
/// `None` on empty input.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Fisher-Pearson skewness (biased, population moments); 0.0 on zero
/// variance or fewer than two values.
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    m3 / m2.powf(1.5)
}

/// Excess kurtosis (biased, population moments); 0.0 on zero variance or
/// fewer than two values.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2) - 3.0
}

/// Relative distance `|a - b| / b`; `None` when `b` is not safely nonzero.
#[inline]
pub fn relative_gap(a: f64, b: f64) -> Option<f64> {
    if b.abs() <= f64::EPSILON {
        return None;
    }
    Some((a - b).abs() / b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_std_sample() {
        // Known sample std of [2, 4, 4, 4, 5, 5, 7, 9] is ~2.138
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_sample(&values), 2.13809, epsilon = 1e-4);
    }

    #[test]
    fn test_std_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_population(&values), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_std_degenerate() {
        assert_eq!(std_sample(&[5.0]), 0.0);
        assert_eq!(std_population(&[]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
        // 30th percentile of 4 values: pos = 0.9 -> 1 + 0.9 * (2 - 1)
        assert_relative_eq!(quantile(&values, 0.3).unwrap(), 1.9);
    }

    #[test]
    fn test_quantile_empty() {
        assert!(quantile(&[], 0.3).is_none());
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
    }

    #[test]
    fn test_skewness_symmetric_is_zero() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(skewness(&values), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_skewness_right_tail_positive() {
        let values = [1.0, 1.0, 1.0, 1.0, 10.0];
        assert!(skewness(&values) > 0.0);
    }

    #[test]
    fn test_moments_zero_variance() {
        let values = [3.0; 10];
        assert_eq!(skewness(&values), 0.0);
        assert_eq!(excess_kurtosis(&values), 0.0);
    }

    #[test]
    fn test_kurtosis_uniform_negative() {
        // A flat distribution has negative excess kurtosis
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert!(excess_kurtosis(&values) < 0.0);
    }

    #[test]
    fn test_relative_gap() {
        assert_relative_eq!(relative_gap(102.0, 100.0).unwrap(), 0.02);
        assert!(relative_gap(1.0, 0.0).is_none());
    }
}
