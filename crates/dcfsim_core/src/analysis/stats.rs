//! Descriptive statistics over plain slices.
//!
//! Moments are population estimators; none are bias-corrected.

use serde::{Deserialize, Serialize};

/// One equal-width histogram bin; `upper` is inclusive only for the last bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    #[must_use]
    pub fn center(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }
}

/// Arithmetic mean; `NaN` for an empty slice
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn central_moment(values: &[f64], mean: f64, order: i32) -> f64 {
    values.iter().map(|x| (x - mean).powi(order)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    central_moment(values, m, 2).sqrt()
}

/// Third standardized moment; zero when the values have no spread
#[must_use]
pub fn skewness(values: &[f64]) -> f64 {
    let m = mean(values);
    let m2 = central_moment(values, m, 2);
    if m2 <= 0.0 || m2.is_nan() {
        return 0.0;
    }
    central_moment(values, m, 3) / m2.powf(1.5)
}

/// Fourth standardized moment `m4 / m2^2` (3 for a normal law); zero when
/// the values have no spread
#[must_use]
pub fn kurtosis(values: &[f64]) -> f64 {
    let m = mean(values);
    let m2 = central_moment(values, m, 2);
    if m2 <= 0.0 || m2.is_nan() {
        return 0.0;
    }
    central_moment(values, m, 4) / (m2 * m2)
}

/// Kurtosis in excess of the normal law's 3; zero when the values have no spread
#[must_use]
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    match kurtosis(values) {
        k if k == 0.0 => 0.0,
        k => k - 3.0,
    }
}

/// Linear-interpolation percentile of ascending `sorted`, `p` in `[0, 100]`.
///
/// Rank `p/100 * (n - 1)` is interpolated between its neighbouring order
/// statistics. Returns `NaN` for an empty slice.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let weight = rank - lo as f64;
            sorted[lo] + weight * (sorted[hi] - sorted[lo])
        }
    }
}

/// Equal-width histogram spanning `[min, max]` of `values`
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &x in values {
        let idx = (((x - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: if i + 1 == bins {
                max
            } else {
                min + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

/// Center of the most populated histogram bin (first one on ties)
#[must_use]
pub fn mode_estimate(values: &[f64], bins: usize) -> f64 {
    histogram(values, bins)
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.count.cmp(&b.count).then(ib.cmp(ia)))
        .map_or(f64::NAN, |(_, bin)| bin.center())
}

/// Pearson correlation; zero when either side has no spread
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// 1-based ranks, ties sharing their average rank
#[must_use]
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) share ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation
#[must_use]
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&ranks(x), &ranks(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 50.0), 3.0);
        assert_eq!(percentile_sorted(&sorted, 100.0), 5.0);
        assert!((percentile_sorted(&sorted, 10.0) - 1.4).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 87.5) - 4.5).abs() < 1e-12);
        assert!(percentile_sorted(&[], 50.0).is_nan());
        assert_eq!(percentile_sorted(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn test_moments() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);

        let symmetric = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(skewness(&symmetric).abs() < 1e-12);
        // Uniform-like five points: m4/m2^2 = 6.8/4 = 1.7
        assert!((kurtosis(&symmetric) - 1.7).abs() < 1e-12);
        assert!((excess_kurtosis(&symmetric) + 1.3).abs() < 1e-12);

        let right_tail = [0.0, 0.0, 0.0, 0.0, 10.0];
        assert!(skewness(&right_tail) > 0.5);

        assert_eq!(skewness(&[3.0, 3.0]), 0.0);
        assert_eq!(kurtosis(&[3.0, 3.0]), 0.0);
        assert_eq!(excess_kurtosis(&[3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_histogram_and_mode() {
        let values = [0.0, 0.1, 0.2, 0.25, 0.26, 0.27, 0.9, 1.0];
        let bins = histogram(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].count, 3);
        assert_eq!(bins[1].count, 3);
        assert_eq!(bins[3].count, 2);
        assert_eq!(bins[3].upper, 1.0);

        // Tie between the first two bins resolves to the first
        assert!((mode_estimate(&values, 4) - 0.125).abs() < 1e-12);

        let flat = histogram(&[2.0, 2.0, 2.0], 10);
        assert_eq!(flat.len(), 1);
        assert_eq!(mode_estimate(&[2.0, 2.0], 10), 2.0);
    }

    #[test]
    fn test_ranks_average_ties() {
        assert_eq!(ranks(&[10.0, 30.0, 20.0, 20.0]), vec![1.0, 4.0, 2.5, 2.5]);
    }

    #[test]
    fn test_correlations() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);

        // Monotone but nonlinear: Spearman sees a perfect relation
        let cubed: Vec<f64> = x.iter().map(|v: &f64| v.powi(3)).collect();
        assert!(pearson(&x, &cubed) < 1.0);
        assert!((spearman(&x, &cubed) - 1.0).abs() < 1e-12);

        let reversed = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((spearman(&x, &reversed) + 1.0).abs() < 1e-12);

        assert_eq!(pearson(&x, &[1.0; 5]), 0.0);
    }
}
