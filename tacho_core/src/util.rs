//! Order statistics shared by the estimator and the stats aggregator.

/// Sort in place using IEEE total ordering (NaN sorts last).
#[inline]
pub fn sort_f64(v: &mut [f64]) {
    v.sort_unstable_by(f64::total_cmp);
}

/// Linear-interpolated percentile of an ascending slice, `p` in `[0, 100]`.
///
/// Rank is `p / 100 * (n - 1)`; values between ranks are interpolated.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of an ascending slice; even lengths average the two middle values.
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    Some(v.iter().sum::<f64>() / v.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values.
pub fn sample_stdev(v: &[f64]) -> f64 {
    if v.len() < 2 {
        return 0.0;
    }
    let m = v.iter().sum::<f64>() / v.len() as f64;
    let var = v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (v.len() as f64 - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let s = [1.0, 2.0, 3.0, 4.0];
        // rank 0.75 -> 1.75, rank 2.25 -> 3.25
        assert!((percentile_sorted(&s, 25.0).unwrap() - 1.75).abs() < 1e-12);
        assert!((percentile_sorted(&s, 75.0).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(percentile_sorted(&s, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&s, 100.0), Some(4.0));
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn median_handles_odd_and_even() {
        assert_eq!(median_sorted(&[1.0, 5.0, 9.0]), Some(5.0));
        assert_eq!(median_sorted(&[1.0, 3.0, 5.0, 9.0]), Some(4.0));
        assert_eq!(median_sorted(&[]), None);
    }

    #[test]
    fn stdev_uses_sample_denominator() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population stdev is 2.0; sample stdev is sqrt(32/7)
        assert!((sample_stdev(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_stdev(&[3.0]), 0.0);
        assert_eq!(mean(&[]), None);
    }
}
