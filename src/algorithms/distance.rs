use crate::algorithms::common::FftCorrelator;
use crate::core::stats::{StatsView, EPS};

/// How a distance profile gets computed.
///
/// Both strategies produce numerically equivalent z-normalized Euclidean
/// distances; they differ in cost shape. The FFT strategy pays one transform
/// for the whole profile, the covariance strategy works term-by-term without
/// any transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceProfileStrategy {
    /// Sliding dot products via FFT cross-correlation (MASS).
    Fft,
    /// Direct summation of centered products, no transform.
    Covariance,
}

/// A distance profile together with the sliding dot products it came from.
///
/// The products feed the ordered batch algorithm's O(1) per-row recurrence,
/// so the FFT path hands them back instead of discarding them.
pub(crate) struct DistanceProfile {
    pub distances: Vec<f64>,
    pub products: Vec<f64>,
}

/// Z-normalized Euclidean distance from a dot product and window statistics.
///
/// `d = sqrt(2m(1 - r))` with `r = (QT - m*mu_a*mu_b) / (m*sigma_a*sigma_b)`
/// clamped to [-1, 1]; the radicand is clamped to 0 against cancellation.
/// A (near-)constant window on either side yields `+inf`.
#[inline]
pub(crate) fn znorm_distance(
    qt: f64,
    window_size: usize,
    mean_a: f64,
    std_a: f64,
    mean_b: f64,
    std_b: f64,
) -> f64 {
    if std_a <= EPS || std_b <= EPS {
        return f64::INFINITY;
    }
    let m = window_size as f64;
    let r = ((qt - m * mean_a * mean_b) / (m * std_a * std_b)).clamp(-1.0, 1.0);
    (2.0 * m * (1.0 - r)).max(0.0).sqrt()
}

/// Distance profile of one query subsequence against every data window.
///
/// `query_index` addresses the subsequence inside `query`; for a self-join
/// pass the same view twice. The result has one entry per data window, with
/// `+inf` wherever either window is constant or skip-flagged.
pub fn distance_profile<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    query_index: usize,
    strategy: DistanceProfileStrategy,
) -> Vec<f64> {
    match strategy {
        DistanceProfileStrategy::Fft => {
            let corr = FftCorrelator::new(&data.values(), data.window_size());
            fft_distance_profile(data, query, query_index, &corr).distances
        }
        DistanceProfileStrategy::Covariance => {
            covariance_distance_profile(data, query, query_index)
        }
    }
}

/// FFT-strategy distance profile reusing an already-planned correlator.
pub(crate) fn fft_distance_profile<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    query_index: usize,
    corr: &FftCorrelator,
) -> DistanceProfile {
    let w = data.window_size();
    let q_values: Vec<f64> = (query_index..query_index + w).map(|i| query.x(i)).collect();
    let products = corr.sliding_products(&q_values);

    let q_mean = query.mean(query_index);
    let q_std = query.std_dev(query_index);
    let q_bad = query.skip(query_index) || q_std <= EPS;

    let distances = products
        .iter()
        .enumerate()
        .map(|(j, &qt)| {
            if q_bad || data.skip(j) {
                f64::INFINITY
            } else {
                znorm_distance(qt, w, data.mean(j), data.std_dev(j), q_mean, q_std)
            }
        })
        .collect();

    DistanceProfile {
        distances,
        products,
    }
}

/// Covariance-strategy distance profile: centered products summed directly.
pub(crate) fn covariance_distance_profile<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    query_index: usize,
) -> Vec<f64> {
    let w = data.window_size();
    let m = w as f64;
    let q_mean = query.mean(query_index);
    let q_std = query.std_dev(query_index);
    let q_bad = query.skip(query_index) || q_std <= EPS;

    (0..data.profile_len())
        .map(|j| {
            let std_j = data.std_dev(j);
            if q_bad || data.skip(j) || std_j <= EPS {
                return f64::INFINITY;
            }
            let mean_j = data.mean(j);
            let cov: f64 = (0..w)
                .map(|t| (data.x(j + t) - mean_j) * (query.x(query_index + t) - q_mean))
                .sum();
            let r = (cov / (m * std_j * q_std)).clamp(-1.0, 1.0);
            (2.0 * m * (1.0 - r)).max(0.0).sqrt()
        })
        .collect()
}

/// Shared precomputation for the diagonal covariance recurrence.
///
/// `df`/`dg` are the forward-difference terms that advance a covariance one
/// step along a diagonal in O(1):
/// `cov += df[a]*dg[b] + df[b]*dg[a]`. Both are zero at position 0 so the
/// first step of every diagonal walk leaves the directly-summed seed intact.
/// `sig_inv` is `1/(sqrt(m)*sigma)`, zero for constant windows, turning the
/// correlation into a pair of multiplications.
pub(crate) struct CovContext {
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub sig_inv: Vec<f64>,
    pub df: Vec<f64>,
    pub dg: Vec<f64>,
    pub valid: Vec<bool>,
}

impl CovContext {
    pub fn compute<V: StatsView>(view: &V) -> Self {
        let w = view.window_size();
        let p_len = view.profile_len();
        let sqrt_m = (w as f64).sqrt();

        let x = view.values();
        let mut mean = Vec::with_capacity(p_len);
        let mut sig_inv = Vec::with_capacity(p_len);
        let mut valid = Vec::with_capacity(p_len);
        for i in 0..p_len {
            let sigma = view.std_dev(i);
            mean.push(view.mean(i));
            if sigma <= EPS {
                sig_inv.push(0.0);
                valid.push(false);
            } else {
                sig_inv.push(1.0 / (sqrt_m * sigma));
                valid.push(!view.skip(i));
            }
        }

        let mut df = vec![0.0; p_len];
        let mut dg = vec![0.0; p_len];
        for i in 1..p_len {
            df[i] = 0.5 * (x[i + w - 1] - x[i - 1]);
            dg[i] = (x[i + w - 1] - mean[i]) + (x[i - 1] - mean[i - 1]);
        }

        Self {
            x,
            mean,
            sig_inv,
            df,
            dg,
            valid,
        }
    }

    /// Covariance of the window pair `(a, b)` by direct summation; seeds a
    /// diagonal walk.
    pub fn seed_cov(&self, a: usize, b: usize, w: usize) -> f64 {
        let mean_a = self.mean[a];
        let mean_b = self.mean[b];
        (0..w)
            .map(|t| (self.x[a + t] - mean_a) * (self.x[b + t] - mean_b))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::RollingWindowStats;

    fn series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (i as f64 * 0.31).sin() + 0.4 * (i as f64 * 0.09).cos())
            .collect()
    }

    #[test]
    fn test_strategies_agree() {
        let ts = series(80);
        let w = 8;
        let stats = RollingWindowStats::from_series(&ts, w);

        for q in [0, 17, stats.profile_len() - 1] {
            let fft = distance_profile(&stats, &stats, q, DistanceProfileStrategy::Fft);
            let cov = distance_profile(&stats, &stats, q, DistanceProfileStrategy::Covariance);
            assert_eq!(fft.len(), cov.len());
            for (j, (a, b)) in fft.iter().zip(cov.iter()).enumerate() {
                assert!(
                    (a - b).abs() < 1e-6,
                    "Strategy mismatch for query {q} at {j}: fft={a}, cov={b}"
                );
            }
        }
    }

    #[test]
    fn test_self_distance_is_zero() {
        let ts = series(60);
        let stats = RollingWindowStats::from_series(&ts, 6);
        let dp = distance_profile(&stats, &stats, 20, DistanceProfileStrategy::Fft);
        assert!(
            dp[20] < 1e-6,
            "Distance of a window to itself should be ~0, got {}",
            dp[20]
        );
    }

    #[test]
    fn test_constant_windows_force_infinity() {
        let stats = RollingWindowStats::from_series(&[5.0; 10], 3);
        for strategy in [DistanceProfileStrategy::Fft, DistanceProfileStrategy::Covariance] {
            let dp = distance_profile(&stats, &stats, 0, strategy);
            assert_eq!(dp.len(), 8);
            for (j, d) in dp.iter().enumerate() {
                assert!(!d.is_nan(), "NaN leaked at {j}");
                assert!(
                    d.is_infinite() || *d == 0.0,
                    "Constant series entry at {j} must be inf or 0, got {d}"
                );
            }
        }
    }

    #[test]
    fn test_skip_windows_force_infinity() {
        let mut ts = series(40);
        ts[15] = f64::INFINITY;
        let w = 5;
        let stats = RollingWindowStats::from_series(&ts, w);
        let dp = distance_profile(&stats, &stats, 0, DistanceProfileStrategy::Fft);

        for (j, d) in dp.iter().enumerate() {
            assert!(!d.is_nan());
            if j <= 15 && 15 < j + w {
                assert!(d.is_infinite(), "Contaminated window {j} must be inf");
            }
        }
        // A contaminated query forces the whole profile to inf
        let dp_bad_query = distance_profile(&stats, &stats, 13, DistanceProfileStrategy::Fft);
        assert!(dp_bad_query.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_shifted_linear_matches() {
        // Linear windows all z-normalize to the same shape
        let ts: Vec<f64> = (0..20).map(|i| 2.0 * i as f64 + 1.0).collect();
        let stats = RollingWindowStats::from_series(&ts, 4);
        let dp = distance_profile(&stats, &stats, 3, DistanceProfileStrategy::Covariance);
        for (j, d) in dp.iter().enumerate() {
            assert!(*d < 1e-6, "Linear series distance at {j} should be ~0, got {d}");
        }
    }

    #[test]
    fn test_cov_context_diagonal_step() {
        // One O(1) df/dg step must equal a freshly summed covariance
        let ts = series(50);
        let w = 6;
        let stats = RollingWindowStats::from_series(&ts, w);
        let ctx = CovContext::compute(&stats);

        let diag = 9;
        let mut cov = ctx.seed_cov(diag, 0, w);
        for offset in 1..stats.profile_len() - diag {
            let col = offset + diag;
            cov += ctx.df[offset] * ctx.dg[col] + ctx.df[col] * ctx.dg[offset];
            let direct = ctx.seed_cov(col, offset, w);
            assert!(
                (cov - direct).abs() < 1e-8,
                "Diagonal recurrence drifted at offset {offset}: {cov} vs {direct}"
            );
        }
    }
}
