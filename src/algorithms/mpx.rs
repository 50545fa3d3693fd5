use log::trace;

use crate::algorithms::distance::CovContext;
use crate::core::profile::{MatrixProfile, UNASSIGNED};
use crate::core::stats::{RollingWindowStats, StatsView};
use crate::error::{Error, Result};

/// Minimum window size for the covariance algorithm; unlike the FFT-based
/// algorithms it stays numerically sound down to very short windows.
const MIN_WINDOW_MPX: usize = 2;

/// Correlation accumulator for a diagonal sweep.
///
/// Works in the correlation domain (higher is better) until one final
/// conversion pass, keeping sqrt out of the inner loop. `-1.0` doubles as the
/// "never updated" floor since it is the minimum attainable correlation.
struct CorrAccumulator {
    corr: Vec<f64>,
    index: Vec<i32>,
}

impl CorrAccumulator {
    fn new(len: usize) -> Self {
        Self {
            corr: vec![-1.0; len],
            index: vec![UNASSIGNED; len],
        }
    }

    #[inline]
    fn update(&mut self, idx: usize, corr: f64, neighbor: usize) {
        if corr > self.corr[idx] {
            self.corr[idx] = corr;
            self.index[idx] = neighbor as i32;
        }
    }

    /// Merge another accumulator, keeping the higher correlation per slot.
    #[cfg(feature = "parallel")]
    fn merge(&mut self, other: &Self) {
        for i in 0..self.corr.len() {
            if other.corr[i] > self.corr[i] {
                self.corr[i] = other.corr[i];
                self.index[i] = other.index[i];
            }
        }
    }

    /// Convert to the output domain: correlations capped at 1.0, or
    /// z-normalized distances `sqrt(2w(1 - corr))` with untouched slots
    /// surfacing as `+inf`/unassigned.
    fn into_profile(self, window_size: usize, exclusion_zone: f64, cross_correlation: bool) -> MatrixProfile {
        let w = window_size as f64;
        let profile = self
            .corr
            .iter()
            .zip(self.index.iter())
            .map(|(&c, &ix)| {
                if cross_correlation {
                    c.min(1.0)
                } else if ix == UNASSIGNED {
                    f64::INFINITY
                } else {
                    let d = (2.0 * w * (1.0 - c.min(1.0))).max(0.0).sqrt();
                    if d.is_nan() {
                        0.0
                    } else {
                        d
                    }
                }
            })
            .collect();
        MatrixProfile {
            window_size,
            exclusion_zone,
            profile,
            index: self.index,
            left_profile: None,
            left_index: None,
            right_profile: None,
            right_index: None,
        }
    }
}

/// Diagonal-sweep matrix-profile computation (MPX).
///
/// Walks every admissible diagonal of the distance matrix, advancing the
/// window covariance in O(1) per cell via the df/dg recurrence and updating
/// both symmetric cells with a max-of-correlation check. No transform is
/// involved, which makes this the fastest strategy for pure self-joins.
pub struct Mpx {
    stats: RollingWindowStats,
    min_lag: Option<usize>,
    cross_correlation: bool,
}

impl Mpx {
    pub fn new(window_size: usize, capacity: usize) -> Result<Self> {
        if window_size < MIN_WINDOW_MPX {
            return Err(Error::WindowTooSmall {
                window_size,
                min: MIN_WINDOW_MPX,
            });
        }
        if capacity < window_size {
            return Err(Error::CapacityTooSmall {
                capacity,
                window_size,
            });
        }
        Ok(Self {
            stats: RollingWindowStats::new(window_size, capacity),
            min_lag: None,
            cross_correlation: false,
        })
    }

    /// Override the smallest admissible diagonal lag (default `ceil(w/4)`).
    pub fn with_min_lag(mut self, min_lag: usize) -> Self {
        self.min_lag = Some(min_lag);
        self
    }

    /// Emit Pearson correlations instead of z-normalized distances.
    pub fn with_cross_correlation(mut self, cross_correlation: bool) -> Self {
        self.cross_correlation = cross_correlation;
        self
    }

    pub fn update(&mut self, value: f64) {
        self.stats.apply(value);
    }

    pub fn is_ready(&self) -> bool {
        self.stats.is_ready()
    }

    pub fn get(&self) -> Option<MatrixProfile> {
        if !self.is_ready() {
            return None;
        }
        let w = self.stats.window_size();
        let min_lag = self
            .min_lag
            .unwrap_or_else(|| (w as f64 / 4.0).ceil() as usize);
        Some(compute_self(
            &self.stats,
            min_lag,
            self.cross_correlation,
        ))
    }

    /// AB-join against a second series; returns one profile per direction.
    pub fn join<Q: StatsView>(&self, query: &Q) -> Option<(MatrixProfile, MatrixProfile)> {
        if !self.is_ready() || query.data_size() < self.stats.window_size() {
            return None;
        }
        Some(compute_join(&self.stats, query, self.cross_correlation))
    }
}

/// Self-join matrix profile of a slice with the default minimum lag.
pub fn mpx(ts: &[f64], window_size: usize) -> Result<MatrixProfile> {
    if window_size < MIN_WINDOW_MPX {
        return Err(Error::WindowTooSmall {
            window_size,
            min: MIN_WINDOW_MPX,
        });
    }
    if ts.len() < window_size {
        return Err(Error::SeriesTooShort {
            len: ts.len(),
            window_size,
        });
    }
    let stats = RollingWindowStats::from_series(ts, window_size);
    let min_lag = (window_size as f64 / 4.0).ceil() as usize;
    Ok(compute_self(&stats, min_lag, false))
}

/// AB-join of two slices; returns `(a_vs_b, b_vs_a)` profiles.
pub fn mpx_ab_join(
    ts_a: &[f64],
    ts_b: &[f64],
    window_size: usize,
) -> Result<(MatrixProfile, MatrixProfile)> {
    if window_size < MIN_WINDOW_MPX {
        return Err(Error::WindowTooSmall {
            window_size,
            min: MIN_WINDOW_MPX,
        });
    }
    if ts_a.len() < window_size || ts_b.len() < window_size {
        return Err(Error::SeriesTooShort {
            len: ts_a.len().min(ts_b.len()),
            window_size,
        });
    }
    let stats_a = RollingWindowStats::from_series(ts_a, window_size);
    let stats_b = RollingWindowStats::from_series(ts_b, window_size);
    Ok(compute_join(&stats_a, &stats_b, false))
}

fn compute_self<V: StatsView>(view: &V, min_lag: usize, cross_correlation: bool) -> MatrixProfile {
    let w = view.window_size();
    let p_len = view.profile_len();
    let ctx = CovContext::compute(view);
    let mut acc = CorrAccumulator::new(p_len);
    let first_diag = min_lag + 1;
    trace!("mpx: {p_len} positions, diagonals {first_diag}..{p_len}");

    #[cfg(feature = "parallel")]
    {
        const MIN_PARALLEL_DIAGS: usize = 256;
        if p_len.saturating_sub(first_diag) >= MIN_PARALLEL_DIAGS {
            sweep_diagonals_parallel(&ctx, w, p_len, first_diag, &mut acc);
            let ez_fraction = min_lag as f64 / w as f64;
            return acc.into_profile(w, ez_fraction, cross_correlation);
        }
    }

    sweep_diagonals(&ctx, w, p_len, first_diag, p_len, &mut acc);
    let ez_fraction = min_lag as f64 / w as f64;
    acc.into_profile(w, ez_fraction, cross_correlation)
}

/// Walk diagonals `first_diag..end_diag`, updating both symmetric profile
/// cells per step.
fn sweep_diagonals(
    ctx: &CovContext,
    w: usize,
    p_len: usize,
    first_diag: usize,
    end_diag: usize,
    acc: &mut CorrAccumulator,
) {
    for diag in first_diag..end_diag {
        let mut cov = ctx.seed_cov(diag, 0, w);
        for offset in 0..p_len - diag {
            let col = offset + diag;
            // df[0] = dg[0] = 0, so the first step leaves the seed intact
            cov += ctx.df[offset] * ctx.dg[col] + ctx.df[col] * ctx.dg[offset];
            if !(ctx.valid[offset] && ctx.valid[col]) {
                continue;
            }
            let corr = cov * ctx.sig_inv[offset] * ctx.sig_inv[col];
            acc.update(offset, corr, col);
            acc.update(col, corr, offset);
        }
    }
}

/// Parallel diagonal sweep: load-balanced diagonal ranges go to thread-local
/// accumulators, merged by max-of-correlation afterwards.
#[cfg(feature = "parallel")]
fn sweep_diagonals_parallel(
    ctx: &CovContext,
    w: usize,
    p_len: usize,
    first_diag: usize,
    acc: &mut CorrAccumulator,
) {
    use rayon::prelude::*;

    use crate::algorithms::common::diagonal_ranges;

    let ranges = diagonal_ranges(first_diag, p_len, rayon::current_num_threads());
    let locals: Vec<CorrAccumulator> = ranges
        .into_par_iter()
        .map(|(start, end)| {
            let mut local = CorrAccumulator::new(p_len);
            sweep_diagonals(ctx, w, p_len, start, end, &mut local);
            local
        })
        .collect();

    for local in &locals {
        acc.merge(local);
    }
}

/// One direction of an AB-join: every pair `(k, j)` with `k = j + i`
/// for some start row `i` of A. Running it again with the series swapped
/// covers the remaining pairs; both passes update both output profiles.
fn join_pass(
    ctx_a: &CovContext,
    ctx_b: &CovContext,
    w: usize,
    acc_a: &mut CorrAccumulator,
    acc_b: &mut CorrAccumulator,
) {
    let p_len_a = acc_a.corr.len();
    let p_len_b = acc_b.corr.len();

    for i in 0..p_len_a {
        let mx = (p_len_a - i).min(p_len_b);
        let mut cov: f64 = (0..w)
            .map(|t| (ctx_a.x[i + t] - ctx_a.mean[i]) * (ctx_b.x[t] - ctx_b.mean[0]))
            .sum();
        for j in 0..mx {
            let k = j + i;
            cov += ctx_a.df[k] * ctx_b.dg[j] + ctx_a.dg[k] * ctx_b.df[j];
            if !(ctx_a.valid[k] && ctx_b.valid[j]) {
                continue;
            }
            let corr = cov * ctx_a.sig_inv[k] * ctx_b.sig_inv[j];
            acc_a.update(k, corr, j);
            acc_b.update(j, corr, k);
        }
    }
}

fn compute_join<A: StatsView, B: StatsView>(
    a: &A,
    b: &B,
    cross_correlation: bool,
) -> (MatrixProfile, MatrixProfile) {
    let w = a.window_size();
    let ctx_a = CovContext::compute(a);
    let ctx_b = CovContext::compute(b);
    let mut acc_a = CorrAccumulator::new(a.profile_len());
    let mut acc_b = CorrAccumulator::new(b.profile_len());

    join_pass(&ctx_a, &ctx_b, w, &mut acc_a, &mut acc_b);
    join_pass(&ctx_b, &ctx_a, w, &mut acc_b, &mut acc_a);

    (
        acc_a.into_profile(w, 0.0, cross_correlation),
        acc_b.into_profile(w, 0.0, cross_correlation),
    )
}
