use log::trace;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::algorithms::common::FftCorrelator;
use crate::algorithms::distance::fft_distance_profile;
use crate::algorithms::stomp::MIN_WINDOW;
use crate::core::profile::{exclusion_zone_len, MatrixProfile};
use crate::core::stats::{RollingWindowStats, StatsView};
use crate::error::{Error, Result};

/// Minimum number of sampled queries before dispatching to the parallel path.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_QUERIES: usize = 256;

/// Anytime matrix-profile computation (STAMP).
///
/// Visits queries in a uniformly shuffled permutation and computes each
/// query's distance profile independently through the FFT strategy. After any
/// prefix of the permutation the accumulated profile is a valid upper-bound
/// approximation that converges to the exact result, so interrupting early
/// (or capping `sample_size`) trades completeness for speed.
///
/// The permutation seed is an explicit parameter; runs with the same seed and
/// input are identical.
pub struct Stamp {
    stats: RollingWindowStats,
    exclusion_zone: f64,
    sample_size: Option<usize>,
    seed: Option<u64>,
}

impl Stamp {
    pub fn new(window_size: usize, capacity: usize) -> Result<Self> {
        if window_size < MIN_WINDOW {
            return Err(Error::WindowTooSmall {
                window_size,
                min: MIN_WINDOW,
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
            exclusion_zone: 0.5,
            sample_size: None,
            seed: None,
        })
    }

    pub fn with_exclusion_zone(mut self, fraction: f64) -> Self {
        self.exclusion_zone = fraction;
        self
    }

    /// Cap the number of queries processed; the result is approximate below
    /// the full query count.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    /// Fix the permutation seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
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
        Some(compute(
            &self.stats,
            &self.stats,
            false,
            self.exclusion_zone,
            self.sample_size,
            self.seed,
        ))
    }

    pub fn join<Q: StatsView>(&self, query: &Q) -> Result<Option<MatrixProfile>> {
        if query.data_size() > self.stats.data_size() {
            return Err(Error::QueryExceedsData {
                query: query.data_size(),
                data: self.stats.data_size(),
            });
        }
        if !self.is_ready() || query.data_size() < self.stats.window_size() {
            return Ok(None);
        }
        Ok(Some(compute(
            &self.stats,
            query,
            true,
            self.exclusion_zone,
            self.sample_size,
            self.seed,
        )))
    }
}

/// Self-join matrix profile of a slice, visiting all queries (seeded).
pub fn stamp(ts: &[f64], window_size: usize, seed: Option<u64>) -> Result<MatrixProfile> {
    if window_size < MIN_WINDOW {
        return Err(Error::WindowTooSmall {
            window_size,
            min: MIN_WINDOW,
        });
    }
    if ts.len() < window_size {
        return Err(Error::SeriesTooShort {
            len: ts.len(),
            window_size,
        });
    }
    let stats = RollingWindowStats::from_series(ts, window_size);
    Ok(compute(&stats, &stats, false, 0.5, None, seed))
}

fn compute<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    is_join: bool,
    exclusion_zone: f64,
    sample_size: Option<usize>,
    seed: Option<u64>,
) -> MatrixProfile {
    let w = data.window_size();
    let mp_len = data.profile_len();
    let num_queries = query.profile_len();
    let ez = if is_join {
        0
    } else {
        exclusion_zone_len(w, exclusion_zone)
    };

    let mut order: Vec<usize> = (0..num_queries).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    order.shuffle(&mut rng);
    if let Some(s) = sample_size {
        order.truncate(s.min(num_queries));
    }
    trace!(
        "stamp: {mp_len} positions, {} of {num_queries} queries sampled",
        order.len()
    );

    let corr = FftCorrelator::new(&data.values(), w);

    #[cfg(feature = "parallel")]
    if order.len() >= MIN_PARALLEL_QUERIES {
        return compute_parallel(data, query, is_join, exclusion_zone, ez, &order, &corr);
    }

    let mut mp = if is_join {
        MatrixProfile::new_join(mp_len, w)
    } else {
        MatrixProfile::new_self_join(mp_len, w, exclusion_zone)
    };
    for &i in &order {
        let dp = fft_distance_profile(data, query, i, &corr);
        mp.merge_row(&dp.distances, i, ez);
    }
    mp
}

/// Parallel anytime computation: chunks of the permutation go to thread-local
/// profiles, merged with element-wise minimums afterwards. Every profile slot
/// only ever improves, so the merge order cannot lose a better candidate.
#[cfg(feature = "parallel")]
fn compute_parallel<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    is_join: bool,
    exclusion_zone: f64,
    ez: usize,
    order: &[usize],
    corr: &FftCorrelator,
) -> MatrixProfile {
    use rayon::prelude::*;

    let w = data.window_size();
    let mp_len = data.profile_len();
    let chunk_size = order.len().div_ceil(rayon::current_num_threads());

    order
        .par_chunks(chunk_size.max(1))
        .map(|chunk| {
            let mut local = if is_join {
                MatrixProfile::new_join(mp_len, w)
            } else {
                MatrixProfile::new_self_join(mp_len, w, exclusion_zone)
            };
            for &i in chunk {
                let dp = fft_distance_profile(data, query, i, corr);
                local.merge_row(&dp.distances, i, ez);
            }
            local
        })
        .reduce_with(|mut a, b| {
            a.merge(&b);
            a
        })
        .unwrap_or_else(|| {
            if is_join {
                MatrixProfile::new_join(mp_len, w)
            } else {
                MatrixProfile::new_self_join(mp_len, w, exclusion_zone)
            }
        })
}
