use log::trace;

use crate::algorithms::common::FftCorrelator;
use crate::algorithms::distance::{fft_distance_profile, znorm_distance};
use crate::core::profile::{exclusion_zone_len, MatrixProfile};
use crate::core::stats::{RollingWindowStats, StatsView, EPS};
use crate::error::{Error, Result};

/// Minimum window size for the FFT-based batch algorithms.
pub(crate) const MIN_WINDOW: usize = 4;

/// Exact ordered matrix-profile computation (STOMP).
///
/// Streams points into a rolling-statistics buffer; once the buffer holds a
/// full window, `get()` assembles the complete self-join profile. The first
/// query's distance profile comes from one FFT pass; every later query reuses
/// the previous row's sliding dot products through an O(1) drop/add
/// recurrence, so the whole profile costs O(n^2) instead of O(n^2 log n).
pub struct Stomp {
    stats: RollingWindowStats,
    exclusion_zone: f64,
}

impl Stomp {
    /// Create an instance for windows of `window_size` points, retaining up
    /// to `capacity` points of history.
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
        })
    }

    /// Override the exclusion-zone fraction (default 0.5: half a window on
    /// each side of a self-match is suppressed as trivial).
    pub fn with_exclusion_zone(mut self, fraction: f64) -> Self {
        self.exclusion_zone = fraction;
        self
    }

    /// Ingest one point.
    pub fn update(&mut self, value: f64) {
        self.stats.apply(value);
    }

    pub fn is_ready(&self) -> bool {
        self.stats.is_ready()
    }

    pub fn stats(&self) -> &RollingWindowStats {
        &self.stats
    }

    /// Self-join matrix profile over the retained buffer, or `None` while the
    /// buffer has not yet seen a full window.
    pub fn get(&self) -> Option<MatrixProfile> {
        if !self.is_ready() {
            return None;
        }
        Some(compute(&self.stats, &self.stats, false, self.exclusion_zone))
    }

    /// AB-join: nearest neighbor in the retained buffer for every query
    /// subsequence. No exclusion zone and no directional profiles apply
    /// across two distinct series.
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
        Ok(Some(compute(&self.stats, query, true, self.exclusion_zone)))
    }
}

/// Self-join matrix profile of a slice with the default exclusion zone.
pub fn stomp(ts: &[f64], window_size: usize) -> Result<MatrixProfile> {
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
    Ok(compute(&stats, &stats, false, 0.5))
}

/// AB-join of two slices: for every window of `ts`, the nearest window of
/// `query` (the profile spans `ts` positions, indices address `query`).
pub fn stomp_join(ts: &[f64], query: &[f64], window_size: usize) -> Result<MatrixProfile> {
    if window_size < MIN_WINDOW {
        return Err(Error::WindowTooSmall {
            window_size,
            min: MIN_WINDOW,
        });
    }
    if ts.len() < window_size || query.len() < window_size {
        return Err(Error::SeriesTooShort {
            len: ts.len().min(query.len()),
            window_size,
        });
    }
    if query.len() > ts.len() {
        return Err(Error::QueryExceedsData {
            query: query.len(),
            data: ts.len(),
        });
    }
    let stats = RollingWindowStats::from_series(ts, window_size);
    let query_stats = RollingWindowStats::from_series(query, window_size);
    Ok(compute(&stats, &query_stats, true, 0.5))
}

/// Core STOMP loop, shared by self-joins (`query` aliases `data`) and
/// AB-joins.
///
/// Phase one computes the first query's distance profile and keeps its
/// sliding dot products. Phase two advances the products row by row:
/// `QT[i][j] = QT[i-1][j-1] - x[j-1]*drop + x[j+w-1]*q[i+w-1]`, walked
/// right-to-left so each update reads pre-update values, with slot 0 refilled
/// from the first row's products of the opposite orientation.
pub(crate) fn compute<D: StatsView, Q: StatsView>(
    data: &D,
    query: &Q,
    is_join: bool,
    exclusion_zone: f64,
) -> MatrixProfile {
    let w = data.window_size();
    let mp_len = data.profile_len();
    let num_queries = query.profile_len();
    let ez = if is_join {
        0
    } else {
        exclusion_zone_len(w, exclusion_zone)
    };
    trace!("stomp: {mp_len} positions, {num_queries} queries, exclusion zone {ez}");

    let mut mp = if is_join {
        MatrixProfile::new_join(mp_len, w)
    } else {
        MatrixProfile::new_self_join(mp_len, w, exclusion_zone)
    };

    let data_values = data.values();
    let corr = FftCorrelator::new(&data_values, w);
    let first = fft_distance_profile(data, query, 0, &corr);
    let mut products = first.products;
    let mut distances = first.distances;

    // Dot products of the data's first window against every query window;
    // refills slot 0 of each row, which the diagonal recurrence cannot reach.
    let row_zero_products = if is_join {
        let query_corr = FftCorrelator::new(&query.values(), w);
        query_corr.sliding_products(&data_values[0..w])
    } else {
        products.clone()
    };

    mp.merge_row(&distances, 0, ez);

    let mut drop_value = query.x(0);
    for i in 1..num_queries {
        let q_last = query.x(i + w - 1);
        for j in (1..mp_len).rev() {
            products[j] = products[j - 1] - data.x(j - 1) * drop_value + data.x(j + w - 1) * q_last;
        }
        products[0] = row_zero_products[i];
        drop_value = query.x(i);

        let q_mean = query.mean(i);
        let q_std = query.std_dev(i);
        let q_bad = query.skip(i) || q_std <= EPS;
        for (j, d) in distances.iter_mut().enumerate() {
            *d = if q_bad || data.skip(j) {
                f64::INFINITY
            } else {
                znorm_distance(products[j], w, data.mean(j), data.std_dev(j), q_mean, q_std)
            };
        }
        mp.merge_row(&distances, i, ez);
    }

    mp
}
