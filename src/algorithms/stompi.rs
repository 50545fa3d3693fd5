use log::debug;

use crate::algorithms::common::FftCorrelator;
use crate::algorithms::distance::{fft_distance_profile, znorm_distance};
use crate::algorithms::stomp::{self, MIN_WINDOW};
use crate::core::profile::{exclusion_zone_len, OnlineMatrixProfile, UNASSIGNED};
use crate::core::stats::{RollingWindowStats, StatsSlice, StatsView, WindowStat, EPS};
use crate::error::{Error, Result};

/// Streaming matrix-profile engine (incremental STOMP).
///
/// `update()` ingests points in O(1); `get()` flushes them into the profile,
/// computing distance profiles only for the newly completed subsequences and
/// merging them into the existing arrays. History beyond the retention
/// horizon is evicted on flush and all indices rebased into the surviving
/// coordinate frame (`offset` tracks the evicted prefix).
///
/// The engine exclusively owns its profile; the reference returned by `get()`
/// must be cloned if it is to outlive the next `update()` call. Batch and
/// streaming results are identical for the same input ordering.
pub struct OnlineStomp {
    stats: RollingWindowStats,
    history: Vec<WindowStat>,
    profile: Option<OnlineMatrixProfile>,
    new_points: usize,
    retention: Option<usize>,
    exclusion_zone: f64,
}

impl OnlineStomp {
    /// Create an engine with an unbounded retention horizon.
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size < MIN_WINDOW {
            return Err(Error::WindowTooSmall {
                window_size,
                min: MIN_WINDOW,
            });
        }
        Ok(Self {
            stats: RollingWindowStats::new(window_size, window_size),
            history: Vec::new(),
            profile: None,
            new_points: 0,
            retention: None,
            exclusion_zone: 0.5,
        })
    }

    /// Bound retained history to `retention` points; older positions are
    /// evicted on flush and indices rebased.
    pub fn with_retention(mut self, retention: usize) -> Result<Self> {
        let w = self.stats.window_size();
        if retention < 2 * w {
            return Err(Error::RetentionTooSmall {
                retention,
                window_size: w,
            });
        }
        self.retention = Some(retention);
        Ok(self)
    }

    pub fn with_exclusion_zone(mut self, fraction: f64) -> Self {
        self.exclusion_zone = fraction;
        self
    }

    /// Buffer one point. O(1): one rolling-statistics update and a counter.
    pub fn update(&mut self, value: f64) {
        let stat = self.stats.apply(value);
        self.history.push(stat);
        if self.profile.is_some() {
            self.new_points += 1;
        }
    }

    pub fn window_size(&self) -> usize {
        self.stats.window_size()
    }

    /// Retained statistics records, oldest first.
    pub fn history(&self) -> &[WindowStat] {
        &self.history
    }

    /// Flush buffered points and return the up-to-date profile, or `None`
    /// while fewer than one full window has been ingested.
    pub fn get(&mut self) -> Option<&OnlineMatrixProfile> {
        if !self.stats.is_ready() {
            return None;
        }
        if self.profile.is_none() {
            let view = StatsSlice::new(&self.history, self.stats.window_size());
            let mp = stomp::compute(&view, &view, false, self.exclusion_zone);
            debug!(
                "online stomp: initial batch over {} points ({} positions)",
                self.history.len(),
                mp.len()
            );
            self.profile = Some(OnlineMatrixProfile::new(mp));
            self.new_points = 0;
        } else if self.new_points > 0 {
            self.flush();
        }
        self.evict_aged();
        self.profile.as_ref()
    }

    /// Merge the buffered points into the existing profile.
    ///
    /// One FFT over the extended series covers the earliest new query; every
    /// later new query advances the sliding dot products with the same
    /// drop/add recurrence the batch algorithm uses, which keeps the flush at
    /// O(buffer length) per point instead of O(n log n).
    fn flush(&mut self) {
        let w = self.stats.window_size();
        let n = self.history.len();
        let mp_len = n - w + 1;
        let first_query = mp_len - self.new_points;
        let ez = exclusion_zone_len(w, self.exclusion_zone);
        debug!(
            "online stomp: flushing {} new points into {} positions",
            self.new_points, mp_len
        );

        let online = self.profile.as_mut().expect("flush requires a profile");
        online.extend(self.new_points);

        let view = StatsSlice::new(&self.history, w);
        let values = view.values();
        let corr = FftCorrelator::new(&values, w);

        // Products of the series head against every window: refills slot 0,
        // which the drop/add recurrence cannot reach. Only needed when more
        // than one new query is flushed at once.
        let row_zero_products = if self.new_points > 1 {
            corr.sliding_products(&values[0..w])
        } else {
            Vec::new()
        };

        let mut products: Vec<f64> = Vec::new();
        let mut distances: Vec<f64> = Vec::new();
        let mut drop_value = 0.0;

        for i in 0..self.new_points {
            let s = first_query + i;
            if i == 0 {
                let dp = fft_distance_profile(&view, &view, s, &corr);
                products = dp.products;
                distances = dp.distances;
            } else {
                let q_last = values[s + w - 1];
                for j in (1..mp_len).rev() {
                    products[j] =
                        products[j - 1] - values[j - 1] * drop_value + values[j + w - 1] * q_last;
                }
                products[0] = row_zero_products[s];

                let q_mean = view.mean(s);
                let q_std = view.std_dev(s);
                let q_bad = view.skip(s) || q_std <= EPS;
                for (j, d) in distances.iter_mut().enumerate() {
                    *d = if q_bad || view.skip(j) {
                        f64::INFINITY
                    } else {
                        znorm_distance(products[j], w, view.mean(j), view.std_dev(j), q_mean, q_std)
                    };
                }
            }
            drop_value = values[s];

            // One-sided exclusion: every admissible neighbor of a new suffix
            // position lies strictly before its trivial-match zone. Pairs of
            // new positions are still covered once, from the later row.
            let exc_start = s.saturating_sub(ez);
            let mp = &mut online.mp;
            let mut row_min = f64::INFINITY;
            let mut row_min_idx = UNASSIGNED;
            for (j, &raw) in distances.iter().enumerate() {
                let d = if j >= exc_start { f64::INFINITY } else { raw };
                if d < mp.profile[j] {
                    mp.profile[j] = d;
                    mp.index[j] = s as i32;
                }
                if d < row_min {
                    row_min = d;
                    row_min_idx = j as i32;
                }
                if let (Some(lp), Some(li)) = (mp.left_profile.as_mut(), mp.left_index.as_mut()) {
                    if j >= s && d < lp[j] {
                        lp[j] = d;
                        li[j] = s as i32;
                    }
                }
                if let (Some(rp), Some(ri)) = (mp.right_profile.as_mut(), mp.right_index.as_mut()) {
                    if j <= s && d < rp[j] {
                        rp[j] = d;
                        ri[j] = s as i32;
                    }
                }
            }

            // The new position's own entry is the row minimum; every
            // candidate is a left neighbor by construction.
            let mp = &mut online.mp;
            mp.profile[s] = row_min;
            mp.index[s] = row_min_idx;
            if let (Some(lp), Some(li)) = (mp.left_profile.as_mut(), mp.left_index.as_mut()) {
                lp[s] = row_min;
                li[s] = row_min_idx;
            }
        }

        self.new_points = 0;
    }

    fn evict_aged(&mut self) {
        let Some(retention) = self.retention else {
            return;
        };
        let excess = self.history.len().saturating_sub(retention);
        if excess == 0 {
            return;
        }
        self.history.drain(0..excess);
        if let Some(online) = self.profile.as_mut() {
            online.advance(excess);
            debug!(
                "online stomp: evicted {excess} aged positions (offset now {})",
                online.offset
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::stomp::stomp;

    fn series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (i as f64 * 0.33).sin() + 0.2 * (i as f64 * 0.071).cos())
            .collect()
    }

    #[test]
    fn test_streaming_equals_batch_every_prefix() {
        let ts = series(60);
        let w = 5;
        let mut engine = OnlineStomp::new(w).unwrap();

        for (p, &v) in ts.iter().enumerate() {
            engine.update(v);
            let Some(online) = engine.get().map(|o| o.clone()) else {
                assert!(p + 1 < w);
                continue;
            };
            let batch = stomp(&ts[..=p], w).unwrap();
            assert_eq!(online.mp.len(), batch.len(), "length mismatch at prefix {p}");
            for i in 0..batch.len() {
                let (s, b) = (online.mp.profile[i], batch.profile[i]);
                assert!(
                    (s - b).abs() < 1e-6 || (s.is_infinite() && b.is_infinite()),
                    "prefix {p}, position {i}: streaming={s}, batch={b}"
                );
            }
        }
    }

    #[test]
    fn test_batched_flush_equals_batch() {
        // Flushing many points at once exercises the drop/add recurrence path
        let ts = series(80);
        let w = 6;
        let mut engine = OnlineStomp::new(w).unwrap();
        for &v in &ts[..30] {
            engine.update(v);
        }
        engine.get().expect("ready");
        for &v in &ts[30..] {
            engine.update(v);
        }
        let online = engine.get().unwrap();

        let batch = stomp(&ts, w).unwrap();
        for i in 0..batch.len() {
            let (s, b) = (online.mp.profile[i], batch.profile[i]);
            assert!(
                (s - b).abs() < 1e-6 || (s.is_infinite() && b.is_infinite()),
                "position {i}: streaming={s}, batch={b}"
            );
        }
        // Directional profiles must agree too
        let (sl, bl) = (
            online.mp.left_profile.as_ref().unwrap(),
            batch.left_profile.as_ref().unwrap(),
        );
        for i in 0..batch.len() {
            assert!(
                (sl[i] - bl[i]).abs() < 1e-6 || (sl[i].is_infinite() && bl[i].is_infinite()),
                "left profile mismatch at {i}: streaming={}, batch={}",
                sl[i],
                bl[i]
            );
        }
    }

    #[test]
    fn test_eviction_rebases_indices() {
        let ts = series(100);
        let w = 5;
        let retention = 40;
        let mut engine = OnlineStomp::new(w)
            .unwrap()
            .with_retention(retention)
            .unwrap();

        let mut last_offset = 0i64;
        for &v in &ts {
            engine.update(v);
            if let Some(online) = engine.get().cloned() {
                assert!(online.offset >= last_offset, "offset must be monotone");
                last_offset = online.offset;
                assert!(engine.history.len() <= retention);
                let len = online.mp.len() as i32;
                for &ix in &online.mp.index {
                    assert!(ix >= UNASSIGNED && ix < len, "index {ix} out of frame");
                }
            }
        }
        assert!(last_offset > 0, "eviction never happened");
        let offset = engine.get().unwrap().offset;
        assert_eq!(offset as usize + engine.history.len(), ts.len());
    }

    #[test]
    fn test_evicted_window_matches_fresh_batch_tail() {
        // After eviction the retained profile must still describe the
        // retained window: surviving entries whose neighbors also survived
        // agree with a batch run over the retained data.
        let ts = series(90);
        let w = 5;
        let retention = 50;
        let mut engine = OnlineStomp::new(w)
            .unwrap()
            .with_retention(retention)
            .unwrap();
        for &v in &ts {
            engine.update(v);
        }
        let online = engine.get().unwrap().clone();
        let offset = online.offset as usize;
        assert!(offset > 0);

        let batch = stomp(&ts[offset..], w).unwrap();
        assert_eq!(online.mp.len(), batch.len());
        for i in 0..batch.len() {
            let s = online.mp.profile[i];
            // The batch over the tail may find neighbors the streaming run
            // assigned before eviction orphaned them; surviving assignments
            // must never be better than the batch optimum.
            assert!(
                s + 1e-6 >= batch.profile[i] || (s.is_infinite() && batch.profile[i].is_infinite()),
                "position {i}: streaming={s} beats batch={}",
                batch.profile[i]
            );
        }
    }

    #[test]
    fn test_not_ready_returns_none() {
        let mut engine = OnlineStomp::new(4).unwrap();
        for v in 0..3 {
            engine.update(v as f64);
            assert!(engine.get().is_none());
        }
        engine.update(3.0);
        assert!(engine.get().is_some());
    }

    #[test]
    fn test_retention_too_small_rejected() {
        let engine = OnlineStomp::new(10).unwrap().with_retention(15);
        assert!(matches!(
            engine,
            Err(Error::RetentionTooSmall {
                retention: 15,
                window_size: 10
            })
        ));
    }
}
