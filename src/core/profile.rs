use crate::core::stats::EPS;

/// Index sentinel for profile positions that have no assigned neighbor yet.
pub const UNASSIGNED: i32 = -1;

/// Exclusion-zone radius in positions for a window size and fraction.
///
/// The small epsilon keeps `0.5 * even_window` from landing just below the
/// integer boundary.
pub(crate) fn exclusion_zone_len(window_size: usize, fraction: f64) -> usize {
    (window_size as f64 * fraction + EPS).floor() as usize
}

/// The matrix profile: per-subsequence nearest-neighbor distance and location.
///
/// `index[i]` is `-1` while position `i` has no assigned neighbor, otherwise
/// the neighbor's position. Self-joins also carry directional profiles: the
/// left profile only admits neighbors at or before each position, the right
/// profile only at or after; AB-joins carry neither.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixProfile {
    /// Subsequence length the profile was computed with.
    pub window_size: usize,
    /// Exclusion-zone fraction applied around self-matches (0 for joins).
    pub exclusion_zone: f64,
    /// Nearest-neighbor distance per subsequence (`+inf` when unmatched).
    pub profile: Vec<f64>,
    /// Nearest-neighbor position per subsequence (`-1` when unmatched).
    pub index: Vec<i32>,
    pub left_profile: Option<Vec<f64>>,
    pub left_index: Option<Vec<i32>>,
    pub right_profile: Option<Vec<f64>>,
    pub right_index: Option<Vec<i32>>,
}

impl MatrixProfile {
    /// Fresh self-join profile: all distances infinite, all indices unassigned,
    /// directional arrays present.
    pub fn new_self_join(len: usize, window_size: usize, exclusion_zone: f64) -> Self {
        Self {
            window_size,
            exclusion_zone,
            profile: vec![f64::INFINITY; len],
            index: vec![UNASSIGNED; len],
            left_profile: Some(vec![f64::INFINITY; len]),
            left_index: Some(vec![UNASSIGNED; len]),
            right_profile: Some(vec![f64::INFINITY; len]),
            right_index: Some(vec![UNASSIGNED; len]),
        }
    }

    /// Fresh AB-join profile: no exclusion zone, no directional arrays.
    pub fn new_join(len: usize, window_size: usize) -> Self {
        Self {
            window_size,
            exclusion_zone: 0.0,
            profile: vec![f64::INFINITY; len],
            index: vec![UNASSIGNED; len],
            left_profile: None,
            left_index: None,
            right_profile: None,
            right_index: None,
        }
    }

    pub fn len(&self) -> usize {
        self.profile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// Merge one query's distance profile into the accumulated result.
    ///
    /// Entries within `ez` positions of `query_idx` are suppressed as trivial
    /// matches before the lower-distance check. For self-joins the directional
    /// arrays admit the query as a left neighbor of positions at or after it
    /// and as a right neighbor of positions at or before it.
    pub(crate) fn merge_row(&mut self, distances: &[f64], query_idx: usize, ez: usize) {
        for (k, &raw) in distances.iter().enumerate() {
            let d = if ez > 0 && k.abs_diff(query_idx) <= ez {
                f64::INFINITY
            } else {
                raw
            };
            if d < self.profile[k] {
                self.profile[k] = d;
                self.index[k] = query_idx as i32;
            }
            if let (Some(lp), Some(li)) = (self.left_profile.as_mut(), self.left_index.as_mut()) {
                if k >= query_idx && d < lp[k] {
                    lp[k] = d;
                    li[k] = query_idx as i32;
                }
            }
            if let (Some(rp), Some(ri)) = (self.right_profile.as_mut(), self.right_index.as_mut()) {
                if k <= query_idx && d < rp[k] {
                    rp[k] = d;
                    ri[k] = query_idx as i32;
                }
            }
        }
    }

    /// Merge another profile into this one, taking element-wise minimums.
    ///
    /// Combines thread-local accumulators after a parallel run; each
    /// profile/index pair is a monotonically-improving register, so the
    /// strictly-smaller check never loses a better candidate.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.profile.len(), other.profile.len());
        for i in 0..self.profile.len() {
            if other.profile[i] < self.profile[i] {
                self.profile[i] = other.profile[i];
                self.index[i] = other.index[i];
            }
        }
        merge_side(&mut self.left_profile, &mut self.left_index, &other.left_profile, &other.left_index);
        merge_side(&mut self.right_profile, &mut self.right_index, &other.right_profile, &other.right_index);
    }
}

fn merge_side(
    profile: &mut Option<Vec<f64>>,
    index: &mut Option<Vec<i32>>,
    other_profile: &Option<Vec<f64>>,
    other_index: &Option<Vec<i32>>,
) {
    if let (Some(p), Some(ix), Some(op), Some(oix)) =
        (profile.as_mut(), index.as_mut(), other_profile, other_index)
    {
        for i in 0..p.len() {
            if op[i] < p[i] {
                p[i] = op[i];
                ix[i] = oix[i];
            }
        }
    }
}

/// A matrix profile extended as its series grows, with aged history evicted.
///
/// All stored indices are relative to the current, post-eviction coordinate
/// frame; `offset` counts the evicted leading positions, so the original
/// stream position of local index `i` is `offset + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineMatrixProfile {
    /// Number of evicted leading positions.
    pub offset: i64,
    pub mp: MatrixProfile,
}

impl OnlineMatrixProfile {
    pub fn new(mp: MatrixProfile) -> Self {
        Self { offset: 0, mp }
    }

    /// Stream-global position of local profile index `i`.
    pub fn global_index(&self, i: usize) -> i64 {
        self.offset + i as i64
    }

    /// Grow every array by `k` trailing slots filled with `+inf`/`-1`.
    pub fn extend(&mut self, k: usize) {
        extend_arrays(&mut self.mp.profile, &mut self.mp.index, k);
        if let (Some(p), Some(ix)) = (self.mp.left_profile.as_mut(), self.mp.left_index.as_mut()) {
            extend_arrays(p, ix, k);
        }
        if let (Some(p), Some(ix)) = (self.mp.right_profile.as_mut(), self.mp.right_index.as_mut()) {
            extend_arrays(p, ix, k);
        }
    }

    /// Evict the `k` oldest positions and rebase every surviving index.
    ///
    /// Assigned indices shift down by `k`; an index that referenced an evicted
    /// position no longer points anywhere meaningful, so its entry reverts to
    /// unmatched rather than going negative.
    pub fn advance(&mut self, k: usize) {
        advance_arrays(&mut self.mp.profile, &mut self.mp.index, k);
        if let (Some(p), Some(ix)) = (self.mp.left_profile.as_mut(), self.mp.left_index.as_mut()) {
            advance_arrays(p, ix, k);
        }
        if let (Some(p), Some(ix)) = (self.mp.right_profile.as_mut(), self.mp.right_index.as_mut()) {
            advance_arrays(p, ix, k);
        }
        self.offset += k as i64;
    }
}

fn extend_arrays(profile: &mut Vec<f64>, index: &mut Vec<i32>, k: usize) {
    profile.resize(profile.len() + k, f64::INFINITY);
    index.resize(index.len() + k, UNASSIGNED);
}

fn advance_arrays(profile: &mut Vec<f64>, index: &mut Vec<i32>, k: usize) {
    profile.drain(0..k);
    index.drain(0..k);
    for (p, ix) in profile.iter_mut().zip(index.iter_mut()) {
        if *ix >= 0 {
            if (*ix as usize) < k {
                *p = f64::INFINITY;
                *ix = UNASSIGNED;
            } else {
                *ix -= k as i32;
            }
        }
    }
}
