use crate::core::buffer::RingBuffer;

/// Numeric tolerance below which a standard deviation is treated as zero.
///
/// Square root of the machine epsilon of `f64`, the same guard the distance
/// formulas use before dividing by a window's standard deviation.
pub const EPS: f64 = 1.490_116_119_384_765_6e-8;

/// Replace NaN/infinite intermediate results with 0 so downstream divisions
/// degrade to the constant-window path instead of propagating NaN.
#[inline]
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Per-point statistics record, immutable once created.
///
/// `mean` and `std_dev` describe the window *ending* at this point. `skip`
/// marks windows contaminated by a non-finite input value; such windows
/// cannot be z-normalized and force an infinite distance wherever they
/// participate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStat {
    /// Raw value (0.0 if the original input was NaN/infinite).
    pub x: f64,
    /// Mean of the window ending at this point.
    pub mean: f64,
    /// Population standard deviation of the window ending at this point.
    pub std_dev: f64,
    /// Position in the original data stream, 1-based.
    pub id: u64,
    /// Whether the window ending here contains a non-finite input.
    pub skip: bool,
}

/// Read-only window-statistics accessors shared by every algorithm.
///
/// Logical index 0 refers to the oldest retained position. `x(i)` is the raw
/// value at position `i`; `mean`/`std_dev`/`skip` describe the window
/// *starting* at position `i` (the stats record of the point that closes it).
pub trait StatsView: Sync {
    fn window_size(&self) -> usize;

    /// Number of retained data points.
    fn data_size(&self) -> usize;

    fn x(&self, i: usize) -> f64;
    fn mean(&self, i: usize) -> f64;
    fn std_dev(&self, i: usize) -> f64;
    fn skip(&self, i: usize) -> bool;

    /// Number of fully formed windows: `data_size - window_size + 1`.
    fn profile_len(&self) -> usize {
        (self.data_size() + 1).saturating_sub(self.window_size())
    }

    /// Raw values in logical order.
    fn values(&self) -> Vec<f64> {
        (0..self.data_size()).map(|i| self.x(i)).collect()
    }
}

/// Rolling mean and standard deviation over a sliding window of a scalar
/// stream, updated in O(1) per point.
///
/// Owns a raw-value ring of exactly one window and a stats ring of
/// `capacity` records (the retention horizon). Uses Welford's recurrence
/// with sliding-window removal; the variance is clamped to >= 0 before the
/// square root and the result sanitized, so cancellation never leaks NaN.
#[derive(Debug, Clone)]
pub struct RollingWindowStats {
    window_size: usize,
    data: RingBuffer<f64>,
    stats: RingBuffer<WindowStat>,
    count: usize,
    mean: f64,
    var_sum: f64,
    total: u64,
    to_skip: usize,
}

impl RollingWindowStats {
    /// Create a store for windows of `window_size` points retaining up to
    /// `capacity` statistics records.
    pub fn new(window_size: usize, capacity: usize) -> Self {
        assert!(window_size >= 2, "Window size must be >= 2");
        assert!(
            capacity >= window_size,
            "Stats capacity must hold at least one window"
        );
        Self {
            window_size,
            data: RingBuffer::with_capacity(window_size),
            stats: RingBuffer::with_capacity(capacity),
            count: 0,
            mean: 0.0,
            var_sum: 0.0,
            total: 0,
            to_skip: 0,
        }
    }

    /// Build a fully populated store from a slice.
    pub fn from_series(values: &[f64], window_size: usize) -> Self {
        let mut stats = Self::new(window_size, values.len().max(window_size));
        for &v in values {
            stats.apply(v);
        }
        stats
    }

    /// Ingest one scalar and return the statistics record for the window
    /// ending at it.
    ///
    /// Non-finite input is accumulated as 0.0 and flags this and the next
    /// `window_size - 1` records as `skip`, since every window containing the
    /// point is unusable.
    pub fn apply(&mut self, value: f64) -> WindowStat {
        self.total += 1;
        let value = if value.is_finite() {
            self.to_skip = self.to_skip.saturating_sub(1);
            value
        } else {
            self.to_skip = self.window_size;
            0.0
        };

        if let Some(evicted) = self.data.push(value) {
            let n = self.count as f64;
            let updated = (n * self.mean - evicted) / (n - 1.0);
            self.var_sum -= (evicted - self.mean) * (evicted - updated);
            self.mean = updated;
            self.count -= 1;
        }
        self.count += 1;
        let n = self.count as f64;
        let prev_mean = self.mean;
        self.mean += (value - prev_mean) / n;
        self.var_sum += (value - prev_mean) * (value - self.mean);

        let variance = if self.count > 1 {
            (self.var_sum / n).max(0.0)
        } else {
            0.0
        };
        let stat = WindowStat {
            x: value,
            mean: self.mean,
            std_dev: sanitize(variance.sqrt()),
            id: self.total,
            skip: self.to_skip > 0,
        };
        self.stats.push(stat);
        stat
    }

    /// Whether a full window has been ingested.
    pub fn is_ready(&self) -> bool {
        self.data.is_full()
    }

    /// Total number of points ever ingested (including evicted ones).
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Stats record at logical index `i` (0 = oldest retained).
    pub fn stat(&self, i: usize) -> &WindowStat {
        self.stats.get(i)
    }
}

impl StatsView for RollingWindowStats {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn data_size(&self) -> usize {
        self.stats.len()
    }

    fn x(&self, i: usize) -> f64 {
        self.stats.get(i).x
    }

    fn mean(&self, i: usize) -> f64 {
        self.stats.get(i + self.window_size - 1).mean
    }

    fn std_dev(&self, i: usize) -> f64 {
        self.stats.get(i + self.window_size - 1).std_dev
    }

    fn skip(&self, i: usize) -> bool {
        self.stats.get(i + self.window_size - 1).skip
    }
}

/// Borrowed view over a contiguous run of statistics records.
///
/// Lets the streaming engine run the batch algorithms over its concatenated
/// history without copying it back into a ring.
#[derive(Debug, Clone, Copy)]
pub struct StatsSlice<'a> {
    stats: &'a [WindowStat],
    window_size: usize,
}

impl<'a> StatsSlice<'a> {
    pub fn new(stats: &'a [WindowStat], window_size: usize) -> Self {
        debug_assert!(stats.len() >= window_size);
        Self { stats, window_size }
    }
}

impl StatsView for StatsSlice<'_> {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn data_size(&self) -> usize {
        self.stats.len()
    }

    fn x(&self, i: usize) -> f64 {
        self.stats[i].x
    }

    fn mean(&self, i: usize) -> f64 {
        self.stats[i + self.window_size - 1].mean
    }

    fn std_dev(&self, i: usize) -> f64 {
        self.stats[i + self.window_size - 1].std_dev
    }

    fn skip(&self, i: usize) -> bool {
        self.stats[i + self.window_size - 1].skip
    }
}
