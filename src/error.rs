use thiserror::Error;

/// Errors reported before any computation starts.
///
/// Numeric degeneracies (constant windows, NaN input, cancellation) are *not*
/// errors: they are sanitized in place so every computation terminates with a
/// well-formed result. "Not ready yet" is not an error either; `get()` returns
/// `None` until the underlying buffer holds a full window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("window size {window_size} is below the minimum of {min}")]
    WindowTooSmall { window_size: usize, min: usize },

    #[error("buffer capacity {capacity} cannot hold a window of {window_size} points")]
    CapacityTooSmall { capacity: usize, window_size: usize },

    #[error("series of {len} points is shorter than the window size {window_size}")]
    SeriesTooShort { len: usize, window_size: usize },

    #[error("query series ({query} points) is longer than the reference series ({data} points)")]
    QueryExceedsData { query: usize, data: usize },

    #[error("retention horizon {retention} must hold at least two windows of {window_size} points")]
    RetentionTooSmall { retention: usize, window_size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
