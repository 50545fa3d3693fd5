//! Matrix profile computation for scalar time series.
//!
//! The matrix profile records, for every subsequence of a fixed window
//! length, the z-normalized Euclidean distance to its nearest non-trivial
//! neighbor and that neighbor's position. It is the base primitive for
//! motif discovery, discord (anomaly) detection, and most downstream
//! time-series similarity analyses.
//!
//! Three interchangeable batch strategies produce the same result:
//!
//! - [`Stomp`]: exact ordered computation; one FFT pass, then an O(1)
//!   dot-product recurrence per query row.
//! - [`Stamp`]: anytime computation; queries visited in a seedable random
//!   permutation, each row independent, interruptible at any prefix.
//! - [`Mpx`]: diagonal covariance sweep; no transform at all, fastest for
//!   self-joins, and the basis for AB-join profile pairs.
//!
//! [`OnlineStomp`] extends a profile incrementally as new points arrive and
//! evicts aged history beyond a retention horizon.
//!
//! # Examples
//!
//! ```
//! use matrix_profile::stomp;
//!
//! let ts = vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 2.0];
//! let mp = stomp(&ts, 4).unwrap();
//! assert_eq!(mp.profile.len(), ts.len() - 4 + 1);
//! // The identical subsequences at 0 and 6 find each other
//! assert!(mp.profile[0] < 1e-6);
//! assert_eq!(mp.index[0], 6);
//! ```
//!
//! Streaming use:
//!
//! ```
//! use matrix_profile::OnlineStomp;
//!
//! let mut engine = OnlineStomp::new(4).unwrap();
//! for i in 0..32 {
//!     engine.update((i as f64 * 0.5).sin());
//! }
//! let online = engine.get().expect("window is full");
//! assert_eq!(online.mp.profile.len(), 32 - 4 + 1);
//! ```

pub mod algorithms;
pub mod core;
mod error;

pub use crate::algorithms::common::{sliding_dot_product_naive, FftCorrelator};
pub use crate::algorithms::distance::{distance_profile, DistanceProfileStrategy};
pub use crate::algorithms::mpx::{mpx, mpx_ab_join, Mpx};
pub use crate::algorithms::stamp::{stamp, Stamp};
pub use crate::algorithms::stomp::{stomp, stomp_join, Stomp};
pub use crate::algorithms::stompi::OnlineStomp;
pub use crate::core::profile::{MatrixProfile, OnlineMatrixProfile, UNASSIGNED};
pub use crate::core::stats::{RollingWindowStats, StatsSlice, StatsView, WindowStat, EPS};
pub use crate::error::{Error, Result};
