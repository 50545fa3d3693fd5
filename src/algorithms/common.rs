use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

/// Naive O(n*m) sliding dot product.
///
/// Reference implementation for tests and small inputs; element `i` of the
/// result is `dot(q, ts[i..i+m])`.
pub fn sliding_dot_product_naive(q: &[f64], ts: &[f64]) -> Vec<f64> {
    let m = q.len();
    assert!(ts.len() >= m, "Time series shorter than query");
    let n_subs = ts.len() - m + 1;

    (0..n_subs)
        .map(|i| q.iter().zip(&ts[i..i + m]).map(|(a, b)| a * b).sum())
        .collect()
}

/// FFT cross-correlator with a cached series spectrum.
///
/// Pads to the next power of two >= `n + m - 1`, transforms the series once,
/// and answers sliding-dot-product queries with one forward and one inverse
/// transform each. The batch algorithms compute one profile per query from
/// these products, so caching the series side halves the transform work.
pub struct FftCorrelator {
    window_size: usize,
    n_subs: usize,
    fft_len: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    spectrum: Vec<Complex<f64>>,
}

impl FftCorrelator {
    /// Plan transforms for `data` and queries of `window_size` points.
    pub fn new(data: &[f64], window_size: usize) -> Self {
        let n = data.len();
        assert!(n >= window_size, "Time series shorter than window");
        let conv_len = n + window_size - 1;
        let fft_len = conv_len.next_power_of_two();

        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let mut padded = vec![0.0; fft_len];
        padded[..n].copy_from_slice(data);
        let mut spectrum = forward.make_output_vec();
        forward.process(&mut padded, &mut spectrum).unwrap();

        Self {
            window_size,
            n_subs: n - window_size + 1,
            fft_len,
            forward,
            inverse,
            spectrum,
        }
    }

    /// Dot products of `query` against every window of the planned series.
    ///
    /// The query is reversed into the padded buffer so the convolution yields
    /// the cross-correlation; the inverse transform is unnormalized and gets
    /// divided by the transform length.
    pub fn sliding_products(&self, query: &[f64]) -> Vec<f64> {
        let m = self.window_size;
        assert_eq!(query.len(), m, "Query length must equal the window size");

        let mut q_padded = vec![0.0; self.fft_len];
        for i in 0..m {
            q_padded[i] = query[m - 1 - i];
        }
        let mut q_spectrum = self.forward.make_output_vec();
        self.forward.process(&mut q_padded, &mut q_spectrum).unwrap();

        for (q, d) in q_spectrum.iter_mut().zip(self.spectrum.iter()) {
            *q *= *d;
        }

        let mut conv = vec![0.0; self.fft_len];
        self.inverse.process(&mut q_spectrum, &mut conv).unwrap();

        let norm = 1.0 / self.fft_len as f64;
        conv[m - 1..m - 1 + self.n_subs]
            .iter()
            .map(|&v| v * norm)
            .collect()
    }

    /// Number of windows in the planned series.
    pub fn n_subs(&self) -> usize {
        self.n_subs
    }
}

/// Partition diagonals `first_diag..end_diag` into load-balanced chunks.
///
/// Diagonal `k` has `end_diag - k` cells, so earlier diagonals carry more
/// work; chunk boundaries come from a binary search over the analytical
/// cumulative-work formula.
#[cfg(feature = "parallel")]
pub(crate) fn diagonal_ranges(
    first_diag: usize,
    end_diag: usize,
    n_chunks: usize,
) -> Vec<(usize, usize)> {
    let n_diags = end_diag.saturating_sub(first_diag);
    if n_diags == 0 || n_chunks == 0 {
        return vec![];
    }
    let n_chunks = n_chunks.min(n_diags);

    // cumwork(i) = sum_{j=0}^{i-1} (n_diags - j) = i*n_diags - i*(i-1)/2
    let cumwork = |i: usize| -> usize { i * n_diags - i * i.saturating_sub(1) / 2 };
    let total_work = cumwork(n_diags);

    let mut ranges = Vec::with_capacity(n_chunks);
    let mut prev = 0usize;

    for c in 1..=n_chunks {
        let target = if c == n_chunks {
            n_diags
        } else {
            let threshold = (c as f64 * total_work as f64 / n_chunks as f64).round() as usize;
            let mut lo = prev;
            let mut hi = n_diags;
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if cumwork(mid) >= threshold {
                    hi = mid;
                } else {
                    lo = mid + 1;
                }
            }
            lo
        };

        if target > prev {
            ranges.push((first_diag + prev, first_diag + target));
        }
        prev = target;
    }

    ranges
}
