//! Cross-strategy agreement: the exact ordered computation, the anytime
//! computation run to completion, and the diagonal covariance sweep must
//! produce the same self-join profile within floating-point tolerance.

use matrix_profile::{mpx, stamp, stomp, Mpx, UNASSIGNED};

const EPSILON: f64 = 1e-6;

/// Deterministic test signal: two sine components plus a linear drift, enough
/// structure that nearest neighbors are unambiguous.
fn signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            (t * 0.21).sin() + 0.6 * (t * 0.047).cos() + t * 0.002
        })
        .collect()
}

fn assert_profiles_close(name: &str, a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "{name}: length mismatch");
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x.is_infinite() && y.is_infinite() {
            continue;
        }
        assert!(
            (x - y).abs() < EPSILON,
            "{name}: mismatch at {i}: {x} vs {y}"
        );
    }
}

#[test]
fn stomp_and_stamp_agree() {
    for (n, w) in [(64, 4), (200, 8), (333, 16)] {
        let ts = signal(n);
        let exact = stomp(&ts, w).unwrap();
        let anytime = stamp(&ts, w, Some(1234)).unwrap();
        assert_profiles_close(&format!("n={n}, w={w}"), &exact.profile, &anytime.profile);
    }
}

#[test]
fn stomp_and_mpx_agree_with_aligned_zone() {
    // STOMP suppresses |i - j| <= floor(w/2); MPX admits diagonals above
    // min_lag. Setting min_lag to the same radius makes the admissible pair
    // sets identical.
    for (n, w) in [(120, 8), (250, 12)] {
        let ts = signal(n);
        let exact = stomp(&ts, w).unwrap();
        let diag = {
            let mut m = Mpx::new(w, n).unwrap().with_min_lag(w / 2);
            for &v in &ts {
                m.update(v);
            }
            m.get().unwrap()
        };
        assert_profiles_close(&format!("n={n}, w={w}"), &exact.profile, &diag.profile);
    }
}

#[test]
fn all_three_strategies_agree() {
    let n = 180;
    let w = 10;
    let ts = signal(n);

    let exact = stomp(&ts, w).unwrap();
    let anytime = stamp(&ts, w, Some(7)).unwrap();
    let diag = {
        let mut m = Mpx::new(w, n).unwrap().with_min_lag(w / 2);
        for &v in &ts {
            m.update(v);
        }
        m.get().unwrap()
    };

    assert_profiles_close("stomp vs stamp", &exact.profile, &anytime.profile);
    assert_profiles_close("stomp vs mpx", &exact.profile, &diag.profile);
}

#[test]
fn duplicate_subsequences_report_each_other() {
    // A planted motif pair outside each other's exclusion zone must match at
    // distance ~0, and never match itself.
    let mut ts = signal(80);
    let pattern = [0.0, 2.0, -1.0, 1.0, -2.0, 0.5];
    ts.splice(10..16, pattern);
    ts.splice(60..66, pattern);

    let mp = stomp(&ts, 6).unwrap();
    assert!(mp.profile[10] < EPSILON, "motif at 10: {}", mp.profile[10]);
    assert!(mp.profile[60] < EPSILON, "motif at 60: {}", mp.profile[60]);
    assert_eq!(mp.index[10], 60);
    assert_eq!(mp.index[60], 10);
    for (i, &ix) in mp.index.iter().enumerate() {
        assert_ne!(ix, i as i32, "position {i} matched itself");
    }
}

#[test]
fn default_min_lag_is_quarter_window() {
    let ts = signal(100);
    let w = 12;
    let mp = mpx(&ts, w).unwrap();
    // ceil(12/4) = 3: no assigned neighbor within lag 3
    for (i, &ix) in mp.index.iter().enumerate() {
        if ix != UNASSIGNED {
            assert!((ix as usize).abs_diff(i) > 3);
        }
    }
}

#[test]
fn nan_contamination_is_contained() {
    let mut ts = signal(90);
    ts[40] = f64::NAN;
    let w = 6;

    let exact = stomp(&ts, w).unwrap();
    let diag = {
        let mut m = Mpx::new(w, ts.len()).unwrap().with_min_lag(w / 2);
        for &v in &ts {
            m.update(v);
        }
        m.get().unwrap()
    };

    for mp in [&exact, &diag] {
        for (i, d) in mp.profile.iter().enumerate() {
            assert!(!d.is_nan(), "NaN leaked into profile at {i}");
            if i <= 40 && 40 < i + w {
                assert!(d.is_infinite(), "contaminated window {i} not suppressed");
            }
        }
    }
    // Far from the contamination both strategies still agree and stay finite
    assert!(exact.profile[10].is_finite());
    assert_profiles_close("nan series", &exact.profile, &diag.profile);
}
