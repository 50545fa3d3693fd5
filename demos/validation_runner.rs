//! Cross-strategy validation runner.
//!
//! Computes the matrix profile of a synthetic series with every batch
//! strategy plus the streaming engine and emits a JSON report of the
//! pairwise deviations, for eyeballing or diffing across versions.
//!
//! Run with: `cargo run --example validation_runner`

use matrix_profile::{stamp, stomp, Mpx, OnlineStomp};
use serde::Serialize;

#[derive(Serialize)]
struct Comparison {
    name: &'static str,
    max_abs_diff: f64,
    max_diff_index: usize,
    positions: usize,
}

#[derive(Serialize)]
struct Report {
    series_len: usize,
    window: usize,
    comparisons: Vec<Comparison>,
}

fn compare(name: &'static str, a: &[f64], b: &[f64]) -> Comparison {
    let mut max_abs_diff = 0.0_f64;
    let mut max_diff_index = 0;
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x.is_infinite() && y.is_infinite() {
            continue;
        }
        let diff = (x - y).abs();
        if diff > max_abs_diff {
            max_abs_diff = diff;
            max_diff_index = i;
        }
    }
    Comparison {
        name,
        max_abs_diff,
        max_diff_index,
        positions: a.len(),
    }
}

fn main() {
    env_logger::init();

    let n = 2_000;
    let window = 32;
    let ts: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            (t * 0.11).sin() + 0.5 * (t * 0.029).cos() + 0.001 * t
        })
        .collect();

    let exact = stomp(&ts, window).expect("valid configuration");
    let anytime = stamp(&ts, window, Some(99)).expect("valid configuration");
    let diag = {
        let mut m = Mpx::new(window, n)
            .expect("valid configuration")
            .with_min_lag(window / 2);
        for &v in &ts {
            m.update(v);
        }
        m.get().expect("buffer is full")
    };
    let streamed = {
        let mut engine = OnlineStomp::new(window).expect("valid configuration");
        for &v in &ts {
            engine.update(v);
        }
        engine.get().expect("buffer is full").clone()
    };

    let report = Report {
        series_len: n,
        window,
        comparisons: vec![
            compare("stomp_vs_stamp", &exact.profile, &anytime.profile),
            compare("stomp_vs_mpx", &exact.profile, &diag.profile),
            compare("stomp_vs_streaming", &exact.profile, &streamed.mp.profile),
        ],
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("report serializes")
    );
}
