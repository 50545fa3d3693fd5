//! Streaming matrix profile over a synthetic sensor feed.
//!
//! Feeds a noisy periodic signal with one injected anomaly into the online
//! engine, flushing every 50 points, and reports the top discord at the end.
//!
//! Run with: `cargo run --example streaming`

use matrix_profile::OnlineStomp;

fn main() {
    env_logger::init();

    let window = 24;
    let mut engine = OnlineStomp::new(window)
        .expect("valid window")
        .with_retention(600)
        .expect("valid retention");

    let mut fed = 0usize;
    for i in 0..1_200 {
        let t = i as f64;
        // Periodic carrier with deterministic jitter and one flat anomaly
        let mut v = (t * 0.26).sin() + 0.1 * (t * 1.7).sin();
        if (700..724).contains(&i) {
            v = 0.0;
        }
        engine.update(v);
        fed += 1;

        if fed % 50 == 0 {
            if let Some(online) = engine.get() {
                let len = online.mp.profile.len();
                println!(
                    "{fed:>5} points fed | profile over {len} positions | offset {}",
                    online.offset
                );
            }
        }
    }

    let online = engine.get().expect("stream long past one window");
    let (discord_local, discord_dist) = online
        .mp
        .profile
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .max_by(|a, b| a.1.partial_cmp(b.1).expect("finite distances"))
        .expect("profile has finite entries");

    println!(
        "top discord at stream position {} (distance {discord_dist:.4})",
        online.global_index(discord_local)
    );
}
