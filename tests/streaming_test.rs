//! Streaming engine conformance: incremental updates must reproduce batch
//! results exactly, and eviction must rebase indices into the surviving
//! coordinate frame.

use matrix_profile::{stomp, MatrixProfile, OnlineMatrixProfile, OnlineStomp, UNASSIGNED};

fn signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            (t * 0.19).sin() * 2.0 + (t * 0.043).cos()
        })
        .collect()
}

fn assert_matches_batch(online: &OnlineMatrixProfile, batch: &MatrixProfile, label: &str) {
    assert_eq!(online.mp.profile.len(), batch.profile.len(), "{label}: length");
    for i in 0..batch.profile.len() {
        let (s, b) = (online.mp.profile[i], batch.profile[i]);
        if s.is_infinite() && b.is_infinite() {
            continue;
        }
        assert!(
            (s - b).abs() < 1e-6,
            "{label}: position {i}: streaming={s}, batch={b}"
        );
    }
}

#[test]
fn every_prefix_matches_batch() {
    let ts = signal(70);
    let w = 6;
    let mut engine = OnlineStomp::new(w).unwrap();

    for (p, &v) in ts.iter().enumerate() {
        engine.update(v);
        match engine.get().cloned() {
            None => assert!(p + 1 < w, "engine not ready at prefix {}", p + 1),
            Some(online) => {
                let batch = stomp(&ts[..=p], w).unwrap();
                assert_matches_batch(&online, &batch, &format!("prefix {}", p + 1));
                assert_eq!(online.offset, 0, "no eviction without a retention bound");
            }
        }
    }
}

#[test]
fn irregular_flush_cadence_matches_batch() {
    // get() at irregular intervals: flushes of 1, 7, 19 and 3 points
    let ts = signal(80);
    let w = 5;
    let mut engine = OnlineStomp::new(w).unwrap();

    let mut fed = 0;
    for chunk in [10usize, 1, 7, 19, 3, 40] {
        for &v in &ts[fed..fed + chunk] {
            engine.update(v);
        }
        fed += chunk;
        let online = engine.get().cloned().unwrap();
        let batch = stomp(&ts[..fed], w).unwrap();
        assert_matches_batch(&online, &batch, &format!("after {fed} points"));
    }
    assert_eq!(fed, ts.len());
}

#[test]
fn eviction_shifts_every_surviving_index() {
    let ts = signal(120);
    let w = 6;
    let retention = 48;
    let mut engine = OnlineStomp::new(w).unwrap().with_retention(retention).unwrap();

    let mut previous: Option<OnlineMatrixProfile> = None;
    for (p, &v) in ts.iter().enumerate() {
        engine.update(v);
        let Some(online) = engine.get().cloned() else {
            assert!(p + 1 < w, "engine must be ready once {w} points are in");
            continue;
        };

        if let Some(prev) = previous {
            let k = (online.offset - prev.offset) as usize;
            if k > 0 {
                // Entries that survived unchanged must have shifted by k
                let old_len = prev.mp.profile.len();
                for i in k..old_len {
                    let (op, oi) = (prev.mp.profile[i], prev.mp.index[i]);
                    let (np, ni) = (online.mp.profile[i - k], online.mp.index[i - k]);
                    if oi >= k as i32 && np == op {
                        assert_eq!(
                            ni,
                            oi - k as i32,
                            "surviving index not rebased at old position {i}"
                        );
                    }
                    assert!(ni >= UNASSIGNED, "negative index after eviction");
                }
            }
        }
        previous = Some(online);
    }

    let final_profile = previous.unwrap();
    assert!(final_profile.offset > 0, "retention bound never triggered");
    // Global coordinates recover original stream positions
    assert_eq!(
        final_profile.global_index(0),
        final_profile.offset
    );
}

#[test]
fn retained_window_never_beats_fresh_batch() {
    let ts = signal(100);
    let w = 5;
    let mut engine = OnlineStomp::new(w).unwrap().with_retention(40).unwrap();
    for &v in &ts {
        engine.update(v);
    }
    let online = engine.get().cloned().unwrap();
    let offset = online.offset as usize;
    assert!(offset > 0);

    // A batch over only the retained tail sees the same admissible pairs or
    // fewer (streaming entries may have been orphaned by eviction), so the
    // streaming profile can never be smaller than the batch optimum.
    let batch = stomp(&ts[offset..], w).unwrap();
    assert_eq!(online.mp.profile.len(), batch.profile.len());
    for i in 0..batch.profile.len() {
        let (s, b) = (online.mp.profile[i], batch.profile[i]);
        if s.is_infinite() {
            continue;
        }
        assert!(s + 1e-6 >= b, "position {i}: streaming={s} beats batch={b}");
    }
}

#[test]
fn snapshots_are_independent() {
    // A cloned snapshot must not change as the engine keeps moving
    let ts = signal(40);
    let w = 4;
    let mut engine = OnlineStomp::new(w).unwrap();
    for &v in &ts[..20] {
        engine.update(v);
    }
    let snapshot = engine.get().cloned().unwrap();
    let frozen = snapshot.clone();

    for &v in &ts[20..] {
        engine.update(v);
    }
    let _ = engine.get();
    assert_eq!(snapshot, frozen);
}
