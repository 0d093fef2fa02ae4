use pretty_assertions::assert_eq;
use revmatch_core::estimator::{GearEstimator, GearProfile, Phase, HISTORY_CAPACITY, NO_TARGET};
use std::sync::Arc;

fn profile() -> Arc<GearProfile> {
    Arc::new(GearProfile::new(4.1, vec![3.5, 2.1, 1.4, 1.0], 800, 7000, 79.0).unwrap())
}

/// Engine speed locked to road speed in `gear`
fn locked_rpm(profile: &GearProfile, gear: i32, speed_mph: i32) -> i32 {
    profile.rpm_in_gear(gear, f64::from(speed_mph)).unwrap().round() as i32
}

/// Engine speed whose effective ratio sits in the middle of the band that
/// classifies as `gear`
///
/// Gear 1 is anything at or above the first ratio; gear `n > 1` is the band
/// between ratio `n` and ratio `n - 1`.
fn bucket_rpm(profile: &GearProfile, gear: i32, speed_mph: i32) -> i32 {
    let ratio = match gear {
        1 => profile.ratio(1).unwrap() * 1.2,
        n => (profile.ratio(n - 1).unwrap() + profile.ratio(n).unwrap()) / 2.0,
    };
    let per_unit_ratio =
        profile.rpm_in_gear(1, f64::from(speed_mph)).unwrap() / profile.ratio(1).unwrap();
    (per_unit_ratio * ratio).round() as i32
}

#[test]
fn test_standstill_is_first_gear() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    // Accelerate in third, then stop with the engine revving
    for (i, speed) in (40..45).enumerate() {
        estimator.update(bucket_rpm(&profile, 3, speed), speed, i as i64 * 50);
    }
    let estimate = estimator.update(2500, 0, 300);

    assert_eq!(estimate.gear, 1);
    assert_eq!(estimate.rev_match_rpm, NO_TARGET);
}

#[test]
fn test_direct_acceleration_tracks_gear() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    let mut last = None;
    for (i, speed) in (20..26).enumerate() {
        let estimate = estimator.update(bucket_rpm(&profile, 2, speed), speed, i as i64 * 50);
        assert_eq!(estimate.gear, 2, "at {} mph", speed);
        assert_eq!(estimate.phase, Phase::Direct);
        last = Some(estimate);
    }

    let last = last.unwrap();
    let expected = profile.rpm_in_gear(1, 25.0).unwrap() as i32;
    assert_eq!(last.rev_match_rpm, expected);
    assert_eq!(last.rev_match_target(), Some(expected));
}

#[test]
fn test_clutch_in_holds_gear() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    for (i, speed) in (20..26).enumerate() {
        estimator.update(bucket_rpm(&profile, 2, speed), speed, i as i64 * 50);
    }

    // Revs fall at constant road speed; the raw ratio now reads as a high gear
    assert_ne!(profile.classify_gear(1500, 25), 2);
    let estimate = estimator.update(1500, 25, 300);
    assert_eq!(estimate.phase, Phase::Hold);
    assert_eq!(estimate.gear, 2);
    let estimate = estimator.update(1400, 25, 350);
    assert_eq!(estimate.phase, Phase::Hold);
    assert_eq!(estimate.gear, 2);
}

#[test]
fn test_ratio_just_below_a_gear_reports_next_gear() {
    let profile = profile();

    // 1.82 is below second gear's 2.1, so it reads as third
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(3000, 30, 0);
    assert!(profile.effective_ratio(3000, 30) < 2.1);
    assert_eq!(estimate.gear, 3);

    // 1.37 is below third gear's 1.4, so it reads as fourth
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(3000, 40, 0);
    assert_eq!(estimate.gear, 4);
    assert_eq!(estimate.rev_match_rpm, profile.rpm_in_gear(3, 40.0).unwrap() as i32);
}

#[test]
fn test_stale_history_trusts_next_sample() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    for (i, speed) in (20..26).enumerate() {
        estimator.update(bucket_rpm(&profile, 2, speed), speed, i as i64 * 50);
    }
    estimator.update(1500, 25, 300);

    // After a long gap only the new sample is fresh
    let estimate = estimator.update(bucket_rpm(&profile, 3, 25), 25, 2_000);
    assert_eq!(estimate.phase, Phase::Direct);
    assert_eq!(estimate.gear, 3);
    assert_eq!(estimator.history().len(), 1);
}

#[test]
fn test_steady_cruise_keeps_gear() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());
    let rpm = bucket_rpm(&profile, 3, 50);

    let first = estimator.update(rpm, 50, 0);
    assert_eq!(first.phase, Phase::Direct);
    assert_eq!(first.gear, 3);

    for i in 1..40 {
        let estimate = estimator.update(rpm, 50, i * 50);
        assert_eq!(estimate.phase, Phase::Hold);
        assert_eq!(estimate.gear, 3);
    }
}

#[test]
fn test_diverging_signals_hold() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    estimator.update(bucket_rpm(&profile, 2, 30), 30, 0);
    // RPM up while speed drops: wheelspin or clutch slip
    let estimate = estimator.update(bucket_rpm(&profile, 2, 30) + 800, 28, 50);
    assert_eq!(estimate.phase, Phase::Hold);
    assert_eq!(estimate.gear, 2);
}

#[test]
fn test_top_ratio_clamps_below_top_gear() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    // Just under the top ratio
    let estimate = estimator.update(locked_rpm(&profile, 4, 60) - 50, 60, 0);
    assert_eq!(estimate.gear, 3);

    // Between third and top ratio
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(bucket_rpm(&profile, 4, 60), 60, 0);
    assert_eq!(estimate.gear, 4);
}

#[test]
fn test_target_outside_rpm_window() {
    let profile = profile();

    // Downshift would over-rev
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(bucket_rpm(&profile, 3, 70), 70, 0);
    assert_eq!(estimate.gear, 3);
    assert!(profile.rpm_in_gear(2, 70.0).unwrap() > 7000.0);
    assert_eq!(estimate.rev_match_rpm, NO_TARGET);

    // Downshift would lug below the floor
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(bucket_rpm(&profile, 2, 2), 2, 0);
    assert_eq!(estimate.gear, 2);
    assert_eq!(estimate.rev_match_rpm, NO_TARGET);
}

#[test]
fn test_first_gear_has_no_target() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());
    let estimate = estimator.update(bucket_rpm(&profile, 1, 15), 15, 0);
    assert_eq!(estimate.gear, 1);
    assert_eq!(estimate.rev_match_target(), None);
}

#[test]
fn test_targets_always_in_window() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    let mut t = 0;
    for gear in 1..=4 {
        for speed in (1..120).step_by(3) {
            let estimate = estimator.update(bucket_rpm(&profile, gear, speed), speed, t);
            t += 40;
            if let Some(target) = estimate.rev_match_target() {
                assert!((800..=7000).contains(&target));
                assert!(estimate.gear >= 2);
            }
            assert!((1..=4).contains(&estimate.gear));
        }
    }
}

#[test]
fn test_memory_bounded_on_long_stream() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());

    for i in 0..10_000i64 {
        let speed = 20 + (i % 30) as i32;
        estimator.update(bucket_rpm(&profile, 2, speed), speed, i);
        assert!(estimator.history().len() <= HISTORY_CAPACITY);
    }
    assert_eq!(estimator.history().len(), HISTORY_CAPACITY);

    // At 20 Hz only the last 250 ms survive
    let mut estimator = GearEstimator::new(profile.clone());
    for i in 0..1_000i64 {
        estimator.update(3000, 30, i * 50);
    }
    assert_eq!(estimator.history().len(), 6);
}

#[test]
fn test_same_stream_same_output() {
    let profile = profile();
    let mut a = GearEstimator::new(profile.clone());
    let mut b = GearEstimator::new(profile.clone());

    let stream: Vec<(i32, i32, i64)> = (0..200)
        .map(|i| {
            let speed = 10 + (i % 50) as i32;
            let rpm = 1500 + ((i * 37) % 3000) as i32;
            (rpm, speed, i64::from(i) * 50)
        })
        .collect();

    for &(rpm, speed, ts) in &stream {
        assert_eq!(a.update(rpm, speed, ts), b.update(rpm, speed, ts));
    }
}

#[test]
fn test_reset_forgets_history() {
    let profile = profile();
    let mut estimator = GearEstimator::new(profile.clone());
    estimator.update(bucket_rpm(&profile, 3, 50), 50, 0);
    assert_eq!(estimator.previous_gear(), 3);

    estimator.reset();
    assert_eq!(estimator.previous_gear(), 1);
    assert!(estimator.history().is_empty());
}
