//! Vehicle gearing

use serde::Serialize;

use super::TIRE_CONVERSION;
use crate::config::ConfigError;

/// Static drivetrain description used to infer the engaged gear
///
/// Ratios are ordered from first gear upwards and strictly decreasing.
/// A profile can only be obtained through [`GearProfile::new`], which
/// enforces those invariants; the estimator relies on them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GearProfile {
    final_drive: f64,
    gear_ratios: Vec<f64>,
    min_rpm: i32,
    max_rpm: i32,
    wheel_circumference_in: f64,
}

impl GearProfile {
    /// Build a validated profile
    ///
    /// # Errors
    /// [`ConfigError::Invariant`] when the final drive or wheel circumference
    /// is not positive, fewer than two ratios are given, ratios are not
    /// strictly decreasing and positive, or `min_rpm >= max_rpm`.
    pub fn new(
        final_drive: f64,
        gear_ratios: Vec<f64>,
        min_rpm: i32,
        max_rpm: i32,
        wheel_circumference_in: f64,
    ) -> Result<Self, ConfigError> {
        if !(final_drive.is_finite() && final_drive > 0.0) {
            return Err(ConfigError::Invariant(format!(
                "final drive must be positive, got {}",
                final_drive
            )));
        }
        if gear_ratios.len() < 2 {
            return Err(ConfigError::Invariant(format!(
                "at least 2 gear ratios are required, got {}",
                gear_ratios.len()
            )));
        }
        if let Some(bad) = gear_ratios.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(ConfigError::Invariant(format!(
                "gear ratios must be positive, got {}",
                bad
            )));
        }
        if let Some(pair) = gear_ratios.windows(2).find(|pair| pair[0] <= pair[1]) {
            return Err(ConfigError::Invariant(format!(
                "gear ratios must be strictly decreasing, got {} then {}",
                pair[0], pair[1]
            )));
        }
        if min_rpm >= max_rpm {
            return Err(ConfigError::Invariant(format!(
                "min_rpm ({}) must be below max_rpm ({})",
                min_rpm, max_rpm
            )));
        }
        if !(wheel_circumference_in.is_finite() && wheel_circumference_in > 0.0) {
            return Err(ConfigError::Invariant(format!(
                "wheel circumference must be positive, got {}",
                wheel_circumference_in
            )));
        }

        Ok(Self {
            final_drive,
            gear_ratios,
            min_rpm,
            max_rpm,
            wheel_circumference_in,
        })
    }

    /// Final drive ratio
    pub fn final_drive(&self) -> f64 {
        self.final_drive
    }

    /// Gearbox ratios, first gear first
    pub fn gear_ratios(&self) -> &[f64] {
        &self.gear_ratios
    }

    /// Number of forward gears
    pub fn gear_count(&self) -> usize {
        self.gear_ratios.len()
    }

    /// Lowest acceptable rev-match target
    pub fn min_rpm(&self) -> i32 {
        self.min_rpm
    }

    /// Highest acceptable rev-match target
    pub fn max_rpm(&self) -> i32 {
        self.max_rpm
    }

    /// Wheel circumference in inches
    pub fn wheel_circumference(&self) -> f64 {
        self.wheel_circumference_in
    }

    /// Ratio of a 1-based gear
    pub fn ratio(&self, gear: i32) -> Option<f64> {
        let index = usize::try_from(gear.checked_sub(1)?).ok()?;
        self.gear_ratios.get(index).copied()
    }

    /// Gearbox ratio implied by the engine and road speed
    ///
    /// Undefined (infinite) at standstill; callers treat `speed_mph == 0`
    /// separately.
    pub fn effective_ratio(&self, rpm: i32, speed_mph: i32) -> f64 {
        (f64::from(rpm) * self.wheel_circumference_in)
            / (f64::from(speed_mph) * TIRE_CONVERSION)
            / self.final_drive
    }

    /// Engine speed in a given gear at a given road speed
    pub fn rpm_in_gear(&self, gear: i32, speed_mph: f64) -> Option<f64> {
        let ratio = self.ratio(gear)?;
        Some(TIRE_CONVERSION * speed_mph * self.final_drive * ratio / self.wheel_circumference_in)
    }

    /// Classify the engaged gear (1-based) from one sample
    ///
    /// Standstill is first gear. Ratios at or above first gear are first
    /// gear; ratios at or below the top ratio report the second-highest gear.
    /// In between, the first configured ratio (scanning from first gear)
    /// that the effective ratio exceeds gives the gear, so a ratio just
    /// below gear `n`'s ratio reports gear `n + 1`.
    pub fn classify_gear(&self, rpm: i32, speed_mph: i32) -> i32 {
        if speed_mph == 0 {
            return 1;
        }
        let (Some(&lowest), Some(&highest)) = (self.gear_ratios.first(), self.gear_ratios.last())
        else {
            return 1;
        };

        let ratio = self.effective_ratio(rpm, speed_mph);
        let count = self.gear_ratios.len() as i32;

        if ratio >= lowest {
            return 1;
        }
        // Ratios at or below the top ratio report the gear below it
        if ratio <= highest {
            return count - 1;
        }

        self.gear_ratios
            .iter()
            .position(|r| ratio > *r)
            .map(|i| i as i32 + 1)
            .unwrap_or(count)
    }

    /// Engine speed to target before shifting down from `current_gear`
    ///
    /// `None` in first gear (nothing to shift down to) or when the target
    /// falls outside `[min_rpm, max_rpm]`.
    pub fn rev_match_target(&self, current_gear: i32, speed_mph: i32) -> Option<i32> {
        if current_gear < 2 {
            return None;
        }
        let rpm = self.rpm_in_gear(current_gear - 1, f64::from(speed_mph))? as i32;
        (self.min_rpm..=self.max_rpm).contains(&rpm).then_some(rpm)
    }

    /// Log the profile at startup
    pub fn log_summary(&self) {
        tracing::info!(final_drive = self.final_drive, "gear profile loaded");
        for (i, ratio) in self.gear_ratios.iter().enumerate() {
            tracing::info!("  gear {}: {:.3}", i + 1, ratio);
        }
        tracing::info!(
            "RPM range {}-{}, wheel circumference {} in",
            self.min_rpm,
            self.max_rpm,
            self.wheel_circumference_in
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> GearProfile {
        GearProfile::new(4.1, vec![3.5, 2.1, 1.4, 1.0], 800, 7000, 79.0).unwrap()
    }

    #[test]
    fn test_rejects_invalid_profiles() {
        assert!(GearProfile::new(0.0, vec![3.5, 2.1], 800, 7000, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![3.5], 800, 7000, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![2.1, 3.5], 800, 7000, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![3.5, 3.5], 800, 7000, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![3.5, -1.0], 800, 7000, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![3.5, 2.1], 7000, 800, 79.0).is_err());
        assert!(GearProfile::new(4.1, vec![3.5, 2.1], 800, 7000, 0.0).is_err());
        assert!(GearProfile::new(f64::NAN, vec![3.5, 2.1], 800, 7000, 79.0).is_err());
    }

    #[test]
    fn test_ratio_lookup() {
        let p = profile();
        assert_eq!(p.ratio(1), Some(3.5));
        assert_eq!(p.ratio(4), Some(1.0));
        assert_eq!(p.ratio(0), None);
        assert_eq!(p.ratio(5), None);
        assert_eq!(p.ratio(-3), None);
    }

    #[test]
    fn test_classify_buckets() {
        let p = profile();
        // buckets: [3.5, inf) -> 1, (2.1, 3.5) -> 2, (1.4, 2.1] -> 3,
        // (1.0, 1.4] -> 4, (0, 1.0] -> 3
        assert_eq!(p.classify_gear(900, 0), 1);
        // 3000 rpm @ 10 mph -> ratio 5.47
        assert_eq!(p.classify_gear(3000, 10), 1);
        // 3000 rpm @ 20 mph -> ratio 2.74
        assert_eq!(p.classify_gear(3000, 20), 2);
        // 3000 rpm @ 30 mph -> ratio 1.82
        assert_eq!(p.classify_gear(3000, 30), 3);
        // 3000 rpm @ 40 mph -> ratio 1.37
        assert_eq!(p.classify_gear(3000, 40), 4);
        // 3000 rpm @ 50 mph -> ratio 1.09
        assert_eq!(p.classify_gear(3000, 50), 4);
        // 3000 rpm @ 60 mph -> ratio 0.91, clamped
        assert_eq!(p.classify_gear(3000, 60), 3);
    }

    #[test]
    fn test_classify_scans_configured_ratios() {
        let p = profile();
        // Compare against the first ratio exceeded, for every bucket
        for speed in 1..120 {
            for rpm in (500..7000).step_by(250) {
                let ratio = p.effective_ratio(rpm, speed);
                let expected = if ratio >= 3.5 {
                    1
                } else if ratio <= 1.0 {
                    3
                } else if ratio > 2.1 {
                    2
                } else if ratio > 1.4 {
                    3
                } else {
                    4
                };
                assert_eq!(p.classify_gear(rpm, speed), expected, "{} rpm @ {} mph", rpm, speed);
            }
        }
    }

    #[test]
    fn test_rev_match_target() {
        let p = profile();
        assert_eq!(p.rev_match_target(1, 30), None);
        // 1056 * 30 * 4.1 * 3.5 / 79 = 5754.5
        assert_eq!(p.rev_match_target(2, 30), Some(5754));
        // 1056 * 60 * 4.1 * 3.5 / 79 is above max_rpm
        assert_eq!(p.rev_match_target(2, 60), None);
        // 1056 * 5 * 4.1 * 1.4 / 79 = 383.6, below min_rpm
        assert_eq!(p.rev_match_target(4, 5), None);
    }
}
