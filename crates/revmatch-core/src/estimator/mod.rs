//! Gear & Rev-Match Estimation
//!
//! Infers the engaged gear from noisy RPM / road speed samples and computes
//! the engine speed to target when shifting down one gear.
//!
//! Each update runs in one of two phases:
//! - **Direct**: RPM and speed move together, so the instantaneous ratio is
//!   trusted and the gear is classified from it.
//! - **Hold**: RPM and speed diverge, or RPM is falling (clutch in, shift in
//!   progress, coasting, braking). The previous gear is kept.
//!
//! The phase is chosen from mean rates of change over a short time window,
//! so the estimator is driven by timestamps, not by call count, and copes
//! with irregular sampling.

mod history;
mod profile;

pub use history::{Derivatives, HistoryPoint, SampleHistory};
pub use profile::GearProfile;

use serde::Serialize;
use std::sync::Arc;

/// Revolutions-per-mile normalisation (inches per mile / 60)
pub const TIRE_CONVERSION: f64 = 1056.0;

/// Samples kept for derivative estimation
pub const HISTORY_CAPACITY: usize = 100;

/// Age after which a history entry no longer contributes, in milliseconds
pub const FRESHNESS_WINDOW_MS: i64 = 250;

/// Rev-match value logged when no safe downshift target exists
pub const NO_TARGET: i32 = -1;

/// Classifier phase for one update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Gear classified from the current sample
    Direct,
    /// Previous gear kept
    Hold,
}

impl Phase {
    /// Pick the phase from the fresh-window derivatives
    ///
    /// Without derivatives (fewer than two fresh samples) the sample is
    /// trusted. Otherwise hold when the signals are not both rising or
    /// both falling (this includes a perfectly steady cruise, where both
    /// rates are zero) or when RPM is falling.
    pub fn from_derivatives(derivatives: Option<Derivatives>) -> Self {
        match derivatives {
            None => Phase::Direct,
            Some(d) if d.rpm_per_ms * d.speed_per_ms <= 0.0 || d.rpm_per_ms < 0.0 => Phase::Hold,
            Some(_) => Phase::Direct,
        }
    }
}

/// Result of one estimator update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GearEstimate {
    /// Engaged gear, 1-based
    pub gear: i32,
    /// Target RPM for a downshift, or [`NO_TARGET`]
    pub rev_match_rpm: i32,
    /// Phase the gear was settled in
    pub phase: Phase,
}

impl GearEstimate {
    /// Rev-match target, if a safe downshift exists
    pub fn rev_match_target(&self) -> Option<i32> {
        (self.rev_match_rpm != NO_TARGET).then_some(self.rev_match_rpm)
    }
}

/// Stateful gear and rev-match estimator
///
/// Not internally synchronised; one instance serves one sample stream.
pub struct GearEstimator {
    profile: Arc<GearProfile>,
    history: SampleHistory,
    previous_gear: i32,
}

impl GearEstimator {
    /// Create an estimator with the standard history window
    pub fn new(profile: Arc<GearProfile>) -> Self {
        Self::with_window(profile, HISTORY_CAPACITY, FRESHNESS_WINDOW_MS)
    }

    /// Create an estimator with a custom history capacity and freshness window
    pub fn with_window(profile: Arc<GearProfile>, capacity: usize, freshness_ms: i64) -> Self {
        Self {
            profile,
            history: SampleHistory::new(capacity, freshness_ms),
            previous_gear: 1,
        }
    }

    /// Feed one sample and return the settled gear and rev-match target
    ///
    /// Callers must filter samples first: `rpm` must be positive and
    /// `speed_mph` non-negative (see [`EngineSample::is_estimable`]). Other
    /// inputs are not checked and give meaningless, but non-panicking, results.
    ///
    /// [`EngineSample::is_estimable`]: crate::protocol::EngineSample::is_estimable
    pub fn update(&mut self, rpm: i32, speed_mph: i32, timestamp_millis: i64) -> GearEstimate {
        self.history.record(HistoryPoint {
            timestamp_millis,
            rpm,
            speed_mph,
        });
        let phase = Phase::from_derivatives(self.history.derivatives());

        let gear = if speed_mph == 0 {
            1
        } else {
            match phase {
                Phase::Hold => self.previous_gear,
                Phase::Direct => self.profile.classify_gear(rpm, speed_mph),
            }
        };
        self.previous_gear = gear;

        let rev_match_rpm = self
            .profile
            .rev_match_target(gear, speed_mph)
            .unwrap_or(NO_TARGET);

        tracing::trace!(rpm, speed_mph, gear, rev_match_rpm, ?phase, "gear estimate");

        GearEstimate {
            gear,
            rev_match_rpm,
            phase,
        }
    }

    /// Gear reported by the last update (1 before the first)
    pub fn previous_gear(&self) -> i32 {
        self.previous_gear
    }

    /// The rolling history
    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// The gear profile
    pub fn profile(&self) -> &GearProfile {
        &self.profile
    }

    /// Forget all history and return to first gear
    pub fn reset(&mut self) {
        self.history.clear();
        self.previous_gear = 1;
    }
}
