//! Demo Mode - Simulated drive cycle for testing without a vehicle
//!
//! Drives a virtual car through the configured gearbox: launch, upshifts
//! with the clutch in, cruise, braking with rev-matched downshifts, idle.
//! Each sample is rendered as an ELM327 response and run through the real
//! decoder, so demo mode exercises the same path as a live adapter.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::estimator::GearProfile;
use crate::protocol::{decode, EngineSample};
use crate::source::{AcquireError, TelemetrySource};
use crate::unit_conversion::{mph_to_kmh, percent_to_byte};

/// Default time between simulated samples
pub const DEFAULT_SAMPLE_INTERVAL_MS: i64 = 50;

const IDLE_RPM: f64 = 850.0;
const LAUNCH_RPM: f64 = 1800.0;
const DOWNSHIFT_RPM: f64 = 2000.0;
const CRUISE_MPH: f64 = 65.0;
/// First-gear acceleration; higher gears scale down with their ratio
const LAUNCH_ACCEL_MPH_PER_S: f64 = 10.0;
const BRAKE_MPH_PER_S: f64 = 8.0;
const COAST_MPH_PER_S: f64 = 0.5;
/// Clutch-in time for every shift
const SHIFT_MS: i64 = 400;
const RPM_FALL_PER_S: f64 = 6000.0;
const RPM_RISE_PER_S: f64 = 8000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DriveState {
    /// Stopped, engine idling
    Idle { until_ms: i64 },
    /// In gear, throttle open
    Accelerate,
    /// Clutch in, revs falling toward the next gear
    Shift { start_ms: i64, to_gear: i32 },
    /// Steady speed
    Cruise { until_ms: i64 },
    /// In gear, slowing down
    Brake,
    /// Clutch in, blipping up to the lower gear
    Downshift { start_ms: i64, to_gear: i32 },
}

/// Simulated vehicle producing engine samples
pub struct DemoSimulator {
    profile: Arc<GearProfile>,
    rng: StdRng,
    /// Simulation time of the next sample (ms)
    sim_time_ms: i64,
    /// Timestamp of simulation time zero
    start_timestamp_ms: i64,
    interval_ms: i64,
    state: DriveState,
    gear: i32,
    speed_mph: f64,
    current_rpm: f64,
    shift_rpm: f64,
    max_samples: Option<u64>,
    emitted: u64,
}

impl DemoSimulator {
    /// Create a simulator stamped with the current wall-clock time
    pub fn new(profile: Arc<GearProfile>) -> Self {
        Self::build(profile, StdRng::from_entropy(), Utc::now().timestamp_millis())
    }

    /// Create a reproducible simulator whose timestamps start at zero
    pub fn with_seed(profile: Arc<GearProfile>, seed: u64) -> Self {
        Self::build(profile, StdRng::seed_from_u64(seed), 0)
    }

    fn build(profile: Arc<GearProfile>, mut rng: StdRng, start_timestamp_ms: i64) -> Self {
        let shift_rpm = (f64::from(profile.max_rpm()) * 0.75).max(LAUNCH_RPM + 500.0);
        let idle_ms = rng.gen_range(1000..3000);
        Self {
            profile,
            rng,
            sim_time_ms: 0,
            start_timestamp_ms,
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            state: DriveState::Idle { until_ms: idle_ms },
            gear: 1,
            speed_mph: 0.0,
            current_rpm: IDLE_RPM,
            shift_rpm,
            max_samples: None,
            emitted: 0,
        }
    }

    /// Set the simulated time between samples
    pub fn with_sample_interval(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms.max(1);
        self
    }

    /// Stop after `limit` samples
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.max_samples = Some(limit);
        self
    }

    /// Samples produced so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Gear the virtual driver has selected
    pub fn gear(&self) -> i32 {
        self.gear
    }

    /// Advance one interval and render the ELM327 response for it
    ///
    /// Returns the response and the sample's timestamp.
    pub fn next_response(&mut self) -> (String, i64) {
        let now = self.sim_time_ms;
        let dt = self.interval_ms as f64 / 1000.0;

        self.update_state(now);
        self.update_motion(dt);

        let rpm = (self.current_rpm + self.rng.gen_range(-10.0..10.0)).max(0.0);
        let (throttle, load) = self.pedal_and_load();
        let response = render_response(rpm, self.speed_mph, load, throttle);

        let timestamp = self.start_timestamp_ms + now;
        self.sim_time_ms += self.interval_ms;
        (response, timestamp)
    }

    fn in_gear_rpm(&self, gear: i32) -> f64 {
        self.profile
            .rpm_in_gear(gear, self.speed_mph)
            .unwrap_or(IDLE_RPM)
    }

    /// Update the drive state machine
    fn update_state(&mut self, now: i64) {
        let top_gear = self.profile.gear_count() as i32;

        match self.state {
            DriveState::Idle { until_ms } => {
                if now >= until_ms {
                    self.gear = 1;
                    self.state = DriveState::Accelerate;
                }
            }
            DriveState::Accelerate => {
                if self.speed_mph >= CRUISE_MPH {
                    self.start_cruise(now);
                } else if self.current_rpm >= self.shift_rpm {
                    if self.gear < top_gear {
                        self.state = DriveState::Shift {
                            start_ms: now,
                            to_gear: self.gear + 1,
                        };
                    } else {
                        self.start_cruise(now);
                    }
                }
            }
            DriveState::Shift { start_ms, to_gear } => {
                if now - start_ms >= SHIFT_MS {
                    self.gear = to_gear;
                    self.state = DriveState::Accelerate;
                }
            }
            DriveState::Cruise { until_ms } => {
                if now >= until_ms {
                    self.state = DriveState::Brake;
                }
            }
            DriveState::Brake => {
                if self.speed_mph <= 0.0 {
                    self.speed_mph = 0.0;
                    self.gear = 1;
                    let idle_ms = self.rng.gen_range(1000..3000);
                    self.state = DriveState::Idle {
                        until_ms: now + idle_ms,
                    };
                } else if self.gear > 1 && self.in_gear_rpm(self.gear) < DOWNSHIFT_RPM {
                    self.state = DriveState::Downshift {
                        start_ms: now,
                        to_gear: self.gear - 1,
                    };
                }
            }
            DriveState::Downshift { start_ms, to_gear } => {
                if now - start_ms >= SHIFT_MS {
                    self.gear = to_gear;
                    self.state = DriveState::Brake;
                }
            }
        }
    }

    fn start_cruise(&mut self, now: i64) {
        let hold_ms = self.rng.gen_range(4000..8000);
        self.state = DriveState::Cruise {
            until_ms: now + hold_ms,
        };
    }

    /// Move speed and revs one step
    fn update_motion(&mut self, dt: f64) {
        match self.state {
            DriveState::Idle { .. } => {
                self.speed_mph = 0.0;
                self.approach_rpm(IDLE_RPM, dt);
            }
            DriveState::Accelerate => {
                let scale = match (self.profile.ratio(self.gear), self.profile.ratio(1)) {
                    (Some(ratio), Some(first)) => ratio / first,
                    _ => 1.0,
                };
                self.speed_mph += LAUNCH_ACCEL_MPH_PER_S * scale * dt;
                let floor = if self.gear == 1 { LAUNCH_RPM } else { IDLE_RPM };
                self.current_rpm = self.in_gear_rpm(self.gear).max(floor);
            }
            DriveState::Shift { to_gear, .. } => {
                self.speed_mph = (self.speed_mph - COAST_MPH_PER_S * dt).max(0.0);
                let target = self.in_gear_rpm(to_gear).max(IDLE_RPM);
                self.approach_rpm(target, dt);
            }
            DriveState::Cruise { .. } => {
                self.speed_mph += self.rng.gen_range(-0.2..0.2);
                self.current_rpm = self.in_gear_rpm(self.gear).max(IDLE_RPM);
            }
            DriveState::Brake => {
                self.speed_mph = (self.speed_mph - BRAKE_MPH_PER_S * dt).max(0.0);
                // Clutch in below idle speed
                self.current_rpm = self.in_gear_rpm(self.gear).max(IDLE_RPM);
            }
            DriveState::Downshift { to_gear, .. } => {
                self.speed_mph = (self.speed_mph - BRAKE_MPH_PER_S * dt).max(0.0);
                let target = self.in_gear_rpm(to_gear).max(IDLE_RPM);
                self.approach_rpm(target, dt);
            }
        }
    }

    /// Rate-limited rev change while the clutch is in
    fn approach_rpm(&mut self, target: f64, dt: f64) {
        let rate = if target > self.current_rpm {
            RPM_RISE_PER_S
        } else {
            RPM_FALL_PER_S
        };
        let max_change = rate * dt;
        self.current_rpm += (target - self.current_rpm).clamp(-max_change, max_change);
    }

    /// Throttle and engine load percentages for the current state
    fn pedal_and_load(&mut self) -> (f64, f64) {
        let (throttle, load) = match self.state {
            DriveState::Idle { .. } => (0.0, 20.0),
            DriveState::Accelerate => (70.0, 80.0),
            DriveState::Shift { .. } => (0.0, 10.0),
            DriveState::Cruise { .. } => (15.0, 35.0),
            DriveState::Brake => (0.0, 10.0),
            DriveState::Downshift { .. } => (30.0, 15.0),
        };
        let wobble: f64 = self.rng.gen_range(-3.0..3.0);
        (
            (throttle + wobble).clamp(0.0, 100.0),
            (load + wobble).clamp(0.0, 100.0),
        )
    }
}

impl TelemetrySource for DemoSimulator {
    fn acquire(&mut self) -> Result<Option<EngineSample>, AcquireError> {
        if self.max_samples.is_some_and(|limit| self.emitted >= limit) {
            return Ok(None);
        }
        let (response, timestamp) = self.next_response();
        self.emitted += 1;
        Ok(Some(decode(&response, timestamp)?))
    }

    fn name(&self) -> &str {
        "demo"
    }
}

/// Single-frame response to the engine data request
fn render_response(rpm: f64, speed_mph: f64, load: f64, throttle: f64) -> String {
    let raw_rpm = (rpm * 4.0).round().clamp(0.0, f64::from(u16::MAX)) as u16;
    let speed_kmh = mph_to_kmh(speed_mph).round().clamp(0.0, 255.0) as u8;
    format!(
        "41 0C {:02X} {:02X} 0D {:02X} 04 {:02X} 11 {:02X} \r\r>",
        raw_rpm >> 8,
        raw_rpm & 0xFF,
        speed_kmh,
        percent_to_byte(load.round() as i32),
        percent_to_byte(throttle.round() as i32),
    )
}
