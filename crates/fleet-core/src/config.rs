//! Engine configuration.
//!
//! Typically built with `DeliveryConfig::default()` and tweaked, or loaded
//! from JSON by the application crate (enable the `serde` feature).

use crate::{CoreError, CoreResult};

/// Miles-per-hour to kilometres-per-hour.
pub const MPH_TO_KMH: f64 = 1.60934;

// ── DetectionRule ─────────────────────────────────────────────────────────────

/// One proximity regime for marking packages delivered.
///
/// A waypoint is deliverable when the vehicle is within `radius_km` of it
/// *and* the session progress is strictly greater than `min_progress`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionRule {
    pub radius_km:    f64,
    pub min_progress: f64,
}

impl DetectionRule {
    /// Checked every tick while the vehicle is moving.
    pub const IN_TRANSIT: DetectionRule = DetectionRule { radius_km: 0.10, min_progress: 0.15 };

    /// Run once when the vehicle reaches the end of its route.  Wider, with no
    /// progress gate, to catch destinations the discrete steps skipped past.
    pub const FINAL_SWEEP: DetectionRule = DetectionRule { radius_km: 0.15, min_progress: 0.0 };

    pub fn new(radius_km: f64, min_progress: f64) -> Self {
        Self { radius_km, min_progress }
    }

    /// Apply the rule to a measured distance at the given progress.
    #[inline]
    pub fn accepts(&self, distance_km: f64, progress: f64) -> bool {
        distance_km <= self.radius_km && progress > self.min_progress
    }

    fn validate(&self, what: &str) -> CoreResult<()> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(CoreError::Config(format!(
                "{what}.radius_km must be a positive number, got {}",
                self.radius_km
            )));
        }
        if !(0.0..1.0).contains(&self.min_progress) {
            return Err(CoreError::Config(format!(
                "{what}.min_progress must be in [0, 1), got {}",
                self.min_progress
            )));
        }
        Ok(())
    }
}

// ── DeliveryConfig ────────────────────────────────────────────────────────────

/// Tunables for the delivery simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeliveryConfig {
    /// Base speed fed to the speed profile, in miles per hour.  The tick
    /// converts to kilometres with [`MPH_TO_KMH`].  Default: 35.
    pub base_speed_mph: f64,

    /// Proximity rule applied on every tick.
    pub in_transit: DetectionRule,

    /// Proximity rule applied once at route completion.
    pub final_sweep: DetectionRule,

    /// Real-time cadence of the tick scheduler, in milliseconds.  Independent
    /// of any session's time scale.  Default: 16 (one animation frame).
    pub tick_interval_ms: u64,

    /// Time scale assigned to newly created sessions.  Default: 1.0.
    pub default_time_scale: f64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_speed_mph:     35.0,
            in_transit:         DetectionRule::IN_TRANSIT,
            final_sweep:        DetectionRule::FINAL_SWEEP,
            tick_interval_ms:   16,
            default_time_scale: 1.0,
        }
    }
}

impl DeliveryConfig {
    /// Check every field; returns the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.base_speed_mph.is_finite() && self.base_speed_mph > 0.0) {
            return Err(CoreError::Config(format!(
                "base_speed_mph must be a positive number, got {}",
                self.base_speed_mph
            )));
        }
        self.in_transit.validate("in_transit")?;
        self.final_sweep.validate("final_sweep")?;
        if self.tick_interval_ms == 0 {
            return Err(CoreError::Config("tick_interval_ms must be at least 1".into()));
        }
        if !(self.default_time_scale.is_finite() && self.default_time_scale > 0.0) {
            return Err(CoreError::Config(format!(
                "default_time_scale must be a positive number, got {}",
                self.default_time_scale
            )));
        }
        Ok(())
    }

    /// Scheduler cadence as a `Duration`.
    #[inline]
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}
