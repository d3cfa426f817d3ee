//! Deterministic speed profile along a route.

use std::f64::consts::PI;

/// Shapes the instantaneous speed as a function of route progress.
///
/// ```text
///  speed
///    │        ╭─╮   ╭─╮   ╭─╮   ╭─╮
///  b ┤      ╭─╯ ╰─╮╭╯ ╰─╮╭╯ ╰─╮╭╯ ╰╮
///    │     ╱       ╰╯    ╰╯    ╰╯   ╲
/// .3b┤────╯                          ╲──
///    └────┬──────────────────────────┬──── progress
///        0.05                       0.95
/// ```
///
/// No randomness: the oscillation stands in for traffic but is a pure
/// function of progress, so replays are exact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpeedProfile {
    /// Fraction of the route spent accelerating (and, mirrored, braking).
    pub ramp_fraction: f64,
    /// Speed at the very start and end, as a fraction of base speed.
    pub ramp_floor: f64,
    /// Peak cruise deviation, as a fraction of base speed.
    pub cruise_amplitude: f64,
    /// Number of half-waves of cruise variation over the whole route
    /// (the argument to `sin` is `progress * π * cruise_waves`).
    pub cruise_waves: f64,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            ramp_fraction:    0.05,
            ramp_floor:       0.3,
            cruise_amplitude: 0.3 * 0.2,
            cruise_waves:     8.0,
        }
    }
}

impl SpeedProfile {
    /// Instantaneous speed at `progress` for the given base speed, in the
    /// base speed's unit.
    ///
    /// Always `> 0` when `base_speed > 0`: the ramps bottom out at
    /// `ramp_floor * base_speed` and the cruise band stays within
    /// `base_speed * (1 ± cruise_amplitude)`.
    pub fn speed_at(&self, progress: f64, base_speed: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        let rise = 1.0 - self.ramp_floor;

        if p < self.ramp_fraction {
            base_speed * self.ramp_floor + base_speed * rise * (p / self.ramp_fraction)
        } else if p > 1.0 - self.ramp_fraction {
            let into_ramp = (p - (1.0 - self.ramp_fraction)) / self.ramp_fraction;
            base_speed * (1.0 - into_ramp * rise)
        } else {
            base_speed + base_speed * self.cruise_amplitude * (p * PI * self.cruise_waves).sin()
        }
    }
}
