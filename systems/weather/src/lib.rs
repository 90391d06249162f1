#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rain state and the wet-weather speed governor.

use arcade_racer_core::{Event, SoundCue, Timer, Vehicle};
use log::{debug, trace};

/// Tuning of the wet-weather speed limit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GovernorConfig {
    max_speed: f32,
    warning_threshold: f32,
    warning_cooldown: f32,
    warning_volume: f32,
}

impl GovernorConfig {
    /// Creates a configuration clamping forward speed to `max_speed`.
    #[must_use]
    pub const fn new(
        max_speed: f32,
        warning_threshold: f32,
        warning_cooldown: f32,
        warning_volume: f32,
    ) -> Self {
        Self {
            max_speed,
            warning_threshold,
            warning_cooldown,
            warning_volume,
        }
    }

    /// Forward speed ceiling while raining.
    #[must_use]
    pub const fn max_speed(&self) -> f32 {
        self.max_speed
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self::new(110.0, 105.0, 1.0, 0.4)
    }
}

/// Clamps a vehicle's forward speed while it is raining.
#[derive(Clone, Debug, Default)]
pub struct SpeedGovernor {
    config: GovernorConfig,
    warning: Timer,
}

impl SpeedGovernor {
    /// Creates a governor with an idle warning debounce.
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            warning: Timer::new(),
        }
    }

    /// Advances the warning debounce by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.warning.advance(dt);
    }

    /// Clamps `vehicle.velocity.z` to the limit when `raining`.
    ///
    /// Returns whether the speed was clamped. A warning sound is requested
    /// at most once per debounce window, and only when the pre-clamp speed
    /// exceeded the warning threshold.
    pub fn enforce(&mut self, vehicle: &mut Vehicle, raining: bool, out: &mut Vec<Event>) -> bool {
        let speed = vehicle.velocity.z;
        if !raining || !(speed > self.config.max_speed) {
            return false;
        }

        vehicle.velocity.z = self.config.max_speed;
        trace!("speed limited from {speed} to {}", self.config.max_speed);
        out.push(Event::SpeedLimited { speed });

        if speed > self.config.warning_threshold && !self.warning.active() {
            out.push(Event::SoundRequested {
                cue: SoundCue::SpeedLimit,
                volume: self.config.warning_volume,
                pitch: 1.0,
            });
            self.warning.set(self.config.warning_cooldown);
        }
        true
    }
}

const WETTING_RATE: f32 = 1.2;
const FORCED_WETTING_FACTOR: f32 = 1.5;
const DRYING_RATE: f32 = 0.5;

/// Process-wide rain flag plus the surface wetness it drives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Weather {
    raining: bool,
    forced: bool,
    wetness: f32,
}

impl Weather {
    /// Dry weather.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raining: false,
            forced: false,
            wetness: 0.0,
        }
    }

    /// Whether it is raining.
    #[must_use]
    pub const fn raining(&self) -> bool {
        self.raining
    }

    /// Whether rain was forced on by the course and can no longer be toggled.
    #[must_use]
    pub const fn forced(&self) -> bool {
        self.forced
    }

    /// Surface wetness in `[0, 1]`.
    #[must_use]
    pub const fn wetness(&self) -> f32 {
        self.wetness
    }

    /// Starts heavy rain immediately and locks it on.
    pub fn force_start(&mut self) {
        if !self.forced {
            debug!("rain forced on");
        }
        self.raining = true;
        self.forced = true;
        self.wetness = 1.0;
    }

    /// Flips the rain flag unless it is forced. Returns the new flag.
    pub fn toggle(&mut self) -> bool {
        if self.forced {
            return self.raining;
        }
        self.raining = !self.raining;
        debug!("rain toggled {}", if self.raining { "on" } else { "off" });
        self.raining
    }

    /// Moves wetness towards the current rain state over `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.wetness = if self.raining {
            let factor = if self.forced { FORCED_WETTING_FACTOR } else { 1.0 };
            (self.wetness + dt * WETTING_RATE * factor).min(1.0)
        } else {
            (self.wetness - dt * DRYING_RATE).max(0.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_ignored_while_forced() {
        let mut weather = Weather::new();
        assert!(weather.toggle());
        assert!(!weather.toggle());

        weather.force_start();
        assert!(weather.forced());
        assert!(weather.toggle());
        assert!(weather.raining());
    }

    #[test]
    fn wetness_rises_while_raining_and_dries_afterwards() {
        let mut weather = Weather::new();
        let _ = weather.toggle();
        weather.update(0.5);
        assert!((weather.wetness() - 0.6).abs() < 1e-6);
        weather.update(1.0);
        assert!((weather.wetness() - 1.0).abs() < f32::EPSILON);

        let _ = weather.toggle();
        weather.update(1.0);
        assert!((weather.wetness() - 0.5).abs() < 1e-6);
        weather.update(5.0);
        assert!(weather.wetness().abs() < f32::EPSILON);
    }

    #[test]
    fn forced_rain_starts_fully_wet() {
        let mut weather = Weather::new();
        weather.force_start();
        assert!((weather.wetness() - 1.0).abs() < f32::EPSILON);
    }
}
