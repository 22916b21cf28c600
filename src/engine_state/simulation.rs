//! # Simulation Context
//!
//! Holds the state that every component of a frame needs to agree on: the global daylight
//! factor and its update schedule. One context is owned by the `EngineState` and passed by
//! reference to the terrain meshers and the chunk renderer.

use std::f32::consts::PI;

use web_time::Duration;

use crate::engine_state::config::EngineConfig;

/// Lowest daylight factor reached at night.
pub const MIN_DAYLIGHT: f32 = 0.15;
/// Daylight factor at full day.
pub const MAX_DAYLIGHT: f32 = 1.0;
/// Smallest change of the daylight factor that is worth a relight.
pub const DAYLIGHT_CHANGE_THRESHOLD: f32 = 0.1;

/// Sky color at full daylight.
const SKY_COLOR: [f32; 3] = [0.6289, 0.6953, 0.9];

/// Per-run simulation state shared by the meshing and scheduling components.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    daylight: f32,
    last_daylight_update: Duration,
    /// Engine time at which the current day cycle started.
    day_start: Duration,
    update_interval: Duration,
    day_length: Duration,
    no_night: bool,
}

impl SimulationContext {
    /// Creates a context in full daylight using the schedule from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            daylight: MAX_DAYLIGHT,
            last_daylight_update: Duration::ZERO,
            day_start: Duration::ZERO,
            update_interval: Duration::from_millis(config.daylight_update_interval_ms),
            day_length: Duration::from_millis(config.day_length_ms.max(1)),
            no_night: config.no_night,
        }
    }

    /// Returns to full daylight and starts a new day cycle at `now`.
    pub fn reset(&mut self, now: Duration) {
        self.daylight = MAX_DAYLIGHT;
        self.last_daylight_update = now;
        self.day_start = now;
    }

    /// Current daylight factor in `[MIN_DAYLIGHT, MAX_DAYLIGHT]`.
    pub fn daylight(&self) -> f32 {
        self.daylight
    }

    /// Forces a daylight factor. Used by tests and by backends that pin the time of day.
    pub fn set_daylight(&mut self, factor: f32) {
        self.daylight = factor.clamp(MIN_DAYLIGHT, MAX_DAYLIGHT);
    }

    /// Whether the night cycle is disabled.
    pub fn no_night(&self) -> bool {
        self.no_night
    }

    /// Enables or disables the night cycle. Disabling it restores full daylight.
    pub fn set_no_night(&mut self, no_night: bool) {
        self.no_night = no_night;
        if no_night {
            self.daylight = MAX_DAYLIGHT;
        }
    }

    /// Daylight factor the schedule prescribes at `now`, measured from the start of the
    /// current day cycle.
    pub fn scheduled_daylight(&self, now: Duration) -> f32 {
        let elapsed = now.saturating_sub(self.day_start);
        let phase = elapsed.as_secs_f32() / self.day_length.as_secs_f32();
        ((phase * PI).cos() * 0.6 + 0.7).clamp(MIN_DAYLIGHT, MAX_DAYLIGHT)
    }

    /// Advances the daylight schedule.
    ///
    /// The factor is re-evaluated once per update interval and only applied if it moved by
    /// at least `DAYLIGHT_CHANGE_THRESHOLD`.
    ///
    /// # Arguments
    /// * `now` - Time since engine start
    ///
    /// # Returns
    /// `true` if the factor changed and lit geometry has to be rebuilt.
    pub fn update_daylight(&mut self, now: Duration) -> bool {
        if self.no_night {
            return false;
        }
        if now.saturating_sub(self.last_daylight_update) <= self.update_interval {
            return false;
        }
        self.last_daylight_update = now;

        let target = self.scheduled_daylight(now);
        if (target - self.daylight).abs() >= DAYLIGHT_CHANGE_THRESHOLD {
            log::info!("Daylight factor {:.2} -> {:.2}", self.daylight, target);
            self.daylight = target;
            return true;
        }
        false
    }

    /// Background clear color for the current daylight factor.
    pub fn clear_color(&self) -> [f32; 3] {
        SKY_COLOR.map(|channel| channel * self.daylight)
    }

    /// Fog density for the current daylight factor; denser at night.
    pub fn fog_density(&self) -> f32 {
        0.02 + (MAX_DAYLIGHT - self.daylight) * 0.04
    }
}
