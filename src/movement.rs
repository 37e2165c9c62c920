//! Movement controller — per-frame velocity integration for the local avatar.
//!
//! DESIGN
//! ======
//! The controller owns the pressed-key set and a velocity; each tick it
//! drives the velocity toward `input_direction * max_speed` (or toward zero
//! when idle) as an exponential approach, then writes the displaced
//! position through `PresenceStore::set_avatar_position`. The store remains
//! authoritative: clamping, room resolution, and heading rules all happen
//! there.
//!
//! ERROR HANDLING
//! ==============
//! A missing local avatar (roster removal racing the frame) skips the frame.
//! Non-finite integration results are rejected and the velocity reset, so a
//! bad frame can never corrupt the committed position.

use std::collections::HashSet;

use tracing::warn;

use crate::avatar::PositionOptions;
use crate::geom::Vec2;
use crate::presence::PresenceStore;

const DEFAULT_MAX_SPEED: f64 = 4.0;
const DEFAULT_ACCELERATION: f64 = 12.0;
const DEFAULT_DAMPING: f64 = 8.0;
/// Frame deltas are clamped to this many milliseconds (~1/24 s) so a stalled
/// or backgrounded client cannot integrate across a huge gap.
const DEFAULT_MAX_FRAME_DT_MS: u64 = 42;

/// Velocity below this is treated as stopped.
const REST_SPEED: f64 = 1e-4;

// =============================================================================
// CONFIG
// =============================================================================

/// Integration tuning, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    /// Top speed in campus units per second.
    pub max_speed: f64,
    /// Approach rate toward the target velocity, per second squared.
    pub acceleration: f64,
    /// Decay rate toward zero when no input is held, per second.
    pub damping: f64,
    /// Upper bound on a single frame delta, in seconds.
    pub max_frame_dt: f64,
}

impl MovementConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let max_frame_dt_ms = crate::env_parse("CAMPUS_MAX_FRAME_DT_MS", DEFAULT_MAX_FRAME_DT_MS);
        Self {
            max_speed: crate::env_parse("CAMPUS_MAX_SPEED", DEFAULT_MAX_SPEED),
            acceleration: crate::env_parse("CAMPUS_ACCELERATION", DEFAULT_ACCELERATION),
            damping: crate::env_parse("CAMPUS_DAMPING", DEFAULT_DAMPING),
            max_frame_dt: std::time::Duration::from_millis(max_frame_dt_ms).as_secs_f64(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            acceleration: DEFAULT_ACCELERATION,
            damping: DEFAULT_DAMPING,
            max_frame_dt: std::time::Duration::from_millis(DEFAULT_MAX_FRAME_DT_MS).as_secs_f64(),
        }
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// Movement intent from the input layer. The hosting client maps raw key
/// events (WASD, arrows) to these before they reach the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDir {
    Forward,
    Back,
    Left,
    Right,
}

impl MoveDir {
    /// Unit vector in the avatar's local frame (heading 0 faces +y).
    #[must_use]
    pub fn unit_vector(self) -> Vec2 {
        match self {
            MoveDir::Forward => Vec2::new(0.0, 1.0),
            MoveDir::Back => Vec2::new(0.0, -1.0),
            MoveDir::Left => Vec2::new(-1.0, 0.0),
            MoveDir::Right => Vec2::new(1.0, 0.0),
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Per-frame integrator for the local avatar.
pub struct MovementController {
    pressed: HashSet<MoveDir>,
    velocity: Vec2,
    config: MovementConfig,
}

impl MovementController {
    #[must_use]
    pub fn new(config: MovementConfig) -> Self {
        Self { pressed: HashSet::new(), velocity: Vec2::ZERO, config }
    }

    pub fn press(&mut self, dir: MoveDir) {
        self.pressed.insert(dir);
    }

    pub fn release(&mut self, dir: MoveDir) {
        self.pressed.remove(&dir);
    }

    /// Drop all held input (window blur, scene teardown).
    pub fn clear_input(&mut self) {
        self.pressed.clear();
    }

    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Integrate one frame and write the local avatar's new position through
    /// the store. Returns whether a position update was committed.
    pub fn integrate(&mut self, dt_secs: f64, store: &mut PresenceStore) -> bool {
        let dt = if dt_secs.is_finite() { dt_secs.clamp(0.0, self.config.max_frame_dt) } else { 0.0 };
        if dt <= 0.0 {
            return false;
        }

        // Roster removal can race the frame loop; skip, don't crash.
        let Some(local) = store.local_avatar() else {
            return false;
        };
        let (local_id, heading, position) = (local.id.clone(), local.heading, local.position);

        let raw: Vec2 = self
            .pressed
            .iter()
            .fold(Vec2::ZERO, |acc, dir| acc + dir.unit_vector());
        let input = raw.normalized();

        let camera = store.camera_mode();
        let world_input = if camera.is_avatar_relative() {
            // "Forward" tracks the avatar's facing.
            input.rotated_by_heading(heading)
        } else {
            input
        };

        let (target, rate) = if world_input == Vec2::ZERO {
            (Vec2::ZERO, self.config.damping)
        } else {
            (world_input * self.config.max_speed, self.config.acceleration)
        };
        let blend = 1.0 - (-rate * dt).exp();
        self.velocity = self.velocity + (target - self.velocity) * blend;

        if self.velocity.length() < REST_SPEED {
            self.velocity = Vec2::ZERO;
            return false;
        }

        let next = position + self.velocity * dt;
        if !next.is_finite() {
            warn!(?next, "rejecting non-finite integration result");
            self.velocity = Vec2::ZERO;
            return false;
        }

        // First-person-style modes pin the heading so strafing cannot make
        // tiny deltas whip the camera around.
        let opts = if camera.pins_heading() {
            PositionOptions { heading: Some(heading) }
        } else {
            PositionOptions::default()
        };
        store.set_avatar_position(&local_id, next, opts)
    }
}

impl Default for MovementController {
    fn default() -> Self {
        Self::new(MovementConfig::from_env())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "movement_test.rs"]
mod tests;
