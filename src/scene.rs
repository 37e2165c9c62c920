//! Scene loop — ties movement integration and audio routing to the scene
//! lifecycle.
//!
//! DESIGN
//! ======
//! A background task ticks at the configured rate, integrates one movement
//! frame, and runs an audio routing pass. The store, controller, and router
//! are shared behind `Mutex`es so the hosting application keeps feeding
//! input events and transport callbacks while the loop runs. Frame deltas
//! come from the tokio clock, so tests drive the loop deterministically
//! with a paused runtime.
//!
//! Teardown is explicit: `SceneHandle::stop` aborts the task on scene
//! unmount or transport disconnect.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::audio::AudioRouter;
use crate::movement::MovementController;
use crate::presence::PresenceStore;

const DEFAULT_TICK_HZ: u64 = 60;

/// The presence store as shared by the host, the loop, and UI callbacks.
pub type SharedPresence = Arc<Mutex<PresenceStore>>;

/// Tick rate tuning, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct SceneConfig {
    pub tick_hz: u64,
}

impl SceneConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self { tick_hz: crate::env_parse("CAMPUS_TICK_HZ", DEFAULT_TICK_HZ) }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self { tick_hz: DEFAULT_TICK_HZ }
    }
}

/// Handle to a running scene loop. Dropping it does NOT stop the loop;
/// teardown is an explicit `stop` at scene unmount.
pub struct SceneHandle {
    task: JoinHandle<()>,
}

impl SceneHandle {
    /// Cancel the loop. Safe to call from any context.
    pub fn stop(self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Spawn the per-frame scene loop. Returns a handle for shutdown.
#[must_use]
pub fn spawn_scene_loop(
    store: SharedPresence,
    controller: Arc<Mutex<MovementController>>,
    router: Arc<Mutex<AudioRouter>>,
    config: SceneConfig,
) -> SceneHandle {
    let period = Duration::from_nanos(1_000_000_000 / config.tick_hz.max(1));
    info!(tick_hz = config.tick_hz, "scene loop starting");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = tokio::time::Instant::now();

        loop {
            ticker.tick().await;
            let now = tokio::time::Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;

            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            {
                let mut controller = controller.lock().unwrap_or_else(PoisonError::into_inner);
                controller.integrate(dt, &mut store);
            }
            let mut router = router.lock().unwrap_or_else(PoisonError::into_inner);
            router.route(&store);
        }
    });

    SceneHandle { task }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "scene_test.rs"]
mod tests;
