//! Audio router — distance/isolation volume mixing for remote tracks.
//!
//! DESIGN
//! ======
//! The router owns no avatar state; it reads the presence store and applies
//! per-participant volume multipliers to opaque transport track handles.
//! Instead of subscribing to the store it polls the store's revision (plus a
//! dirty flag raised by track lifecycle events), so a pass is skipped
//! entirely when nothing relevant changed.
//!
//! ERROR HANDLING
//! ==============
//! A volume write against a not-yet-ready track is swallowed: the cached
//! value for that track is invalidated so the next trigger retries. Nothing
//! in this module is fatal; worst case is a stale volume that self-heals on
//! the next pass.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::avatar::AvatarState;
use crate::presence::PresenceStore;
use crate::room::{AudioProfile, Falloff, RoomCatalog};

const DEFAULT_MIN_AUDIBLE: f64 = 0.02;
const DEFAULT_VOLUME_EPSILON: f64 = 0.01;

/// Exponent of the perceptual (logarithmic) falloff curve.
const LOG_FALLOFF_EXPONENT: f64 = 2.2;

// =============================================================================
// TRANSPORT BOUNDARY
// =============================================================================

/// Failure applying a volume to a transport track.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The track exists but its playback element is not attached yet.
    #[error("track is not ready")]
    NotReady,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Opaque per-participant audio handle exposed by the transport layer.
/// `Send` so the router can live inside the scene loop task.
pub trait AudioTrack: Send {
    fn set_volume(&self, volume: f64) -> Result<(), TrackError>;
}

/// Track lifecycle notification from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Subscribed,
    Unsubscribed,
    Published,
}

// =============================================================================
// CONFIG
// =============================================================================

/// Mixing thresholds, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Positive volumes are floored here so distant speech stays faintly present.
    pub min_audible: f64,
    /// Writes are suppressed when within this distance of the last applied value.
    pub volume_epsilon: f64,
}

impl AudioConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            min_audible: crate::env_parse("CAMPUS_MIN_AUDIBLE", DEFAULT_MIN_AUDIBLE),
            volume_epsilon: crate::env_parse("CAMPUS_VOLUME_EPSILON", DEFAULT_VOLUME_EPSILON),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { min_audible: DEFAULT_MIN_AUDIBLE, volume_epsilon: DEFAULT_VOLUME_EPSILON }
    }
}

// =============================================================================
// VOLUME MODEL
// =============================================================================

/// Distance attenuation for a profile: 1 inside `min_distance`, 0 at or
/// beyond `max_distance`, interpolated between.
#[must_use]
pub fn falloff_gain(profile: &AudioProfile, distance: f64) -> f64 {
    if distance <= profile.min_distance {
        return 1.0;
    }
    if distance >= profile.max_distance {
        return 0.0;
    }
    let t = (distance - profile.min_distance) / (profile.max_distance - profile.min_distance);
    match profile.falloff {
        Falloff::Linear => 1.0 - t,
        Falloff::Logarithmic => (1.0 - t).powf(LOG_FALLOFF_EXPONENT),
    }
}

/// Cross-room bleed factor: 1 when both avatars share a room, otherwise the
/// complement of the stronger room isolation.
#[must_use]
pub fn isolation_factor(local: &AvatarState, remote: &AvatarState, catalog: &RoomCatalog) -> f64 {
    if local.room_id == remote.room_id {
        return 1.0;
    }
    let iso = |room_id: &str| catalog.room(room_id).map_or(0.0, |r| r.audio_profile.isolation);
    (1.0 - iso(&local.room_id).max(iso(&remote.room_id))).max(0.0)
}

/// Playback volume multiplier for one remote participant, in `[0, 1]`.
///
/// The governing profile is the remote avatar's room profile when its room
/// is known, else the local avatar's.
#[must_use]
pub fn compute_volume(
    local: &AvatarState,
    remote: &AvatarState,
    catalog: &RoomCatalog,
    speaker_enabled: bool,
    min_audible: f64,
) -> f64 {
    if !speaker_enabled {
        return 0.0;
    }
    let Some(profile) = catalog
        .room(&remote.room_id)
        .or_else(|| catalog.room(&local.room_id))
        .map(|r| r.audio_profile)
    else {
        return 0.0;
    };

    let distance = local.position.distance(remote.position);
    let volume = falloff_gain(&profile, distance) * isolation_factor(local, remote, catalog);
    if volume > 0.0 { volume.max(min_audible) } else { 0.0 }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Applies computed volumes to registered transport tracks, with a per-track
/// cache to suppress redundant writes.
pub struct AudioRouter {
    tracks: HashMap<String, Box<dyn AudioTrack>>,
    /// Last successfully applied volume per avatar id.
    applied: HashMap<String, f64>,
    last_revision: Option<u64>,
    dirty: bool,
    config: AudioConfig,
}

impl AudioRouter {
    #[must_use]
    pub fn new(config: AudioConfig) -> Self {
        Self {
            tracks: HashMap::new(),
            applied: HashMap::new(),
            last_revision: None,
            dirty: false,
            config,
        }
    }

    /// Attach a transport track for a participant. Replaces any previous
    /// handle and forces a recompute on the next pass.
    pub fn register_track(&mut self, avatar_id: impl Into<String>, track: Box<dyn AudioTrack>) {
        let avatar_id = avatar_id.into();
        self.applied.remove(&avatar_id);
        self.tracks.insert(avatar_id, track);
        self.dirty = true;
    }

    pub fn remove_track(&mut self, avatar_id: &str) {
        self.tracks.remove(avatar_id);
        self.applied.remove(avatar_id);
        self.dirty = true;
    }

    /// Transport lifecycle callback; any event invalidates the cache for
    /// that track and schedules a pass.
    pub fn handle_track_event(&mut self, avatar_id: &str, event: TrackEvent) {
        debug!(avatar_id, ?event, "track lifecycle event");
        self.applied.remove(avatar_id);
        self.dirty = true;
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Recompute and apply volumes if the store changed since the last pass
    /// or a track event arrived. Returns the number of volume writes made.
    pub fn route(&mut self, store: &PresenceStore) -> usize {
        if !self.dirty && self.last_revision == Some(store.revision()) {
            return 0;
        }
        self.route_now(store)
    }

    /// Unconditional recompute-and-apply pass (used on mount).
    pub fn route_now(&mut self, store: &PresenceStore) -> usize {
        self.last_revision = Some(store.revision());
        self.dirty = false;

        let Some(local) = store.local_avatar() else {
            // No local anchor to mix against; retry once one appears.
            self.dirty = true;
            return 0;
        };

        let speaker = store.speaker_enabled();
        let mut writes = 0;
        for (avatar_id, track) in &self.tracks {
            let Some(remote) = store.avatar(avatar_id) else {
                continue;
            };
            if remote.is_local {
                continue;
            }
            let volume = compute_volume(local, remote, store.catalog(), speaker, self.config.min_audible);

            if let Some(&last) = self.applied.get(avatar_id) {
                if (volume - last).abs() < self.config.volume_epsilon {
                    continue;
                }
            }
            match track.set_volume(volume) {
                Ok(()) => {
                    self.applied.insert(avatar_id.clone(), volume);
                    writes += 1;
                }
                Err(err) => {
                    // Transient: drop the cache entry so the next pass retries.
                    warn!(avatar_id, error = %err, "volume write failed; will retry");
                    self.applied.remove(avatar_id);
                    self.dirty = true;
                }
            }
        }
        writes
    }
}

impl Default for AudioRouter {
    fn default() -> Self {
        Self::new(AudioConfig::from_env())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
