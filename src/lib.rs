//! `CampusVerse` spatial presence core.
//!
//! ARCHITECTURE
//! ============
//! The crate simulates presence on a multi-room 3D campus for a virtual
//! office client. `PresenceStore` is the single source of truth: a roster
//! of avatars with positions, room membership resolved from geometry, a
//! rate-limited join-nudge queue, waypoints, and operator preferences.
//! Around it sit pure helpers (`geom`, `room`, `layout`), the per-frame
//! `movement` integrator, the `audio` router that mixes remote track
//! volumes by distance and room isolation, and the `scene` loop that drives
//! both from a tokio tick.
//!
//! Rendering, the audio/video transport itself, persistence, and auth all
//! live outside this crate; they talk to it through the roster feed,
//! `AudioTrack` handles, and the read-only state surface.

pub mod audio;
pub mod avatar;
pub mod geom;
pub mod layout;
pub mod movement;
pub mod presence;
pub mod room;
pub mod scene;

pub use audio::{AudioConfig, AudioRouter, AudioTrack, TrackError, TrackEvent};
pub use avatar::{AvatarState, AvatarUpsert, CameraMode, JoinNudge, ParticipantInfo, PositionOptions, PresenceStatus, QualityLevel};
pub use geom::Vec2;
pub use movement::{MoveDir, MovementConfig, MovementController};
pub use presence::{NudgeConfig, PresenceStore};
pub use room::{AudioProfile, Boundary, CatalogError, Falloff, RoomCatalog, RoomDefinition};
pub use scene::{SceneConfig, SceneHandle, SharedPresence, spawn_scene_loop};

/// Read a typed value from the environment, falling back to `default` on a
/// missing or unparseable variable.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
