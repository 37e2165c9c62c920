//! Avatar types: runtime state, roster feed entries, nudges, preferences.
//!
//! DESIGN
//! ======
//! `AvatarState` derives `PartialEq` on every field; the presence store
//! leans on that for semantic no-op detection, so any field added here is
//! automatically part of the "did anything actually change" check.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::Vec2;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// ROSTER FEED
// =============================================================================

/// Availability advertised by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    DoNotDisturb,
}

/// One entry of the participant roster feed. Ids are opaque identities
/// minted by the transport; the core never fabricates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    /// Set by the transport on the entry representing this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_local: Option<bool>,
}

// =============================================================================
// RUNTIME STATE
// =============================================================================

/// Live state of one participant on the campus plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub id: String,
    pub display_name: String,
    pub room_id: String,
    pub position: Vec2,
    /// Radians; 0 faces +y, computed as `atan2(dx, dy)` from movement.
    pub heading: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    pub is_local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub last_active_ms: i64,
}

/// Create-or-merge payload for `PresenceStore::upsert_avatar`.
#[derive(Debug, Clone, Default)]
pub struct AvatarUpsert {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub status: Option<PresenceStatus>,
    /// Claim to be the local avatar. Only the first claim wins.
    pub is_local: bool,
    /// Optional position override; omitted for pure profile updates.
    pub position: Option<Vec2>,
}

/// Options for `PresenceStore::set_avatar_position`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionOptions {
    /// Pin the heading instead of deriving it from the movement delta.
    /// Used by close-up camera modes to avoid jitter while strafing.
    pub heading: Option<f64>,
}

// =============================================================================
// NOTIFICATIONS & PREFERENCES
// =============================================================================

/// Rate-limited "someone joined your room" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinNudge {
    pub id: Uuid,
    pub avatar_id: String,
    pub room_id: String,
    pub display_name: String,
    pub ts_ms: i64,
}

/// Camera behavior requested by the operator, consumed by the renderer and
/// by movement integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Follow camera behind the avatar.
    #[default]
    ThirdPerson,
    /// Through the avatar's eyes.
    FirstPerson,
    /// Top-down map view (world-axis movement, reserved).
    Overhead,
}

impl CameraMode {
    /// Whether movement input is expressed relative to the avatar's facing.
    #[must_use]
    pub fn is_avatar_relative(self) -> bool {
        matches!(self, Self::ThirdPerson | Self::FirstPerson)
    }

    /// Whether the heading is pinned during movement instead of recomputed
    /// from position deltas.
    #[must_use]
    pub fn pins_heading(self) -> bool {
        matches!(self, Self::FirstPerson)
    }
}

/// Rendering quality preference, consumed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Low,
    #[default]
    Balanced,
    High,
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Remote avatar fixture at a given position.
    #[must_use]
    pub fn dummy_avatar(id: &str, room_id: &str, position: Vec2) -> AvatarState {
        AvatarState {
            id: id.into(),
            display_name: id.into(),
            room_id: room_id.into(),
            position,
            heading: 0.0,
            status: None,
            is_local: false,
            avatar_url: None,
            last_active_ms: 0,
        }
    }

    /// Roster feed entry fixture.
    #[must_use]
    pub fn dummy_participant(id: &str, is_local: bool) -> ParticipantInfo {
        ParticipantInfo {
            id: id.into(),
            display_name: id.into(),
            avatar_url: None,
            status: None,
            is_local: if is_local { Some(true) } else { None },
        }
    }
}
