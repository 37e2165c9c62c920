//! Room catalog — static campus topology and audio profiles.
//!
//! DESIGN
//! ======
//! `RoomCatalog` is immutable after construction and validated up front:
//! unique ids, a real fallback room, sane audio ranges. Every other module
//! treats it as read-only shared data. Room resolution scans rooms in
//! catalog order; that order is also the tie-break for overlapping
//! boundaries (the built-in campus has none).

use serde::{Deserialize, Serialize};

use crate::geom::{self, Aabb, Vec2};

/// Padding, in campus units, added around the union of room extents when
/// clamping movement.
pub const CAMPUS_PADDING: f64 = 4.0;

// =============================================================================
// TYPES
// =============================================================================

/// Distance-to-attenuation curve shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Falloff {
    Linear,
    Logarithmic,
}

/// How audio behaves inside and across a room boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioProfile {
    pub falloff: Falloff,
    /// Below this distance, no attenuation.
    pub min_distance: f64,
    /// At or beyond this distance, full attenuation.
    pub max_distance: f64,
    /// 0.0 = sound leaks freely across the boundary, 1.0 = fully soundproof.
    pub isolation: f64,
}

/// Geometric extent of a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Boundary {
    Rect { center: Vec2, size: Vec2, rotation: f64 },
    Circle { center: Vec2, radius: f64 },
}

impl Boundary {
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Boundary::Rect { center, size, rotation } => geom::point_in_rect(point, center, size, rotation),
            Boundary::Circle { center, radius } => geom::point_in_circle(point, center, radius),
        }
    }

    /// Axis-aligned bounding box of the boundary.
    #[must_use]
    pub fn extent(&self) -> Aabb {
        match *self {
            Boundary::Rect { center, size, rotation } => geom::rect_extent(center, size, rotation),
            Boundary::Circle { center, radius } => geom::circle_extent(center, radius),
        }
    }

    /// Geometric center, used as the default spawn point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        match *self {
            Boundary::Rect { center, .. } | Boundary::Circle { center, .. } => center,
        }
    }
}

/// A named campus region with a boundary and an audio profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDefinition {
    pub id: String,
    pub name: String,
    pub theme_color: String,
    pub boundary: Boundary,
    pub audio_profile: AudioProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_hint: Option<u32>,
    /// Free-form signage payload rendered by the client (labels, icons).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signage: Option<serde_json::Value>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("room catalog must contain at least one room")]
    Empty,
    #[error("duplicate room id \"{id}\"")]
    DuplicateRoomId { id: String },
    #[error("fallback room \"{id}\" is not in the catalog")]
    UnknownFallback { id: String },
    #[error("room \"{id}\" isolation {value} is outside [0, 1]")]
    InvalidIsolation { id: String, value: f64 },
    #[error("room \"{id}\" audio distances are invalid (min {min}, max {max})")]
    InvalidFalloffRange { id: String, min: f64, max: f64 },
}

// =============================================================================
// CATALOG
// =============================================================================

/// Validated, immutable set of rooms plus the designated fallback room.
#[derive(Debug, Clone)]
pub struct RoomCatalog {
    rooms: Vec<RoomDefinition>,
    fallback_id: String,
}

impl RoomCatalog {
    /// Build a catalog, validating ids, fallback, and audio profiles.
    pub fn new(rooms: Vec<RoomDefinition>, fallback_id: impl Into<String>) -> Result<Self, CatalogError> {
        let fallback_id = fallback_id.into();
        if rooms.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for room in &rooms {
            if !seen.insert(room.id.as_str()) {
                return Err(CatalogError::DuplicateRoomId { id: room.id.clone() });
            }
            let profile = room.audio_profile;
            if !(0.0..=1.0).contains(&profile.isolation) {
                return Err(CatalogError::InvalidIsolation { id: room.id.clone(), value: profile.isolation });
            }
            if profile.min_distance < 0.0 || profile.max_distance <= profile.min_distance {
                return Err(CatalogError::InvalidFalloffRange {
                    id: room.id.clone(),
                    min: profile.min_distance,
                    max: profile.max_distance,
                });
            }
        }
        if !seen.contains(fallback_id.as_str()) {
            return Err(CatalogError::UnknownFallback { id: fallback_id });
        }
        Ok(Self { rooms, fallback_id })
    }

    #[must_use]
    pub fn rooms(&self) -> &[RoomDefinition] {
        &self.rooms
    }

    #[must_use]
    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    #[must_use]
    pub fn room(&self, id: &str) -> Option<&RoomDefinition> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Resolve which room a position belongs to: first boundary containing
    /// the point, in catalog order, else the fallback room.
    #[must_use]
    pub fn resolve_room(&self, pos: Vec2) -> &str {
        self.rooms
            .iter()
            .find(|room| room.boundary.contains(pos))
            .map_or(self.fallback_id.as_str(), |room| room.id.as_str())
    }

    /// Union bounding box of every room extent plus `CAMPUS_PADDING`.
    #[must_use]
    pub fn campus_bounds(&self) -> Option<Aabb> {
        let mut iter = self.rooms.iter();
        let first = iter.next()?.boundary.extent();
        let bounds = iter.fold(first, |acc, room| acc.union(room.boundary.extent()));
        Some(bounds.padded(CAMPUS_PADDING))
    }

    /// Clamp a position into the campus bounds, each axis independently.
    /// Identity when the catalog is somehow empty of extents.
    #[must_use]
    pub fn clamp_to_campus(&self, pos: Vec2) -> Vec2 {
        match self.campus_bounds() {
            Some(bounds) => bounds.clamp(pos),
            None => pos,
        }
    }

    /// The built-in campus: an open lobby (fallback), a rotated boardroom,
    /// a soundproof focus pod, an open lounge, and a desks area.
    #[must_use]
    pub fn default_campus() -> Self {
        let open_profile = AudioProfile {
            falloff: Falloff::Logarithmic,
            min_distance: 2.0,
            max_distance: 14.0,
            isolation: 0.0,
        };
        let rooms = vec![
            RoomDefinition {
                id: "lobby".into(),
                name: "Lobby".into(),
                theme_color: "#90CAF9".into(),
                boundary: Boundary::Rect {
                    center: Vec2::new(0.0, 0.0),
                    size: Vec2::new(24.0, 16.0),
                    rotation: 0.0,
                },
                audio_profile: open_profile,
                capacity_hint: Some(24),
                signage: None,
            },
            RoomDefinition {
                id: "boardroom".into(),
                name: "Boardroom".into(),
                theme_color: "#FFCC80".into(),
                boundary: Boundary::Rect {
                    center: Vec2::new(22.0, 6.0),
                    size: Vec2::new(12.0, 8.0),
                    rotation: std::f64::consts::FRAC_PI_6,
                },
                audio_profile: AudioProfile {
                    falloff: Falloff::Linear,
                    min_distance: 1.5,
                    max_distance: 10.0,
                    isolation: 0.85,
                },
                capacity_hint: Some(10),
                signage: Some(serde_json::json!({ "icon": "presentation" })),
            },
            RoomDefinition {
                id: "focus-pod".into(),
                name: "Focus Pod".into(),
                theme_color: "#A5D6A7".into(),
                boundary: Boundary::Circle { center: Vec2::new(-18.0, 8.0), radius: 5.0 },
                audio_profile: AudioProfile {
                    falloff: Falloff::Linear,
                    min_distance: 1.0,
                    max_distance: 6.0,
                    isolation: 1.0,
                },
                capacity_hint: Some(4),
                signage: Some(serde_json::json!({ "icon": "headphones" })),
            },
            RoomDefinition {
                id: "lounge".into(),
                name: "Lounge".into(),
                theme_color: "#CE93D8".into(),
                boundary: Boundary::Circle { center: Vec2::new(-16.0, -10.0), radius: 7.0 },
                audio_profile: open_profile,
                capacity_hint: Some(12),
                signage: None,
            },
            RoomDefinition {
                id: "desks".into(),
                name: "Desks".into(),
                theme_color: "#FFF59D".into(),
                boundary: Boundary::Rect {
                    center: Vec2::new(18.0, -10.0),
                    size: Vec2::new(16.0, 10.0),
                    rotation: 0.0,
                },
                audio_profile: AudioProfile {
                    falloff: Falloff::Logarithmic,
                    min_distance: 1.5,
                    max_distance: 9.0,
                    isolation: 0.3,
                },
                capacity_hint: Some(16),
                signage: None,
            },
        ];
        Self::new(rooms, "lobby").expect("built-in campus is valid")
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
