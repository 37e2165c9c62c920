//! Layout engine — deterministic placement of remote occupants per room.
//!
//! DESIGN
//! ======
//! A pure map from `(catalog, avatars)` to positions. The local avatar's
//! position is authoritative (it is driven by movement integration) and is
//! never reassigned, but it still occupies the first slot so remote
//! occupants arrange themselves around it deterministically.
//!
//! Rect rooms get an evenly margined grid in the room's local frame, then
//! rotate to world space. Circle rooms get a ring at 0.65x the room radius;
//! a lone occupant sits at the center.

use std::collections::HashMap;

use crate::avatar::AvatarState;
use crate::geom::Vec2;
use crate::room::{Boundary, RoomCatalog};

/// Ring radius never shrinks below this, so tiny pods still spread people out.
const MIN_RING_RADIUS: f64 = 1.5;
/// Ring radius as a fraction of the room radius.
const RING_RADIUS_FACTOR: f64 = 0.65;

/// Compute collision-free positions for every non-local occupant of every
/// room. Returns a map of avatar id to assigned position; avatars absent
/// from the map (the local avatar) keep their current position.
#[must_use]
pub fn compute_room_layout(catalog: &RoomCatalog, avatars: &HashMap<String, AvatarState>) -> HashMap<String, Vec2> {
    let mut by_room: HashMap<&str, Vec<&AvatarState>> = HashMap::new();
    for avatar in avatars.values() {
        by_room.entry(avatar.room_id.as_str()).or_default().push(avatar);
    }

    let mut assigned = HashMap::new();
    for (room_id, mut occupants) in by_room {
        let Some(room) = catalog.room(room_id) else {
            continue;
        };
        // Local first, then by name, with id as the final determinism tie-break.
        occupants.sort_by(|a, b| {
            b.is_local
                .cmp(&a.is_local)
                .then_with(|| a.display_name.cmp(&b.display_name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let slots = room_slots(&room.boundary, occupants.len());
        for (occupant, slot) in occupants.iter().zip(slots) {
            if !occupant.is_local {
                assigned.insert(occupant.id.clone(), slot);
            }
        }
    }
    assigned
}

/// Slot positions for `n` occupants of a room, in slot order.
fn room_slots(boundary: &Boundary, n: usize) -> Vec<Vec2> {
    match *boundary {
        Boundary::Rect { center, size, rotation } => grid_slots(center, size, rotation, n),
        Boundary::Circle { center, radius } => ring_slots(center, radius, n),
    }
}

/// Evenly margined grid inside a (possibly rotated) rectangle. Spacing is
/// `size / (count + 1)` per axis, so the outermost slots never touch a wall.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_slots(center: Vec2, size: Vec2, rotation: f64, n: usize) -> Vec<Vec2> {
    if n == 0 {
        return Vec::new();
    }
    let columns = ((n as f64).sqrt().ceil() as usize).clamp(1, n);
    let rows = n.div_ceil(columns);

    let step_x = size.x / (columns as f64 + 1.0);
    let step_y = size.y / (rows as f64 + 1.0);
    let half = Vec2::new(size.x / 2.0, size.y / 2.0);

    (0..n)
        .map(|i| {
            let col = i % columns;
            let row = i / columns;
            let local = Vec2::new(
                step_x * (col as f64 + 1.0) - half.x,
                step_y * (row as f64 + 1.0) - half.y,
            );
            center + local.rotated(rotation)
        })
        .collect()
}

/// Single occupant at the center; otherwise an evenly spaced ring.
#[allow(clippy::cast_precision_loss)]
fn ring_slots(center: Vec2, radius: f64, n: usize) -> Vec<Vec2> {
    match n {
        0 => Vec::new(),
        1 => vec![center],
        _ => {
            let ring = (radius * RING_RADIUS_FACTOR).max(MIN_RING_RADIUS);
            (0..n)
                .map(|i| {
                    let angle = std::f64::consts::TAU * (i as f64) / (n as f64);
                    center + Vec2::new(angle.cos(), angle.sin()) * ring
                })
                .collect()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
