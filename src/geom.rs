//! Pure 2D geometry: vectors, boundary predicates, and the campus bounding box.
//!
//! DESIGN
//! ======
//! Everything in this module is a pure function over plain values. Room
//! resolution and clamping live on `RoomCatalog` (see `room`), which calls
//! into these predicates; keeping the math here means it can be tested
//! without building a catalog.
//!
//! Headings follow the avatar convention: 0 faces +y, measured clockwise
//! toward +x, i.e. `heading = atan2(dx, dy)`.

use serde::{Deserialize, Serialize};

/// A 2D point or displacement on the campus plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    #[must_use]
    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `ZERO` for a (near-)zero vector.
    #[must_use]
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len < 1e-9 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// Rotate counter-clockwise by `angle` radians (standard math convention).
    #[must_use]
    pub fn rotated(self, angle: f64) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotate a vector expressed in an avatar's local frame into world space.
    ///
    /// Heading 0 faces +y, so local "forward" (0, 1) maps to
    /// `(sin heading, cos heading)`.
    #[must_use]
    pub fn rotated_by_heading(self, heading: f64) -> Vec2 {
        let (sin, cos) = heading.sin_cos();
        Vec2::new(self.x * cos + self.y * sin, -self.x * sin + self.y * cos)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

// =============================================================================
// BOUNDARY PREDICATES
// =============================================================================

/// Whether `point` lies inside a rectangle of dimensions `size` centered at
/// `center`, rotated by `rotation` radians.
///
/// The point is rotated into the rectangle's local frame by the inverse
/// rotation, then compared against the half extents.
#[must_use]
pub fn point_in_rect(point: Vec2, center: Vec2, size: Vec2, rotation: f64) -> bool {
    let local = (point - center).rotated(-rotation);
    local.x.abs() <= size.x / 2.0 && local.y.abs() <= size.y / 2.0
}

/// Whether `point` lies inside a circle. Squared-distance comparison, no sqrt.
#[must_use]
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f64) -> bool {
    (point - center).length_squared() <= radius * radius
}

// =============================================================================
// AXIS-ALIGNED BOUNDING BOX
// =============================================================================

/// Axis-aligned bounding box, used for the campus movement clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Degenerate box containing exactly one point.
    #[must_use]
    pub fn point(p: Vec2) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing both operands.
    #[must_use]
    pub fn union(self, other: Aabb) -> Aabb {
        Aabb {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Expand by `pad` on every side.
    #[must_use]
    pub fn padded(self, pad: f64) -> Aabb {
        Aabb {
            min: Vec2::new(self.min.x - pad, self.min.y - pad),
            max: Vec2::new(self.max.x + pad, self.max.y + pad),
        }
    }

    /// Clamp a point into the box, each axis independently.
    #[must_use]
    pub fn clamp(self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    #[must_use]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Bounding box of a rotated rectangle, from its four rotated corners.
#[must_use]
pub fn rect_extent(center: Vec2, size: Vec2, rotation: f64) -> Aabb {
    let half = Vec2::new(size.x / 2.0, size.y / 2.0);
    let corners = [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ];
    let mut bounds = Aabb::point(center + corners[0].rotated(rotation));
    for corner in &corners[1..] {
        bounds = bounds.union(Aabb::point(center + corner.rotated(rotation)));
    }
    bounds
}

/// Bounding box of a circle.
#[must_use]
pub fn circle_extent(center: Vec2, radius: f64) -> Aabb {
    Aabb {
        min: Vec2::new(center.x - radius, center.y - radius),
        max: Vec2::new(center.x + radius, center.y + radius),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "geom_test.rs"]
mod tests;
