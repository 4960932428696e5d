//! Narrow-phase collision tests for the built-in physics world
//!
//! Only two shape pairs exist on the field: circles against circles
//! (players, balls, goal posts) and circles against axis-aligned boxes
//! (walls, goal sensors).

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the shapes touch or overlap
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec2,
    /// Unit normal pointing from the first shape toward the second
    pub normal: Vec2,
    /// Overlap depth (zero when exactly touching)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    /// Same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Circle A against circle B
pub fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> CollisionResult {
    let delta = pos_b - pos_a;
    let dist = delta.length();
    let reach = radius_a + radius_b;
    if dist > reach {
        return CollisionResult::miss();
    }

    // Concentric circles have no defined normal; push along +x
    let normal = if dist > f32::EPSILON {
        delta / dist
    } else {
        Vec2::X
    };
    CollisionResult {
        hit: true,
        point: pos_a + normal * radius_a,
        normal,
        penetration: reach - dist,
    }
}

/// Circle against an axis-aligned box centered at `box_pos`
///
/// The normal points from the circle toward the box.
pub fn circle_box(
    circle_pos: Vec2,
    radius: f32,
    box_pos: Vec2,
    half_extents: Vec2,
) -> CollisionResult {
    let local = circle_pos - box_pos;
    let clamped = local.clamp(-half_extents, half_extents);

    if clamped != local {
        // Center outside the box: nearest point on the surface
        let to_circle = local - clamped;
        let dist = to_circle.length();
        if dist > radius {
            return CollisionResult::miss();
        }
        let normal = if dist > f32::EPSILON {
            -to_circle / dist
        } else {
            Vec2::X
        };
        return CollisionResult {
            hit: true,
            point: box_pos + clamped,
            normal,
            penetration: radius - dist,
        };
    }

    // Center inside the box: leave through the nearest face
    let to_face_x = half_extents.x - local.x.abs();
    let to_face_y = half_extents.y - local.y.abs();
    let (outward, depth) = if to_face_x < to_face_y {
        (Vec2::new(local.x.signum(), 0.0), to_face_x)
    } else {
        (Vec2::new(0.0, local.y.signum()), to_face_y)
    };
    CollisionResult {
        hit: true,
        point: circle_pos + outward * depth,
        normal: -outward,
        penetration: radius + depth,
    }
}
