//! Rigid-body physics seam
//!
//! The gameplay core never integrates bodies itself. It talks to a
//! `PhysicsBackend` through handles and receives collision notifications
//! through a `ContactListener` passed into `step`.
//!
//! `RapierWorld` (in `rapier_world`) is the engine used by matches.
//! `ArenaWorld` here is a small deterministic stand-in for tests: circles and
//! axis-aligned boxes, semi-implicit Euler integration, Box2D-style damping,
//! positional correction plus a restitution impulse, and sensors that report
//! contacts without responding to them.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionResult, circle_box, circle_circle};

/// Opaque reference to a body owned by the physics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned box
    Box { half_extents: Vec2 },
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: Shape,
    pub position: Vec2,
    pub angle: f32,
    /// Ignored for static bodies
    pub mass: f32,
    pub linear_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Sensors report contacts but never collide
    pub sensor: bool,
}

impl BodyDesc {
    pub fn dynamic_circle(radius: f32, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: Shape::Circle { radius },
            position: Vec2::ZERO,
            angle: 0.0,
            mass,
            linear_damping: 0.0,
            restitution: 0.0,
            friction: 0.0,
            sensor: false,
        }
    }

    pub fn static_circle(radius: f32, position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            shape: Shape::Circle { radius },
            position,
            mass: 0.0,
            ..Self::dynamic_circle(radius, 0.0)
        }
    }

    pub fn static_box(half_extents: Vec2, position: Vec2) -> Self {
        Self {
            shape: Shape::Box { half_extents },
            ..Self::static_circle(0.0, position)
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn damping(mut self, linear_damping: f32) -> Self {
        self.linear_damping = linear_damping;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// Contact data delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from body A toward body B (may be zero if degenerate)
    pub normal: Vec2,
    /// Velocity of A at the moment of impact
    pub velocity_a: Vec2,
    /// Velocity of B at the moment of impact
    pub velocity_b: Vec2,
}

impl Contact {
    /// Velocity of B relative to A
    pub fn relative_velocity(&self) -> Vec2 {
        self.velocity_b - self.velocity_a
    }

    /// Same contact seen from B
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            velocity_a: self.velocity_b,
            velocity_b: self.velocity_a,
        }
    }
}

/// Receives collision notifications while the world steps
pub trait ContactListener {
    /// Two bodies started touching
    fn begin_contact(&mut self, a: BodyHandle, b: BodyHandle, contact: &Contact);

    /// A solid contact between two bodies was resolved this step
    fn post_solve(&mut self, a: BodyHandle, b: BodyHandle, contact: &Contact);

    /// Two bodies stopped touching
    fn end_contact(&mut self, _a: BodyHandle, _b: BodyHandle) {}
}

/// Listener that ignores everything
pub struct NoContacts;

impl ContactListener for NoContacts {
    fn begin_contact(&mut self, _a: BodyHandle, _b: BodyHandle, _contact: &Contact) {}
    fn post_solve(&mut self, _a: BodyHandle, _b: BodyHandle, _contact: &Contact) {}
}

/// Operations the gameplay core needs from a rigid-body engine
pub trait PhysicsBackend {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;
    fn destroy_body(&mut self, handle: BodyHandle);

    fn position(&self, handle: BodyHandle) -> Vec2;
    fn set_position(&mut self, handle: BodyHandle, position: Vec2);
    fn angle(&self, handle: BodyHandle) -> f32;
    fn set_angle(&mut self, handle: BodyHandle, angle: f32);
    fn linear_velocity(&self, handle: BodyHandle) -> Vec2;
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2);
    fn angular_velocity(&self, handle: BodyHandle) -> f32;
    fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f32);

    /// Force accumulated until the next step
    fn apply_force(&mut self, handle: BodyHandle, force: Vec2);
    /// Immediate change of momentum
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2);

    /// Toggle collision response while keeping contact detection
    fn set_sensor(&mut self, handle: BodyHandle, sensor: bool);
    fn is_sensor(&self, handle: BodyHandle) -> bool;

    /// Radius of a circle body (zero for other shapes)
    fn radius(&self, handle: BodyHandle) -> f32;

    /// Forget which pairs are touching so every overlap reports a fresh
    /// `begin_contact` on the next step
    fn reset_contacts(&mut self);

    /// Advance the simulation, reporting contacts to `listener`
    fn step(&mut self, dt: f32, listener: &mut dyn ContactListener);
}

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    alive: bool,
    position: Vec2,
    angle: f32,
    velocity: Vec2,
    angular_velocity: f32,
    force: Vec2,
    inv_mass: f32,
}

impl Body {
    fn new(desc: &BodyDesc) -> Self {
        let inv_mass = match desc.kind {
            BodyKind::Dynamic if desc.mass > 0.0 => 1.0 / desc.mass,
            _ => 0.0,
        };
        Self {
            desc: *desc,
            alive: true,
            position: desc.position,
            angle: desc.angle,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            inv_mass,
        }
    }

    fn is_static(&self) -> bool {
        self.desc.kind == BodyKind::Static
    }
}

/// Minimal 2D world for circles and axis-aligned boxes, used as a test double
#[derive(Debug, Clone, Default)]
pub struct ArenaWorld {
    bodies: Vec<Body>,
    /// Pairs currently touching (lower handle first)
    touching: BTreeSet<(BodyHandle, BodyHandle)>,
}

impl ArenaWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.alive).count()
    }

    fn body(&self, handle: BodyHandle) -> &Body {
        &self.bodies[handle.0 as usize]
    }

    fn body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        &mut self.bodies[handle.0 as usize]
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().filter(|b| b.alive && !b.is_static()) {
            body.velocity += body.force * body.inv_mass * dt;
            body.velocity *= 1.0 / (1.0 + dt * body.desc.linear_damping);
            body.position += body.velocity * dt;
            body.angle += body.angular_velocity * dt;
            body.force = Vec2::ZERO;
        }
    }

    fn test_pair(&self, a: &Body, b: &Body) -> CollisionResult {
        match (a.desc.shape, b.desc.shape) {
            (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
                circle_circle(a.position, ra, b.position, rb)
            }
            (Shape::Circle { radius }, Shape::Box { half_extents }) => {
                circle_box(a.position, radius, b.position, half_extents)
            }
            (Shape::Box { half_extents }, Shape::Circle { radius }) => {
                circle_box(b.position, radius, a.position, half_extents).flipped()
            }
            // Boxes are only used for static geometry
            (Shape::Box { .. }, Shape::Box { .. }) => CollisionResult::miss(),
        }
    }

    /// Push bodies apart and apply the restitution impulse
    fn resolve(&mut self, ia: usize, ib: usize, hit: &CollisionResult) {
        let (inv_a, inv_b) = (self.bodies[ia].inv_mass, self.bodies[ib].inv_mass);
        let inv_sum = inv_a + inv_b;
        if inv_sum <= 0.0 {
            return;
        }
        let n = hit.normal;

        let correction = n * (hit.penetration / inv_sum);
        self.bodies[ia].position -= correction * inv_a;
        self.bodies[ib].position += correction * inv_b;

        let rel = self.bodies[ib].velocity - self.bodies[ia].velocity;
        let approach = rel.dot(n);
        if approach >= 0.0 {
            return;
        }
        let restitution = self.bodies[ia]
            .desc
            .restitution
            .max(self.bodies[ib].desc.restitution);
        let j = -(1.0 + restitution) * approach / inv_sum;
        self.bodies[ia].velocity -= n * (j * inv_a);
        self.bodies[ib].velocity += n * (j * inv_b);
    }
}

impl PhysicsBackend for ArenaWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Body::new(desc));
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        self.body_mut(handle).alive = false;
        self.touching.retain(|&(a, b)| a != handle && b != handle);
    }

    fn position(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle).position
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        self.body_mut(handle).position = position;
    }

    fn angle(&self, handle: BodyHandle) -> f32 {
        self.body(handle).angle
    }

    fn set_angle(&mut self, handle: BodyHandle, angle: f32) {
        self.body_mut(handle).angle = angle;
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle).velocity
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        let body = self.body_mut(handle);
        if !body.is_static() {
            body.velocity = velocity;
        }
    }

    fn angular_velocity(&self, handle: BodyHandle) -> f32 {
        self.body(handle).angular_velocity
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f32) {
        let body = self.body_mut(handle);
        if !body.is_static() {
            body.angular_velocity = omega;
        }
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        self.body_mut(handle).force += force;
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        let body = self.body_mut(handle);
        body.velocity += impulse * body.inv_mass;
    }

    fn set_sensor(&mut self, handle: BodyHandle, sensor: bool) {
        self.body_mut(handle).desc.sensor = sensor;
    }

    fn is_sensor(&self, handle: BodyHandle) -> bool {
        self.body(handle).desc.sensor
    }

    fn radius(&self, handle: BodyHandle) -> f32 {
        match self.body(handle).desc.shape {
            Shape::Circle { radius } => radius,
            Shape::Box { .. } => 0.0,
        }
    }

    fn reset_contacts(&mut self) {
        self.touching.clear();
    }

    fn step(&mut self, dt: f32, listener: &mut dyn ContactListener) {
        self.integrate(dt);

        let mut now_touching = BTreeSet::new();
        let count = self.bodies.len();
        for ia in 0..count {
            for ib in (ia + 1)..count {
                let (a, b) = (&self.bodies[ia], &self.bodies[ib]);
                if !a.alive || !b.alive || (a.is_static() && b.is_static()) {
                    continue;
                }
                let hit = self.test_pair(a, b);
                if !hit.hit {
                    continue;
                }

                let solid = !a.desc.sensor && !b.desc.sensor;
                let pair = (BodyHandle(ia as u32), BodyHandle(ib as u32));
                let contact = Contact {
                    normal: hit.normal,
                    velocity_a: a.velocity,
                    velocity_b: b.velocity,
                };
                now_touching.insert(pair);
                if !self.touching.contains(&pair) {
                    listener.begin_contact(pair.0, pair.1, &contact);
                }
                if solid {
                    self.resolve(ia, ib, &hit);
                    listener.post_solve(pair.0, pair.1, &contact);
                }
            }
        }

        for &(a, b) in self.touching.difference(&now_touching) {
            listener.end_contact(a, b);
        }
        self.touching = now_touching;
    }
}
