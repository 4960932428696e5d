//! rapier2d physics backend
//!
//! Wraps a rapier pipeline behind `PhysicsBackend`. Rapier reports contacts
//! through an `EventHandler`; the collected events are replayed to the
//! listener after each step, keyed by our own `BodyHandle`s so the gameplay
//! core never sees rapier types.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rapier2d::prelude::*;

use super::physics::{BodyDesc, BodyHandle, BodyKind, Contact, ContactListener, PhysicsBackend, Shape};

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Started,
    Stopped,
    Solved,
}

#[derive(Debug, Clone, Copy)]
struct PhysicsEvent {
    kind: EventKind,
    collider1: ColliderHandle,
    collider2: ColliderHandle,
}

/// Collects rapier events during `PhysicsPipeline::step`
#[derive(Default)]
struct ContactEventCollector {
    events: Mutex<Vec<PhysicsEvent>>,
}

impl ContactEventCollector {
    fn push(&self, event: PhysicsEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn take(&self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventHandler for ContactEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let kind = if event.started() {
            EventKind::Started
        } else {
            EventKind::Stopped
        };
        self.push(PhysicsEvent {
            kind,
            collider1: event.collider1(),
            collider2: event.collider2(),
        });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        self.push(PhysicsEvent {
            kind: EventKind::Solved,
            collider1: contact_pair.collider1,
            collider2: contact_pair.collider2,
        });
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    radius: f32,
    /// Zero for static bodies
    inv_mass: f32,
    alive: bool,
}

/// Physics world backed by rapier2d
pub struct RapierWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    physics_hooks: (),
    event_handler: ContactEventCollector,

    entries: Vec<Entry>,
    by_collider: HashMap<ColliderHandle, BodyHandle>,
    /// Pairs currently touching (lower handle first)
    touching: BTreeSet<(BodyHandle, BodyHandle)>,
    /// Report every live overlap as new on the next step
    rescan: bool,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            // Top-down field
            gravity: vector![0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            physics_hooks: (),
            event_handler: ContactEventCollector::default(),
            entries: Vec::new(),
            by_collider: HashMap::new(),
            touching: BTreeSet::new(),
            rescan: false,
        }
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_count(&self) -> usize {
        self.entries.iter().filter(|e| e.alive).count()
    }

    fn entry(&self, handle: BodyHandle) -> Option<&Entry> {
        self.entries
            .get(handle.0 as usize)
            .filter(|e| e.alive)
    }

    fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.entry(handle)
            .and_then(|e| self.rigid_body_set.get(e.body))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let body = self.entry(handle)?.body;
        self.rigid_body_set.get_mut(body)
    }

    fn collider_mut(&mut self, handle: BodyHandle) -> Option<&mut Collider> {
        let collider = self.entry(handle)?.collider;
        self.collider_set.get_mut(collider)
    }

    /// Map a rapier pair to ours, lower handle first
    fn pair(&self, c1: ColliderHandle, c2: ColliderHandle) -> Option<(BodyHandle, BodyHandle)> {
        let (a, b) = (*self.by_collider.get(&c1)?, *self.by_collider.get(&c2)?);
        Some(if a <= b { (a, b) } else { (b, a) })
    }

    /// Contact along the line between centers, with velocities from before the step
    fn contact(&self, a: BodyHandle, b: BodyHandle, before: &[Vec2]) -> Contact {
        let velocity = |h: BodyHandle| before.get(h.0 as usize).copied().unwrap_or(Vec2::ZERO);
        Contact {
            normal: (self.position(b) - self.position(a)).normalize_or_zero(),
            velocity_a: velocity(a),
            velocity_b: velocity(b),
        }
    }

    fn either_sensor(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.is_sensor(a) || self.is_sensor(b)
    }

    /// Overlaps rapier already knows about, for use after `reset_contacts`
    fn active_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let contacts = self
            .narrow_phase
            .contact_pairs()
            .filter(|p| p.has_any_active_contact)
            .map(|p| (p.collider1, p.collider2));
        let intersections = self
            .narrow_phase
            .intersection_pairs()
            .filter(|(_, _, hit)| *hit)
            .map(|(c1, c2, _)| (c1, c2));
        contacts
            .chain(intersections)
            .filter_map(|(c1, c2)| self.pair(c1, c2))
            .collect()
    }
}

impl PhysicsBackend for RapierWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let builder = match desc.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .linear_damping(desc.linear_damping)
                .can_sleep(false),
            BodyKind::Static => RigidBodyBuilder::fixed(),
        };
        let rigid_body = builder
            .translation(to_vector(desc.position))
            .rotation(desc.angle)
            .build();
        let body = self.rigid_body_set.insert(rigid_body);

        let (shape, radius) = match desc.shape {
            Shape::Circle { radius } => (ColliderBuilder::ball(radius), radius),
            Shape::Box { half_extents } => (ColliderBuilder::cuboid(half_extents.x, half_extents.y), 0.0),
        };
        let mut collider = shape
            .restitution(desc.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .friction(desc.friction)
            .sensor(desc.sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS)
            .contact_force_event_threshold(0.0);
        let inv_mass = match desc.kind {
            BodyKind::Dynamic if desc.mass > 0.0 => {
                collider = collider.mass(desc.mass);
                1.0 / desc.mass
            }
            _ => 0.0,
        };
        let collider = self
            .collider_set
            .insert_with_parent(collider.build(), body, &mut self.rigid_body_set);

        let handle = BodyHandle(self.entries.len() as u32);
        self.entries.push(Entry {
            body,
            collider,
            radius,
            inv_mass,
            alive: true,
        });
        self.by_collider.insert(collider, handle);
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        let Some(entry) = self.entry(handle).copied() else {
            return;
        };
        self.rigid_body_set.remove(
            entry.body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.by_collider.remove(&entry.collider);
        self.touching.retain(|&(a, b)| a != handle && b != handle);
        if let Some(entry) = self.entries.get_mut(handle.0 as usize) {
            entry.alive = false;
        }
    }

    fn position(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle)
            .map(|b| to_vec2(b.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            body.set_translation(to_vector(position), true);
        }
    }

    fn angle(&self, handle: BodyHandle) -> f32 {
        self.body(handle)
            .map(|b| b.rotation().angle())
            .unwrap_or(0.0)
    }

    fn set_angle(&mut self, handle: BodyHandle, angle: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.set_rotation(Rotation::new(angle), true);
        }
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle)
            .map(|b| to_vec2(b.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.set_linvel(to_vector(velocity), true);
            }
        }
    }

    fn angular_velocity(&self, handle: BodyHandle) -> f32 {
        self.body(handle).map(|b| b.angvel()).unwrap_or(0.0)
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f32) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.set_angvel(omega, true);
            }
        }
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            body.add_force(to_vector(force), true);
        }
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        // Mass properties of a new body are only settled by the first step
        let Some(inv_mass) = self.entry(handle).map(|e| e.inv_mass) else {
            return;
        };
        let velocity = self.linear_velocity(handle) + impulse * inv_mass;
        self.set_linear_velocity(handle, velocity);
    }

    fn set_sensor(&mut self, handle: BodyHandle, sensor: bool) {
        if let Some(collider) = self.collider_mut(handle) {
            collider.set_sensor(sensor);
        }
    }

    fn is_sensor(&self, handle: BodyHandle) -> bool {
        self.entry(handle)
            .and_then(|e| self.collider_set.get(e.collider))
            .is_some_and(|c| c.is_sensor())
    }

    fn radius(&self, handle: BodyHandle) -> f32 {
        self.entry(handle).map(|e| e.radius).unwrap_or(0.0)
    }

    fn reset_contacts(&mut self) {
        self.touching.clear();
        self.rescan = true;
    }

    fn step(&mut self, dt: f32, listener: &mut dyn ContactListener) {
        let before: Vec<Vec2> = (0..self.entries.len())
            .map(|i| self.linear_velocity(BodyHandle(i as u32)))
            .collect();

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &self.physics_hooks,
            &self.event_handler,
        );

        // Rapier keeps user forces until cleared; ours last one step
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
        }

        for event in self.event_handler.take() {
            let Some((a, b)) = self.pair(event.collider1, event.collider2) else {
                continue;
            };
            match event.kind {
                EventKind::Started => {
                    if self.touching.insert((a, b)) {
                        listener.begin_contact(a, b, &self.contact(a, b, &before));
                    }
                }
                EventKind::Stopped => {
                    if self.touching.remove(&(a, b)) {
                        listener.end_contact(a, b);
                    }
                }
                EventKind::Solved => {
                    if !self.either_sensor(a, b) {
                        listener.post_solve(a, b, &self.contact(a, b, &before));
                    }
                }
            }
        }

        if self.rescan {
            self.rescan = false;
            for (a, b) in self.active_pairs() {
                if self.touching.insert((a, b)) {
                    listener.begin_contact(a, b, &self.contact(a, b, &before));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::NoContacts;

    #[derive(Default)]
    struct Recorder {
        begins: Vec<(BodyHandle, BodyHandle, Contact)>,
        solves: usize,
        ends: usize,
    }

    impl ContactListener for Recorder {
        fn begin_contact(&mut self, a: BodyHandle, b: BodyHandle, contact: &Contact) {
            self.begins.push((a, b, *contact));
        }
        fn post_solve(&mut self, _a: BodyHandle, _b: BodyHandle, _contact: &Contact) {
            self.solves += 1;
        }
        fn end_contact(&mut self, _a: BodyHandle, _b: BodyHandle) {
            self.ends += 1;
        }
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_force_lasts_one_step() {
        let mut world = RapierWorld::new();
        let h = world.create_body(&BodyDesc::dynamic_circle(1.0, 2.0));
        world.apply_force(h, Vec2::new(120.0, 0.0));
        world.step(DT, &mut NoContacts);
        let v = world.linear_velocity(h).x;
        assert!((v - 1.0).abs() < 1e-3, "got {v}");

        world.step(DT, &mut NoContacts);
        assert!((world.linear_velocity(h).x - v).abs() < 1e-5);
        assert!(world.position(h).x > 0.0);
    }

    #[test]
    fn test_impulse_before_first_step() {
        let mut world = RapierWorld::new();
        let h = world.create_body(&BodyDesc::dynamic_circle(0.5, 0.5));
        world.apply_impulse(h, Vec2::new(0.0, 2.0));
        assert_eq!(world.linear_velocity(h), Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_sensor_reports_begin_without_response() {
        let mut world = RapierWorld::new();
        let ball = world.create_body(&BodyDesc::dynamic_circle(0.5, 0.1));
        world.set_linear_velocity(ball, Vec2::new(6.0, 0.0));
        let sensor = world.create_body(&BodyDesc::static_box(Vec2::new(0.125, 2.5), Vec2::new(0.5, 0.0)).sensor());
        assert!(world.is_sensor(sensor));

        let mut rec = Recorder::default();
        world.step(DT, &mut rec);
        world.step(DT, &mut rec);
        assert_eq!(rec.begins.len(), 1);
        assert_eq!((rec.begins[0].0, rec.begins[0].1), (ball, sensor));
        assert!((rec.begins[0].2.velocity_a.x - 6.0).abs() < 1e-4);
        assert_eq!(rec.solves, 0);
        assert!((world.linear_velocity(ball).x - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_solid_contact_stops_at_wall() {
        let mut world = RapierWorld::new();
        let ball = world.create_body(&BodyDesc::dynamic_circle(1.0, 1.0).restitution(0.5).at(Vec2::new(-0.99, 0.0)));
        let wall = world.create_body(&BodyDesc::static_box(Vec2::new(1.0, 10.0), Vec2::new(1.0, 0.0)));
        world.set_linear_velocity(ball, Vec2::new(10.0, 0.0));

        let mut rec = Recorder::default();
        for _ in 0..3 {
            world.step(DT, &mut rec);
        }
        assert_eq!(rec.begins.len(), 1);
        assert_eq!((rec.begins[0].0, rec.begins[0].1), (ball, wall));
        assert!(rec.solves >= 1);
        let v = world.linear_velocity(ball);
        assert!(v.x < 1.0, "still driving into the wall at {v}");
        assert!(world.position(ball).x < 0.1);
        assert_eq!(world.position(wall), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_reset_contacts_reports_overlap_again() {
        let mut world = RapierWorld::new();
        world.create_body(&BodyDesc::dynamic_circle(0.5, 0.1));
        world.create_body(&BodyDesc::static_box(Vec2::new(0.125, 2.5), Vec2::new(0.3, 0.0)).sensor());
        let mut rec = Recorder::default();

        world.step(DT, &mut rec);
        world.step(DT, &mut rec);
        assert_eq!(rec.begins.len(), 1);

        world.reset_contacts();
        world.step(DT, &mut rec);
        assert_eq!(rec.begins.len(), 2);
        assert_eq!(rec.ends, 0);
    }

    #[test]
    fn test_separation_ends_contact() {
        let mut world = RapierWorld::new();
        let ball = world.create_body(&BodyDesc::dynamic_circle(0.5, 0.1));
        world.create_body(&BodyDesc::static_box(Vec2::new(0.125, 2.5), Vec2::new(0.3, 0.0)).sensor());
        let mut rec = Recorder::default();
        world.step(DT, &mut rec);

        world.set_position(ball, Vec2::new(-10.0, 0.0));
        world.step(DT, &mut rec);
        assert_eq!(rec.ends, 1);
    }

    #[test]
    fn test_destroyed_body_is_gone() {
        let mut world = RapierWorld::new();
        let a = world.create_body(&BodyDesc::dynamic_circle(1.0, 1.0));
        world.create_body(&BodyDesc::dynamic_circle(1.0, 1.0).at(Vec2::new(1.0, 0.0)));
        world.destroy_body(a);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.position(a), Vec2::ZERO);

        let mut rec = Recorder::default();
        world.step(DT, &mut rec);
        assert!(rec.begins.is_empty());
    }

    #[test]
    fn test_angle_round_trip() {
        let mut world = RapierWorld::new();
        let h = world.create_body(&BodyDesc::dynamic_circle(1.0, 1.0));
        world.set_angle(h, 1.0);
        assert!((world.angle(h) - 1.0).abs() < 1e-5);
        assert_eq!(world.radius(h), 1.0);
    }
}
