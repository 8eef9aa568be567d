//! Fixed-step orchestrator: ties gravity, integration, constraint solving,
//! collision detection, contact resolution, and sleeping into one
//! `Engine::update` call per step.

use crate::body::{Body, BASE_DELTA};
use crate::collision::detector;
use crate::collision::pairs::{Pair, PairsRegistry};
use crate::collision::resolver;
use crate::common::EngineContext;
use crate::composite::Composite;
use crate::constraint::{self, Constraint, Endpoint};
use crate::events::{Event, EventEmitter, EventName};
use crate::sleeping;
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Downward acceleration direction and its scale, applied each step as
/// `force += mass * gravity * gravity.scale` to every non-static,
/// non-sleeping body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Gravity {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Gravity {
    fn default() -> Self {
        Self { x: 0.0, y: 1.0, scale: 0.001 }
    }
}

/// Step timing, read-only to callers via [`Engine::timing`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timing {
    pub timestamp: f64,
    pub time_scale: f64,
    pub last_delta: f64,
    pub last_elapsed: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self { timestamp: 0.0, time_scale: 1.0, last_delta: 0.0, last_elapsed: 0.0 }
    }
}

/// Construction-time options for [`Engine::new`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub gravity: Gravity,
    pub enable_sleeping: bool,
    pub position_iterations: u32,
    pub velocity_iterations: u32,
    pub constraint_iterations: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            gravity: Gravity::default(),
            enable_sleeping: false,
            position_iterations: 6,
            velocity_iterations: 4,
            constraint_iterations: 2,
        }
    }
}

/// Owns the world, the live contact-pair registry, the id/PRNG context, and
/// runs the fixed-step update loop.
pub struct Engine {
    pub world: Composite,
    pub pairs: PairsRegistry,
    pub ctx: EngineContext,
    pub gravity: Gravity,
    pub timing: Timing,
    pub events: EventEmitter,
    pub enable_sleeping: bool,
    pub position_iterations: u32,
    pub velocity_iterations: u32,
    pub constraint_iterations: u32,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_seed(1, options)
    }

    /// Creates an engine with an explicit PRNG seed, for reproducible runs.
    pub fn with_seed(seed: u32, options: EngineOptions) -> Self {
        let mut ctx = EngineContext::new(seed);
        let world = Composite::new(&mut ctx, "World");
        tracing::info!(seed, "engine created");
        Self {
            world,
            pairs: PairsRegistry::new(),
            ctx,
            gravity: options.gravity,
            timing: Timing::default(),
            events: EventEmitter::new(),
            enable_sleeping: options.enable_sleeping,
            position_iterations: options.position_iterations,
            velocity_iterations: options.velocity_iterations,
            constraint_iterations: options.constraint_iterations,
        }
    }

    /// The context bodies and constraints must be constructed against
    /// before being added to [`Engine::world`].
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    pub fn add_body(&mut self, body: Body) -> u64 {
        self.world.add_body(body)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> u64 {
        self.world.add_constraint(constraint)
    }

    pub fn add_composite(&mut self, composite: Composite) -> u64 {
        self.world.add_composite(composite)
    }

    /// Discards the world and the contact-pair registry, resetting timing.
    /// The id/category/group/PRNG context is left untouched.
    pub fn clear(&mut self) {
        self.world = Composite::new(&mut self.ctx, "World");
        self.pairs = PairsRegistry::new();
        self.timing = Timing::default();
        tracing::info!("engine cleared");
    }

    /// Advances the simulation by one fixed step. `delta` defaults to
    /// [`BASE_DELTA`] (ms) when `None`, then is scaled by `timing.time_scale`.
    pub fn update(&mut self, delta: Option<f64>) {
        let started = std::time::Instant::now();

        let delta = delta.unwrap_or(BASE_DELTA) * self.timing.time_scale;
        self.timing.timestamp += delta;
        self.timing.last_delta = delta;

        let (mut bodies, mut constraints) = self.world.bodies_and_constraints_mut();
        let id_index = resolver::index_bodies(&bodies);

        self.events.emit(EventName::BeforeUpdate, &Event::Step { timestamp: self.timing.timestamp });

        let sleep_before: HashMap<u64, bool> = bodies.iter().map(|b| (b.id, b.is_sleeping)).collect();
        sleeping::update(&mut bodies, delta, BASE_DELTA, self.enable_sleeping);

        let gravity = self.gravity;
        for body in bodies.iter_mut().filter(|b| !b.is_static && !b.is_sleeping) {
            body.force += Vector2::new(gravity.x, gravity.y) * (body.mass * gravity.scale);
        }

        for body in bodies.iter_mut().filter(|b| !b.is_static && !b.is_sleeping) {
            body.update(delta);
        }

        let ts = (delta / BASE_DELTA).clamp(0.0, 1.0);
        self.events.emit(EventName::BeforeSolve, &Event::Step { timestamp: self.timing.timestamp });
        solve_constraints(&mut bodies, &id_index, &mut constraints, self.constraint_iterations, ts);

        let collisions = {
            let body_refs: Vec<&Body> = bodies.iter().map(|b| &**b).collect();
            detector::collisions(&body_refs)
        };
        {
            let bodies_by_id: HashMap<u64, &Body> = bodies.iter().map(|b| (b.id, &**b)).collect();
            self.pairs.update(collisions, &bodies_by_id, self.timing.timestamp as u64);
        }

        if self.enable_sleeping {
            sleeping::after_collisions(&mut bodies, &self.pairs);
        }
        emit_sleep_transitions(&mut self.events, &bodies, &sleep_before);

        if !self.pairs.collision_start.is_empty() {
            self.events.emit(
                EventName::CollisionStart,
                &Event::Collision { pair_ids: self.pairs.collision_start.clone() },
            );
        }

        let mut active_pairs: Vec<Pair> =
            self.pairs.list.iter().filter_map(|key| self.pairs.table.get(key).cloned()).collect();

        let position_damping = (20.0 / self.position_iterations.max(1) as f64).clamp(0.0, 1.0);
        let totals = resolver::pre_solve_position(&active_pairs);
        for _ in 0..self.position_iterations {
            resolver::solve_position(&mut active_pairs, &mut bodies, &id_index, &totals, delta, position_damping);
        }
        resolver::post_solve_position(&mut bodies);

        solve_constraints(&mut bodies, &id_index, &mut constraints, self.constraint_iterations, ts);

        resolver::pre_solve_velocity(&active_pairs, &mut bodies, &id_index);
        for _ in 0..self.velocity_iterations {
            resolver::solve_velocity(&mut active_pairs, &mut bodies, &id_index, delta);
        }

        for pair in active_pairs {
            self.pairs.table.insert(pair.id.clone(), pair);
        }

        for body in bodies.iter_mut() {
            body.update_velocities();
        }

        if !self.pairs.collision_active.is_empty() {
            self.events.emit(
                EventName::CollisionActive,
                &Event::Collision { pair_ids: self.pairs.collision_active.clone() },
            );
        }
        if !self.pairs.collision_end.is_empty() {
            self.events.emit(
                EventName::CollisionEnd,
                &Event::Collision { pair_ids: self.pairs.collision_end.clone() },
            );
        }

        for body in bodies.iter_mut() {
            body.clear_forces();
        }

        self.timing.last_elapsed = started.elapsed().as_secs_f64() * 1000.0;
        self.events.emit(EventName::AfterUpdate, &Event::Step { timestamp: self.timing.timestamp });
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

/// Runs one pre/solve(×iterations)/post pass over every constraint in the
/// world, resolving each constraint's body ids against `bodies` by index.
///
/// Each iteration solves in two passes: constraints with a static or
/// world-fixed endpoint first, then the rest, so a dynamic body settles
/// against its anchors before chained dynamic-to-dynamic links relax.
fn solve_constraints(
    bodies: &mut [&mut Body],
    id_index: &HashMap<u64, usize>,
    constraints: &mut [&mut Constraint],
    iterations: u32,
    ts: f64,
) {
    constraint::pre_solve_all(bodies);

    let has_fixed_endpoint: Vec<bool> =
        constraints.iter().map(|c| constraint_has_fixed_endpoint(c, bodies, id_index)).collect();

    for _ in 0..iterations {
        for &pass_fixed in &[true, false] {
            for (constraint, &is_fixed) in constraints.iter_mut().zip(has_fixed_endpoint.iter()) {
                if is_fixed != pass_fixed {
                    continue;
                }
                let constraint: &mut Constraint = &mut **constraint;
                let (a, b) = constraint_endpoints(bodies, id_index, constraint);
                crate::constraint::solve(constraint, a, b, ts);
            }
        }
    }
    constraint::post_solve_all(bodies);
}

fn constraint_has_fixed_endpoint(constraint: &Constraint, bodies: &[&mut Body], id_index: &HashMap<u64, usize>) -> bool {
    endpoint_is_fixed(constraint.body_a, bodies, id_index) || endpoint_is_fixed(constraint.body_b, bodies, id_index)
}

fn endpoint_is_fixed(body_id: Option<u64>, bodies: &[&mut Body], id_index: &HashMap<u64, usize>) -> bool {
    match body_id {
        None => true,
        Some(id) => id_index.get(&id).map(|&i| bodies[i].is_static).unwrap_or(true),
    }
}

/// Resolves a constraint's `body_a`/`body_b` ids into solver [`Endpoint`]s,
/// pulling at most two distinct mutable bodies out of one flat slice.
fn constraint_endpoints<'s, 'a>(
    bodies: &'s mut [&'a mut Body],
    id_index: &HashMap<u64, usize>,
    constraint: &Constraint,
) -> (Endpoint<'s>, Endpoint<'s>) {
    let index_a = constraint.body_a.and_then(|id| id_index.get(&id).copied());
    let index_b = constraint.body_b.and_then(|id| id_index.get(&id).copied());

    match (index_a, index_b) {
        (Some(i), Some(j)) => {
            let (a, b) = two_mut(bodies, i, j);
            (
                Endpoint { body: Some(a), local_point: constraint.point_a },
                Endpoint { body: Some(b), local_point: constraint.point_b },
            )
        }
        (Some(i), None) => (
            Endpoint { body: Some(&mut *bodies[i]), local_point: constraint.point_a },
            Endpoint { body: None, local_point: constraint.point_b },
        ),
        (None, Some(j)) => (
            Endpoint { body: None, local_point: constraint.point_a },
            Endpoint { body: Some(&mut *bodies[j]), local_point: constraint.point_b },
        ),
        (None, None) => (
            Endpoint { body: None, local_point: constraint.point_a },
            Endpoint { body: None, local_point: constraint.point_b },
        ),
    }
}

fn two_mut<'s, 'a>(bodies: &'s mut [&'a mut Body], i: usize, j: usize) -> (&'s mut Body, &'s mut Body) {
    assert_ne!(i, j, "a constraint must reference two distinct bodies");
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut *left[i], &mut *right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut *right[0], &mut *left[j])
    }
}

fn emit_sleep_transitions(events: &mut EventEmitter, bodies: &[&mut Body], before: &HashMap<u64, bool>) {
    for body in bodies.iter() {
        let was_sleeping = before.get(&body.id).copied().unwrap_or(false);
        if body.is_sleeping && !was_sleeping {
            events.emit(EventName::SleepStart, &Event::Sleep { body_id: body.id });
        } else if !body.is_sleeping && was_sleeping {
            events.emit(EventName::SleepEnd, &Event::Sleep { body_id: body.id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;
    use crate::constraint::ConstraintOptions;

    fn falling_body(engine: &mut Engine, x: f64, y: f64) -> u64 {
        let ctx = engine.context_mut();
        let body = Body::rectangle(ctx, Vector2::new(x, y), 40.0, 40.0, BodyOptions::default());
        engine.add_body(body)
    }

    fn static_floor(engine: &mut Engine, x: f64, y: f64) -> u64 {
        let ctx = engine.context_mut();
        let options = BodyOptions { is_static: true, ..BodyOptions::default() };
        let body = Body::rectangle(ctx, Vector2::new(x, y), 400.0, 40.0, options);
        engine.add_body(body)
    }

    #[test]
    fn gravity_accelerates_a_dynamic_body_downward() {
        let mut engine = Engine::default();
        let id = falling_body(&mut engine, 0.0, 0.0);
        let start_y = engine.world.find_body(id).unwrap().position.y;
        for _ in 0..20 {
            engine.update(None);
        }
        let end_y = engine.world.find_body(id).unwrap().position.y;
        assert!(end_y > start_y);
    }

    #[test]
    fn static_body_never_moves() {
        let mut engine = Engine::default();
        let id = static_floor(&mut engine, 0.0, 300.0);
        let start = engine.world.find_body(id).unwrap().position;
        for _ in 0..50 {
            engine.update(None);
        }
        assert_eq!(engine.world.find_body(id).unwrap().position, start);
    }

    #[test]
    fn box_resting_on_floor_produces_an_active_pair() {
        let mut engine = Engine::default();
        falling_body(&mut engine, 100.0, 0.0);
        static_floor(&mut engine, 100.0, 30.0);
        for _ in 0..40 {
            engine.update(None);
        }
        assert!(!engine.pairs.list.is_empty());
    }

    #[test]
    fn constraint_pulls_two_bodies_toward_rest_length() {
        let mut engine = Engine::default();
        engine.gravity = Gravity { x: 0.0, y: 0.0, scale: 0.0 };
        let id_a = falling_body(&mut engine, -50.0, 0.0);
        let id_b = falling_body(&mut engine, 50.0, 0.0);

        let (point_a, point_b) = {
            let a = engine.world.find_body(id_a).unwrap();
            let b = engine.world.find_body(id_b).unwrap();
            (a.position, b.position)
        };
        let constraint = Constraint::new(
            engine.context_mut().next_id(),
            ConstraintOptions {
                body_a: Some(id_a),
                body_b: Some(id_b),
                length: Some(10.0),
                ..Default::default()
            },
            point_a,
            point_b,
        );
        engine.add_constraint(constraint);

        let start_distance = {
            let a = engine.world.find_body(id_a).unwrap();
            let b = engine.world.find_body(id_b).unwrap();
            (a.position - b.position).magnitude()
        };
        for _ in 0..30 {
            engine.update(None);
        }
        let end_distance = {
            let a = engine.world.find_body(id_a).unwrap();
            let b = engine.world.find_body(id_b).unwrap();
            (a.position - b.position).magnitude()
        };
        assert!(end_distance < start_distance);
    }

    #[test]
    fn clear_resets_world_pairs_and_timing() {
        let mut engine = Engine::default();
        falling_body(&mut engine, 0.0, 0.0);
        engine.update(None);
        assert!(engine.timing.timestamp > 0.0);

        engine.clear();
        assert!(engine.world.all_body_ids().is_empty());
        assert!(engine.pairs.list.is_empty());
        assert_eq!(engine.timing.timestamp, 0.0);
    }

    #[test]
    fn before_and_after_update_events_fire_once_per_step() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut engine = Engine::default();
        falling_body(&mut engine, 0.0, 0.0);

        let count = Rc::new(RefCell::new(0));
        let c1 = count.clone();
        engine.events.on(EventName::BeforeUpdate, move |_| *c1.borrow_mut() += 1);
        let c2 = count.clone();
        engine.events.on(EventName::AfterUpdate, move |_| *c2.borrow_mut() += 1);

        engine.update(None);
        assert_eq!(*count.borrow(), 2);
    }
}
