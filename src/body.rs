//! Rigid body: geometry, pose, kinematics, and Verlet-style integration.

use crate::axes;
use crate::bounds::Bounds;
use crate::common::EngineContext;
use crate::vector::Vector2;
use crate::vertices::{self, Vertex};
use serde::{Deserialize, Serialize};

/// Baseline timestep (ms) that `frictionAir` damping is calibrated against,
/// so that simulations run at other framerates see consistent drag.
pub const BASE_DELTA: f64 = 1000.0 / 60.0;

/// A sibling body's physical attributes, as needed by [`Body::set_parts`]
/// to aggregate a compound body's mass/area/inertia/centre. Passed in by
/// id rather than by reference, since compound parts are resolved against
/// an id-addressed arena rather than held as direct `&mut` siblings.
#[derive(Debug, Clone)]
pub struct CompoundPart {
    pub id: u64,
    pub position: Vector2,
    pub mass: f64,
    pub area: f64,
    pub inertia: f64,
    pub world_vertices: Vec<Vector2>,
}

/// Snapshot of the physical attributes a body had before it was made
/// static, restored if it is ever made non-static again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OriginalAttributes {
    pub restitution: f64,
    pub friction: f64,
    pub mass: f64,
    pub inertia: f64,
    pub density: f64,
    pub inverse_mass: f64,
    pub inverse_inertia: f64,
}

/// A single rigid body, possibly a compound part of another body.
///
/// `parts[0]` is always a self-reference id (the root); a single-part body
/// stores only its own id there. Sub-parts point back to the root via
/// `parent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: u64,
    pub label: String,

    // Geometry
    pub vertices: Vec<Vertex>,
    pub axes: Vec<Vector2>,
    pub bounds: Bounds,
    pub circle_radius: Option<f64>,

    // Pose
    pub position: Vector2,
    pub angle: f64,
    pub position_prev: Vector2,
    pub angle_prev: f64,

    // Kinematics
    pub velocity: Vector2,
    pub angular_velocity: f64,
    pub speed: f64,
    pub angular_speed: f64,

    // Accumulators
    pub force: Vector2,
    pub torque: f64,
    pub position_impulse: Vector2,
    pub constraint_impulse: Vector2,
    pub constraint_impulse_angle: f64,

    // Physical
    pub mass: f64,
    pub inverse_mass: f64,
    pub inertia: f64,
    pub inverse_inertia: f64,
    pub density: f64,
    pub area: f64,
    pub restitution: f64,
    pub friction: f64,
    pub friction_static: f64,
    pub friction_air: f64,
    pub slop: f64,
    pub time_scale: f64,
    pub delta_time: f64,

    // Flags
    pub is_static: bool,
    pub is_sensor: bool,
    pub is_sleeping: bool,
    pub sleep_counter: u32,
    pub sleep_threshold: u32,
    pub motion: f64,

    // Collision filtering
    pub category: u32,
    pub mask: u32,
    pub group: i32,

    // Compound
    pub parts: Vec<u64>,
    pub parent: Option<u64>,

    pub original: Option<OriginalAttributes>,
}

/// Options accepted by [`Body::new`]; everything has a sane default so
/// callers only set the fields relevant to their shape.
#[derive(Debug, Clone)]
pub struct BodyOptions {
    pub label: String,
    pub density: f64,
    pub restitution: f64,
    pub friction: f64,
    pub friction_static: f64,
    pub friction_air: f64,
    pub is_static: bool,
    pub is_sensor: bool,
    pub category: u32,
    pub mask: u32,
    pub group: i32,
    pub circle_radius: Option<f64>,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            label: "Body".to_string(),
            density: 0.001,
            restitution: 0.0,
            friction: 0.1,
            friction_static: 0.5,
            friction_air: 0.01,
            is_static: false,
            is_sensor: false,
            category: 1,
            mask: u32::MAX,
            group: 0,
            circle_radius: None,
        }
    }
}

impl Body {
    /// Creates a new single-part body from a convex, clockwise vertex ring.
    pub fn new(ctx: &mut EngineContext, points: &[Vector2], options: BodyOptions) -> Self {
        let id = ctx.next_id();
        let verts = vertices::from_points(points);

        let mut body = Self {
            id,
            label: options.label,
            vertices: verts,
            axes: Vec::new(),
            bounds: Bounds::empty(),
            circle_radius: options.circle_radius,
            position: Vector2::zero(),
            angle: 0.0,
            position_prev: Vector2::zero(),
            angle_prev: 0.0,
            velocity: Vector2::zero(),
            angular_velocity: 0.0,
            speed: 0.0,
            angular_speed: 0.0,
            force: Vector2::zero(),
            torque: 0.0,
            position_impulse: Vector2::zero(),
            constraint_impulse: Vector2::zero(),
            constraint_impulse_angle: 0.0,
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: 0.0,
            inverse_inertia: 0.0,
            density: options.density,
            area: 0.0,
            restitution: options.restitution,
            friction: options.friction,
            friction_static: options.friction_static,
            friction_air: options.friction_air,
            slop: 0.05,
            time_scale: 1.0,
            delta_time: BASE_DELTA,
            is_static: false,
            is_sensor: options.is_sensor,
            is_sleeping: false,
            sleep_counter: 0,
            sleep_threshold: 60,
            motion: 0.0,
            category: options.category,
            mask: options.mask,
            group: options.group,
            parts: Vec::new(),
            parent: None,
            original: None,
        };

        body.parts = vec![body.id];
        body.set_centre_to_vertices_centroid();
        body.axes = axes::from_vertices(&body.vertices);
        body.area = vertices::area(&body.vertices, false);
        body.set_mass_from_density(body.density);
        body.bounds.update(&Self::world_points(&body.vertices, body.position), body.velocity);

        if options.is_static {
            body.set_static(true);
        }

        tracing::debug!(id = body.id, label = %body.label, "body created");
        body
    }

    /// Convenience constructor for an axis-aligned rectangle centered at
    /// `position`. Not a general shape factory: callers needing chamfering,
    /// SVG import, or concave decomposition build vertex rings themselves.
    pub fn rectangle(
        ctx: &mut EngineContext,
        position: Vector2,
        width: f64,
        height: f64,
        options: BodyOptions,
    ) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let points = [
            Vector2::new(-hw, -hh),
            Vector2::new(hw, -hh),
            Vector2::new(hw, hh),
            Vector2::new(-hw, hh),
        ];
        let mut body = Self::new(ctx, &points, options);
        body.set_position(position);
        body
    }

    /// Convenience constructor for a regular n-gon inscribed in a circle of
    /// the given radius, centered at `position`.
    pub fn polygon(
        ctx: &mut EngineContext,
        position: Vector2,
        sides: usize,
        radius: f64,
        options: BodyOptions,
    ) -> Self {
        let sides = sides.max(3);
        let mut points = Vec::with_capacity(sides);
        for i in 0..sides {
            let angle = std::f64::consts::TAU * (i as f64) / (sides as f64);
            points.push(Vector2::new(radius * angle.cos(), radius * angle.sin()));
        }
        let mut body = Self::new(ctx, &points, options);
        body.set_position(position);
        body
    }

    /// Convenience constructor approximating a circle with a many-sided
    /// regular polygon, tagging `circle_radius` so collision code can use
    /// the exact-circle SAT fast path.
    pub fn circle(ctx: &mut EngineContext, position: Vector2, radius: f64, mut options: BodyOptions) -> Self {
        options.circle_radius = Some(radius);
        let sides = (radius.max(8.0) * 0.6).ceil().clamp(16.0, 50.0) as usize;
        Self::polygon(ctx, position, sides, radius, options)
    }

    fn world_points(verts: &[Vertex], position: Vector2) -> Vec<Vector2> {
        verts.iter().map(|v| v.point + position).collect()
    }

    fn set_centre_to_vertices_centroid(&mut self) {
        let centre = vertices::centre(&self.vertices);
        for v in self.vertices.iter_mut() {
            v.point = v.point - centre;
        }
    }

    /// Recomputes `mass`, `inverseMass`, `inertia`, `inverseInertia` from a
    /// given density, in terms of the current vertex ring.
    pub fn set_mass_from_density(&mut self, density: f64) {
        self.density = density;
        let mass = density * self.area;
        self.set_mass(mass);
        let inertia = vertices::inertia(&self.vertices, mass);
        self.set_inertia(inertia);
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
        self.inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
    }

    pub fn set_density(&mut self, density: f64) {
        self.set_mass_from_density(density);
    }

    pub fn set_inertia(&mut self, inertia: f64) {
        self.inertia = inertia;
        self.inverse_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
    }

    /// Replaces the vertex ring, recentres on the new centroid, and
    /// recomputes axes, area, and mass/inertia from the current density.
    pub fn set_vertices(&mut self, points: &[Vector2]) {
        self.vertices = vertices::from_points(points);
        self.set_centre_to_vertices_centroid();
        self.axes = axes::from_vertices(&self.vertices);
        self.area = vertices::area(&self.vertices, false);
        let density = self.density;
        self.set_mass_from_density(density);
    }

    /// Assigns `parts` as this body's sub-parts, ensuring `parts[0]` is
    /// `self`. When `auto_hull` is set, recomputes this body's own vertex
    /// ring as the convex hull of every part's vertices (this body's own
    /// included) and re-centres on it. Then sums `{mass, area, inertia,
    /// centre}` across the given parts (mass-weighted centre), treating an
    /// infinite (static) part mass as 1 the way the rest of the compound's
    /// aggregate does.
    ///
    /// Takes each part's physical attributes directly, since `Body` cannot
    /// hold `&mut` references to sibling bodies in an id-addressed arena.
    pub fn set_parts(&mut self, parts: &[CompoundPart], auto_hull: bool) {
        self.parts = std::iter::once(self.id).chain(parts.iter().map(|p| p.id)).collect();

        if parts.is_empty() {
            return;
        }

        if auto_hull {
            let mut all_points = self.world_vertices();
            for part in parts {
                all_points.extend(part.world_vertices.iter().copied());
            }
            let hull_points = vertices::hull(&all_points);
            self.set_vertices(&hull_points);
        }

        let mut total_mass = 0.0;
        let mut total_area = 0.0;
        let mut total_inertia = 0.0;
        let mut weighted_centre = Vector2::zero();
        for part in parts {
            let mass = if part.mass.is_finite() { part.mass } else { 1.0 };
            total_mass += mass;
            total_area += part.area;
            total_inertia += part.inertia;
            weighted_centre += part.position * mass;
        }
        if total_mass > 0.0 {
            weighted_centre = weighted_centre / total_mass;
        }

        self.area = total_area;
        self.set_mass(total_mass);
        self.set_inertia(total_inertia);
        self.position = weighted_centre;
        self.position_prev = weighted_centre;
        let world_points = Self::world_points(&self.vertices, self.position);
        self.bounds.update(&world_points, self.velocity);
    }

    /// Integrates position and orientation one timestep using Verlet
    /// integration with time correction, per the update equations this
    /// body's engine is built around.
    pub fn update(&mut self, delta: f64) {
        if self.is_static {
            return;
        }

        let delta_prime = delta * self.time_scale;
        let correction = if self.delta_time > 0.0 { delta_prime / self.delta_time } else { 1.0 };
        let friction_factor = 1.0 - self.friction_air * delta_prime / BASE_DELTA;

        let velocity_prev = (self.position - self.position_prev) * correction;
        self.velocity = velocity_prev * friction_factor + (self.force * self.inverse_mass) * delta_prime * delta_prime;
        self.position_prev = self.position;
        self.position += self.velocity;

        let angular_velocity_prev = (self.angle - self.angle_prev) * correction;
        self.angular_velocity =
            angular_velocity_prev * friction_factor + (self.torque * self.inverse_inertia) * delta_prime * delta_prime;
        self.angle_prev = self.angle;
        self.angle += self.angular_velocity;

        self.delta_time = delta_prime;

        for v in self.vertices.iter_mut() {
            v.point = v.point.rotate(self.angular_velocity);
        }
        axes::rotate(&mut self.axes, self.angular_velocity);

        let world_points = Self::world_points(&self.vertices, self.position);
        self.bounds.update(&world_points, self.velocity);

        self.speed = self.velocity.magnitude();
        self.angular_speed = self.angular_velocity.abs();
    }

    /// Recomputes `velocity`/`angularVelocity` (and their magnitudes) from
    /// `position`/`positionPrev` after the solver has moved them via
    /// impulses, normalised against the baseline timestep.
    pub fn update_velocities(&mut self) {
        let time_scale = if self.delta_time > 0.0 { BASE_DELTA / self.delta_time } else { 1.0 };
        self.velocity = (self.position - self.position_prev) * time_scale;
        self.speed = self.velocity.magnitude();
        self.angular_velocity = (self.angle - self.angle_prev) * time_scale;
        self.angular_speed = self.angular_velocity.abs();
    }

    /// Accumulates a force applied at a world-space point: adds directly to
    /// `force`, and adds the resulting moment to `torque`.
    pub fn apply_force(&mut self, world_point: Vector2, force: Vector2) {
        self.force += force;
        let offset = world_point - self.position;
        self.torque += offset.cross(&force);
    }

    pub fn clear_forces(&mut self) {
        self.force = Vector2::zero();
        self.torque = 0.0;
    }

    /// Toggles static-ness, snapshotting (or restoring) the physical
    /// attributes a static body otherwise loses.
    pub fn set_static(&mut self, is_static: bool) {
        if is_static == self.is_static {
            return;
        }

        if is_static {
            self.original = Some(OriginalAttributes {
                restitution: self.restitution,
                friction: self.friction,
                mass: self.mass,
                inertia: self.inertia,
                density: self.density,
                inverse_mass: self.inverse_mass,
                inverse_inertia: self.inverse_inertia,
            });
            self.mass = f64::INFINITY;
            self.inertia = f64::INFINITY;
            self.inverse_mass = 0.0;
            self.inverse_inertia = 0.0;
            self.velocity = Vector2::zero();
            self.angular_velocity = 0.0;
            self.motion = 0.0;
        } else if let Some(orig) = self.original.take() {
            self.restitution = orig.restitution;
            self.friction = orig.friction;
            self.mass = orig.mass;
            self.inertia = orig.inertia;
            self.density = orig.density;
            self.inverse_mass = orig.inverse_mass;
            self.inverse_inertia = orig.inverse_inertia;
        }

        self.is_static = is_static;
    }

    pub fn set_centre(&mut self, centre: Vector2) {
        self.position = centre;
        self.position_prev = centre;
    }

    pub fn set_position(&mut self, position: Vector2) {
        let delta = position - self.position;
        self.position_prev = self.position_prev + delta;
        self.position = position;
        let world_points = Self::world_points(&self.vertices, self.position);
        self.bounds.update(&world_points, self.velocity);
    }

    pub fn set_angle(&mut self, angle: f64) {
        let delta = angle - self.angle;
        self.angle_prev += delta;
        self.angle = angle;
        for v in self.vertices.iter_mut() {
            v.point = v.point.rotate(delta);
        }
        axes::rotate(&mut self.axes, delta);
        let world_points = Self::world_points(&self.vertices, self.position);
        self.bounds.update(&world_points, self.velocity);
    }

    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.position_prev = self.position - velocity;
        self.velocity = velocity;
        self.speed = velocity.magnitude();
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        self.angle_prev = self.angle - angular_velocity;
        self.angular_velocity = angular_velocity;
        self.angular_speed = angular_velocity.abs();
    }

    pub fn set_speed(&mut self, speed: f64) {
        let direction = if self.velocity.is_zero(1e-12) { Vector2::new(1.0, 0.0) } else { self.velocity.normalize() };
        self.set_velocity(direction * speed);
    }

    pub fn set_angular_speed(&mut self, angular_speed: f64) {
        let sign = if self.angular_velocity < 0.0 { -1.0 } else { 1.0 };
        self.set_angular_velocity(angular_speed * sign);
    }

    pub fn translate(&mut self, delta: Vector2) {
        let new_position = self.position + delta;
        self.set_position(new_position);
    }

    pub fn rotate(&mut self, delta: f64) {
        let new_angle = self.angle + delta;
        self.set_angle(new_angle);
    }

    /// Scales vertices and physical attributes about the body's centre.
    pub fn scale(&mut self, scale_x: f64, scale_y: f64) {
        for v in self.vertices.iter_mut() {
            v.point.x *= scale_x;
            v.point.y *= scale_y;
        }
        self.axes = axes::from_vertices(&self.vertices);
        self.area = vertices::area(&self.vertices, false);
        let density = self.density;
        self.set_mass_from_density(density);
        let world_points = Self::world_points(&self.vertices, self.position);
        self.bounds.update(&world_points, self.velocity);
    }

    /// World-space points of this body's vertex ring, for collision and
    /// rendering code that needs them without re-deriving the offset.
    pub fn world_vertices(&self) -> Vec<Vector2> {
        Self::world_points(&self.vertices, self.position)
    }

    pub fn can_collide(&self, other: &Body) -> bool {
        if self.group != 0 && self.group == other.group {
            return self.group > 0;
        }
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

/// Allocates the next collision category bit for a new filter group.
pub fn next_category(ctx: &mut EngineContext) -> u32 {
    ctx.next_category()
}

/// Allocates a fresh signed collision group id.
pub fn next_group(ctx: &mut EngineContext, noncolliding: bool) -> i32 {
    ctx.next_group(noncolliding)
}
