//! Distance/spring constraints between two bodies (or a body and a fixed
//! world point).

use crate::body::Body;
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};

/// A distance constraint, pinned or springy depending on `stiffness`. At
/// least one of `body_a`/`body_b` must be set; the unset side's anchor is
/// a world-space point instead of a body-local one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: u64,
    pub label: String,
    pub body_a: Option<u64>,
    pub body_b: Option<u64>,
    /// Anchor relative to `body_a`: body-local if `body_a` is set,
    /// otherwise a world-space point.
    pub point_a: Vector2,
    /// Anchor relative to `body_b`: body-local if `body_b` is set,
    /// otherwise a world-space point.
    pub point_b: Vector2,
    pub length: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub angular_stiffness: f64,
    /// Body angle the last time this constraint rotated `point_a`/`point_b`
    /// with it, so per-step rotation deltas can be derived.
    pub angle_a: f64,
    pub angle_b: f64,
}

/// Options for [`Constraint::new`]; `length` of `None` derives the rest
/// length from the current world-space anchor separation.
#[derive(Debug, Clone)]
pub struct ConstraintOptions {
    pub label: String,
    pub body_a: Option<u64>,
    pub body_b: Option<u64>,
    pub point_a: Vector2,
    pub point_b: Vector2,
    pub length: Option<f64>,
    pub stiffness: Option<f64>,
    pub damping: f64,
    pub angular_stiffness: f64,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            label: "Constraint".to_string(),
            body_a: None,
            body_b: None,
            point_a: Vector2::zero(),
            point_b: Vector2::zero(),
            length: None,
            stiffness: None,
            damping: 0.0,
            angular_stiffness: 0.0,
        }
    }
}

impl Constraint {
    /// Creates a constraint, deriving rest length and default stiffness
    /// from the anchor world positions when not given explicitly.
    pub fn new(id: u64, options: ConstraintOptions, anchor_a_world: Vector2, anchor_b_world: Vector2) -> Self {
        let length = options
            .length
            .unwrap_or_else(|| (anchor_a_world - anchor_b_world).magnitude());
        let stiffness = options.stiffness.unwrap_or(if length > 0.0 { 1.0 } else { 0.7 });

        Self {
            id,
            label: options.label,
            body_a: options.body_a,
            body_b: options.body_b,
            point_a: options.point_a,
            point_b: options.point_b,
            length,
            stiffness,
            damping: options.damping,
            angular_stiffness: options.angular_stiffness,
            angle_a: 0.0,
            angle_b: 0.0,
        }
    }

    /// Validating constructor: fails if neither `body_a` nor `body_b` is
    /// set, since an unanchored constraint has nothing to pull on.
    pub fn try_new(
        id: u64,
        options: ConstraintOptions,
        anchor_a_world: Vector2,
        anchor_b_world: Vector2,
    ) -> crate::error::PhysicsResult<Self> {
        if options.body_a.is_none() && options.body_b.is_none() {
            return Err(crate::error::PhysicsError::UnboundConstraint);
        }
        Ok(Self::new(id, options, anchor_a_world, anchor_b_world))
    }

    /// True for a rigid pin: zero rest length with near-full stiffness.
    pub fn is_pin(&self) -> bool {
        self.length == 0.0 && self.stiffness >= 0.1
    }

    /// True when this constraint should be drawn/treated as a visible
    /// spring rather than a rigid link.
    pub fn is_spring(&self) -> bool {
        self.stiffness < 0.9
    }
}

/// Applies each body's cached `constraint_impulse` as a warm start before
/// the iterative solve begins.
pub fn pre_solve_all(bodies: &mut [&mut Body]) {
    for body in bodies.iter_mut() {
        if body.is_static {
            continue;
        }
        let impulse = body.constraint_impulse;
        if impulse.x != 0.0 || impulse.y != 0.0 {
            body.position += impulse;
        }
        if body.constraint_impulse_angle != 0.0 {
            body.angle += body.constraint_impulse_angle;
        }
    }
}

/// One body's slot in a constraint solve: either an anchored dynamic body
/// or `None` for a fixed world-space anchor.
pub struct Endpoint<'a> {
    pub body: Option<&'a mut Body>,
    pub local_point: Vector2,
}

/// Solves a single constraint for one sub-step. `ts` is the normalised
/// time scale (`clamp(delta/baseDelta, 0, 1)`).
pub fn solve(constraint: &mut Constraint, mut a: Endpoint, mut b: Endpoint, ts: f64) {
    let (point_a_world, angle_a_now) = world_anchor(&a, constraint.point_a, constraint.angle_a);
    let (point_b_world, angle_b_now) = world_anchor(&b, constraint.point_b, constraint.angle_b);
    constraint.angle_a = angle_a_now;
    constraint.angle_b = angle_b_now;

    let delta = point_a_world - point_b_world;
    let current_length = delta.magnitude().max(1e-6);

    let difference = (current_length - constraint.length) / current_length;
    let is_rigid = constraint.stiffness >= 1.0 || constraint.length == 0.0;
    let effective_k = if is_rigid {
        constraint.stiffness * ts
    } else {
        constraint.stiffness * ts * ts
    };
    let force = delta * difference * effective_k;

    let inv_mass_a = a.body.as_ref().map(|b| b.inverse_mass).unwrap_or(0.0);
    let inv_mass_b = b.body.as_ref().map(|b| b.inverse_mass).unwrap_or(0.0);
    let inv_inertia_a = a.body.as_ref().map(|b| b.inverse_inertia).unwrap_or(0.0);
    let inv_inertia_b = b.body.as_ref().map(|b| b.inverse_inertia).unwrap_or(0.0);

    let mass_total = inv_mass_a + inv_mass_b;
    let inertia_total = inv_inertia_a + inv_inertia_b;
    let resistance = mass_total + inertia_total;
    if resistance == 0.0 {
        return;
    }

    if constraint.damping > 0.0 {
        let normal = delta.normalize();
        let rel_velocity = relative_verlet_velocity(&a, &b, normal);
        if let Some(body) = a.body.as_mut() {
            let share = inv_mass_a / mass_total.max(f64::MIN_POSITIVE);
            body.position_prev += normal * (constraint.damping * rel_velocity * share);
        }
        if let Some(body) = b.body.as_mut() {
            let share = inv_mass_b / mass_total.max(f64::MIN_POSITIVE);
            body.position_prev -= normal * (constraint.damping * rel_velocity * share);
        }
    }

    apply_to_endpoint(&mut a, force, inv_mass_a, mass_total, resistance, inv_inertia_a, constraint.angular_stiffness, true);
    apply_to_endpoint(&mut b, force, inv_mass_b, mass_total, resistance, inv_inertia_b, constraint.angular_stiffness, false);
}

fn world_anchor(endpoint: &Endpoint, stored_local: Vector2, stored_angle: f64) -> (Vector2, f64) {
    match &endpoint.body {
        Some(body) => {
            let delta_angle = body.angle - stored_angle;
            let rotated = stored_local.rotate(delta_angle);
            (body.position + rotated, body.angle)
        }
        None => (stored_local, stored_angle),
    }
}

fn relative_verlet_velocity(a: &Endpoint, b: &Endpoint, normal: Vector2) -> f64 {
    let vel_a = a.body.as_ref().map(|b| b.position - b.position_prev).unwrap_or(Vector2::zero());
    let vel_b = b.body.as_ref().map(|b| b.position - b.position_prev).unwrap_or(Vector2::zero());
    (vel_a - vel_b).dot(&normal)
}

#[allow(clippy::too_many_arguments)]
fn apply_to_endpoint(
    endpoint: &mut Endpoint,
    force: Vector2,
    inv_mass: f64,
    mass_total: f64,
    resistance: f64,
    inv_inertia: f64,
    angular_stiffness: f64,
    is_a: bool,
) {
    let Some(body) = endpoint.body.as_mut() else { return };
    if body.is_static || inv_mass == 0.0 {
        return;
    }
    let share = inv_mass / mass_total;
    let signed_force = if is_a { force * -1.0 } else { force };
    let displacement = signed_force * share;
    body.position += displacement;
    body.constraint_impulse += displacement;

    let torque = endpoint.local_point.cross(&signed_force) / resistance * inv_inertia * (1.0 - angular_stiffness);
    body.angle += torque;
    body.constraint_impulse_angle += torque;
}

/// Wakes any non-static body with a residual impulse, bakes the impulse
/// into vertices/axes/bounds, then damps the cached impulse for next
/// step's warm start.
pub fn post_solve_all(bodies: &mut [&mut Body]) {
    for body in bodies.iter_mut() {
        if body.is_static {
            continue;
        }
        let impulse = body.constraint_impulse;
        let angle_impulse = body.constraint_impulse_angle;

        if impulse.x != 0.0 || impulse.y != 0.0 {
            body.is_sleeping = false;
            for v in body.vertices.iter_mut() {
                v.point += impulse;
            }
        }
        if angle_impulse != 0.0 {
            body.is_sleeping = false;
            for v in body.vertices.iter_mut() {
                v.point = v.point.rotate(angle_impulse);
            }
            crate::axes::rotate(&mut body.axes, angle_impulse);
        }
        if impulse.x != 0.0 || impulse.y != 0.0 || angle_impulse != 0.0 {
            let world_points: Vec<Vector2> = body.vertices.iter().map(|v| v.point + body.position).collect();
            body.bounds.update(&world_points, body.velocity);
        }

        body.constraint_impulse *= 0.4;
        body.constraint_impulse_angle *= 0.4;
    }
}
