//! Two-phase (position then velocity) Gauss-Seidel contact solver with
//! warm-starting and Erin Catto-style resting-constraint accumulation.

use super::pairs::Pair;
use crate::body::{Body, BASE_DELTA};
use crate::vector::Vector2;
use std::collections::HashMap;

/// Builds an id -> index map into a flat body slice, letting the solver
/// pull two distinct mutable bodies out of one borrow per pair.
pub fn index_bodies(bodies: &[&mut Body]) -> HashMap<u64, usize> {
    bodies.iter().enumerate().map(|(i, b)| (b.id, i)).collect()
}

fn two_mut<'s, 'a>(bodies: &'s mut [&'a mut Body], i: usize, j: usize) -> (&'s mut Body, &'s mut Body) {
    assert_ne!(i, j, "a pair must reference two distinct bodies");
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut *left[i], &mut *right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut *right[0], &mut *left[j])
    }
}

fn point_velocity(position: Vector2, position_prev: Vector2, angular_delta: f64, offset: Vector2) -> Vector2 {
    let linear = position - position_prev;
    linear + Vector2::new(-angular_delta * offset.y, angular_delta * offset.x)
}

/// Per-body contact counts this step, dividing each body's correction
/// budget across every contact it's part of. Scoped to one position pass.
pub fn pre_solve_position(pairs: &[Pair]) -> HashMap<u64, u32> {
    let mut totals = HashMap::new();
    for pair in pairs.iter().filter(|p| p.is_active && !p.is_sensor) {
        *totals.entry(pair.collision.parent_a).or_insert(0) += pair.contact_count as u32;
        *totals.entry(pair.collision.parent_b).or_insert(0) += pair.contact_count as u32;
    }
    totals
}

/// Corrects interpenetration without injecting velocity.
pub fn solve_position(
    pairs: &mut [Pair],
    bodies: &mut [&mut Body],
    id_index: &HashMap<u64, usize>,
    total_contacts: &HashMap<u64, u32>,
    delta: f64,
    damping: f64,
) {
    let position_dampen = 0.9 * damping;
    let slop_dampen = (delta / BASE_DELTA).clamp(0.0, 1.0);

    for pair in pairs.iter_mut().filter(|p| p.is_active && !p.is_sensor) {
        let ia = id_index[&pair.body_a];
        let ib = id_index[&pair.body_b];
        let (a, b) = two_mut(bodies, ia, ib);
        pair.separation = pair.collision.depth + pair.collision.normal.dot(&(b.position_impulse - a.position_impulse));
    }

    for pair in pairs.iter().filter(|p| p.is_active && !p.is_sensor) {
        let ia = id_index[&pair.body_a];
        let ib = id_index[&pair.body_b];
        let (a, b) = two_mut(bodies, ia, ib);

        let mut impulse = pair.separation - pair.slop * slop_dampen;
        if a.is_static != b.is_static {
            impulse *= 2.0;
        }

        if !a.is_static {
            let total = *total_contacts.get(&pair.collision.parent_a).unwrap_or(&1) as f64;
            a.position_impulse += pair.collision.normal * (impulse * (position_dampen / total.max(1.0)));
        }
        if !b.is_static {
            let total = *total_contacts.get(&pair.collision.parent_b).unwrap_or(&1) as f64;
            b.position_impulse -= pair.collision.normal * (impulse * (position_dampen / total.max(1.0)));
        }
    }
}

/// Bakes each body's accumulated `position_impulse` into its geometry,
/// preserving velocity by shifting `position_prev` along with `position`.
pub fn post_solve_position(bodies: &mut [&mut Body]) {
    for body in bodies.iter_mut() {
        let impulse = body.position_impulse;
        if impulse.x == 0.0 && impulse.y == 0.0 {
            continue;
        }

        for v in body.vertices.iter_mut() {
            v.point += impulse;
        }
        body.position += impulse;
        body.position_prev += impulse;

        if impulse.dot(&body.velocity) < 0.0 {
            body.position_impulse = Vector2::zero();
        } else {
            body.position_impulse *= 0.8;
        }

        let world_points: Vec<Vector2> = body.vertices.iter().map(|v| v.point + body.position).collect();
        body.bounds.update(&world_points, body.velocity);
    }
}

/// Applies each contact's cached impulse from the previous step immediately,
/// warm-starting the velocity pass.
pub fn pre_solve_velocity(pairs: &[Pair], bodies: &mut [&mut Body], id_index: &HashMap<u64, usize>) {
    for pair in pairs.iter().filter(|p| p.is_active && !p.is_sensor) {
        let ia = id_index[&pair.body_a];
        let ib = id_index[&pair.body_b];
        let normal = pair.collision.normal;
        let tangent = pair.collision.tangent;

        for contact in pair.contacts.iter().take(pair.contact_count) {
            if contact.normal_impulse == 0.0 && contact.tangent_impulse == 0.0 {
                continue;
            }
            let impulse_vec = normal * contact.normal_impulse + tangent * contact.tangent_impulse;
            let (a, b) = two_mut(bodies, ia, ib);

            if !a.is_static && !a.is_sleeping {
                a.position_prev -= impulse_vec * a.inverse_mass;
                let offset = contact.vertex - a.position;
                a.angle_prev -= offset.cross(&impulse_vec) * a.inverse_inertia;
            }
            if !b.is_static && !b.is_sleeping {
                b.position_prev += impulse_vec * b.inverse_mass;
                let offset = contact.vertex - b.position;
                b.angle_prev += offset.cross(&impulse_vec) * b.inverse_inertia;
            }
        }
    }
}

/// Classical sequential-impulse velocity solve with Coulomb friction and
/// Erin Catto-style resting-contact accumulator clamping.
pub fn solve_velocity(pairs: &mut [Pair], bodies: &mut [&mut Body], id_index: &HashMap<u64, usize>, delta: f64) {
    let ts = delta / BASE_DELTA;
    let ts3 = ts * ts * ts;
    let resting_thresh = -2.0 * ts;
    let resting_thresh_tangent = 6f64.sqrt();
    let mu_n = 5.0 * ts;

    for pair in pairs.iter_mut().filter(|p| p.is_active && !p.is_sensor) {
        let ia = id_index[&pair.body_a];
        let ib = id_index[&pair.body_b];
        let normal = pair.collision.normal;
        let tangent = pair.collision.tangent;
        let contact_count = pair.contact_count;
        let separation = pair.separation;
        let restitution = pair.restitution;
        let friction = pair.friction;
        let friction_static = pair.friction_static;
        let inverse_mass_total = pair.inverse_mass;

        let (a, b) = two_mut(bodies, ia, ib);
        let angular_delta_a = a.angle - a.angle_prev;
        let angular_delta_b = b.angle - b.angle_prev;

        for contact in pair.contacts.iter_mut().take(contact_count) {
            let offset_a = contact.vertex - a.position;
            let offset_b = contact.vertex - b.position;

            let vel_a = point_velocity(a.position, a.position_prev, angular_delta_a, offset_a);
            let vel_b = point_velocity(b.position, b.position_prev, angular_delta_b, offset_b);
            let relative = vel_a - vel_b;

            let normal_vel = relative.dot(&normal);
            let tangent_vel = relative.dot(&tangent);

            let rn_a = offset_a.cross(&normal);
            let rn_b = offset_b.cross(&normal);
            let share = (1.0 / contact_count as f64)
                / (inverse_mass_total + a.inverse_inertia * rn_a * rn_a + b.inverse_inertia * rn_b * rn_b);

            let raw_normal_impulse = (1.0 + restitution) * normal_vel * share;

            let friction_limit = (separation + normal_vel).clamp(0.0, 1.0) * friction * friction_static * mu_n;
            let raw_tangent_impulse = if tangent_vel.abs() > friction_limit {
                let kinetic = friction * tangent_vel.signum() * ts3;
                kinetic.clamp(-tangent_vel.abs(), tangent_vel.abs())
            } else {
                tangent_vel
            } * share;

            let normal_delta = if normal_vel < resting_thresh {
                contact.normal_impulse = 0.0;
                raw_normal_impulse
            } else {
                let previous = contact.normal_impulse;
                contact.normal_impulse = (previous + raw_normal_impulse).min(0.0);
                contact.normal_impulse - previous
            };

            let tangent_delta = if tangent_vel.abs() > resting_thresh_tangent {
                contact.tangent_impulse = 0.0;
                raw_tangent_impulse
            } else {
                let previous = contact.tangent_impulse;
                let accumulated = (previous + raw_tangent_impulse).clamp(-friction_limit, friction_limit);
                contact.tangent_impulse = accumulated;
                accumulated - previous
            };

            let impulse_vec = normal * normal_delta + tangent * tangent_delta;

            if !a.is_static && !a.is_sleeping {
                a.position_prev -= impulse_vec * a.inverse_mass;
                a.angle_prev -= offset_a.cross(&impulse_vec) * a.inverse_inertia;
            }
            if !b.is_static && !b.is_sleeping {
                b.position_prev += impulse_vec * b.inverse_mass;
                b.angle_prev += offset_b.cross(&impulse_vec) * b.inverse_inertia;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;
    use crate::collision::sat;
    use crate::common::EngineContext;

    fn overlapping_pair() -> (Body, Body, Pair) {
        let mut ctx = EngineContext::default();
        let a = Body::rectangle(&mut ctx, Vector2::new(0.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let b = Body::rectangle(&mut ctx, Vector2::new(1.5, 0.0), 2.0, 2.0, BodyOptions::default());
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        let collision = sat::collides(&a, &b, &pa, &pb, false, false).unwrap().unwrap();
        let pair = Pair {
            id: "0:1".to_string(),
            body_a: collision.body_a,
            body_b: collision.body_b,
            contact_count: collision.support_count,
            contacts: [Default::default(); 2],
            friction: a.friction.min(b.friction),
            friction_static: a.friction_static.max(b.friction_static),
            restitution: a.restitution.max(b.restitution),
            slop: a.slop.max(b.slop),
            inverse_mass: a.inverse_mass + b.inverse_mass,
            separation: 0.0,
            is_active: true,
            is_sensor: false,
            time_created: 0,
            time_updated: 0,
            collision,
        };
        (a, b, pair)
    }

    #[test]
    fn solve_position_pushes_bodies_apart() {
        let (mut a, mut b, mut pair) = overlapping_pair();
        let ids;
        {
            let bodies: Vec<&mut Body> = vec![&mut a, &mut b];
            ids = index_bodies(&bodies);
        }
        let mut pairs = vec![pair.clone()];
        let totals = pre_solve_position(&pairs);
        {
            let mut bodies: Vec<&mut Body> = vec![&mut a, &mut b];
            solve_position(&mut pairs, &mut bodies, &ids, &totals, BASE_DELTA, 1.0);
        }
        pair = pairs.remove(0);
        assert!(pair.separation > 0.0);
        assert!(a.position_impulse.x != 0.0 || b.position_impulse.x != 0.0);
    }

    #[test]
    fn post_solve_position_moves_position_and_prev_together() {
        let mut ctx = EngineContext::default();
        let mut body = Body::rectangle(&mut ctx, Vector2::zero(), 1.0, 1.0, BodyOptions::default());
        body.position_impulse = Vector2::new(1.0, 0.0);
        body.velocity = Vector2::new(1.0, 0.0);
        let delta_before = body.position - body.position_prev;
        {
            let mut bodies: Vec<&mut Body> = vec![&mut body];
            post_solve_position(&mut bodies);
        }
        let delta_after = body.position - body.position_prev;
        assert_eq!(delta_before, delta_after);
    }

    #[test]
    fn solve_velocity_reduces_closing_speed() {
        let (mut a, mut b, pair) = overlapping_pair();
        a.position_prev = a.position - Vector2::new(1.0, 0.0);
        b.position_prev = b.position + Vector2::new(1.0, 0.0);
        let mut pairs = vec![pair];

        let ids;
        {
            let bodies: Vec<&mut Body> = vec![&mut a, &mut b];
            ids = index_bodies(&bodies);
        }
        let rel_before = (a.position - a.position_prev) - (b.position - b.position_prev);
        {
            let mut bodies: Vec<&mut Body> = vec![&mut a, &mut b];
            solve_velocity(&mut pairs, &mut bodies, &ids, BASE_DELTA);
        }
        let rel_after = (a.position - a.position_prev) - (b.position - b.position_prev);
        assert!(rel_after.magnitude() <= rel_before.magnitude() + 1e-9);
    }
}
