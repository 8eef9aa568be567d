//! Separating Axis Theorem narrow-phase test for two convex polygons.

use super::Collision;
use crate::body::Body;
use crate::error::{PhysicsError, PhysicsResult};
use crate::vector::Vector2;

/// Projects a set of world-space points onto `axis`, returning `(min, max)`.
fn project(points: &[Vector2], axis: Vector2) -> (f64, f64) {
    let mut min = points[0].dot(&axis);
    let mut max = min;
    for p in &points[1..] {
        let d = p.dot(&axis);
        if d < min {
            min = d;
        }
        if d > max {
            max = d;
        }
    }
    (min, max)
}

/// Classic SAT projection loop: for each axis, projects both polygons and
/// keeps the smallest overlap, short-circuiting to "separated" the moment
/// any axis yields a non-positive overlap.
fn overlap_axes(points_a: &[Vector2], points_b: &[Vector2], axes: &[Vector2]) -> Option<(f64, Vector2)> {
    let mut min_overlap = f64::INFINITY;
    let mut min_axis = *axes.first()?;

    for &axis in axes {
        let (min_a, max_a) = project(points_a, axis);
        let (min_b, max_b) = project(points_b, axis);
        let overlap = (max_a - min_b).min(max_b - min_a);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = axis;
        }
    }

    Some((min_overlap, min_axis))
}

fn support_index(points: &[Vector2], direction: Vector2) -> usize {
    let n = points.len();
    let mut best = 0;
    let mut best_dot = points[0].dot(&direction);
    loop {
        let prev = (best + n - 1) % n;
        let next = (best + 1) % n;
        let prev_dot = points[prev].dot(&direction);
        let next_dot = points[next].dot(&direction);
        if prev_dot > best_dot {
            best = prev;
            best_dot = prev_dot;
        } else if next_dot > best_dot {
            best = next;
            best_dot = next_dot;
        } else {
            break;
        }
    }
    best
}

fn ring_neighbour_toward(points: &[Vector2], idx: usize, direction: Vector2) -> usize {
    let n = points.len();
    let prev = (idx + n - 1) % n;
    let next = (idx + 1) % n;
    if points[prev].dot(&direction) > points[next].dot(&direction) {
        prev
    } else {
        next
    }
}

fn polygon_contains(poly: &[Vector2], point: Vector2) -> bool {
    let n = poly.len();
    for i in 0..n {
        let cur = poly[i];
        let next = poly[(i + 1) % n];
        let edge = next - cur;
        if edge.cross(&(point - cur)) < 0.0 {
            return false;
        }
    }
    true
}

/// Finds up to two support points where `deep_body`'s vertices penetrate
/// `shallow_body`'s hull along `direction` (pointing into `shallow_body`).
fn find_supports(deep_points: &[Vector2], shallow_points: &[Vector2], direction: Vector2) -> Vec<Vector2> {
    let best = support_index(deep_points, direction);
    let neighbour = ring_neighbour_toward(deep_points, best, direction);

    let mut supports = Vec::with_capacity(2);
    for &idx in &[best, neighbour] {
        let p = deep_points[idx];
        if polygon_contains(shallow_points, p) {
            supports.push(p);
        }
    }
    supports
}

/// Resolves the root id a body's `parent_a`/`parent_b` collision field
/// should carry. A single-part body is its own root, so a missing `parent`
/// there is expected. `require_parent` marks `body` as a compound sub-part
/// resolved from another body's `parts[1..]`; a missing `parent` on such a
/// body breaks the `parts[0] == root` invariant and is fatal.
fn resolve_parent(body: &Body, require_parent: bool) -> PhysicsResult<u64> {
    match body.parent {
        Some(id) => Ok(id),
        None if require_parent => Err(PhysicsError::MissingParent(body.id)),
        None => Ok(body.id),
    }
}

/// Tests two bodies for overlap via SAT. Returns `Ok(None)` when a
/// separating axis exists. `points_a`/`points_b` are world-space vertex
/// rings for the two parts under test (which may be compound sub-parts, not
/// necessarily `body_a.vertices`/`body_b.vertices` directly).
///
/// `require_parent_a`/`require_parent_b` mark the corresponding body as a
/// resolved compound sub-part, per [`resolve_parent`].
pub fn collides(
    body_a: &Body,
    body_b: &Body,
    points_a: &[Vector2],
    points_b: &[Vector2],
    require_parent_a: bool,
    require_parent_b: bool,
) -> PhysicsResult<Option<Collision>> {
    let (overlap_ab, axis_ab) = match overlap_axes(points_a, points_b, &body_a.axes) {
        Some(v) => v,
        None => return Ok(None),
    };
    let (overlap_ba, axis_ba) = match overlap_axes(points_a, points_b, &body_b.axes) {
        Some(v) => v,
        None => return Ok(None),
    };

    let (depth, mut normal) = if overlap_ab < overlap_ba {
        (overlap_ab, axis_ab)
    } else {
        (overlap_ba, axis_ba)
    };

    let centre_a = points_a.iter().fold(Vector2::zero(), |acc, p| acc + *p) / points_a.len() as f64;
    let centre_b = points_b.iter().fold(Vector2::zero(), |acc, p| acc + *p) / points_b.len() as f64;
    if normal.dot(&(centre_b - centre_a)) < 0.0 {
        normal = -normal;
    }

    let tangent = normal.perp();

    let mut supports = find_supports(points_b, points_a, -normal);
    if supports.len() < 2 {
        let symmetric = find_supports(points_a, points_b, normal);
        if symmetric.len() > supports.len() {
            supports = symmetric;
        }
    }
    if supports.is_empty() {
        let best = support_index(points_b, -normal);
        supports.push(points_b[best]);
    }
    let support_count = supports.len().min(2);

    let resolved_parent_a = resolve_parent(body_a, require_parent_a)?;
    let resolved_parent_b = resolve_parent(body_b, require_parent_b)?;
    let (id_a, id_b, parent_a, parent_b) = if body_a.id < body_b.id {
        (body_a.id, body_b.id, resolved_parent_a, resolved_parent_b)
    } else {
        (body_b.id, body_a.id, resolved_parent_b, resolved_parent_a)
    };

    Ok(Some(Collision {
        body_a: id_a,
        body_b: id_b,
        parent_a,
        parent_b,
        depth,
        normal,
        tangent,
        penetration: normal * depth,
        supports,
        support_count,
        collided: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;
    use crate::common::EngineContext;
    use crate::vector::Vector2;

    fn square_at(ctx: &mut EngineContext, x: f64, y: f64) -> Body {
        Body::rectangle(ctx, Vector2::new(x, y), 2.0, 2.0, BodyOptions::default())
    }

    #[test]
    fn overlapping_squares_collide() {
        let mut ctx = EngineContext::default();
        let a = square_at(&mut ctx, 0.0, 0.0);
        let b = square_at(&mut ctx, 1.0, 0.0);
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        let collision = collides(&a, &b, &pa, &pb, false, false).unwrap();
        assert!(collision.is_some());
        let c = collision.unwrap();
        assert!(c.depth > 0.0);
        assert!(c.support_count >= 1);
    }

    #[test]
    fn distant_squares_do_not_collide() {
        let mut ctx = EngineContext::default();
        let a = square_at(&mut ctx, 0.0, 0.0);
        let b = square_at(&mut ctx, 100.0, 0.0);
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        assert!(collides(&a, &b, &pa, &pb, false, false).unwrap().is_none());
    }

    #[test]
    fn normal_points_away_from_a() {
        let mut ctx = EngineContext::default();
        let a = square_at(&mut ctx, 0.0, 0.0);
        let b = square_at(&mut ctx, 1.5, 0.0);
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        let c = collides(&a, &b, &pa, &pb, false, false).unwrap().unwrap();
        assert!(c.normal.dot(&(b.position - a.position)) >= 0.0);
    }

    #[test]
    fn body_ids_are_ascending() {
        let mut ctx = EngineContext::default();
        let a = square_at(&mut ctx, 0.0, 0.0);
        let b = square_at(&mut ctx, 1.0, 0.0);
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        let c = collides(&a, &b, &pa, &pb, false, false).unwrap().unwrap();
        assert!(c.body_a < c.body_b);
    }

    #[test]
    fn missing_parent_on_a_required_sub_part_is_fatal() {
        let mut ctx = EngineContext::default();
        let a = square_at(&mut ctx, 0.0, 0.0);
        let b = square_at(&mut ctx, 1.0, 0.0);
        let pa = a.world_vertices();
        let pb = b.world_vertices();
        let err = collides(&a, &b, &pa, &pb, true, false).unwrap_err();
        assert!(matches!(err, PhysicsError::MissingParent(id) if id == a.id));
    }
}
