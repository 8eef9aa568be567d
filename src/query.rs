//! Point, region, ray, and body overlap queries against a flat body list.

use crate::body::{Body, BodyOptions};
use crate::bounds::Bounds;
use crate::collision::{sat, Collision};
use crate::common::EngineContext;
use crate::vector::Vector2;
use crate::vertices;

/// Tests `body` for overlap against every candidate in `bodies`, gating on
/// AABB overlap before running SAT.
pub fn collides(body: &Body, bodies: &[&Body]) -> Vec<Collision> {
    let body_points = body.world_vertices();
    bodies
        .iter()
        .filter(|other| other.id != body.id)
        .filter(|other| body.bounds.overlaps(&other.bounds))
        .filter_map(|other| {
            let other_points = other.world_vertices();
            match sat::collides(body, other, &body_points, &other_points, false, false) {
                Ok(collision) => collision,
                Err(err) => {
                    tracing::error!(error = %err, a = body.id, b = other.id, "skipping malformed collision pair");
                    None
                }
            }
        })
        .collect()
}

/// Casts a thin rectangle between `start` and `end` and reports every body
/// it crosses, via [`collides`].
pub fn ray(ctx: &mut EngineContext, bodies: &[&Body], start: Vector2, end: Vector2, width: f64) -> Vec<Collision> {
    let delta = end - start;
    let length = delta.magnitude();
    if length == 0.0 {
        return Vec::new();
    }
    let midpoint = (start + end) * 0.5;
    let angle = delta.angle();

    let mut probe = Body::rectangle(ctx, midpoint, length, width.max(1e-100), BodyOptions::default());
    probe.set_angle(angle);

    collides(&probe, bodies)
}

/// Returns every body whose bounds overlap `region` (or, with
/// `outside = true`, every body whose bounds do NOT overlap it).
pub fn region<'a>(bodies: &[&'a Body], region: &Bounds, outside: bool) -> Vec<&'a Body> {
    bodies
        .iter()
        .filter(|b| b.bounds.overlaps(region) != outside)
        .copied()
        .collect()
}

/// Returns every body containing world point `p`: a bounds check, then an
/// exact polygon-containment test against each compound part the caller
/// supplies alongside its root (single-part bodies pass just themselves).
pub fn point<'a>(bodies: &[&'a Body], p: Vector2) -> Vec<&'a Body> {
    bodies
        .iter()
        .filter(|b| b.bounds.contains_point(&p))
        .filter(|b| {
            let local = p - b.position;
            vertices::contains(&b.vertices, &local)
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EngineContext;

    fn square(ctx: &mut EngineContext, x: f64, y: f64) -> Body {
        Body::rectangle(ctx, Vector2::new(x, y), 2.0, 2.0, BodyOptions::default())
    }

    #[test]
    fn collides_finds_overlapping_body() {
        let mut ctx = EngineContext::default();
        let a = square(&mut ctx, 0.0, 0.0);
        let b = square(&mut ctx, 1.0, 0.0);
        let bodies = vec![&b];
        assert_eq!(collides(&a, &bodies).len(), 1);
    }

    #[test]
    fn region_filters_by_bounds_overlap() {
        let mut ctx = EngineContext::default();
        let a = square(&mut ctx, 0.0, 0.0);
        let b = square(&mut ctx, 100.0, 0.0);
        let bodies = vec![&a, &b];
        let box_bounds = Bounds::new(Vector2::new(-5.0, -5.0), Vector2::new(5.0, 5.0));
        let hits = region(&bodies, &box_bounds, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);
    }

    #[test]
    fn point_finds_body_containing_point() {
        let mut ctx = EngineContext::default();
        let a = square(&mut ctx, 0.0, 0.0);
        let bodies = vec![&a];
        assert_eq!(point(&bodies, Vector2::zero()).len(), 1);
        assert!(point(&bodies, Vector2::new(10.0, 10.0)).is_empty());
    }

    #[test]
    fn ray_crosses_body_between_bodies() {
        let mut ctx = EngineContext::default();
        let a = square(&mut ctx, 5.0, 0.0);
        let bodies = vec![&a];
        let hits = ray(&mut ctx, &bodies, Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), 0.1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn ray_misses_body_off_axis() {
        let mut ctx = EngineContext::default();
        let a = square(&mut ctx, 5.0, 50.0);
        let bodies = vec![&a];
        let hits = ray(&mut ctx, &bodies, Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), 0.1);
        assert!(hits.is_empty());
    }
}
