//! Sort-and-sweep broad phase over body AABBs, narrowing to SAT.

use super::sat;
use super::Collision;
use crate::body::Body;
use std::collections::HashMap;

/// Runs one broad-phase sweep over every root body (bodies with no
/// `parent`), narrowing candidate pairs to SAT. `bodies` should contain
/// every body in the world, including compound sub-parts, so sub-part
/// lookups by id succeed.
pub fn collisions(bodies: &[&Body]) -> Vec<Collision> {
    let mut roots: Vec<&Body> = bodies.iter().copied().filter(|b| b.parent.is_none()).collect();
    roots.sort_by(|a, b| a.bounds.min.x.partial_cmp(&b.bounds.min.x).unwrap());

    let by_id: HashMap<u64, &Body> = bodies.iter().map(|b| (b.id, *b)).collect();

    let mut results = Vec::new();
    let n = roots.len();

    for i in 0..n {
        let body_i = roots[i];
        for &body_j in roots.iter().skip(i + 1) {
            if body_j.bounds.min.x > body_i.bounds.max.x {
                break;
            }
            if body_i.bounds.max.y < body_j.bounds.min.y || body_j.bounds.max.y < body_i.bounds.min.y {
                continue;
            }
            if (body_i.is_static || body_i.is_sleeping) && (body_j.is_static || body_j.is_sleeping) {
                continue;
            }
            if !body_i.can_collide(body_j) {
                continue;
            }

            if body_i.parts.len() <= 1 && body_j.parts.len() <= 1 {
                test_pair(body_i, body_j, false, false, &mut results);
            } else {
                for &(part_i, sub_i) in &resolve_parts(body_i, &by_id) {
                    for &(part_j, sub_j) in &resolve_parts(body_j, &by_id) {
                        if !part_i.bounds.overlaps(&part_j.bounds) {
                            continue;
                        }
                        test_pair(part_i, part_j, sub_i, sub_j, &mut results);
                    }
                }
            }
        }
    }

    results
}

/// Resolves `body` to the parts SAT should test it against: its actual
/// sub-parts (`parts[1..]`, each flagged as a resolved sub-part) if it's a
/// compound, or just itself (not a sub-part) otherwise.
fn resolve_parts<'a>(body: &'a Body, by_id: &HashMap<u64, &'a Body>) -> Vec<(&'a Body, bool)> {
    if body.parts.len() <= 1 {
        return vec![(body, false)];
    }
    body.parts
        .iter()
        .skip(1)
        .filter_map(|id| by_id.get(id).copied())
        .map(|part| (part, true))
        .collect()
}

fn test_pair<'a>(a: &'a Body, b: &'a Body, require_parent_a: bool, require_parent_b: bool, out: &mut Vec<Collision>) {
    let points_a = a.world_vertices();
    let points_b = b.world_vertices();
    match sat::collides(a, b, &points_a, &points_b, require_parent_a, require_parent_b) {
        Ok(Some(collision)) => out.push(collision),
        Ok(None) => {}
        Err(err) => tracing::error!(error = %err, a = a.id, b = b.id, "skipping malformed collision pair"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;
    use crate::common::EngineContext;
    use crate::vector::Vector2;

    #[test]
    fn overlapping_bodies_are_detected() {
        let mut ctx = EngineContext::default();
        let a = Body::rectangle(&mut ctx, Vector2::new(0.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let b = Body::rectangle(&mut ctx, Vector2::new(1.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let bodies = vec![&a, &b];
        let found = collisions(&bodies);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn far_apart_bodies_are_not_detected() {
        let mut ctx = EngineContext::default();
        let a = Body::rectangle(&mut ctx, Vector2::new(0.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let b = Body::rectangle(&mut ctx, Vector2::new(50.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let bodies = vec![&a, &b];
        assert!(collisions(&bodies).is_empty());
    }

    #[test]
    fn two_sleeping_bodies_are_skipped() {
        let mut ctx = EngineContext::default();
        let mut a = Body::rectangle(&mut ctx, Vector2::new(0.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let mut b = Body::rectangle(&mut ctx, Vector2::new(1.0, 0.0), 2.0, 2.0, BodyOptions::default());
        a.is_sleeping = true;
        b.is_sleeping = true;
        let bodies = vec![&a, &b];
        assert!(collisions(&bodies).is_empty());
    }

    #[test]
    fn incompatible_masks_prevent_detection() {
        let mut ctx = EngineContext::default();
        let a = Body::rectangle(&mut ctx, Vector2::new(0.0, 0.0), 2.0, 2.0, BodyOptions::default());
        let mut b = Body::rectangle(&mut ctx, Vector2::new(1.0, 0.0), 2.0, 2.0, BodyOptions::default());
        b.mask = 0;
        let bodies = vec![&a, &b];
        assert!(collisions(&bodies).is_empty());
    }
}
