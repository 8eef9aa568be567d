//! Unique outward edge normals ("axes") for SAT, deduplicated at a
//! deliberately precision-limited key (spec.md §9 "Axis dedupe
//! precision").

use crate::vector::Vector2;
use crate::vertices::Vertex;
use std::collections::HashSet;

/// Dedupe key: the normal's gradient (`x/y`, or infinite for a horizontal
/// edge), rounded to three decimal places. This is a tuning knob that
/// trades axis count (SAT cost) for false merges; kept as-is to stay
/// behaviour-compatible rather than switched to exact edge-direction
/// dedupe (spec.md §9).
fn dedupe_key(normal: Vector2) -> String {
    let gradient = if normal.y == 0.0 { f64::INFINITY } else { normal.x / normal.y };
    // Avoid `-0.0` and `0.0` formatting as distinct keys.
    let gradient = if gradient == 0.0 { 0.0 } else { gradient };
    format!("{:.3}", gradient)
}

/// Computes the unique outward edge normals of a convex, clockwise vertex
/// ring.
pub fn from_vertices(vertices: &[Vertex]) -> Vec<Vector2> {
    let n = vertices.len();
    let mut axes = Vec::with_capacity(n);
    let mut seen = HashSet::with_capacity(n);

    for i in 0..n {
        let j = (i + 1) % n;
        let edge = vertices[j].point - vertices[i].point;
        // Outward normal for a clockwise ring: rotate the edge -90 degrees.
        let normal = Vector2::new(edge.y, -edge.x).normalize();
        if seen.insert(dedupe_key(normal)) {
            axes.push(normal);
        }
    }

    axes
}

/// Rotates every axis by `angle` radians, in place. Used each integration
/// step to keep a body's axes tracking its orientation.
pub fn rotate(axes: &mut [Vector2], angle: f64) {
    for axis in axes.iter_mut() {
        *axis = axis.rotate(angle);
    }
}
