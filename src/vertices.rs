//! Polygon vertex operations: area, centroid, inertia, containment,
//! chamfering, convex hull, and clockwise sorting.

use crate::vector::{cross3, Vector2};

/// A point on a body's convex hull, carrying its index into the owning
/// body's vertex ring and whether the edge leading into it is internal
/// (coincident with a neighbouring compound part).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position, in whatever space the caller is working in (body-local or
    /// world, depending on context).
    pub point: Vector2,
    /// Index into the owning body's vertex ring.
    pub index: usize,
    /// Marks an edge coincident with a neighbouring compound part.
    pub is_internal: bool,
}

impl Vertex {
    /// Creates a new vertex.
    pub fn new(point: Vector2, index: usize, is_internal: bool) -> Self {
        Self { point, index, is_internal }
    }
}

/// Builds a vertex ring from a list of points, in order, none internal.
pub fn from_points(points: &[Vector2]) -> Vec<Vertex> {
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| Vertex::new(p, i, false))
        .collect()
}

/// Polygon area via the trapezoid (shoelace) formula. Unsigned unless
/// `signed` is true.
pub fn area(vertices: &[Vertex], signed: bool) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += vertices[i].point.cross(&vertices[j].point);
    }
    let signed_area = sum / 2.0;
    if signed { signed_area } else { signed_area.abs() }
}

/// Signed-area-weighted polygon centroid.
pub fn centre(vertices: &[Vertex]) -> Vector2 {
    let n = vertices.len();
    if n == 0 {
        return Vector2::zero();
    }
    let a = area(vertices, true);
    if a.abs() < 1e-12 {
        return mean(vertices);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let p0 = vertices[i].point;
        let p1 = vertices[j].point;
        let cross = p0.cross(&p1);
        cx += (p0.x + p1.x) * cross;
        cy += (p0.y + p1.y) * cross;
    }
    let factor = 1.0 / (6.0 * a);
    Vector2::new(cx * factor, cy * factor)
}

/// Arithmetic mean of vertex positions.
pub fn mean(vertices: &[Vertex]) -> Vector2 {
    let n = vertices.len();
    if n == 0 {
        return Vector2::zero();
    }
    let sum = vertices.iter().fold(Vector2::zero(), |acc, v| acc + v.point);
    sum / n as f64
}

/// Second moment of area scaled by `mass / 6`, using the triangle-fan
/// formula with edge-cross magnitudes as weights (spec.md §4.1).
pub fn inertia(vertices: &[Vertex], mass: f64) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let a = vertices[i].point;
        let b = vertices[j].point;
        let cross = b.cross(&a).abs();
        numerator += cross * (b.dot(&b) + b.dot(&a) + a.dot(&a));
        denominator += cross;
    }
    if denominator.abs() < 1e-12 {
        return 0.0;
    }
    (mass / 6.0) * (numerator / denominator)
}

/// Half-plane containment test: walks the ring in order and rejects the
/// point the moment any directed edge places it on the right.
pub fn contains(vertices: &[Vertex], point: &Vector2) -> bool {
    let n = vertices.len();
    for i in 0..n {
        let cur = vertices[i].point;
        let next = vertices[(i + 1) % n].point;
        let edge = next - cur;
        let to_point = *point - cur;
        if edge.cross(&to_point) < 0.0 {
            return false;
        }
    }
    true
}

/// Chamfers (rounds) every vertex of a convex polygon with arcs of the
/// given radius. A zero radius is the identity. `quality == -1.0`
/// auto-derives the arc precision from the radius.
pub fn chamfer(
    vertices: &[Vertex],
    radius: f64,
    quality: f64,
    quality_min: usize,
    quality_max: usize,
) -> Vec<Vertex> {
    if radius <= 0.0 {
        return vertices.to_vec();
    }

    let precision = {
        let raw = if quality == -1.0 {
            radius.powf(0.32) * 1.75
        } else {
            quality
        };
        let clamped = raw.clamp(quality_min as f64, quality_max as f64);
        let rounded = clamped.ceil() as usize;
        if rounded % 2 == 1 { rounded + 1 } else { rounded }
    };

    let n = vertices.len();
    let mut result = Vec::with_capacity(n * (precision + 1));

    for i in 0..n {
        let prev = vertices[(i + n - 1) % n].point;
        let cur = vertices[i].point;
        let next = vertices[(i + 1) % n].point;

        let to_prev = (prev - cur).normalize();
        let to_next = (next - cur).normalize();

        let edge_len_prev = (prev - cur).magnitude();
        let edge_len_next = (next - cur).magnitude();
        let r = radius.min(edge_len_prev * 0.5).min(edge_len_next * 0.5);

        let start = cur + to_prev * r;
        let end = cur + to_next * r;

        let start_angle = (start - cur).angle();
        let mut end_angle = (end - cur).angle();

        // Walk the short way around from start_angle to end_angle.
        let two_pi = std::f64::consts::TAU;
        let mut delta = end_angle - start_angle;
        if delta > std::f64::consts::PI {
            delta -= two_pi;
        } else if delta < -std::f64::consts::PI {
            delta += two_pi;
        }
        end_angle = start_angle + delta;

        for step in 0..=precision {
            let t = step as f64 / precision as f64;
            let angle = start_angle + (end_angle - start_angle) * t;
            let point = Vector2::new(cur.x + r * angle.cos(), cur.y + r * angle.sin());
            result.push(Vertex::new(point, result.len(), false));
        }
    }

    for (idx, v) in result.iter_mut().enumerate() {
        v.index = idx;
    }
    result
}

/// Monotone-chain convex hull, returned sorted ascending on `(x, then y)`.
pub fn hull(points: &[Vector2]) -> Vec<Vector2> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap().then(a.y.partial_cmp(&b.y).unwrap()));
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);

    let n = pts.len();
    if n < 3 {
        return pts;
    }

    let mut lower: Vec<Vector2> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross3(&lower[lower.len() - 2], &lower[lower.len() - 1], &p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vector2> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross3(&upper[upper.len() - 2], &upper[upper.len() - 1], &p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Sorts points by `atan2(v - mean)`, i.e. angularly about their centroid.
pub fn clockwise_sort(points: &mut [Vector2]) {
    let n = points.len();
    if n == 0 {
        return;
    }
    let sum = points.iter().fold(Vector2::zero(), |acc, p| acc + *p);
    let mean = sum / n as f64;
    points.sort_by(|a, b| {
        let angle_a = (*a - mean).angle();
        let angle_b = (*b - mean).angle();
        angle_a.partial_cmp(&angle_b).unwrap()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Vec<Vertex> {
        let h = side / 2.0;
        from_points(&[
            Vector2::new(-h, -h),
            Vector2::new(h, -h),
            Vector2::new(h, h),
            Vector2::new(-h, h),
        ])
    }

    #[test]
    fn area_of_unit_square() {
        let v = square(1.0);
        assert_relative_eq!(area(&v, false), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn centre_of_square_is_origin() {
        let v = square(2.0);
        let c = centre(&v);
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn mean_of_square_is_origin() {
        let v = square(2.0);
        let m = mean(&v);
        assert_relative_eq!(m.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(m.y, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn inertia_is_positive() {
        let v = square(2.0);
        assert!(inertia(&v, 1.0) > 0.0);
    }

    #[test]
    fn contains_centre_point() {
        let v = square(2.0);
        assert!(contains(&v, &Vector2::zero()));
        assert!(!contains(&v, &Vector2::new(10.0, 10.0)));
    }

    #[test]
    fn chamfer_zero_radius_is_identity() {
        let v = square(2.0);
        let chamfered = chamfer(&v, 0.0, -1.0, 2, 14);
        assert_eq!(chamfered.len(), v.len());
        for (a, b) in chamfered.iter().zip(v.iter()) {
            assert_eq!(a.point, b.point);
        }
    }

    #[test]
    fn chamfer_produces_more_vertices() {
        let v = square(2.0);
        let chamfered = chamfer(&v, 0.2, -1.0, 2, 14);
        assert!(chamfered.len() > v.len());
    }

    #[test]
    fn hull_of_square_with_interior_point() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(1.0, 1.0), // interior, should be dropped
        ];
        let h = hull(&points);
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn clockwise_sort_orders_by_angle() {
        let mut points = vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(-1.0, 0.0),
            Vector2::new(0.0, -1.0),
        ];
        clockwise_sort(&mut points);
        let angles: Vec<f64> = points.iter().map(|p| p.angle()).collect();
        for w in angles.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }
}
