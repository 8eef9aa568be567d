//! 2D vector mathematics shared by every other module.
//!
//! `Vector2` is a pure value type: every operation returns a new vector
//! rather than mutating in place, except [`Vector2::rotate_into`] which
//! exists for the one hot path (per-vertex rotation during body
//! integration) where an output sink avoids an allocation.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A 2D vector used for position, velocity, force, and direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl Vector2 {
    /// Creates a new vector.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Magnitude (Euclidean length).
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Squared magnitude, avoiding the square root.
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product, a scalar (the z-component of the 3D cross product).
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Normalizes the vector. Returns the zero vector if the magnitude is
    /// zero, per spec.md §4.1 ("normalise returns zero vector when
    /// magnitude is zero") — this is a numerical guard, not an error.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            Self::zero()
        } else {
            Self::new(self.x / mag, self.y / mag)
        }
    }

    /// The perpendicular vector, rotated 90 degrees counter-clockwise.
    pub fn perp(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Negates the vector.
    pub fn neg(&self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// Angle of the vector from the positive x-axis, in radians.
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Angle from this vector to another, in radians.
    pub fn angle_to(&self, other: &Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Rotates the vector about the origin by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotates the vector about the origin, writing the result into `out`
    /// instead of allocating a new value. Used on the per-vertex rotation
    /// hot path during body integration.
    pub fn rotate_into(&self, angle: f64, out: &mut Self) {
        let (sin, cos) = angle.sin_cos();
        out.x = self.x * cos - self.y * sin;
        out.y = self.x * sin + self.y * cos;
    }

    /// Rotates the vector about an arbitrary point by `angle` radians.
    pub fn rotate_about(&self, point: &Self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - point.x;
        let dy = self.y - point.y;
        Self::new(
            point.x + dx * cos - dy * sin,
            point.y + dx * sin + dy * cos,
        )
    }

    /// Linearly interpolates toward `other`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }

    /// Checks if both components are approximately zero.
    pub fn is_zero(&self, epsilon: f64) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon
    }
}

/// `(b - a) x (c - a)`, the scalar orientation test used for convex hull
/// and clockwise-sort construction. Positive when `a -> b -> c` turns
/// counter-clockwise.
pub fn cross3(a: &Vector2, b: &Vector2, c: &Vector2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

impl Add for Vector2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl MulAssign<f64> for Vector2 {
    fn mul_assign(&mut self, scalar: f64) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl Div<f64> for Vector2 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl DivAssign<f64> for Vector2 {
    fn div_assign(&mut self, scalar: f64) {
        self.x /= scalar;
        self.y /= scalar;
    }
}

impl Neg for Vector2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Default for Vector2 {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn magnitude_and_normalize() {
        let v = Vector2::new(3.0, 4.0);
        assert_eq!(v.magnitude(), 5.0);
        let n = v.normalize();
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn normalize_zero_vector_is_zero() {
        let v = Vector2::zero();
        assert_eq!(v.normalize(), Vector2::zero());
    }

    #[test]
    fn dot_and_cross() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.cross(&b), 1.0);
    }

    #[test]
    fn perp_is_90_degrees_ccw() {
        let a = Vector2::new(1.0, 0.0);
        assert_eq!(a.perp(), Vector2::new(0.0, 1.0));
    }

    #[test]
    fn rotate_about_origin_matches_rotate() {
        let v = Vector2::new(1.0, 0.0);
        let r1 = v.rotate(std::f64::consts::FRAC_PI_2);
        let r2 = v.rotate_about(&Vector2::zero(), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(r1.x, r2.x, epsilon = 1e-12);
        assert_relative_eq!(r1.y, r2.y, epsilon = 1e-12);
    }

    #[test]
    fn rotate_into_matches_rotate() {
        let v = Vector2::new(2.0, 3.0);
        let mut out = Vector2::zero();
        v.rotate_into(0.7, &mut out);
        let expected = v.rotate(0.7);
        assert_relative_eq!(out.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(out.y, expected.y, epsilon = 1e-12);
    }

    #[test]
    fn cross3_orientation() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);
        let c = Vector2::new(1.0, 1.0);
        assert!(cross3(&a, &b, &c) > 0.0);
        assert!(cross3(&a, &c, &b) < 0.0);
    }

    #[test]
    fn arithmetic_ops() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, 4.0);
        assert_eq!(a + b, Vector2::new(4.0, 6.0));
        assert_eq!(b - a, Vector2::new(2.0, 2.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(b / 2.0, Vector2::new(1.5, 2.0));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
    }
}
