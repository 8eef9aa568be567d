//! Narrow-phase (SAT) and broad-phase (sort-and-sweep) collision
//! detection, the contact-pair registry, and the iterative resolver.

pub mod detector;
pub mod pairs;
pub mod resolver;
pub mod sat;

use crate::vector::Vector2;
use serde::{Deserialize, Serialize};

/// Result of a narrow-phase test between two bodies (or two compound
/// parts). `body_a`/`body_b` are always ordered by ascending id so a
/// pair's key is stable across frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collision {
    pub body_a: u64,
    pub body_b: u64,
    /// Root body id owning `body_a` (equal to `body_a` for a single-part
    /// body, or the compound root for a sub-part).
    pub parent_a: u64,
    pub parent_b: u64,
    pub depth: f64,
    /// Unit normal, oriented away from A (points from A toward B).
    pub normal: Vector2,
    pub tangent: Vector2,
    /// `normal * depth` — the vector a caller would subtract to separate
    /// the bodies exactly.
    pub penetration: Vector2,
    pub supports: Vec<Vector2>,
    pub support_count: usize,
    pub collided: bool,
}
