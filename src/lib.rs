//! rigid2d - a deterministic 2D rigid-body physics core.
//!
//! This crate provides the simulation core for a 2D physics engine:
//!
//! - **Geometry**: vectors, AABBs, convex vertex rings, separating axes.
//! - **Bodies**: Verlet-style integration, compound parts, collision
//!   filtering by category/mask/group.
//! - **Collision**: SAT narrow phase, sort-and-sweep broad phase, a
//!   persistent contact-pair registry, and an iterative Gauss-Seidel
//!   position/velocity resolver with warm-starting.
//! - **Constraints**: distance and spring links between bodies or to fixed
//!   world points.
//! - **Sleeping**: motion-based rest detection so quiescent bodies stop
//!   integrating.
//! - **Engine**: the fixed-step orchestrator tying all of the above
//!   together, plus point/region/ray/body queries and a lifecycle event hook.
//!
//! # Example
//!
//! ```
//! use rigid2d::body::{Body, BodyOptions};
//! use rigid2d::engine::{Engine, EngineOptions};
//! use rigid2d::vector::Vector2;
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let ctx = engine.context_mut();
//! let ball = Body::circle(ctx, Vector2::new(0.0, 0.0), 10.0, BodyOptions::default());
//! engine.add_body(ball);
//!
//! for _ in 0..60 {
//!     engine.update(None);
//! }
//! ```

pub mod axes;
pub mod body;
pub mod bounds;
pub mod collision;
pub mod common;
pub mod composite;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod events;
pub mod query;
pub mod sleeping;
pub mod vector;
pub mod vertices;

pub use body::{Body, BodyOptions};
pub use bounds::Bounds;
pub use collision::Collision;
pub use common::EngineContext;
pub use composite::Composite;
pub use constraint::{Constraint, ConstraintOptions};
pub use engine::{Engine, EngineOptions, Gravity, Timing};
pub use error::{PhysicsError, PhysicsResult};
pub use events::{Event, EventEmitter, EventName};
pub use vector::Vector2;
pub use vertices::Vertex;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Returns version information.
pub fn version() -> String {
    format!("{} v{}", NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let v = version();
        assert!(v.contains("rigid2d"));
    }
}
