//! Error types for the physics core.
//!
//! Per spec.md §7, only construction errors are fallible — numerical
//! guards and precondition warnings are handled locally (clamped, logged,
//! or defaulted) and never produce a [`PhysicsError`].

use thiserror::Error;

/// Result type alias for fallible physics operations.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Construction-time errors. These always surface to the caller as a
/// failed operation; nothing in this crate retries internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A collision record was built for a body with no `parent`, breaking
    /// the `parts[0] == root` invariant (spec.md §3, §7).
    #[error("body {0} has no parent part reference; parts[0] must be the root")]
    MissingParent(u64),

    /// A constraint was built with neither endpoint body set.
    #[error("constraint must define at least one of bodyA or bodyB")]
    UnboundConstraint,

    /// A body factory was given a degenerate vertex set (fewer than 3
    /// points, or zero signed area).
    #[error("body {0:?} vertex set is degenerate: {reason}")]
    DegenerateVertices { context: Option<u64>, reason: String },

    /// A composite lookup (`get`) found no child of the requested kind
    /// with the requested id.
    #[error("no {kind} with id {id} in composite")]
    NotFound { kind: &'static str, id: u64 },
}

impl PhysicsError {
    /// Builds a [`PhysicsError::DegenerateVertices`] without an owning body
    /// id (used during standalone vertex validation, before a `Body`
    /// exists to attach an id to).
    pub fn degenerate_vertices(reason: impl Into<String>) -> Self {
        Self::DegenerateVertices { context: None, reason: reason.into() }
    }
}
