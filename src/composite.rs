//! Recursive container of bodies, constraints, and nested composites.
//!
//! A `Composite` owns its children directly (no shared ownership, no
//! `Rc`/`RefCell`): bodies and constraints live in `Vec`s here rather than
//! in a side arena, and cross-cutting references — a constraint's
//! `body_a`/`body_b`, a collision pair's two body ids — are plain `u64`
//! ids resolved against the tree at the point of use.

use crate::body::Body;
use crate::bounds::Bounds;
use crate::common::EngineContext;
use crate::constraint::Constraint;
use crate::error::{PhysicsError, PhysicsResult};
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};

/// Discriminates the three child collections a [`Composite`] owns, for
/// kind-tagged lookups (`get`) and moves between composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Body,
    Constraint,
    Composite,
}

impl CompositeKind {
    fn label(self) -> &'static str {
        match self {
            CompositeKind::Body => "body",
            CompositeKind::Constraint => "constraint",
            CompositeKind::Composite => "composite",
        }
    }
}

/// A borrowed child, returned by [`Composite::get`].
#[derive(Debug)]
pub enum CompositeItem<'a> {
    Body(&'a Body),
    Constraint(&'a Constraint),
    Composite(&'a Composite),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Cache {
    all_body_ids: Option<Vec<u64>>,
    all_constraint_ids: Option<Vec<u64>>,
    all_composite_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composite {
    pub id: u64,
    pub label: String,
    pub is_modified: bool,
    pub bodies: Vec<Body>,
    pub constraints: Vec<Constraint>,
    pub composites: Vec<Composite>,
    cache: Cache,
}

impl Composite {
    pub fn new(ctx: &mut EngineContext, label: impl Into<String>) -> Self {
        Self {
            id: ctx.next_id(),
            label: label.into(),
            is_modified: false,
            bodies: Vec::new(),
            constraints: Vec::new(),
            composites: Vec::new(),
            cache: Cache::default(),
        }
    }

    fn mark_modified(&mut self) {
        self.is_modified = true;
        self.cache = Cache::default();
    }

    pub fn add_body(&mut self, body: Body) -> u64 {
        let id = body.id;
        self.bodies.push(body);
        self.mark_modified();
        tracing::debug!(composite = self.id, body = id, "body added to composite");
        id
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> u64 {
        let id = constraint.id;
        self.constraints.push(constraint);
        self.mark_modified();
        id
    }

    pub fn add_composite(&mut self, composite: Composite) -> u64 {
        let id = composite.id;
        self.composites.push(composite);
        self.mark_modified();
        id
    }

    pub fn remove_body(&mut self, id: u64) -> Option<Body> {
        let idx = self.bodies.iter().position(|b| b.id == id)?;
        self.mark_modified();
        Some(self.bodies.remove(idx))
    }

    pub fn remove_constraint(&mut self, id: u64) -> Option<Constraint> {
        let idx = self.constraints.iter().position(|c| c.id == id)?;
        self.mark_modified();
        Some(self.constraints.remove(idx))
    }

    pub fn remove_composite(&mut self, id: u64) -> Option<Composite> {
        let idx = self.composites.iter().position(|c| c.id == id)?;
        self.mark_modified();
        Some(self.composites.remove(idx))
    }

    /// True if this composite or any descendant has been structurally
    /// modified since the last cache rebuild.
    fn is_dirty(&self) -> bool {
        self.is_modified || self.composites.iter().any(Composite::is_dirty)
    }

    /// Depth-first flattening of every body id in this composite and its
    /// descendants, cached until the next structural mutation.
    pub fn all_body_ids(&mut self) -> &[u64] {
        if self.is_dirty() || self.cache.all_body_ids.is_none() {
            let mut ids: Vec<u64> = self.bodies.iter().map(|b| b.id).collect();
            for child in self.composites.iter_mut() {
                ids.extend_from_slice(child.all_body_ids());
            }
            self.cache.all_body_ids = Some(ids);
            self.is_modified = false;
        }
        self.cache.all_body_ids.as_deref().unwrap()
    }

    pub fn all_constraint_ids(&mut self) -> &[u64] {
        if self.is_dirty() || self.cache.all_constraint_ids.is_none() {
            let mut ids: Vec<u64> = self.constraints.iter().map(|c| c.id).collect();
            for child in self.composites.iter_mut() {
                ids.extend_from_slice(child.all_constraint_ids());
            }
            self.cache.all_constraint_ids = Some(ids);
        }
        self.cache.all_constraint_ids.as_deref().unwrap()
    }

    pub fn all_composite_ids(&mut self) -> &[u64] {
        if self.is_dirty() || self.cache.all_composite_ids.is_none() {
            let mut ids: Vec<u64> = self.composites.iter().map(|c| c.id).collect();
            for child in self.composites.iter_mut() {
                ids.extend_from_slice(child.all_composite_ids());
            }
            self.cache.all_composite_ids = Some(ids);
        }
        self.cache.all_composite_ids.as_deref().unwrap()
    }

    /// Depth-first mutable references to every body owned by this
    /// composite tree, in a single flat `Vec` a solver can index into.
    pub fn all_bodies_mut(&mut self) -> Vec<&mut Body> {
        let mut out: Vec<&mut Body> = self.bodies.iter_mut().collect();
        for child in self.composites.iter_mut() {
            out.extend(child.all_bodies_mut());
        }
        out
    }

    pub fn all_bodies(&self) -> Vec<&Body> {
        let mut out: Vec<&Body> = self.bodies.iter().collect();
        for child in &self.composites {
            out.extend(child.all_bodies());
        }
        out
    }

    pub fn all_constraints_mut(&mut self) -> Vec<&mut Constraint> {
        let mut out: Vec<&mut Constraint> = self.constraints.iter_mut().collect();
        for child in self.composites.iter_mut() {
            out.extend(child.all_constraints_mut());
        }
        out
    }

    /// Flattens bodies and constraints in one traversal, for callers (the
    /// engine's step loop) that need both from a single mutable borrow of
    /// the tree.
    pub fn bodies_and_constraints_mut(&mut self) -> (Vec<&mut Body>, Vec<&mut Constraint>) {
        let mut bodies: Vec<&mut Body> = self.bodies.iter_mut().collect();
        let mut constraints: Vec<&mut Constraint> = self.constraints.iter_mut().collect();
        for child in self.composites.iter_mut() {
            let (child_bodies, child_constraints) = child.bodies_and_constraints_mut();
            bodies.extend(child_bodies);
            constraints.extend(child_constraints);
        }
        (bodies, constraints)
    }

    /// Absorbs another composite's bodies, constraints, and nested
    /// composites into this one.
    pub fn merge(&mut self, other: Composite) {
        self.bodies.extend(other.bodies);
        self.constraints.extend(other.constraints);
        self.composites.extend(other.composites);
        self.mark_modified();
    }

    /// Finds a body anywhere in this composite tree by id.
    pub fn find_body(&self, id: u64) -> Option<&Body> {
        self.bodies
            .iter()
            .find(|b| b.id == id)
            .or_else(|| self.composites.iter().find_map(|c| c.find_body(id)))
    }

    pub fn find_body_mut(&mut self, id: u64) -> Option<&mut Body> {
        if let Some(pos) = self.bodies.iter().position(|b| b.id == id) {
            return Some(&mut self.bodies[pos]);
        }
        self.composites.iter_mut().find_map(|c| c.find_body_mut(id))
    }

    /// Applies a translation to every body in this composite tree.
    pub fn translate(&mut self, delta: Vector2, recursive: bool) {
        for body in self.bodies.iter_mut() {
            body.translate(delta);
        }
        if recursive {
            for child in self.composites.iter_mut() {
                child.translate(delta, true);
            }
        }
    }

    /// Rotates every body about `point` by `angle` radians.
    pub fn rotate(&mut self, angle: f64, point: Vector2, recursive: bool) {
        for body in self.bodies.iter_mut() {
            let rotated = body.position.rotate_about(&point, angle);
            body.set_position(rotated);
            body.rotate(angle);
        }
        if recursive {
            for child in self.composites.iter_mut() {
                child.rotate(angle, point, true);
            }
        }
    }

    /// Scales every body's vertices and position about `point`.
    pub fn scale(&mut self, scale_x: f64, scale_y: f64, point: Vector2, recursive: bool) {
        for body in self.bodies.iter_mut() {
            let offset = body.position - point;
            let scaled = Vector2::new(point.x + offset.x * scale_x, point.y + offset.y * scale_y);
            body.set_position(scaled);
            body.scale(scale_x, scale_y);
        }
        if recursive {
            for child in self.composites.iter_mut() {
                child.scale(scale_x, scale_y, point, true);
            }
        }
    }

    /// Removes every body, constraint, and (optionally) every nested
    /// composite. `keep_static` preserves static bodies in place, matching
    /// the common "reset the scene but leave the ground" pattern.
    pub fn clear(&mut self, keep_static: bool) {
        if keep_static {
            self.bodies.retain(|b| b.is_static);
        } else {
            self.bodies.clear();
        }
        self.constraints.clear();
        self.composites.clear();
        self.mark_modified();
    }

    /// Aggregate AABB over every body in this composite tree. Empty (inverted)
    /// bounds if the tree has no bodies.
    pub fn bounds(&mut self) -> Bounds {
        let mut bounds = Bounds::empty();
        for body in self.all_bodies() {
            bounds.grow(body.bounds.min);
            bounds.grow(body.bounds.max);
        }
        bounds
    }

    /// Forces this composite and every descendant to rebuild their caches on
    /// next read, without otherwise touching their contents. Used after a
    /// bulk external mutation (a direct edit to `bodies`/`constraints`, or
    /// after [`Composite::move_to`]) to resynchronize stale cached state.
    pub fn rebase(&mut self) {
        self.mark_modified();
        for child in self.composites.iter_mut() {
            child.rebase();
        }
    }

    /// Moves a child of the given id and kind out of this composite and
    /// into `target`. Fails with [`PhysicsError::NotFound`] if no such child
    /// exists anywhere in this composite tree.
    pub fn move_to(&mut self, id: u64, kind: CompositeKind, target: &mut Composite) -> PhysicsResult<()> {
        match kind {
            CompositeKind::Body => {
                let body = self.take_body(id).ok_or(PhysicsError::NotFound { kind: kind.label(), id })?;
                target.add_body(body);
            }
            CompositeKind::Constraint => {
                let constraint =
                    self.take_constraint(id).ok_or(PhysicsError::NotFound { kind: kind.label(), id })?;
                target.add_constraint(constraint);
            }
            CompositeKind::Composite => {
                let composite =
                    self.take_composite(id).ok_or(PhysicsError::NotFound { kind: kind.label(), id })?;
                target.add_composite(composite);
            }
        }
        Ok(())
    }

    fn take_body(&mut self, id: u64) -> Option<Body> {
        if let Some(body) = self.remove_body(id) {
            return Some(body);
        }
        self.composites.iter_mut().find_map(|c| c.take_body(id))
    }

    fn take_constraint(&mut self, id: u64) -> Option<Constraint> {
        if let Some(constraint) = self.remove_constraint(id) {
            return Some(constraint);
        }
        self.composites.iter_mut().find_map(|c| c.take_constraint(id))
    }

    fn take_composite(&mut self, id: u64) -> Option<Composite> {
        if let Some(composite) = self.remove_composite(id) {
            return Some(composite);
        }
        self.composites.iter_mut().find_map(|c| c.take_composite(id))
    }

    /// Looks up a child of the given id and kind anywhere in this composite
    /// tree.
    pub fn get(&self, id: u64, kind: CompositeKind) -> PhysicsResult<CompositeItem<'_>> {
        let not_found = || PhysicsError::NotFound { kind: kind.label(), id };
        match kind {
            CompositeKind::Body => self.find_body(id).map(CompositeItem::Body).ok_or_else(not_found),
            CompositeKind::Constraint => self
                .constraints
                .iter()
                .find(|c| c.id == id)
                .or_else(|| self.composites.iter().find_map(|c| c.find_constraint(id)))
                .map(CompositeItem::Constraint)
                .ok_or_else(not_found),
            CompositeKind::Composite => self.find_composite(id).map(CompositeItem::Composite).ok_or_else(not_found),
        }
    }

    fn find_constraint(&self, id: u64) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.id == id)
            .or_else(|| self.composites.iter().find_map(|c| c.find_constraint(id)))
    }

    fn find_composite(&self, id: u64) -> Option<&Composite> {
        if self.id == id {
            return Some(self);
        }
        self.composites.iter().find_map(|c| c.find_composite(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;

    fn body(ctx: &mut EngineContext, pos: Vector2) -> Body {
        Body::rectangle(ctx, pos, 1.0, 1.0, BodyOptions::default())
    }

    #[test]
    fn add_body_appears_in_all_body_ids() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let b = body(&mut ctx, Vector2::zero());
        let id = world.add_body(b);
        assert_eq!(world.all_body_ids(), &[id]);
    }

    #[test]
    fn nested_composite_flattens_depth_first() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let id1 = world.add_body(body(&mut ctx, Vector2::zero()));
        let mut child = Composite::new(&mut ctx, "child");
        let id2 = child.add_body(body(&mut ctx, Vector2::new(1.0, 0.0)));
        world.add_composite(child);

        let ids = world.all_body_ids().to_vec();
        assert!(ids.contains(&id1));
        assert!(ids.contains(&id2));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn removing_body_invalidates_cache() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let id = world.add_body(body(&mut ctx, Vector2::zero()));
        assert_eq!(world.all_body_ids().len(), 1);
        world.remove_body(id);
        assert_eq!(world.all_body_ids().len(), 0);
    }

    #[test]
    fn translate_moves_every_body_recursively() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        world.add_body(body(&mut ctx, Vector2::zero()));
        let mut child = Composite::new(&mut ctx, "child");
        child.add_body(body(&mut ctx, Vector2::zero()));
        world.add_composite(child);

        world.translate(Vector2::new(5.0, 0.0), true);
        for b in world.all_bodies() {
            assert_eq!(b.position.x, 5.0);
        }
    }

    #[test]
    fn merge_combines_two_composites() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let id1 = world.add_body(body(&mut ctx, Vector2::zero()));
        let mut other = Composite::new(&mut ctx, "other");
        let id2 = other.add_body(body(&mut ctx, Vector2::new(2.0, 0.0)));

        world.merge(other);

        let ids = world.all_body_ids().to_vec();
        assert!(ids.contains(&id1));
        assert!(ids.contains(&id2));
    }

    #[test]
    fn find_body_locates_nested_body() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let mut child = Composite::new(&mut ctx, "child");
        let id = child.add_body(body(&mut ctx, Vector2::zero()));
        world.add_composite(child);
        assert!(world.find_body(id).is_some());
        assert!(world.find_body(999).is_none());
    }

    #[test]
    fn clear_keeps_static_bodies_when_requested() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let floor_opts = BodyOptions { is_static: true, ..BodyOptions::default() };
        world.add_body(Body::rectangle(&mut ctx, Vector2::zero(), 10.0, 1.0, floor_opts));
        world.add_body(body(&mut ctx, Vector2::new(0.0, -5.0)));
        let mut child = Composite::new(&mut ctx, "child");
        child.add_body(body(&mut ctx, Vector2::zero()));
        world.add_composite(child);

        world.clear(true);

        assert_eq!(world.all_body_ids().len(), 1);
        assert!(world.composites.is_empty());
    }

    #[test]
    fn clear_without_keep_static_removes_everything() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        world.add_body(body(&mut ctx, Vector2::zero()));
        world.clear(false);
        assert_eq!(world.all_body_ids().len(), 0);
    }

    #[test]
    fn bounds_covers_every_body_including_nested() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        world.add_body(Body::rectangle(&mut ctx, Vector2::new(-10.0, 0.0), 2.0, 2.0, BodyOptions::default()));
        let mut child = Composite::new(&mut ctx, "child");
        child.add_body(Body::rectangle(&mut ctx, Vector2::new(10.0, 0.0), 2.0, 2.0, BodyOptions::default()));
        world.add_composite(child);

        let bounds = world.bounds();
        assert!(bounds.min.x <= -11.0);
        assert!(bounds.max.x >= 11.0);
    }

    #[test]
    fn move_to_transfers_a_nested_body_to_another_composite() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let mut child = Composite::new(&mut ctx, "child");
        let id = child.add_body(body(&mut ctx, Vector2::zero()));
        world.add_composite(child);
        let mut target = Composite::new(&mut ctx, "target");

        world.move_to(id, CompositeKind::Body, &mut target).unwrap();

        assert!(world.find_body(id).is_none());
        assert!(target.find_body(id).is_some());
    }

    #[test]
    fn move_to_missing_id_reports_not_found() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let mut target = Composite::new(&mut ctx, "target");
        let err = world.move_to(999, CompositeKind::Body, &mut target).unwrap_err();
        assert!(matches!(err, PhysicsError::NotFound { kind: "body", id: 999 }));
    }

    #[test]
    fn get_resolves_each_kind_by_id() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let body_id = world.add_body(body(&mut ctx, Vector2::zero()));
        let constraint_opts = crate::constraint::ConstraintOptions {
            point_a: Vector2::zero(),
            point_b: Vector2::new(1.0, 0.0),
            ..Default::default()
        };
        let constraint = Constraint::new(ctx.next_id(), constraint_opts, Vector2::zero(), Vector2::new(1.0, 0.0));
        let constraint_id = world.add_constraint(constraint);
        let child = Composite::new(&mut ctx, "child");
        let child_id = world.add_composite(child);

        assert!(matches!(world.get(body_id, CompositeKind::Body), Ok(CompositeItem::Body(_))));
        assert!(matches!(world.get(constraint_id, CompositeKind::Constraint), Ok(CompositeItem::Constraint(_))));
        assert!(matches!(world.get(child_id, CompositeKind::Composite), Ok(CompositeItem::Composite(_))));
        assert!(world.get(999, CompositeKind::Body).is_err());
    }

    #[test]
    fn rebase_forces_descendant_caches_to_rebuild() {
        let mut ctx = EngineContext::default();
        let mut world = Composite::new(&mut ctx, "world");
        let mut child = Composite::new(&mut ctx, "child");
        child.add_body(body(&mut ctx, Vector2::zero()));
        world.add_composite(child);
        let _ = world.all_body_ids();

        world.composites[0].bodies[0] = body(&mut ctx, Vector2::new(9.0, 0.0));
        world.rebase();

        assert_eq!(world.all_body_ids().len(), 1);
    }
}
