//! Contact-pair registry: tracks persistent contacts across steps so the
//! resolver can warm-start from cached impulses.

use super::Collision;
use crate::body::Body;
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single contact point, with the solver's warm-start state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Contact {
    pub vertex: Vector2,
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
}

/// Builds the stable `min:max` radix-36 key spec.md uses for a pair of
/// body ids.
pub fn pair_id(a: u64, b: u64) -> String {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    format!("{}:{}", to_radix36(lo), to_radix36(hi))
}

fn to_radix36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap()
}

/// A tracked contact manifold between two bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub id: String,
    pub body_a: u64,
    pub body_b: u64,
    pub collision: Collision,
    pub contacts: [Contact; 2],
    pub contact_count: usize,
    pub friction: f64,
    pub friction_static: f64,
    pub restitution: f64,
    pub slop: f64,
    pub inverse_mass: f64,
    pub separation: f64,
    pub is_active: bool,
    pub is_sensor: bool,
    pub time_created: u64,
    pub time_updated: u64,
}

impl Pair {
    fn new(collision: Collision, body_a: &Body, body_b: &Body, timestamp: u64) -> Self {
        let mut pair = Self {
            id: pair_id(collision.body_a, collision.body_b),
            body_a: collision.body_a,
            body_b: collision.body_b,
            contacts: [Contact::default(); 2],
            contact_count: collision.support_count,
            friction: 0.0,
            friction_static: 0.0,
            restitution: 0.0,
            slop: 0.0,
            inverse_mass: 0.0,
            separation: 0.0,
            is_active: true,
            is_sensor: body_a.is_sensor || body_b.is_sensor,
            time_created: timestamp,
            time_updated: timestamp,
            collision,
        };
        pair.refresh_contacts_from_scratch();
        pair.recompute_material(body_a, body_b);
        pair
    }

    fn refresh_contacts_from_scratch(&mut self) {
        for (i, support) in self.collision.supports.iter().enumerate().take(2) {
            self.contacts[i] = Contact { vertex: *support, normal_impulse: 0.0, tangent_impulse: 0.0 };
        }
    }

    /// Refreshes contacts to match the new collision's supports by vertex
    /// identity, preserving each slot's cached impulse when the same
    /// support point recurs (the warm-start a resting stack depends on).
    fn update_contacts(&mut self, collision: Collision) {
        let mut next = [Contact::default(); 2];
        for (i, support) in collision.supports.iter().enumerate().take(2) {
            let reused = self.contacts[..self.contact_count]
                .iter()
                .find(|c| (c.vertex - *support).magnitude() < 1e-6);
            next[i] = match reused {
                Some(existing) => Contact { vertex: *support, ..*existing },
                None => Contact { vertex: *support, normal_impulse: 0.0, tangent_impulse: 0.0 },
            };
        }

        // If only one contact survives and it actually matches slot 1's
        // old vertex, swap so each slot keeps tracking the same physical
        // support across frames.
        if collision.support_count == 2 && next[0].vertex == next[1].vertex {
            next[1] = Contact { vertex: collision.supports[1], normal_impulse: 0.0, tangent_impulse: 0.0 };
        }

        self.contacts = next;
        self.contact_count = collision.support_count;
        self.collision = collision;
    }

    fn recompute_material(&mut self, body_a: &Body, body_b: &Body) {
        self.friction = body_a.friction.min(body_b.friction);
        self.friction_static = body_a.friction_static.max(body_b.friction_static);
        self.restitution = body_a.restitution.max(body_b.restitution);
        self.slop = body_a.slop.max(body_b.slop);
        self.inverse_mass = body_a.inverse_mass + body_b.inverse_mass;
    }
}

/// The live set of contact pairs: a lookup table by pair id plus an
/// insertion-ordered list for deterministic iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairsRegistry {
    pub table: HashMap<String, Pair>,
    pub list: Vec<String>,
    pub collision_start: Vec<String>,
    pub collision_active: Vec<String>,
    pub collision_end: Vec<String>,
}

impl PairsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a new batch of narrow-phase collisions into the registry,
    /// creating pairs for new contacts, refreshing existing ones, and
    /// deactivating/removing pairs that weren't touched this step.
    pub fn update(
        &mut self,
        collisions: Vec<Collision>,
        bodies_by_id: &HashMap<u64, &Body>,
        timestamp: u64,
    ) {
        self.collision_start.clear();
        self.collision_active.clear();
        let mut touched: Vec<String> = Vec::with_capacity(collisions.len());

        for collision in collisions {
            let key = pair_id(collision.body_a, collision.body_b);
            touched.push(key.clone());

            if let Some(existing) = self.table.get_mut(&key) {
                existing.is_active = true;
                existing.time_updated = timestamp;
                existing.update_contacts(collision);
                if let (Some(&a), Some(&b)) = (bodies_by_id.get(&existing.body_a), bodies_by_id.get(&existing.body_b)) {
                    existing.recompute_material(a, b);
                }
                self.collision_active.push(key);
            } else {
                let (Some(&a), Some(&b)) = (bodies_by_id.get(&collision.body_a), bodies_by_id.get(&collision.body_b))
                else {
                    continue;
                };
                let pair = Pair::new(collision, a, b, timestamp);
                self.table.insert(key.clone(), pair);
                self.list.push(key.clone());
                self.collision_start.push(key);
            }
        }

        self.collision_end.clear();
        let mut still_present = Vec::with_capacity(self.list.len());
        for key in self.list.drain(..) {
            if touched.contains(&key) {
                still_present.push(key);
                continue;
            }

            let keep_in_list = self
                .table
                .get(&key)
                .map(|p| {
                    let sleeping_a = bodies_by_id.get(&p.body_a).map(|b| b.is_sleeping).unwrap_or(false);
                    let sleeping_b = bodies_by_id.get(&p.body_b).map(|b| b.is_sleeping).unwrap_or(false);
                    sleeping_a || sleeping_b
                })
                .unwrap_or(false);

            if let Some(pair) = self.table.get_mut(&key) {
                pair.is_active = false;
            }

            if keep_in_list {
                still_present.push(key);
            } else {
                self.collision_end.push(key.clone());
                self.table.remove(&key);
            }
        }
        self.list = still_present;
    }
}
