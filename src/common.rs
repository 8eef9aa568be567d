//! Process-scoped (really: engine-scoped) counters and the seeded PRNG.
//!
//! spec.md §9 calls out the id/category/group counters and the PRNG seed
//! as global mutable state in the distilled system, and directs that a
//! systems-language port isolate them behind a context object owned by the
//! engine rather than sharing unsynchronised statics across engines. This
//! is that context.

use serde::{Deserialize, Serialize};

/// Owns every counter an engine needs that must not be shared, unsynchronised,
/// across multiple engines: body/constraint ids, collision category bits,
/// collision groups, and the deterministic PRNG state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineContext {
    next_id: u64,
    next_category_bit: u32,
    next_group: i32,
    rng_state: u32,
}

impl EngineContext {
    /// Creates a context with the given PRNG seed.
    pub fn new(seed: u32) -> Self {
        Self {
            next_id: 0,
            next_category_bit: 0,
            next_group: 0,
            rng_state: seed,
        }
    }

    /// Allocates a fresh, monotonically increasing id.
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Allocates the next bit in a 32-bit collision category bitfield.
    ///
    /// # Panics
    /// Panics if more than 32 categories are allocated from one context —
    /// a 33rd category has no free bit, which is a configuration error the
    /// caller must not hit in practice.
    pub fn next_category(&mut self) -> u32 {
        assert!(self.next_category_bit < 32, "exhausted 32-bit category bitfield");
        let bit = 1u32 << self.next_category_bit;
        self.next_category_bit += 1;
        bit
    }

    /// Allocates a fresh collision group id. Positive groups collide only
    /// with themselves; negative groups never collide with anything.
    pub fn next_group(&mut self, noncolliding: bool) -> i32 {
        if noncolliding {
            self.next_group -= 1;
            self.next_group
        } else {
            self.next_group += 1;
            self.next_group
        }
    }

    /// Advances the seeded linear-congruential generator and returns a
    /// value in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.rng_state = (self.rng_state.wrapping_mul(9301).wrapping_add(49297)) % 233280;
        self.rng_state as f64 / 233280.0
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(1)
    }
}
