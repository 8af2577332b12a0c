//! # Entity Handle Generation
//!
//! Entities are opaque 64-bit handles with no owned storage; they only gain
//! meaning once the archive maps them to an archetype and a storage slot.
//! This module is responsible for producing fresh handles.
//!
//! ## Generation strategies
//!
//! - [`generate_entity`] — the default path: a process-wide atomic counter
//!   starting at 1. Handles are unique and monotonic per process.
//! - [`generate_entity_random`] — uniform random 64-bit handles from the
//!   thread-local generator in [`crate::engine::random`]. Uniqueness is
//!   probabilistic; useful when handle values must not be guessable from
//!   creation order.
//!
//! Both paths never return [`Entity::INVALID`] (zero).
//!
//! ## Concurrency
//!
//! Handle generation is the only thread-safe mutating primitive the engine
//! exposes. No ordering is guaranteed across threads beyond uniqueness on the
//! atomic path.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::random::tl_rand_u64;
use crate::engine::types::Entity;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Generates a fresh entity handle from the monotonic counter.
///
/// ## Behavior
/// Increments a process-wide atomic counter; the first handle ever produced
/// is `Entity(1)`. Safe to call from any thread.
///
/// ## Notes
/// The counter never wraps in practice: at one allocation per nanosecond it
/// would take centuries to exhaust 64 bits.

#[inline]
pub fn generate_entity() -> Entity {
    Entity(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// Generates a fresh entity handle from the thread-local random generator.
///
/// ## Behavior
/// Draws a uniform non-zero 64-bit value. Uniqueness is probabilistic only;
/// collisions are astronomically unlikely but not impossible.

#[inline]
pub fn generate_entity_random() -> Entity {
    let handle = tl_rand_u64();
    debug_assert_ne!(handle, 0, "xorshift64* output is never zero");
    Entity(handle)
}
