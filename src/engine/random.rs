//! Fast thread-local pseudo-random number generation.
//!
//! This module provides a lightweight, lock-free source of pseudo-random
//! numbers backing the optional random entity-handle path.
//!
//! # Design
//!
//! The generator is implemented as a **thread-local xorshift64\*** RNG:
//!
//! - Each thread owns its own independent RNG state via `thread_local!`.
//! - The state is stored in a `Cell<u64>` to allow mutation without borrowing.
//! - No global state, locks, or atomics are used.
//!
//! The initial seed is a fixed, non-zero constant, so each thread produces a
//! deterministic sequence across executions.
//!
//! # Non-goals
//!
//! - This generator is **not cryptographically secure**.
//! - It should not be used for security-sensitive randomness.
//!
//! For statistically rigorous randomness, prefer `rand`-crate generators
//! instead.

use std::cell::Cell;
use std::thread_local;

thread_local! {static TL_RNG: Cell<u64> = const { Cell::new(0x9E37_79B9_7F4A_7C15) };}

/// Returns a fast, thread-local pseudo-random `u64`.
///
/// ## Behavior
/// Generates a new pseudo-random value using a **xorshift64\*** step backed by
/// thread-local state. Each thread maintains its own independent state,
/// eliminating contention and synchronization overhead.
///
/// ## Guarantees
/// * **Lock-free:** No global synchronization or atomics.
/// * **Thread-safe:** Each thread has independent state via `thread_local!`.
/// * **Never zero:** The xorshift state cycle excludes zero, and the final
///   multiply is a bijection, so the output is never zero either.
///
/// ## Example
/// ```
/// use component_archive::engine::random::tl_rand_u64;
///
/// let x = tl_rand_u64();
/// let y = tl_rand_u64();
/// assert_ne!(x, y);
/// ```

#[inline]
pub fn tl_rand_u64() -> u64 {
    TL_RNG.with(|c| {
        let mut x = c.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        c.set(x);
        x.wrapping_mul(0x2545F4914F6CDD1D)
    })
}
