//! Error types for component registration.
//!
//! This module declares the focused error types used by the component
//! registry. Each error carries enough context to make failures actionable
//! while remaining small and cheap to pass around.
//!
//! ## Goals
//! * **Specificity:** Each variant models a single failure mode (identifier
//!   collision, degenerate kind description, poisoned registry lock).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`std::fmt::Display`].
//! * **Actionability:** Structured fields (offending identifier, both kind
//!   names involved in a collision) make logs useful without reproducing the
//!   issue.
//!
//! ## Typical flow
//! Registration is the only fallible public surface of the engine; everything
//! else reports negative results as `Option`/no-op. Callers register kinds at
//! startup and use `?` to bubble a [`RegistryError`] out of their setup path.
//!
//! ## Display vs. Debug
//! * [`std::fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`std::fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::ComponentId;

/// Convenience alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced while registering or describing component kinds.
///
/// ## Context
/// Component identifiers are derived from kind names by a stable 32-bit hash,
/// so two distinct names can collide. Collisions are programmer-visible
/// configuration errors and must be surfaced at registration time rather than
/// corrupting the archive later.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Two distinct kind names hash to the same identifier.
    Collision {
        /// The contested identifier.
        id: ComponentId,

        /// Name already registered under `id`.
        existing: &'static str,

        /// Name whose registration was rejected.
        incoming: &'static str,
    },

    /// A named kind was described with a zero byte size.
    ZeroSized {
        /// Name of the degenerate kind.
        name: &'static str,
    },

    /// A kind name hashed to the reserved invalid identifier.
    NullId {
        /// Name whose hash is zero.
        name: &'static str,
    },

    /// The registry lock was poisoned by a panicking writer.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Collision { id, existing, incoming } => write!(
                f,
                "component id {:#010x} collision: '{}' is already registered, '{}' rejected",
                id, existing, incoming
            ),
            RegistryError::ZeroSized { name } => {
                write!(f, "component kind '{}' has zero size", name)
            }
            RegistryError::NullId { name } => {
                write!(f, "component kind '{}' hashes to the reserved invalid id", name)
            }
            RegistryError::PoisonedLock => f.write_str("component registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}
