//! # confex-base
//!
//! Semantic extraction engine for network-device configuration languages.
//!
//! Given an ordered statement stream produced by an external grammar-driven
//! parser, this crate builds the validated, cross-referenced in-memory model
//! the device's own CLI would have accepted: stable identities for renamable
//! objects, edit-block transaction semantics (mutate, validate, commit or
//! discard), group-membership cycle detection, definition/reference
//! bookkeeping for diagnostics, and order-preserving rule lists with
//! CLI-style relative moves.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! fortios   → reference dialect: statements, object model, extraction driver
//!   ↓
//! txn       → edit-block transactions (clone, mutate, validate, commit/discard)
//! rules     → ordered rule collections with move-before/move-after
//! groups    → group-membership cycle detection
//!   ↓
//! registry  → stable object identity, rename-in-place, namespaces
//! structure → definition/reference ledger for diagnostics
//!   ↓
//! warn      → warnings sink (line, text, message) + unrecognized-input flag
//! base      → primitives (source locations)
//! ```

// ============================================================================
// MODULES (dependency order: base → warn → structure/registry → engine → dialect)
// ============================================================================

/// Foundation types: source locations.
pub mod base;

/// Warnings sink consumed by every layer above.
pub mod warn;

/// Structure table: definition and reference ledger.
pub mod structure;

/// Renamable-object registry: stable identifiers, rename support.
pub mod registry;

/// Cycle detection for self-referential group membership.
pub mod groups;

/// Ordered, name-keyed rule collections.
pub mod rules;

/// Edit-block transactions.
pub mod txn;

/// Reference dialect: FortiOS-style statement stream and extraction driver.
pub mod fortios;

// Re-export the types almost every caller needs.
pub use base::Loc;
pub use registry::{IdAllocator, Namespaced, ObjId, Registry, ResolveError};
pub use rules::{MoveError, RuleSeq};
pub use structure::StructureTable;
pub use txn::EditBlock;
pub use warn::{ParseWarning, Warnings};
