//! Reference dialect: a FortiOS-style configuration language.
//!
//! The dialect exercises every engine layer at once: renamable objects with
//! stable identities, edit-block transactions, group cycle checks, an
//! ordered policy list with relative moves, and the definition/reference
//! ledger. Statements come from an external grammar-driven parser as a
//! [`Statement`] stream; [`extract`] walks the stream and returns the
//! populated [`FortiosConfig`].

pub mod config;
pub mod extract;
pub mod kinds;
pub mod model;
pub mod statements;

pub use config::FortiosConfig;
pub use extract::{ExtractError, Extractor, extract};
pub use kinds::{Namespace, StructureKind, UsageKind};
pub use statements::{ConfigSection, MoveDir, SetField, Statement, StmtKind};
