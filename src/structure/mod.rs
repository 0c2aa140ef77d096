//! Structure table — the definition/reference ledger.
//!
//! Records every place a named configuration structure is defined and every
//! place one is referenced, keyed by (structure kind, name). It is a pure
//! ledger: recording a reference never requires a prior definition (forward
//! and dangling references are both legal), and no validation lives here.
//! A downstream diagnostics pass turns the ledger into undefined-reference
//! and unused-structure findings.

use std::collections::BTreeSet;
use std::hash::Hash;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::Loc;

/// Definition history for one (kind, name) pair.
///
/// A structure may be defined on several lines: the CLI allows reopening an
/// edit block, and a rename contributes its own line. `live` goes false when
/// the structure is deleted or renamed away; history is retained either way
/// so diagnostics can still point at the old lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefinitionRecord {
    lines: BTreeSet<u32>,
    live: bool,
}

impl DefinitionRecord {
    /// Lines on which this structure was defined, sorted ascending.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().copied()
    }

    /// False once the definition has been superseded by delete or rename.
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// One recorded use of a structure name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceRecord<U> {
    /// The syntactic role the name appeared in.
    pub usage: U,
    /// Where it appeared.
    pub loc: Loc,
}

/// Ledger of structure definitions and references for one file.
///
/// `K` is the dialect's structure-kind enum, `U` its usage-kind enum. Both
/// are closed enumerations; the compiler forces the dialect driver to handle
/// every kind it declares.
#[derive(Debug, Clone)]
pub struct StructureTable<K, U> {
    definitions: IndexMap<(K, SmolStr), DefinitionRecord>,
    references: IndexMap<(K, SmolStr), Vec<ReferenceRecord<U>>>,
}

impl<K, U> Default for StructureTable<K, U>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self {
            definitions: IndexMap::new(),
            references: IndexMap::new(),
        }
    }
}

impl<K, U> StructureTable<K, U>
where
    K: Copy + Eq + Hash,
    U: Copy,
{
    pub fn new() -> Self {
        Self {
            definitions: IndexMap::new(),
            references: IndexMap::new(),
        }
    }

    /// Record a definition site. Idempotent per line; always succeeds.
    /// Re-defining a deleted structure makes it live again.
    pub fn define(&mut self, kind: K, name: impl Into<SmolStr>, loc: Loc) {
        let record = self
            .definitions
            .entry((kind, name.into()))
            .or_default();
        record.lines.insert(loc.line);
        record.live = true;
    }

    /// Record a reference site. Append-only; the name need not be defined,
    /// now or ever.
    pub fn reference(&mut self, kind: K, name: impl Into<SmolStr>, usage: U, loc: Loc) {
        self.references
            .entry((kind, name.into()))
            .or_default()
            .push(ReferenceRecord { usage, loc });
    }

    /// Mark a definition superseded (delete or rename-away). History stays.
    pub fn undefine(&mut self, kind: K, name: &str) {
        if let Some(record) = self.definitions.get_mut(&(kind, SmolStr::new(name))) {
            record.live = false;
        }
    }

    /// Move the definition history and all accumulated references from `old`
    /// to `new`, then record `loc` (the rename statement itself) as a fresh
    /// definition of `new`.
    ///
    /// References made against `old` before the rename follow the object to
    /// its new name; references made against `old` afterwards accumulate
    /// under `old` again and surface downstream as undefined references.
    pub fn rename(&mut self, kind: K, old: &str, new: impl Into<SmolStr>, loc: Loc) {
        let new = new.into();
        let old_key = (kind, SmolStr::new(old));

        if let Some(mut record) = self.definitions.shift_remove(&old_key) {
            record.lines.insert(loc.line);
            record.live = true;
            let merged = self
                .definitions
                .entry((kind, new.clone()))
                .or_default();
            merged.lines.extend(record.lines);
            merged.live = true;
        }

        if let Some(refs) = self.references.shift_remove(&old_key) {
            self.references
                .entry((kind, new))
                .or_default()
                .extend(refs);
        }
    }

    /// True if (kind, name) has a live definition.
    pub fn is_defined(&self, kind: K, name: &str) -> bool {
        self.definitions
            .get(&(kind, SmolStr::new(name)))
            .is_some_and(|r| r.live)
    }

    /// Definition record for (kind, name), live or not.
    pub fn definition(&self, kind: K, name: &str) -> Option<&DefinitionRecord> {
        self.definitions.get(&(kind, SmolStr::new(name)))
    }

    /// All references recorded against (kind, name).
    pub fn references_to(&self, kind: K, name: &str) -> &[ReferenceRecord<U>] {
        self.references
            .get(&(kind, SmolStr::new(name)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate every definition in recording order.
    pub fn definitions(&self) -> impl Iterator<Item = (K, &SmolStr, &DefinitionRecord)> {
        self.definitions.iter().map(|((k, n), r)| (*k, n, r))
    }

    /// Iterate every (kind, name) with recorded references.
    pub fn referenced_names(&self) -> impl Iterator<Item = (K, &SmolStr, &[ReferenceRecord<U>])> {
        self.references
            .iter()
            .map(|((k, n), refs)| (*k, n, refs.as_slice()))
    }

    /// Names referenced at least once but never defined (live or dead) —
    /// input for the undefined-reference diagnostic.
    pub fn undefined_references(&self) -> impl Iterator<Item = (K, &SmolStr)> {
        self.references
            .iter()
            .filter(|((k, n), _)| !self.definitions.contains_key(&(*k, n.clone())))
            .map(|((k, n), _)| (*k, n))
    }
}
