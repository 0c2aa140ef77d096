//! Edit-block transactions.
//!
//! A device CLI edit block ("edit <name> … next") provisionally mutates a
//! working copy of one object and only publishes it if the whole block
//! passes the kind's validity predicate on exit; otherwise the block is
//! discarded with a warning and previously committed state is untouched.
//!
//! [`EditBlock`] makes that transaction an explicit value the driver holds
//! in an `Option` per object kind, instead of the ambient nullable
//! "current object" fields the pattern is usually written with — "no
//! transaction open" is a representable state, not a null-pointer risk.

use std::collections::BTreeSet;

use crate::base::Loc;

/// One open edit block for an object of type `T`.
///
/// Reopening an existing object clones it, so a discarded block can never
/// partially corrupt the committed instance. Identity fields (the object's
/// allocated id) ride along through the clone deliberately; the commit path
/// re-registers the same id.
#[derive(Debug, Clone)]
pub struct EditBlock<T> {
    working: T,
    /// Whether the block's name was syntactically valid at entry. An
    /// invalid name does not abort entry; the validity predicate consults
    /// this flag at commit time, matching the CLI's accept-then-reject
    /// behavior.
    name_ok: bool,
    /// True when the block reopened an already-committed object.
    reopened: bool,
    /// Every source line the block touched (the edit line plus each set
    /// statement), recorded as definition lines on commit.
    lines: BTreeSet<u32>,
}

impl<T: Clone> EditBlock<T> {
    /// Open a block over an existing committed object: the working copy is
    /// a clone, never the committed instance itself.
    pub fn reopen(committed: &T, name_ok: bool, loc: Loc) -> Self {
        Self {
            working: committed.clone(),
            name_ok,
            reopened: true,
            lines: BTreeSet::from([loc.line]),
        }
    }

    /// Open a block over a freshly synthesized stub.
    pub fn open(stub: T, name_ok: bool, loc: Loc) -> Self {
        Self {
            working: stub,
            name_ok,
            reopened: false,
            lines: BTreeSet::from([loc.line]),
        }
    }

    pub fn get(&self) -> &T {
        &self.working
    }

    /// Mutable access for field-set statements. Individual setters may
    /// still reject a value (with a local warning) without aborting the
    /// block.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.working
    }

    pub fn name_ok(&self) -> bool {
        self.name_ok
    }

    pub fn reopened(&self) -> bool {
        self.reopened
    }

    /// Record that a statement at `loc` touched this block.
    pub fn touch(&mut self, loc: Loc) {
        self.lines.insert(loc.line);
    }

    /// Lines the block spanned, sorted ascending.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().copied()
    }

    /// Close the block: run the kind's validity predicate over the working
    /// copy and the name-validity flag. `Ok` yields the object to publish;
    /// `Err` carries the predicate's failure reason and drops the working
    /// copy — the predicate must be pure, so a failed commit has no side
    /// effects beyond the warning the caller emits.
    pub fn commit<E>(self, validate: impl FnOnce(&T, bool) -> Result<(), E>) -> Result<T, E> {
        validate(&self.working, self.name_ok)?;
        Ok(self.working)
    }
}
