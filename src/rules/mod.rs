//! Ordered, name-keyed rule collections.
//!
//! First-match rule sets (firewall policies, ACL rules) are order-sensitive:
//! iteration order is the authoritative evaluation order. The collection
//! supports the CLI's relative reordering commands — "move X before Y",
//! "move X after Y" — which refuse to act when either side does not exist,
//! leaving the order untouched so the caller can warn.

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;

/// Reordering failed because one side of the move does not exist. The
/// caller warns and no-ops; this is never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("cannot move non-existent rule {0}")]
    MissingSubject(SmolStr),
    #[error("cannot move around non-existent rule {0}")]
    MissingPivot(SmolStr),
}

/// Insertion-ordered map of rules keyed by name (or number rendered as a
/// name). Re-inserting an existing key replaces the value in place, keeping
/// its position — committing a reopened edit block must not reorder the set.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RuleSeq<V> {
    rules: IndexMap<SmolStr, V>,
}

impl<V> Default for RuleSeq<V> {
    fn default() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }
}

impl<V> RuleSeq<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule. New names append at the end; existing names are
    /// replaced in place.
    pub fn insert(&mut self, name: impl Into<SmolStr>, value: V) -> Option<V> {
        self.rules.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.rules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.rules.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Remove a rule, preserving the relative order of the remainder.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.rules.shift_remove(name)
    }

    /// Relocate `name` immediately before `pivot`.
    pub fn move_before(&mut self, name: &str, pivot: &str) -> Result<(), MoveError> {
        let (from, to) = self.move_indices(name, pivot)?;
        let to = if from < to { to - 1 } else { to };
        self.rules.move_index(from, to);
        Ok(())
    }

    /// Relocate `name` immediately after `pivot`.
    pub fn move_after(&mut self, name: &str, pivot: &str) -> Result<(), MoveError> {
        let (from, to) = self.move_indices(name, pivot)?;
        let to = if from < to { to } else { to + 1 };
        self.rules.move_index(from, to);
        Ok(())
    }

    fn move_indices(&self, name: &str, pivot: &str) -> Result<(usize, usize), MoveError> {
        let from = self
            .rules
            .get_index_of(name)
            .ok_or_else(|| MoveError::MissingSubject(SmolStr::new(name)))?;
        let to = self
            .rules
            .get_index_of(pivot)
            .ok_or_else(|| MoveError::MissingPivot(SmolStr::new(pivot)))?;
        Ok((from, to))
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &V)> {
        self.rules.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SmolStr, &mut V)> {
        self.rules.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.rules.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
