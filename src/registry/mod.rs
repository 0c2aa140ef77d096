//! Renamable-object registry — the identity layer.
//!
//! Every configuration object that can be renamed after creation gets a
//! stable, process-unique identifier at creation time. Cross-reference
//! fields (group member lists, policy address sets) store these identifiers
//! instead of names, so a member renamed after the reference was recorded
//! still resolves. The finalization pass converts identifiers back to
//! current names once the whole file has been walked.
//!
//! Identifiers are a monotonic counter, never recycled, even across clones
//! and deletions. Resolving an identifier that was deleted (and whose
//! holders were not purged first) is an engine bug, not a data error, and
//! surfaces as [`ResolveError`].

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

/// Opaque identity of a renamable configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjId(u64);

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Issues [`ObjId`]s. Strictly increasing, no recycling.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ObjId {
        let id = ObjId(self.next);
        self.next += 1;
        id
    }
}

/// Raised when an identifier does not resolve. Per the error taxonomy this
/// is an invariant violation — the deletion protocol failed to purge a
/// holder, or finalization ran against an unregistered id — and is fatal to
/// the file rather than a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no live object holds identifier {0}")]
pub struct ResolveError(pub ObjId);

/// Structure kinds that participate in rename-conflict checking declare
/// which naming namespace they live in. Two kinds conflict on rename only
/// when they share a namespace (e.g. address vs. address-group names
/// collide; address vs. service names do not).
pub trait Namespaced: Copy {
    type Namespace: PartialEq;

    fn namespace(self) -> Self::Namespace;

    fn shares_namespace(self, other: Self) -> bool {
        self.namespace() == other.namespace()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry<K> {
    kind: K,
    name: SmolStr,
}

/// Identifier → (kind, current name) map for one file's renamable objects.
///
/// The dialect keeps its objects in name-keyed maps; the registry is the
/// single source of truth for "what is this identifier called right now".
#[derive(Debug, Clone)]
pub struct Registry<K> {
    entries: FxHashMap<ObjId, Entry<K>>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Copy> Registry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to (kind, name). Re-registering the same id (clone-and-
    /// replace on edit-block reopen) simply refreshes the binding.
    pub fn register(&mut self, id: ObjId, kind: K, name: impl Into<SmolStr>) {
        self.entries.insert(
            id,
            Entry {
                kind,
                name: name.into(),
            },
        );
    }

    /// Current name for `id`.
    pub fn resolve_name(&self, id: ObjId) -> Result<&SmolStr, ResolveError> {
        self.entries
            .get(&id)
            .map(|e| &e.name)
            .ok_or(ResolveError(id))
    }

    /// Kind and current name for `id`, if live.
    pub fn lookup(&self, id: ObjId) -> Option<(K, &SmolStr)> {
        self.entries.get(&id).map(|e| (e.kind, &e.name))
    }

    pub fn contains(&self, id: ObjId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Point `id` at a new name. The identifier itself never changes.
    pub fn rename_id(&mut self, id: ObjId, new_name: impl Into<SmolStr>) -> Result<(), ResolveError> {
        let entry = self.entries.get_mut(&id).ok_or(ResolveError(id))?;
        entry.name = new_name.into();
        Ok(())
    }

    /// Drop `id` from the registry (object deleted). Callers must purge all
    /// holders of the identifier first, or accept that the member no longer
    /// resolves.
    pub fn remove(&mut self, id: ObjId) -> Option<(K, SmolStr)> {
        self.entries.remove(&id).map(|e| (e.kind, e.name))
    }

    /// Find the live object of a kind sharing `kind`'s namespace that is
    /// currently called `name`, if any. Used for rename-conflict checks.
    pub fn find_in_namespace(&self, kind: K, name: &str) -> Option<ObjId>
    where
        K: Namespaced,
    {
        self.entries
            .iter()
            .find(|(_, e)| e.name == name && e.kind.shares_namespace(kind))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Address,
        Addrgrp,
        Service,
    }

    impl Namespaced for Kind {
        type Namespace = u8;

        fn namespace(self) -> u8 {
            match self {
                Kind::Address | Kind::Addrgrp => 0,
                Kind::Service => 1,
            }
        }
    }

    #[test]
    fn test_allocator_is_strictly_increasing() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        let c = ids.allocate();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_resolve_follows_renames() {
        let mut ids = IdAllocator::new();
        let mut reg = Registry::new();
        let id = ids.allocate();
        reg.register(id, Kind::Address, "addr1");

        reg.rename_id(id, "addr2").unwrap();
        reg.rename_id(id, "addr3").unwrap();

        assert_eq!(reg.resolve_name(id).unwrap(), "addr3");
    }

    #[test]
    fn test_resolve_after_remove_is_an_error() {
        let mut ids = IdAllocator::new();
        let mut reg = Registry::new();
        let id = ids.allocate();
        reg.register(id, Kind::Address, "addr1");
        reg.remove(id);

        assert_eq!(reg.resolve_name(id), Err(ResolveError(id)));
    }

    #[test]
    fn test_namespace_partitions_conflict_checks() {
        let mut ids = IdAllocator::new();
        let mut reg = Registry::new();
        let grp = ids.allocate();
        reg.register(grp, Kind::Addrgrp, "shared");

        // Address shares the addrgrp namespace; service does not.
        assert_eq!(reg.find_in_namespace(Kind::Address, "shared"), Some(grp));
        assert_eq!(reg.find_in_namespace(Kind::Service, "shared"), None);
    }
}
