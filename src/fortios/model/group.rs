//! Address groups and service groups.
//!
//! Member lists are stored as identifier sets, never names: a member renamed
//! after the reference was recorded must still resolve. The finalization
//! pass fills the name views once all renames have been applied.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::registry::ObjId;

/// A firewall address group. May contain addresses and other address
/// groups; cycle checking happens in the driver before any member mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Addrgrp {
    name: SmolStr,
    id: ObjId,
    member_ids: FxHashSet<ObjId>,
    exclude: bool,
    exclude_member_ids: FxHashSet<ObjId>,
    comment: Option<SmolStr>,
    /// Finalized member names; empty until the finalization pass runs.
    members: BTreeSet<SmolStr>,
    exclude_members: BTreeSet<SmolStr>,
}

impl Addrgrp {
    pub const NAME_MAX_LEN: usize = 79;

    pub fn new(name: impl Into<SmolStr>, id: ObjId) -> Self {
        Self {
            name: name.into(),
            id,
            member_ids: FxHashSet::default(),
            exclude: false,
            exclude_member_ids: FxHashSet::default(),
            comment: None,
            members: BTreeSet::new(),
            exclude_members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<SmolStr>) {
        self.name = name.into();
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn member_ids(&self) -> &FxHashSet<ObjId> {
        &self.member_ids
    }

    pub fn member_ids_mut(&mut self) -> &mut FxHashSet<ObjId> {
        &mut self.member_ids
    }

    pub fn exclude(&self) -> bool {
        self.exclude
    }

    pub fn set_exclude(&mut self, exclude: bool) {
        self.exclude = exclude;
    }

    pub fn exclude_member_ids(&self) -> &FxHashSet<ObjId> {
        &self.exclude_member_ids
    }

    /// Exclude members may only be set while `exclude` is enabled.
    pub fn set_exclude_member_ids(&mut self, ids: FxHashSet<ObjId>) -> Result<(), String> {
        if !self.exclude {
            return Err("Cannot set exclude-member when exclude is not enabled".to_string());
        }
        self.exclude_member_ids = ids;
        Ok(())
    }

    pub fn comment(&self) -> Option<&SmolStr> {
        self.comment.as_ref()
    }

    pub fn set_comment(&mut self, comment: impl Into<SmolStr>) {
        self.comment = Some(comment.into());
    }

    /// Finalized member names (current as of the end of the walk).
    pub fn members(&self) -> &BTreeSet<SmolStr> {
        &self.members
    }

    pub fn exclude_members(&self) -> &BTreeSet<SmolStr> {
        &self.exclude_members
    }

    pub(crate) fn set_resolved_members(
        &mut self,
        members: BTreeSet<SmolStr>,
        exclude_members: BTreeSet<SmolStr>,
    ) {
        self.members = members;
        self.exclude_members = exclude_members;
    }

    pub(crate) fn purge_member(&mut self, id: ObjId) {
        self.member_ids.remove(&id);
        self.exclude_member_ids.remove(&id);
    }
}

/// Commit-time validity predicate for address groups. Pure.
pub fn validate_addrgrp(group: &Addrgrp, name_ok: bool) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    if group.member_ids().is_empty() {
        return Err("addrgrp requires at least one member".to_string());
    }
    Ok(())
}

/// A service group. Same identity discipline as [`Addrgrp`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceGroup {
    name: SmolStr,
    id: ObjId,
    member_ids: FxHashSet<ObjId>,
    comment: Option<SmolStr>,
    members: BTreeSet<SmolStr>,
}

impl ServiceGroup {
    pub const NAME_MAX_LEN: usize = 79;

    pub fn new(name: impl Into<SmolStr>, id: ObjId) -> Self {
        Self {
            name: name.into(),
            id,
            member_ids: FxHashSet::default(),
            comment: None,
            members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<SmolStr>) {
        self.name = name.into();
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn member_ids(&self) -> &FxHashSet<ObjId> {
        &self.member_ids
    }

    pub fn member_ids_mut(&mut self) -> &mut FxHashSet<ObjId> {
        &mut self.member_ids
    }

    pub fn comment(&self) -> Option<&SmolStr> {
        self.comment.as_ref()
    }

    pub fn set_comment(&mut self, comment: impl Into<SmolStr>) {
        self.comment = Some(comment.into());
    }

    pub fn members(&self) -> &BTreeSet<SmolStr> {
        &self.members
    }

    pub(crate) fn set_resolved_members(&mut self, members: BTreeSet<SmolStr>) {
        self.members = members;
    }

    pub(crate) fn purge_member(&mut self, id: ObjId) {
        self.member_ids.remove(&id);
    }
}

/// Commit-time validity predicate for service groups. Pure.
pub fn validate_service_group(group: &ServiceGroup, name_ok: bool) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    if group.member_ids().is_empty() {
        return Err("service group requires at least one member".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdAllocator;

    #[test]
    fn test_exclude_member_requires_exclude_enabled() {
        let mut ids = IdAllocator::new();
        let mut g = Addrgrp::new("g1", ids.allocate());
        let member = ids.allocate();

        let err = g
            .set_exclude_member_ids([member].into_iter().collect())
            .unwrap_err();
        assert_eq!(err, "Cannot set exclude-member when exclude is not enabled");
        assert!(g.exclude_member_ids().is_empty());

        g.set_exclude(true);
        assert!(
            g.set_exclude_member_ids([member].into_iter().collect())
                .is_ok()
        );
        assert_eq!(g.exclude_member_ids().len(), 1);
    }

    #[test]
    fn test_validate_requires_members() {
        let mut ids = IdAllocator::new();
        let mut g = Addrgrp::new("g1", ids.allocate());
        assert_eq!(
            validate_addrgrp(&g, true).unwrap_err(),
            "addrgrp requires at least one member"
        );

        g.member_ids_mut().insert(ids.allocate());
        assert!(validate_addrgrp(&g, true).is_ok());
    }
}
