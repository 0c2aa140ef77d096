//! The extracted configuration model for one file.
//!
//! [`FortiosConfig`] is the root object the driver populates: name-keyed
//! maps per structure kind, the ordered policy list, the identity registry,
//! the structure ledger, and the warnings sink. It also owns the operations
//! that span several of those at once — rename, delete, and the
//! finalization pass.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::kinds::{StructureKind, UsageKind};
use super::model::{
    Address, Addrgrp, Interface, Policy, Service, ServiceGroup, Zone, valid_name,
};
use crate::base::Loc;
use crate::registry::{IdAllocator, Namespaced, ObjId, Registry, ResolveError};
use crate::rules::RuleSeq;
use crate::structure::StructureTable;
use crate::warn::Warnings;

/// In-memory model of one configuration file.
#[derive(Debug, Clone)]
pub struct FortiosConfig {
    pub(super) ids: IdAllocator,
    pub(super) registry: Registry<StructureKind>,
    pub(super) structures: StructureTable<StructureKind, UsageKind>,
    pub(super) warnings: Warnings,
    pub(super) addresses: IndexMap<SmolStr, Address>,
    pub(super) addrgrps: IndexMap<SmolStr, Addrgrp>,
    pub(super) services: IndexMap<SmolStr, Service>,
    pub(super) service_groups: IndexMap<SmolStr, ServiceGroup>,
    pub(super) interfaces: IndexMap<SmolStr, Interface>,
    pub(super) zones: IndexMap<SmolStr, Zone>,
    pub(super) policies: RuleSeq<Policy>,
}

impl Default for FortiosConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FortiosConfig {
    /// A fresh model, pre-seeded with the device's built-in `all` address.
    /// The built-in is registered for identity resolution but records no
    /// definition site — it was never defined in the file.
    pub fn new() -> Self {
        let mut config = Self {
            ids: IdAllocator::new(),
            registry: Registry::new(),
            structures: StructureTable::new(),
            warnings: Warnings::new(),
            addresses: IndexMap::new(),
            addrgrps: IndexMap::new(),
            services: IndexMap::new(),
            service_groups: IndexMap::new(),
            interfaces: IndexMap::new(),
            zones: IndexMap::new(),
            policies: RuleSeq::new(),
        };
        let id = config.ids.allocate();
        config
            .registry
            .register(id, StructureKind::Address, super::model::ALL_ADDRESSES);
        config.addresses.insert(
            SmolStr::new(super::model::ALL_ADDRESSES),
            Address::new(super::model::ALL_ADDRESSES, id),
        );
        config
    }

    pub fn addresses(&self) -> &IndexMap<SmolStr, Address> {
        &self.addresses
    }

    pub fn addrgrps(&self) -> &IndexMap<SmolStr, Addrgrp> {
        &self.addrgrps
    }

    pub fn services(&self) -> &IndexMap<SmolStr, Service> {
        &self.services
    }

    pub fn service_groups(&self) -> &IndexMap<SmolStr, ServiceGroup> {
        &self.service_groups
    }

    pub fn interfaces(&self) -> &IndexMap<SmolStr, Interface> {
        &self.interfaces
    }

    pub fn zones(&self) -> &IndexMap<SmolStr, Zone> {
        &self.zones
    }

    /// Policies in evaluation order.
    pub fn policies(&self) -> &RuleSeq<Policy> {
        &self.policies
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn structures(&self) -> &StructureTable<StructureKind, UsageKind> {
        &self.structures
    }

    pub fn registry(&self) -> &Registry<StructureKind> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Reference resolution used while the walk is in progress
    // ------------------------------------------------------------------

    /// Resolve an address-or-addrgrp member name to its identity.
    pub(super) fn resolve_address_like(&self, name: &str) -> Option<(StructureKind, ObjId)> {
        if let Some(addr) = self.addresses.get(name) {
            return Some((StructureKind::Address, addr.id()));
        }
        self.addrgrps
            .get(name)
            .map(|g| (StructureKind::Addrgrp, g.id()))
    }

    /// Resolve a service-or-service-group member name to its identity.
    pub(super) fn resolve_service_like(&self, name: &str) -> Option<(StructureKind, ObjId)> {
        if let Some(svc) = self.services.get(name) {
            return Some((StructureKind::ServiceCustom, svc.id()));
        }
        self.service_groups
            .get(name)
            .map(|g| (StructureKind::ServiceGroup, g.id()))
    }

    /// Which kind, if any, owns `name` in the interface/zone namespace.
    pub(super) fn iface_or_zone(&self, name: &str) -> Option<StructureKind> {
        if self.interfaces.contains_key(name) {
            Some(StructureKind::Interface)
        } else if self.zones.contains_key(name) {
            Some(StructureKind::Zone)
        } else {
            None
        }
    }

    /// Name of the zone containing `iface`, if it is zoned.
    pub(super) fn zone_of(&self, iface: &str) -> Option<&SmolStr> {
        self.zones
            .iter()
            .find(|(_, zone)| zone.contains_interface(iface))
            .map(|(name, _)| name)
    }

    // ------------------------------------------------------------------
    // Rename
    // ------------------------------------------------------------------

    /// `rename <old> to <new>` for a renamable kind. Never partially
    /// applies: on any failure it warns and leaves every map, the
    /// registry, and the structure table exactly as they were.
    pub(super) fn rename(
        &mut self,
        kind: StructureKind,
        old: &str,
        new: &str,
        loc: Loc,
        text: &SmolStr,
    ) {
        let (exists, max_len) = match kind {
            StructureKind::Address => (self.addresses.contains_key(old), Address::NAME_MAX_LEN),
            StructureKind::Addrgrp => (self.addrgrps.contains_key(old), Addrgrp::NAME_MAX_LEN),
            StructureKind::ServiceCustom => {
                (self.services.contains_key(old), Service::NAME_MAX_LEN)
            }
            StructureKind::ServiceGroup => (
                self.service_groups.contains_key(old),
                ServiceGroup::NAME_MAX_LEN,
            ),
            StructureKind::Interface | StructureKind::Zone | StructureKind::Policy => {
                self.warnings
                    .add(loc, text.clone(), format!("Cannot rename {kind} {old}"));
                return;
            }
        };
        if !exists {
            self.warnings.add(
                loc,
                text.clone(),
                format!("Cannot rename non-existent {kind} {old}"),
            );
            return;
        }
        if !valid_name(new, max_len) {
            self.warnings
                .add(loc, text.clone(), format!("Illegal value for {kind} name"));
            return;
        }
        if self.registry.find_in_namespace(kind, new).is_some() {
            self.warnings.add(
                loc,
                text.clone(),
                format!(
                    "Renaming {kind} {old} conflicts with existing object {new}, \
                     ignoring this rename operation"
                ),
            );
            return;
        }

        tracing::debug!(%kind, old, new, "renaming structure");
        let id = match kind {
            StructureKind::Address => match self.addresses.shift_remove(old) {
                Some(mut obj) => {
                    obj.set_name(new);
                    let id = obj.id();
                    self.addresses.insert(SmolStr::new(new), obj);
                    id
                }
                None => return,
            },
            StructureKind::Addrgrp => match self.addrgrps.shift_remove(old) {
                Some(mut obj) => {
                    obj.set_name(new);
                    let id = obj.id();
                    self.addrgrps.insert(SmolStr::new(new), obj);
                    id
                }
                None => return,
            },
            StructureKind::ServiceCustom => match self.services.shift_remove(old) {
                Some(mut obj) => {
                    obj.set_name(new);
                    let id = obj.id();
                    self.services.insert(SmolStr::new(new), obj);
                    id
                }
                None => return,
            },
            StructureKind::ServiceGroup => match self.service_groups.shift_remove(old) {
                Some(mut obj) => {
                    obj.set_name(new);
                    let id = obj.id();
                    self.service_groups.insert(SmolStr::new(new), obj);
                    id
                }
                None => return,
            },
            _ => unreachable!("non-renamable kinds returned early"),
        };
        // The identifier is untouched; only its name binding moves.
        let _ = self.registry.rename_id(id, new);
        self.structures.rename(kind, old, new, loc);
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// `delete <name>`. For identity-carrying kinds the deletion protocol
    /// removes the identifier from every holder first, so no committed
    /// object is left with a reference that cannot resolve.
    pub(super) fn delete(&mut self, kind: StructureKind, name: &str, loc: Loc, text: &SmolStr) {
        let removed_id = match kind {
            StructureKind::Address => self.addresses.shift_remove(name).map(|o| o.id()),
            StructureKind::Addrgrp => self.addrgrps.shift_remove(name).map(|o| o.id()),
            StructureKind::ServiceCustom => self.services.shift_remove(name).map(|o| o.id()),
            StructureKind::ServiceGroup => self.service_groups.shift_remove(name).map(|o| o.id()),
            StructureKind::Interface => {
                if self.interfaces.shift_remove(name).is_none() {
                    self.warn_missing_delete(kind, name, loc, text);
                    return;
                }
                self.structures.undefine(kind, name);
                return;
            }
            StructureKind::Zone => {
                if self.zones.shift_remove(name).is_none() {
                    self.warn_missing_delete(kind, name, loc, text);
                    return;
                }
                self.structures.undefine(kind, name);
                return;
            }
            StructureKind::Policy => {
                if self.policies.remove(name).is_none() {
                    self.warn_missing_delete(kind, name, loc, text);
                    return;
                }
                self.structures.undefine(kind, name);
                return;
            }
        };
        match removed_id {
            Some(id) => {
                tracing::debug!(%kind, name, %id, "deleting structure");
                self.purge_id(id);
                self.registry.remove(id);
                self.structures.undefine(kind, name);
            }
            None => self.warn_missing_delete(kind, name, loc, text),
        }
    }

    fn warn_missing_delete(&mut self, kind: StructureKind, name: &str, loc: Loc, text: &SmolStr) {
        self.warnings.add(
            loc,
            text.clone(),
            format!("Cannot delete non-existent {kind} {name}"),
        );
    }

    /// Remove `id` from every cross-reference field that may hold it.
    fn purge_id(&mut self, id: ObjId) {
        for group in self.addrgrps.values_mut() {
            group.purge_member(id);
        }
        for group in self.service_groups.values_mut() {
            group.purge_member(id);
        }
        for (_, policy) in self.policies.iter_mut() {
            policy.purge_member(id);
        }
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// The single post-walk pass that rewrites every stored identifier into
    /// the object's current name. Runs exactly once, after all renames and
    /// deletes; an unresolvable identifier here is an engine invariant
    /// violation and fails the whole file.
    pub(super) fn finalize(&mut self) -> Result<(), ResolveError> {
        let registry = &self.registry;
        for group in self.addrgrps.values_mut() {
            let members = resolve_names(registry, group.member_ids())?;
            let exclude = resolve_names(registry, group.exclude_member_ids())?;
            group.set_resolved_members(members, exclude);
        }
        for group in self.service_groups.values_mut() {
            let members = resolve_names(registry, group.member_ids())?;
            group.set_resolved_members(members);
        }
        for (_, policy) in self.policies.iter_mut() {
            let src = resolve_names(registry, policy.src_addr_ids())?;
            let dst = resolve_names(registry, policy.dst_addr_ids())?;
            let service = resolve_names(registry, policy.service_ids())?;
            policy.set_resolved_refs(src, dst, service);
        }
        Ok(())
    }
}

fn resolve_names(
    registry: &Registry<StructureKind>,
    ids: &FxHashSet<ObjId>,
) -> Result<BTreeSet<SmolStr>, ResolveError> {
    let mut names = BTreeSet::new();
    for &id in ids {
        names.insert(registry.resolve_name(id)?.clone());
    }
    Ok(names)
}
