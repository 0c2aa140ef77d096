//! The extraction driver: walks the statement stream in source order and
//! populates a [`FortiosConfig`].
//!
//! For every statement the driver runs checks in a fixed order — structural
//! validity and existence first (warn + no-op on failure), then the state
//! mutation, then structure-table bookkeeping. Edit blocks are explicit
//! [`EditBlock`] values held per object kind; "no block open" is an `Option`
//! state, not a null field. After the walk, [`FortiosConfig::finalize`]
//! rewrites every stored identifier into its current name exactly once.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use thiserror::Error;

use super::config::FortiosConfig;
use super::kinds::{StructureKind, UsageKind};
use super::model::{
    ALL_ADDRESSES, ANY_INTERFACE, Address, Addrgrp, Interface, Policy, Service, ServiceGroup,
    Zone, policy_number_ok, valid_name, validate_address, validate_addrgrp, validate_interface,
    validate_policy, validate_service, validate_service_group, validate_zone,
};
use super::statements::{ConfigSection, MoveDir, SetField, Statement, StmtKind};
use crate::base::Loc;
use crate::groups::would_create_cycle;
use crate::registry::{ObjId, ResolveError};
use crate::rules::MoveError;
use crate::txn::EditBlock;

/// Fatal-to-the-file failures. Everything recoverable is a warning on the
/// config instead; only a broken engine invariant lands here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("finalization failed: {0}")]
    Finalize(#[from] ResolveError),
}

/// Extract one file's model from its statement stream.
pub fn extract(statements: &[Statement]) -> Result<FortiosConfig, ExtractError> {
    let mut extractor = Extractor::new();
    for stmt in statements {
        extractor.apply(stmt);
    }
    extractor.finish()
}

/// An open edit block plus the statement that opened it, kept for warning
/// attribution when the block is discarded.
#[derive(Debug)]
struct Open<T> {
    block: EditBlock<T>,
    loc: Loc,
    text: SmolStr,
}

/// Statement-by-statement extraction state for one file.
#[derive(Debug, Default)]
pub struct Extractor {
    config: FortiosConfig,
    section: Option<ConfigSection>,
    address_block: Option<Open<Address>>,
    addrgrp_block: Option<Open<Addrgrp>>,
    service_block: Option<Open<Service>>,
    service_group_block: Option<Open<ServiceGroup>>,
    interface_block: Option<Open<Interface>>,
    zone_block: Option<Open<Zone>>,
    policy_block: Option<Open<Policy>>,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            config: FortiosConfig::new(),
            section: None,
            address_block: None,
            addrgrp_block: None,
            service_block: None,
            service_group_block: None,
            interface_block: None,
            zone_block: None,
            policy_block: None,
        }
    }

    /// Apply one statement. Never fails; recoverable problems become
    /// warnings on the config.
    pub fn apply(&mut self, stmt: &Statement) {
        tracing::trace!(line = stmt.loc.line, kind = ?stmt.kind, "statement");
        match &stmt.kind {
            StmtKind::Config(section) => self.enter_section(*section, stmt),
            StmtKind::Edit(name) => self.enter_edit(name, stmt),
            StmtKind::Next => self.close_block(stmt),
            StmtKind::End => self.end_section(stmt),
            StmtKind::Set(field) => self.apply_set(field, stmt),
            StmtKind::AppendMembers(names) => self.apply_append(names, stmt),
            StmtKind::Rename { old, new } => self.apply_rename(old, new, stmt),
            StmtKind::Move { subject, dir, pivot } => self.apply_move(subject, *dir, pivot, stmt),
            StmtKind::CloneTo { src, dst } => self.apply_clone(src, dst, stmt),
            StmtKind::Delete(name) => self.apply_delete(name, stmt),
            StmtKind::Unrecognized => self.config.warnings.unrecognized(stmt.loc, stmt.text.clone()),
        }
    }

    /// Finish the walk: discard anything left open, then run finalization.
    pub fn finish(mut self) -> Result<FortiosConfig, ExtractError> {
        let open_locs: Vec<(Loc, SmolStr)> = [
            self.address_block.take().map(|o| (o.loc, o.text)),
            self.addrgrp_block.take().map(|o| (o.loc, o.text)),
            self.service_block.take().map(|o| (o.loc, o.text)),
            self.service_group_block.take().map(|o| (o.loc, o.text)),
            self.interface_block.take().map(|o| (o.loc, o.text)),
            self.zone_block.take().map(|o| (o.loc, o.text)),
            self.policy_block.take().map(|o| (o.loc, o.text)),
        ]
        .into_iter()
        .flatten()
        .collect();
        for (loc, text) in open_locs {
            self.config
                .warnings
                .add(loc, text, "Edit block was never closed and is ignored");
        }
        self.config.finalize()?;
        Ok(self.config)
    }

    // ------------------------------------------------------------------
    // Section and block lifecycle
    // ------------------------------------------------------------------

    fn enter_section(&mut self, section: ConfigSection, stmt: &Statement) {
        if let Some(current) = self.section {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                format!("Config blocks cannot nest; already inside config {current}"),
            );
            return;
        }
        self.section = Some(section);
    }

    fn enter_edit(&mut self, name: &SmolStr, stmt: &Statement) {
        let Some(section) = self.section else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "edit statement outside of a config block",
            );
            return;
        };
        // A dangling block for this section means the stream lost a `next`;
        // close it the way the CLI would before opening the new one.
        self.commit_open_block(section);

        match section {
            ConfigSection::FirewallAddress => {
                let name_ok = valid_name(name, Address::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for address name",
                    );
                }
                let block = match self.config.addresses.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => {
                        let id = self.config.ids.allocate();
                        EditBlock::open(Address::new(name.clone(), id), name_ok, stmt.loc)
                    }
                };
                self.address_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::FirewallAddrgrp => {
                let name_ok = valid_name(name, Addrgrp::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for addrgrp name",
                    );
                }
                let block = match self.config.addrgrps.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => {
                        let id = self.config.ids.allocate();
                        EditBlock::open(Addrgrp::new(name.clone(), id), name_ok, stmt.loc)
                    }
                };
                self.addrgrp_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::FirewallServiceCustom => {
                let name_ok = valid_name(name, Service::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for service name",
                    );
                }
                let block = match self.config.services.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => {
                        let id = self.config.ids.allocate();
                        EditBlock::open(Service::new(name.clone(), id), name_ok, stmt.loc)
                    }
                };
                self.service_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::FirewallServiceGroup => {
                let name_ok = valid_name(name, ServiceGroup::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for service group name",
                    );
                }
                let block = match self.config.service_groups.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => {
                        let id = self.config.ids.allocate();
                        EditBlock::open(ServiceGroup::new(name.clone(), id), name_ok, stmt.loc)
                    }
                };
                self.service_group_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::SystemInterface => {
                let name_ok = valid_name(name, Interface::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for interface name",
                    );
                }
                let block = match self.config.interfaces.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => EditBlock::open(Interface::new(name.clone()), name_ok, stmt.loc),
                };
                self.interface_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::SystemZone => {
                let name_ok = valid_name(name, Zone::NAME_MAX_LEN);
                if !name_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for zone name",
                    );
                }
                let block = match self.config.zones.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, name_ok, stmt.loc),
                    None => EditBlock::open(Zone::new(name.clone()), name_ok, stmt.loc),
                };
                self.zone_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
            ConfigSection::FirewallPolicy => {
                let number_ok = policy_number_ok(name);
                if !number_ok {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "Illegal value for policy number",
                    );
                }
                let block = match self.config.policies.get(name.as_str()) {
                    Some(existing) => EditBlock::reopen(existing, number_ok, stmt.loc),
                    None => EditBlock::open(Policy::new(name.clone()), number_ok, stmt.loc),
                };
                self.policy_block = Some(Open {
                    block,
                    loc: stmt.loc,
                    text: stmt.text.clone(),
                });
            }
        }
    }

    fn close_block(&mut self, stmt: &Statement) {
        let Some(section) = self.section else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "next statement outside of a config block",
            );
            return;
        };
        if !self.has_open_block(section) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "next statement outside of an edit block",
            );
            return;
        }
        self.commit_open_block(section);
    }

    fn end_section(&mut self, stmt: &Statement) {
        match self.section.take() {
            // `end` also closes a still-open edit block, as the CLI does.
            Some(section) => self.commit_open_block(section),
            None => self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "end statement outside of a config block",
            ),
        }
    }

    fn has_open_block(&self, section: ConfigSection) -> bool {
        match section {
            ConfigSection::FirewallAddress => self.address_block.is_some(),
            ConfigSection::FirewallAddrgrp => self.addrgrp_block.is_some(),
            ConfigSection::FirewallServiceCustom => self.service_block.is_some(),
            ConfigSection::FirewallServiceGroup => self.service_group_block.is_some(),
            ConfigSection::SystemInterface => self.interface_block.is_some(),
            ConfigSection::SystemZone => self.zone_block.is_some(),
            ConfigSection::FirewallPolicy => self.policy_block.is_some(),
        }
    }

    fn commit_open_block(&mut self, section: ConfigSection) {
        match section {
            ConfigSection::FirewallAddress => self.commit_address(),
            ConfigSection::FirewallAddrgrp => self.commit_addrgrp(),
            ConfigSection::FirewallServiceCustom => self.commit_service(),
            ConfigSection::FirewallServiceGroup => self.commit_service_group(),
            ConfigSection::SystemInterface => self.commit_interface(),
            ConfigSection::SystemZone => self.commit_zone(),
            ConfigSection::FirewallPolicy => self.commit_policy(),
        }
    }

    // ------------------------------------------------------------------
    // Commit paths, one per kind
    // ------------------------------------------------------------------

    fn commit_address(&mut self) {
        let Some(Open { block, loc, text }) = self.address_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let id = block.get().id();
        let lines: Vec<u32> = block.lines().collect();
        match block.commit(validate_address) {
            Ok(address) => {
                tracing::debug!(%name, "committed address");
                self.config
                    .registry
                    .register(id, StructureKind::Address, name.clone());
                self.config.addresses.insert(name.clone(), address);
                self.record_definition(StructureKind::Address, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Address edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_addrgrp(&mut self) {
        let Some(Open { block, loc, text }) = self.addrgrp_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let id = block.get().id();
        let lines: Vec<u32> = block.lines().collect();
        match block.commit(validate_addrgrp) {
            Ok(group) => {
                tracing::debug!(%name, "committed addrgrp");
                self.config
                    .registry
                    .register(id, StructureKind::Addrgrp, name.clone());
                self.config.addrgrps.insert(name.clone(), group);
                self.record_definition(StructureKind::Addrgrp, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Addrgrp edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_service(&mut self) {
        let Some(Open { block, loc, text }) = self.service_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let id = block.get().id();
        let lines: Vec<u32> = block.lines().collect();
        match block.commit(validate_service) {
            Ok(service) => {
                tracing::debug!(%name, "committed service");
                self.config
                    .registry
                    .register(id, StructureKind::ServiceCustom, name.clone());
                self.config.services.insert(name.clone(), service);
                self.record_definition(StructureKind::ServiceCustom, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Service edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_service_group(&mut self) {
        let Some(Open { block, loc, text }) = self.service_group_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let id = block.get().id();
        let lines: Vec<u32> = block.lines().collect();
        match block.commit(validate_service_group) {
            Ok(group) => {
                tracing::debug!(%name, "committed service group");
                self.config
                    .registry
                    .register(id, StructureKind::ServiceGroup, name.clone());
                self.config.service_groups.insert(name.clone(), group);
                self.record_definition(StructureKind::ServiceGroup, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Service group edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_interface(&mut self) {
        let Some(Open { block, loc, text }) = self.interface_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let lines: Vec<u32> = block.lines().collect();
        let zone_conflict = self.config.zones.contains_key(name.as_str());
        match block.commit(move |iface, name_ok| validate_interface(iface, name_ok, zone_conflict))
        {
            Ok(iface) => {
                tracing::debug!(%name, "committed interface");
                self.config.interfaces.insert(name.clone(), iface);
                self.record_definition(StructureKind::Interface, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Interface edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_zone(&mut self) {
        let Some(Open { block, loc, text }) = self.zone_block.take() else {
            return;
        };
        let name = block.get().name().clone();
        let lines: Vec<u32> = block.lines().collect();
        let iface_conflict = self.config.interfaces.contains_key(name.as_str());
        match block.commit(move |zone, name_ok| validate_zone(zone, name_ok, iface_conflict)) {
            Ok(zone) => {
                tracing::debug!(%name, "committed zone");
                self.config.zones.insert(name.clone(), zone);
                self.record_definition(StructureKind::Zone, &name, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Zone edit block ignored: {reason}"),
            ),
        }
    }

    fn commit_policy(&mut self) {
        let Some(Open { block, loc, text }) = self.policy_block.take() else {
            return;
        };
        let number = block.get().number().clone();
        let lines: Vec<u32> = block.lines().collect();
        match block.commit(validate_policy) {
            Ok(policy) => {
                tracing::debug!(%number, "committed policy");
                self.config.policies.insert(number.clone(), policy);
                self.record_definition(StructureKind::Policy, &number, &lines, loc);
            }
            Err(reason) => self.config.warnings.add(
                loc,
                text,
                format!("Policy edit block ignored: {reason}"),
            ),
        }
    }

    fn record_definition(&mut self, kind: StructureKind, name: &SmolStr, lines: &[u32], loc: Loc) {
        for &line in lines {
            self.config
                .structures
                .define(kind, name.clone(), Loc::new(line));
        }
        self.config
            .structures
            .reference(kind, name.clone(), UsageKind::SelfRef, loc);
    }

    // ------------------------------------------------------------------
    // Field setters
    // ------------------------------------------------------------------

    fn apply_set(&mut self, field: &SetField, stmt: &Statement) {
        let Some(section) = self.section else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "set statement outside of a config block",
            );
            return;
        };
        if !self.has_open_block(section) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "set statement outside of an edit block",
            );
            return;
        }
        match section {
            ConfigSection::FirewallAddress => self.set_address_field(field, stmt),
            ConfigSection::FirewallAddrgrp => self.set_addrgrp_field(field, stmt),
            ConfigSection::FirewallServiceCustom => self.set_service_field(field, stmt),
            ConfigSection::FirewallServiceGroup => self.set_service_group_field(field, stmt),
            ConfigSection::SystemInterface => self.set_interface_field(field, stmt),
            ConfigSection::SystemZone => self.set_zone_field(field, stmt),
            ConfigSection::FirewallPolicy => self.set_policy_field(field, stmt),
        }
    }

    fn set_address_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.address_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::AddrType(addr_type) => {
                open.block.get_mut().set_type(*addr_type);
                Ok(())
            }
            SetField::Subnet { ip, mask } => open.block.get_mut().set_subnet(*ip, *mask),
            SetField::StartIp(ip) => open.block.get_mut().set_start_ip(*ip),
            SetField::EndIp(ip) => open.block.get_mut().set_end_ip(*ip),
            SetField::Wildcard { ip, mask } => open.block.get_mut().set_wildcard(*ip, *mask),
            SetField::Comment(comment) => {
                open.block.get_mut().set_comment(comment.clone());
                Ok(())
            }
            SetField::AssociatedInterface(name) => {
                match iface_ref_kind(&self.config, name) {
                    Ok(kind) => {
                        self.config.structures.reference(
                            kind,
                            name.clone(),
                            UsageKind::AddressAssociatedInterface,
                            stmt.loc,
                        );
                        open.block.get_mut().set_associated_interface(name.clone());
                        Ok(())
                    }
                    Err(reason) => Err(reason),
                }
            }
            _ => Err("Cannot set this field for an address".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_addrgrp_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.addrgrp_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::Members(names) => {
                match resolve_address_members(&self.config, names) {
                    Ok((ids, refs)) => {
                        let group_id = open.block.get().id();
                        let group_name = open.block.get().name().clone();
                        match check_addrgrp_cycle(&self.config, group_id, &group_name, &ids) {
                            Ok(()) => {
                                record_refs(&mut self.config, &refs, UsageKind::AddrgrpMember, stmt.loc);
                                *open.block.get_mut().member_ids_mut() = ids;
                                Ok(())
                            }
                            Err(reason) => Err(reason),
                        }
                    }
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::Address,
                            undefined.name,
                            UsageKind::AddrgrpMember,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                }
            }
            SetField::Exclude(exclude) => {
                open.block.get_mut().set_exclude(*exclude);
                Ok(())
            }
            SetField::ExcludeMembers(names) => {
                match resolve_address_members(&self.config, names) {
                    Ok((ids, refs)) => match open.block.get_mut().set_exclude_member_ids(ids) {
                        Ok(()) => {
                            record_refs(
                                &mut self.config,
                                &refs,
                                UsageKind::AddrgrpExcludeMember,
                                stmt.loc,
                            );
                            Ok(())
                        }
                        Err(reason) => Err(reason),
                    },
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::Address,
                            undefined.name,
                            UsageKind::AddrgrpExcludeMember,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                }
            }
            SetField::Comment(comment) => {
                open.block.get_mut().set_comment(comment.clone());
                Ok(())
            }
            _ => Err("Cannot set this field for an addrgrp".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_service_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.service_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::Protocol(protocol) => {
                open.block.get_mut().set_protocol(*protocol);
                Ok(())
            }
            SetField::TcpPortRange(ranges) => {
                open.block.get_mut().set_tcp_port_ranges(ranges.clone())
            }
            SetField::UdpPortRange(ranges) => {
                open.block.get_mut().set_udp_port_ranges(ranges.clone())
            }
            SetField::IcmpType(icmp_type) => open.block.get_mut().set_icmp_type(*icmp_type),
            SetField::IcmpCode(icmp_code) => open.block.get_mut().set_icmp_code(*icmp_code),
            SetField::Comment(comment) => {
                open.block.get_mut().set_comment(comment.clone());
                Ok(())
            }
            _ => Err("Cannot set this field for a service".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_service_group_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.service_group_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::Members(names) => {
                match resolve_service_members(&self.config, names) {
                    Ok((ids, refs)) => {
                        let group_id = open.block.get().id();
                        let group_name = open.block.get().name().clone();
                        match check_service_group_cycle(&self.config, group_id, &group_name, &ids) {
                            Ok(()) => {
                                record_refs(
                                    &mut self.config,
                                    &refs,
                                    UsageKind::ServiceGroupMember,
                                    stmt.loc,
                                );
                                *open.block.get_mut().member_ids_mut() = ids;
                                Ok(())
                            }
                            Err(reason) => Err(reason),
                        }
                    }
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::ServiceCustom,
                            undefined.name,
                            UsageKind::ServiceGroupMember,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                }
            }
            SetField::Comment(comment) => {
                open.block.get_mut().set_comment(comment.clone());
                Ok(())
            }
            _ => Err("Cannot set this field for a service group".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_interface_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.interface_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::Vdom(vdom) => {
                open.block.get_mut().set_vdom(vdom.clone());
                Ok(())
            }
            SetField::IfaceType(iface_type) => open.block.get_mut().set_type(*iface_type),
            SetField::Vlanid(vlanid) => {
                if (Interface::VLANID_MIN..=Interface::VLANID_MAX).contains(vlanid) {
                    open.block.get_mut().set_vlanid(*vlanid as u16);
                    Ok(())
                } else {
                    Err(format!(
                        "Expected vlanid in range {}-{}, but got '{vlanid}'",
                        Interface::VLANID_MIN,
                        Interface::VLANID_MAX
                    ))
                }
            }
            SetField::ParentInterface(parent) => {
                if self.config.interfaces.contains_key(parent.as_str()) {
                    self.config.structures.reference(
                        StructureKind::Interface,
                        parent.clone(),
                        UsageKind::VlanParentInterface,
                        stmt.loc,
                    );
                    open.block.get_mut().set_parent(parent.clone());
                    Ok(())
                } else {
                    Err(format!("No interface named {parent}"))
                }
            }
            SetField::StatusUp(up) => {
                open.block.get_mut().set_status_up(*up);
                Ok(())
            }
            _ => Err("Cannot set this field for an interface".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_zone_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.zone_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let result = match field {
            SetField::ZoneInterfaces(names) => {
                let zone_name = open.block.get().name().clone();
                let mut resolved = BTreeSet::new();
                let mut failure = None;
                for name in names {
                    if !self.config.interfaces.contains_key(name.as_str()) {
                        failure = Some(format!("Interface {name} is undefined"));
                        break;
                    }
                    if let Some(other) = self.config.zone_of(name) {
                        if *other != zone_name {
                            failure =
                                Some(format!("Interface {name} is already in zone {other}"));
                            break;
                        }
                    }
                    resolved.insert(name.clone());
                }
                match failure {
                    Some(reason) => Err(reason),
                    None => {
                        for name in &resolved {
                            self.config.structures.reference(
                                StructureKind::Interface,
                                name.clone(),
                                UsageKind::ZoneInterface,
                                stmt.loc,
                            );
                        }
                        open.block.get_mut().set_interfaces(resolved);
                        Ok(())
                    }
                }
            }
            SetField::Intrazone(action) => {
                open.block.get_mut().set_intrazone(*action);
                Ok(())
            }
            _ => Err("Cannot set this field for a zone".to_string()),
        };
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn set_policy_field(&mut self, field: &SetField, stmt: &Statement) {
        let Some(open) = self.policy_block.as_mut() else {
            return;
        };
        open.block.touch(stmt.loc);
        let mut pre_warnings: Vec<String> = Vec::new();
        let result = match field {
            SetField::Action(action) => {
                open.block.get_mut().set_action(*action);
                Ok(())
            }
            SetField::PolicyName(name) => {
                open.block.get_mut().set_name(name.clone());
                Ok(())
            }
            SetField::StatusUp(up) => {
                open.block.get_mut().set_status_up(*up);
                Ok(())
            }
            SetField::Comment(comments) => {
                open.block.get_mut().set_comments(comments.clone());
                Ok(())
            }
            SetField::SrcAddr(names) | SetField::DstAddr(names) => {
                let is_src = matches!(field, SetField::SrcAddr(_));
                let names = strip_special(
                    names,
                    ALL_ADDRESSES,
                    "When 'all' is set together with other address(es), it is removed",
                    &mut pre_warnings,
                );
                let usage = if is_src {
                    UsageKind::PolicySrcAddr
                } else {
                    UsageKind::PolicyDstAddr
                };
                match resolve_address_members(&self.config, &names) {
                    Ok((ids, refs)) => {
                        record_refs(&mut self.config, &refs, usage, stmt.loc);
                        if is_src {
                            open.block.get_mut().set_src_addr_ids(ids);
                        } else {
                            open.block.get_mut().set_dst_addr_ids(ids);
                        }
                        Ok(())
                    }
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::Address,
                            undefined.name,
                            usage,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                }
            }
            SetField::Service(names) => match resolve_service_members(&self.config, names) {
                Ok((ids, refs)) => {
                    record_refs(&mut self.config, &refs, UsageKind::PolicyService, stmt.loc);
                    open.block.get_mut().set_service_ids(ids);
                    Ok(())
                }
                Err(undefined) => {
                    self.config.structures.reference(
                        StructureKind::ServiceCustom,
                        undefined.name,
                        UsageKind::PolicyService,
                        stmt.loc,
                    );
                    Err(undefined.reason)
                }
            },
            SetField::SrcIntf(names) | SetField::DstIntf(names) => {
                let is_src = matches!(field, SetField::SrcIntf(_));
                let names = strip_special(
                    names,
                    ANY_INTERFACE,
                    "When 'any' is set together with other interfaces, it is removed",
                    &mut pre_warnings,
                );
                match resolve_intf_members(&self.config, &names) {
                    Ok((set, refs)) => {
                        let usage = if is_src {
                            UsageKind::PolicySrcIntf
                        } else {
                            UsageKind::PolicyDstIntf
                        };
                        record_refs(&mut self.config, &refs, usage, stmt.loc);
                        if is_src {
                            open.block.get_mut().set_src_intf(set);
                        } else {
                            open.block.get_mut().set_dst_intf(set);
                        }
                        Ok(())
                    }
                    Err(reason) => Err(reason),
                }
            }
            _ => Err("Cannot set this field for a policy".to_string()),
        };
        for reason in pre_warnings {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
        if let Err(reason) = result {
            self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
        }
    }

    fn apply_append(&mut self, names: &[SmolStr], stmt: &Statement) {
        match self.section {
            Some(ConfigSection::FirewallAddrgrp) => {
                let Some(open) = self.addrgrp_block.as_mut() else {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "append statement outside of an edit block",
                    );
                    return;
                };
                open.block.touch(stmt.loc);
                let result = match resolve_address_members(&self.config, names) {
                    Ok((ids, refs)) => {
                        let group_id = open.block.get().id();
                        let group_name = open.block.get().name().clone();
                        let mut proposed = open.block.get().member_ids().clone();
                        proposed.extend(ids.iter().copied());
                        match check_addrgrp_cycle(&self.config, group_id, &group_name, &proposed)
                        {
                            Ok(()) => {
                                record_refs(
                                    &mut self.config,
                                    &refs,
                                    UsageKind::AddrgrpMember,
                                    stmt.loc,
                                );
                                *open.block.get_mut().member_ids_mut() = proposed;
                                Ok(())
                            }
                            Err(reason) => Err(reason),
                        }
                    }
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::Address,
                            undefined.name,
                            UsageKind::AddrgrpMember,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                };
                if let Err(reason) = result {
                    self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
                }
            }
            Some(ConfigSection::FirewallServiceGroup) => {
                let Some(open) = self.service_group_block.as_mut() else {
                    self.config.warnings.add(
                        stmt.loc,
                        stmt.text.clone(),
                        "append statement outside of an edit block",
                    );
                    return;
                };
                open.block.touch(stmt.loc);
                let result = match resolve_service_members(&self.config, names) {
                    Ok((ids, refs)) => {
                        let group_id = open.block.get().id();
                        let group_name = open.block.get().name().clone();
                        let mut proposed = open.block.get().member_ids().clone();
                        proposed.extend(ids.iter().copied());
                        match check_service_group_cycle(
                            &self.config,
                            group_id,
                            &group_name,
                            &proposed,
                        ) {
                            Ok(()) => {
                                record_refs(
                                    &mut self.config,
                                    &refs,
                                    UsageKind::ServiceGroupMember,
                                    stmt.loc,
                                );
                                *open.block.get_mut().member_ids_mut() = proposed;
                                Ok(())
                            }
                            Err(reason) => Err(reason),
                        }
                    }
                    Err(undefined) => {
                        self.config.structures.reference(
                            StructureKind::ServiceCustom,
                            undefined.name,
                            UsageKind::ServiceGroupMember,
                            stmt.loc,
                        );
                        Err(undefined.reason)
                    }
                };
                if let Err(reason) = result {
                    self.config.warnings.add(stmt.loc, stmt.text.clone(), reason);
                }
            }
            _ => self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "append is only valid for group members",
            ),
        }
    }

    // ------------------------------------------------------------------
    // Rename / move / clone / delete
    // ------------------------------------------------------------------

    fn apply_rename(&mut self, old: &SmolStr, new: &SmolStr, stmt: &Statement) {
        let Some(section) = self.section else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "rename statement outside of a config block",
            );
            return;
        };
        let kind = section_kind(section);
        self.config.rename(kind, old, new, stmt.loc, &stmt.text);
    }

    fn apply_move(&mut self, subject: &SmolStr, dir: MoveDir, pivot: &SmolStr, stmt: &Statement) {
        if self.section != Some(ConfigSection::FirewallPolicy) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "move is only valid for policies",
            );
            return;
        }
        let result = match dir {
            MoveDir::Before => self.config.policies.move_before(subject, pivot),
            MoveDir::After => self.config.policies.move_after(subject, pivot),
        };
        match result {
            Ok(()) => {}
            Err(MoveError::MissingSubject(name)) => self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                format!("Cannot move a non-existent policy {name}"),
            ),
            Err(MoveError::MissingPivot(name)) => self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                format!("Cannot move around a non-existent policy {name}"),
            ),
        }
    }

    fn apply_clone(&mut self, src: &SmolStr, dst: &SmolStr, stmt: &Statement) {
        if self.section != Some(ConfigSection::FirewallPolicy) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "clone is only valid for policies",
            );
            return;
        }
        let Some(source) = self.config.policies.get(src) else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                format!("Cannot clone a non-existent policy {src}"),
            );
            return;
        };
        if !policy_number_ok(dst) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "Cannot create a cloned policy with an invalid name",
            );
            return;
        }
        if self.config.policies.contains(dst) {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                format!("Cannot clone, policy {dst} already exists"),
            );
            return;
        }
        let clone = source.clone_with_number(dst.clone());
        self.config.policies.insert(dst.clone(), clone);
        self.config
            .structures
            .define(StructureKind::Policy, dst.clone(), stmt.loc);
        self.config
            .structures
            .reference(StructureKind::Policy, dst.clone(), UsageKind::SelfRef, stmt.loc);
    }

    fn apply_delete(&mut self, name: &SmolStr, stmt: &Statement) {
        let Some(section) = self.section else {
            self.config.warnings.add(
                stmt.loc,
                stmt.text.clone(),
                "delete statement outside of a config block",
            );
            return;
        };
        let kind = section_kind(section);
        self.config.delete(kind, name, stmt.loc, &stmt.text);
    }
}

// ----------------------------------------------------------------------
// Free helpers (pure over the config, so field borrows stay disjoint)
// ----------------------------------------------------------------------

fn section_kind(section: ConfigSection) -> StructureKind {
    match section {
        ConfigSection::FirewallAddress => StructureKind::Address,
        ConfigSection::FirewallAddrgrp => StructureKind::Addrgrp,
        ConfigSection::FirewallServiceCustom => StructureKind::ServiceCustom,
        ConfigSection::FirewallServiceGroup => StructureKind::ServiceGroup,
        ConfigSection::FirewallPolicy => StructureKind::Policy,
        ConfigSection::SystemInterface => StructureKind::Interface,
        ConfigSection::SystemZone => StructureKind::Zone,
    }
}

/// Drop `special` from a member list when it appears alongside concrete
/// names, queueing the CLI's removal warning.
fn strip_special(
    names: &[SmolStr],
    special: &str,
    warning: &str,
    pre_warnings: &mut Vec<String>,
) -> Vec<SmolStr> {
    if names.len() > 1 && names.iter().any(|n| n == special) {
        pre_warnings.push(warning.to_string());
        names.iter().filter(|n| *n != special).cloned().collect()
    } else {
        names.to_vec()
    }
}

type ResolvedIds = (FxHashSet<ObjId>, Vec<(StructureKind, SmolStr)>);

/// A member name that did not resolve. The whole statement becomes a no-op,
/// but the attempted reference is still recorded so it surfaces downstream
/// as an undefined reference.
struct UndefinedMember {
    name: SmolStr,
    reason: String,
}

/// Resolve address-or-addrgrp member names to identities. Fails atomically:
/// one undefined name drops the whole statement.
fn resolve_address_members(
    config: &FortiosConfig,
    names: &[SmolStr],
) -> Result<ResolvedIds, UndefinedMember> {
    let mut ids = FxHashSet::default();
    let mut refs = Vec::new();
    for name in names {
        match config.resolve_address_like(name) {
            Some((kind, id)) => {
                ids.insert(id);
                refs.push((kind, name.clone()));
            }
            None => {
                return Err(UndefinedMember {
                    name: name.clone(),
                    reason: format!("Address {name} is undefined and cannot be referenced"),
                });
            }
        }
    }
    Ok((ids, refs))
}

/// Resolve service-or-service-group member names to identities.
fn resolve_service_members(
    config: &FortiosConfig,
    names: &[SmolStr],
) -> Result<ResolvedIds, UndefinedMember> {
    let mut ids = FxHashSet::default();
    let mut refs = Vec::new();
    for name in names {
        match config.resolve_service_like(name) {
            Some((kind, id)) => {
                ids.insert(id);
                refs.push((kind, name.clone()));
            }
            None => {
                return Err(UndefinedMember {
                    name: name.clone(),
                    reason: format!("Service {name} is undefined and cannot be referenced"),
                });
            }
        }
    }
    Ok((ids, refs))
}

type ResolvedIntfs = (BTreeSet<SmolStr>, Vec<(StructureKind, SmolStr)>);

/// Resolve policy interface members: each must be `any`, a zone, or an
/// unzoned interface.
fn resolve_intf_members(config: &FortiosConfig, names: &[SmolStr]) -> Result<ResolvedIntfs, String> {
    let mut set = BTreeSet::new();
    let mut refs = Vec::new();
    for name in names {
        if name == ANY_INTERFACE {
            set.insert(name.clone());
            continue;
        }
        let kind = iface_ref_kind(config, name)?;
        refs.push((kind, name.clone()));
        set.insert(name.clone());
    }
    Ok((set, refs))
}

/// Which kind a direct interface-or-zone reference resolves to. Interfaces
/// folded into a zone must be referenced through the zone.
fn iface_ref_kind(config: &FortiosConfig, name: &str) -> Result<StructureKind, String> {
    match config.iface_or_zone(name) {
        Some(StructureKind::Zone) => Ok(StructureKind::Zone),
        Some(kind) => {
            if config.zone_of(name).is_some() {
                Err(format!("Cannot reference zoned interface {name}"))
            } else {
                Ok(kind)
            }
        }
        None => Err(format!("No interface or zone named {name}")),
    }
}

fn record_refs(
    config: &mut FortiosConfig,
    refs: &[(StructureKind, SmolStr)],
    usage: UsageKind,
    loc: Loc,
) {
    for (kind, name) in refs {
        config.structures.reference(*kind, name.clone(), usage, loc);
    }
}

fn check_addrgrp_cycle(
    config: &FortiosConfig,
    group_id: ObjId,
    group_name: &SmolStr,
    proposed: &FxHashSet<ObjId>,
) -> Result<(), String> {
    let committed: FxHashMap<ObjId, &FxHashSet<ObjId>> = config
        .addrgrps()
        .values()
        .map(|g| (g.id(), g.member_ids()))
        .collect();
    match would_create_cycle(group_id, proposed, &committed) {
        Some(offender) => {
            let offender_name = member_display_name(config, offender, group_name);
            Err(format!(
                "Addrgrp {offender_name} cannot be added to {group_name} as it would create a cycle"
            ))
        }
        None => Ok(()),
    }
}

fn check_service_group_cycle(
    config: &FortiosConfig,
    group_id: ObjId,
    group_name: &SmolStr,
    proposed: &FxHashSet<ObjId>,
) -> Result<(), String> {
    let committed: FxHashMap<ObjId, &FxHashSet<ObjId>> = config
        .service_groups()
        .values()
        .map(|g| (g.id(), g.member_ids()))
        .collect();
    match would_create_cycle(group_id, proposed, &committed) {
        Some(offender) => {
            let offender_name = member_display_name(config, offender, group_name);
            Err(format!(
                "Service group {offender_name} cannot be added to {group_name} as it would \
                 create a cycle"
            ))
        }
        None => Ok(()),
    }
}

/// Name the offending member in a cycle warning. The offender is either a
/// committed (registered) group or the group under edit itself.
fn member_display_name(config: &FortiosConfig, id: ObjId, group_under_edit: &SmolStr) -> SmolStr {
    match config.registry().lookup(id) {
        Some((_, name)) => name.clone(),
        None => group_under_edit.clone(),
    }
}
