//! Structure and usage kinds for the FortiOS-style dialect.

use crate::registry::Namespaced;

/// Categories of named configuration structure this dialect defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructureKind {
    Address,
    Addrgrp,
    Interface,
    Policy,
    ServiceCustom,
    ServiceGroup,
    Zone,
}

impl StructureKind {
    /// How the kind is spelled in warnings, matching the CLI's vocabulary.
    pub fn description(self) -> &'static str {
        match self {
            StructureKind::Address => "address",
            StructureKind::Addrgrp => "addrgrp",
            StructureKind::Interface => "interface",
            StructureKind::Policy => "policy",
            StructureKind::ServiceCustom => "service",
            StructureKind::ServiceGroup => "service group",
            StructureKind::Zone => "zone",
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Rename-conflict namespaces. Address and address-group names collide with
/// each other but not with service names; interfaces and zones share a
/// namespace; policies are numbered and live alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Address,
    Service,
    IfaceZone,
    Policy,
}

impl Namespaced for StructureKind {
    type Namespace = Namespace;

    fn namespace(self) -> Namespace {
        match self {
            StructureKind::Address | StructureKind::Addrgrp => Namespace::Address,
            StructureKind::ServiceCustom | StructureKind::ServiceGroup => Namespace::Service,
            StructureKind::Interface | StructureKind::Zone => Namespace::IfaceZone,
            StructureKind::Policy => Namespace::Policy,
        }
    }
}

/// Syntactic contexts in which a structure name may be referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UsageKind {
    AddrgrpMember,
    AddrgrpExcludeMember,
    AddressAssociatedInterface,
    ServiceGroupMember,
    PolicySrcAddr,
    PolicyDstAddr,
    PolicyService,
    PolicySrcIntf,
    PolicyDstIntf,
    ZoneInterface,
    VlanParentInterface,
    /// Recorded once per committed edit block so a structure that is
    /// defined but never used elsewhere is distinguishable downstream.
    SelfRef,
}
