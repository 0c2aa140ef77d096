//! The statement stream consumed by the extraction driver.
//!
//! The external grammar-driven parser walks the configuration file and
//! produces one [`Statement`] per line, carrying the line number and the
//! raw matched text. The statement kind is a closed tagged union — adding a
//! production to the dialect forces a new variant, and the driver's
//! exhaustive match forces a handler for it. Spans the grammar could not
//! interpret arrive as [`StmtKind::Unrecognized`] error nodes.

use std::net::Ipv4Addr;

use smol_str::SmolStr;

use super::model::{
    AddressType, InterfaceType, IntrazoneAction, PolicyAction, PortRange, ServiceProtocol,
};
use crate::base::Loc;

/// Config sections (top-level `config …` blocks) the dialect understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    FirewallAddress,
    FirewallAddrgrp,
    FirewallServiceCustom,
    FirewallServiceGroup,
    FirewallPolicy,
    SystemInterface,
    SystemZone,
}

impl std::fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConfigSection::FirewallAddress => "firewall address",
            ConfigSection::FirewallAddrgrp => "firewall addrgrp",
            ConfigSection::FirewallServiceCustom => "firewall service custom",
            ConfigSection::FirewallServiceGroup => "firewall service group",
            ConfigSection::FirewallPolicy => "firewall policy",
            ConfigSection::SystemInterface => "system interface",
            ConfigSection::SystemZone => "system zone",
        })
    }
}

/// Direction of a relative `move` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDir {
    Before,
    After,
}

/// One semantic statement, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub loc: Loc,
    /// Raw text as matched by the parser, echoed in warnings.
    pub text: SmolStr,
    pub kind: StmtKind,
}

impl Statement {
    pub fn new(line: u32, text: impl Into<SmolStr>, kind: StmtKind) -> Self {
        Self {
            loc: Loc::new(line),
            text: text.into(),
            kind,
        }
    }
}

/// The closed set of statement productions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `config <section>` — enter a section.
    Config(ConfigSection),
    /// `edit <name>` — open an edit block for the named object.
    Edit(SmolStr),
    /// `next` — close the open edit block (commit or discard).
    Next,
    /// `end` — leave the section, closing any open edit block first.
    End,
    /// `set <field> …` inside an edit block.
    Set(SetField),
    /// `append member …` — add to a group's member set.
    AppendMembers(Vec<SmolStr>),
    /// `rename <old> to <new>`.
    Rename { old: SmolStr, new: SmolStr },
    /// `move <subject> before|after <pivot>`.
    Move {
        subject: SmolStr,
        dir: MoveDir,
        pivot: SmolStr,
    },
    /// `clone <src> to <dst>`.
    CloneTo { src: SmolStr, dst: SmolStr },
    /// `delete <name>`.
    Delete(SmolStr),
    /// Error node: the parser matched nothing it understood.
    Unrecognized,
}

/// Field setters, grouped by the section whose grammar produces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetField {
    // firewall address
    AddrType(AddressType),
    Subnet { ip: Ipv4Addr, mask: Ipv4Addr },
    StartIp(Ipv4Addr),
    EndIp(Ipv4Addr),
    Wildcard { ip: Ipv4Addr, mask: Ipv4Addr },
    AssociatedInterface(SmolStr),
    Comment(SmolStr),

    // firewall addrgrp / service group
    Members(Vec<SmolStr>),
    Exclude(bool),
    ExcludeMembers(Vec<SmolStr>),

    // firewall service custom
    Protocol(ServiceProtocol),
    TcpPortRange(Vec<PortRange>),
    UdpPortRange(Vec<PortRange>),
    IcmpType(u8),
    IcmpCode(u8),

    // system interface
    Vdom(SmolStr),
    IfaceType(InterfaceType),
    Vlanid(u32),
    ParentInterface(SmolStr),
    StatusUp(bool),

    // system zone
    ZoneInterfaces(Vec<SmolStr>),
    Intrazone(IntrazoneAction),

    // firewall policy
    Action(PolicyAction),
    PolicyName(SmolStr),
    SrcIntf(Vec<SmolStr>),
    DstIntf(Vec<SmolStr>),
    SrcAddr(Vec<SmolStr>),
    DstAddr(Vec<SmolStr>),
    Service(Vec<SmolStr>),
}
