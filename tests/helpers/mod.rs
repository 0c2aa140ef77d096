//! Shared builders for extraction tests.
//!
//! Tests describe configuration files as statement streams; the `Script`
//! builder numbers the lines the way the external parser would, so tests
//! can assert on definition-line sets without hand-maintaining counters.

#![allow(dead_code)]

use std::net::Ipv4Addr;

use confex::fortios::{
    ConfigSection, FortiosConfig, MoveDir, SetField, Statement, StmtKind, extract,
};

/// A statement stream under construction. Line numbers start at 1 and
/// advance by one per statement.
pub struct Script {
    statements: Vec<Statement>,
    line: u32,
}

impl Script {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
            line: 0,
        }
    }

    /// Append a statement; returns the line it landed on.
    pub fn push(&mut self, text: &str, kind: StmtKind) -> u32 {
        self.line += 1;
        self.statements.push(Statement::new(self.line, text, kind));
        self.line
    }

    pub fn config(&mut self, section: ConfigSection) -> u32 {
        self.push(&format!("config {section}"), StmtKind::Config(section))
    }

    pub fn edit(&mut self, name: &str) -> u32 {
        self.push(&format!("edit {name}"), StmtKind::Edit(name.into()))
    }

    pub fn set(&mut self, text: &str, field: SetField) -> u32 {
        self.push(text, StmtKind::Set(field))
    }

    pub fn next(&mut self) -> u32 {
        self.push("next", StmtKind::Next)
    }

    pub fn end(&mut self) -> u32 {
        self.push("end", StmtKind::End)
    }

    pub fn append_members(&mut self, names: &[&str]) -> u32 {
        self.push(
            &format!("append member {}", names.join(" ")),
            StmtKind::AppendMembers(names.iter().map(|&n| n.into()).collect()),
        )
    }

    pub fn rename(&mut self, old: &str, new: &str) -> u32 {
        self.push(
            &format!("rename {old} to {new}"),
            StmtKind::Rename {
                old: old.into(),
                new: new.into(),
            },
        )
    }

    pub fn move_before(&mut self, subject: &str, pivot: &str) -> u32 {
        self.push(
            &format!("move {subject} before {pivot}"),
            StmtKind::Move {
                subject: subject.into(),
                dir: MoveDir::Before,
                pivot: pivot.into(),
            },
        )
    }

    pub fn move_after(&mut self, subject: &str, pivot: &str) -> u32 {
        self.push(
            &format!("move {subject} after {pivot}"),
            StmtKind::Move {
                subject: subject.into(),
                dir: MoveDir::After,
                pivot: pivot.into(),
            },
        )
    }

    pub fn clone_to(&mut self, src: &str, dst: &str) -> u32 {
        self.push(
            &format!("clone {src} to {dst}"),
            StmtKind::CloneTo {
                src: src.into(),
                dst: dst.into(),
            },
        )
    }

    pub fn delete(&mut self, name: &str) -> u32 {
        self.push(&format!("delete {name}"), StmtKind::Delete(name.into()))
    }

    pub fn unrecognized(&mut self, text: &str) -> u32 {
        self.push(text, StmtKind::Unrecognized)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Run extraction; panics on the fatal path, which no well-formed test
    /// stream should hit.
    pub fn extract(&self) -> FortiosConfig {
        extract(&self.statements).expect("extraction should not fail")
    }
}

// Field shorthands so tests read like the config file they model.

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("test fixture ip")
}

pub fn subnet(addr: &str, mask: &str) -> SetField {
    SetField::Subnet {
        ip: ip(addr),
        mask: ip(mask),
    }
}

pub fn members(names: &[&str]) -> SetField {
    SetField::Members(names.iter().map(|&n| n.into()).collect())
}

pub fn exclude_members(names: &[&str]) -> SetField {
    SetField::ExcludeMembers(names.iter().map(|&n| n.into()).collect())
}

pub fn src_intf(names: &[&str]) -> SetField {
    SetField::SrcIntf(names.iter().map(|&n| n.into()).collect())
}

pub fn dst_intf(names: &[&str]) -> SetField {
    SetField::DstIntf(names.iter().map(|&n| n.into()).collect())
}

pub fn src_addr(names: &[&str]) -> SetField {
    SetField::SrcAddr(names.iter().map(|&n| n.into()).collect())
}

pub fn dst_addr(names: &[&str]) -> SetField {
    SetField::DstAddr(names.iter().map(|&n| n.into()).collect())
}

pub fn service(names: &[&str]) -> SetField {
    SetField::Service(names.iter().map(|&n| n.into()).collect())
}

pub fn zone_interfaces(names: &[&str]) -> SetField {
    SetField::ZoneInterfaces(names.iter().map(|&n| n.into()).collect())
}

// Scenario fragments. Each assumes the script is already inside the right
// config section.

/// `edit <name> / set subnet / next` for a minimal valid ipmask address.
pub fn edit_address(s: &mut Script, name: &str) {
    s.edit(name);
    s.set(
        "set subnet 10.0.0.0 255.255.255.0",
        subnet("10.0.0.0", "255.255.255.0"),
    );
    s.next();
}

/// `edit <name> / set member … / next` for an address group.
pub fn edit_addrgrp(s: &mut Script, name: &str, member_names: &[&str]) {
    s.edit(name);
    s.set(
        &format!("set member {}", member_names.join(" ")),
        members(member_names),
    );
    s.next();
}

/// A physical interface with the given name.
pub fn edit_interface(s: &mut Script, name: &str) {
    s.edit(name);
    s.set(
        "set type physical",
        SetField::IfaceType(confex::fortios::model::InterfaceType::Physical),
    );
    s.next();
}

/// A minimal valid TCP service.
pub fn edit_service(s: &mut Script, name: &str, port: u16) {
    s.edit(name);
    s.set(
        &format!("set tcp-portrange {port}"),
        SetField::TcpPortRange(vec![confex::fortios::model::PortRange::single(port)]),
    );
    s.next();
}

/// A minimal valid policy: any/any interfaces, all/all addresses.
pub fn edit_policy(s: &mut Script, number: &str, service_name: &str) {
    s.edit(number);
    s.set("set srcintf any", src_intf(&["any"]));
    s.set("set dstintf any", dst_intf(&["any"]));
    s.set("set srcaddr all", src_addr(&["all"]));
    s.set("set dstaddr all", dst_addr(&["all"]));
    s.set(
        &format!("set service {service_name}"),
        service(&[service_name]),
    );
    s.next();
}

// Assertion shorthands.

pub fn assert_warning(config: &FortiosConfig, message: &str) {
    assert!(
        config.warnings().matching(message).next().is_some(),
        "expected warning {message:?}, got: {:?}",
        config
            .warnings()
            .iter()
            .map(|w| w.message.as_str())
            .collect::<Vec<_>>()
    );
}

pub fn assert_no_warning(config: &FortiosConfig, message: &str) {
    assert!(
        config.warnings().matching(message).next().is_none(),
        "unexpected warning {message:?}"
    );
}

/// Policy numbers in evaluation order.
pub fn policy_order(config: &FortiosConfig) -> Vec<String> {
    config.policies().keys().map(|k| k.to_string()).collect()
}
