//! Rename semantics: identity stability, ledger migration, and
//! namespace-scoped conflict checking.

#[path = "helpers/mod.rs"]
mod helpers;

use confex::fortios::{ConfigSection, StructureKind};
use helpers::*;

#[test]
fn test_rename_follows_identity_through_group_membership() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    edit_address(&mut s, "addr1");
    s.end();
    s.config(ConfigSection::FirewallAddrgrp);
    edit_addrgrp(&mut s, "g1", &["addr1"]);
    s.end();
    s.config(ConfigSection::FirewallAddress);
    s.rename("addr1", "addr1-new");
    s.end();

    let config = s.extract();

    assert!(!config.addresses().contains_key("addr1"));
    assert!(config.addresses().contains_key("addr1-new"));
    // The group stored the identifier, so finalization sees the new name.
    let g1 = config.addrgrps().get("g1").expect("committed");
    let names: Vec<&str> = g1.members().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["addr1-new"]);
}

#[test]
fn test_rename_migrates_definitions_and_references() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    let edit_line = s.edit("addr1");
    let subnet_line = s.set(
        "set subnet 10.0.0.0 255.255.255.0",
        subnet("10.0.0.0", "255.255.255.0"),
    );
    s.next();
    s.end();
    s.config(ConfigSection::FirewallAddrgrp);
    edit_addrgrp(&mut s, "g1", &["addr1"]);
    s.end();
    s.config(ConfigSection::FirewallAddress);
    let rename_line = s.rename("addr1", "addr1-new");
    s.end();

    let config = s.extract();

    // Old name: nothing left on the ledger.
    assert!(
        config
            .structures()
            .definition(StructureKind::Address, "addr1")
            .is_none()
    );
    assert!(
        config
            .structures()
            .references_to(StructureKind::Address, "addr1")
            .is_empty()
    );
    // New name: full history plus the rename line, and the moved reference.
    let record = config
        .structures()
        .definition(StructureKind::Address, "addr1-new")
        .expect("definition migrated");
    assert_eq!(
        record.lines().collect::<Vec<_>>(),
        vec![edit_line, subnet_line, rename_line]
    );
    assert!(
        !config
            .structures()
            .references_to(StructureKind::Address, "addr1-new")
            .is_empty()
    );
}

#[test]
fn test_reference_to_old_name_after_rename_is_undefined() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    edit_address(&mut s, "addr1");
    s.rename("addr1", "addr1-new");
    s.end();
    s.config(ConfigSection::FirewallAddrgrp);
    s.edit("g1");
    s.set("set member addr1", members(&["addr1"]));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Address addr1 is undefined and cannot be referenced");
    assert!(
        config
            .structures()
            .undefined_references()
            .any(|(k, n)| k == StructureKind::Address && n == "addr1")
    );
}

#[test]
fn test_rename_conflict_in_same_namespace_is_refused() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    edit_address(&mut s, "addr1");
    s.end();
    s.config(ConfigSection::FirewallAddrgrp);
    edit_addrgrp(&mut s, "g1", &["addr1"]);
    s.end();
    s.config(ConfigSection::FirewallAddress);
    // Addresses and address groups share a namespace.
    s.rename("addr1", "g1");
    s.end();

    let config = s.extract();

    assert_warning(
        &config,
        "Renaming address addr1 conflicts with existing object g1, \
         ignoring this rename operation",
    );
    assert!(config.addresses().contains_key("addr1"));
}

#[test]
fn test_rename_across_namespaces_does_not_conflict() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallServiceCustom);
    edit_service(&mut s, "web", 80);
    s.end();
    s.config(ConfigSection::FirewallAddress);
    edit_address(&mut s, "addr1");
    // "web" is taken by a service, but services live in another namespace.
    s.rename("addr1", "web");
    s.end();

    let config = s.extract();

    assert_no_warning(
        &config,
        "Renaming address addr1 conflicts with existing object web, \
         ignoring this rename operation",
    );
    assert!(config.addresses().contains_key("web"));
    assert!(config.services().contains_key("web"));
}

#[test]
fn test_rename_nonexistent_warns() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    s.rename("ghost", "ghost2");
    s.end();

    let config = s.extract();

    assert_warning(&config, "Cannot rename non-existent address ghost");
}

#[test]
fn test_rename_to_invalid_name_warns() {
    let mut s = Script::new();
    s.config(ConfigSection::FirewallAddress);
    edit_address(&mut s, "addr1");
    s.rename("addr1", "");
    s.end();

    let config = s.extract();

    assert_warning(&config, "Illegal value for address name");
    assert!(config.addresses().contains_key("addr1"));
}

#[test]
fn test_rename_unsupported_for_interfaces() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    s.rename("port1", "port2");
    s.end();

    let config = s.extract();

    assert_warning(&config, "Cannot rename interface port1");
    assert!(config.interfaces().contains_key("port1"));
}

#[test]
fn test_service_rename_updates_policy_references() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    s.end();
    s.config(ConfigSection::FirewallServiceCustom);
    edit_service(&mut s, "web", 80);
    s.end();
    s.config(ConfigSection::FirewallPolicy);
    edit_policy(&mut s, "1", "web");
    s.end();
    s.config(ConfigSection::FirewallServiceCustom);
    s.rename("web", "http");
    s.end();

    let config = s.extract();

    let policy = config.policies().get("1").expect("committed");
    let services: Vec<&str> = policy.service().iter().map(|n| n.as_str()).collect();
    assert_eq!(services, vec!["http"]);
}
