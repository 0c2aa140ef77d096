//! Interface and zone extraction: the shared naming namespace, vlan
//! requirements, and zone membership exclusivity.

#[path = "helpers/mod.rs"]
mod helpers;

use confex::fortios::model::{InterfaceType, IntrazoneAction};
use confex::fortios::{ConfigSection, SetField};
use helpers::*;

#[test]
fn test_interface_type_cannot_be_changed() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    s.edit("port1");
    s.set("set type physical", SetField::IfaceType(InterfaceType::Physical));
    s.set("set type tunnel", SetField::IfaceType(InterfaceType::Tunnel));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "The type of an interface cannot be changed");
    let iface = config.interfaces().get("port1").expect("committed");
    assert_eq!(iface.iface_type(), Some(InterfaceType::Physical));
}

#[test]
fn test_vlan_interface_requires_vlanid_and_parent() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    // Default type is vlan; without vlanid the block cannot commit.
    s.edit("vlan-a");
    s.next();
    s.edit("vlan-b");
    s.set("set vlanid 100", SetField::Vlanid(100));
    s.next();
    s.edit("vlan-c");
    s.set("set vlanid 100", SetField::Vlanid(100));
    s.set("set interface port1", SetField::ParentInterface("port1".into()));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Interface edit block ignored: vlanid must be set");
    assert_warning(&config, "Interface edit block ignored: interface must be set");
    assert!(!config.interfaces().contains_key("vlan-a"));
    assert!(!config.interfaces().contains_key("vlan-b"));
    let vlan_c = config.interfaces().get("vlan-c").expect("committed");
    assert_eq!(vlan_c.vlanid(), Some(100));
    assert_eq!(vlan_c.parent().map(|p| p.as_str()), Some("port1"));
}

#[test]
fn test_vlanid_out_of_range_warns() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    s.edit("vlan-a");
    s.set("set vlanid 5000", SetField::Vlanid(5000));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Expected vlanid in range 1-4094, but got '5000'");
}

#[test]
fn test_vlan_parent_must_exist() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    s.edit("vlan-a");
    s.set("set vlanid 100", SetField::Vlanid(100));
    s.set("set interface port9", SetField::ParentInterface("port9".into()));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "No interface named port9");
    assert!(!config.interfaces().contains_key("vlan-a"));
}

#[test]
fn test_interface_name_length_limit() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    s.edit("interface-name-too-long");
    s.set("set type physical", SetField::IfaceType(InterfaceType::Physical));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Illegal value for interface name");
    assert_warning(&config, "Interface edit block ignored: name is invalid");
    assert!(config.interfaces().is_empty());
}

#[test]
fn test_zone_name_may_not_shadow_an_interface() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    edit_interface(&mut s, "port2");
    s.end();
    s.config(ConfigSection::SystemZone);
    s.edit("port1");
    s.set("set interface port2", zone_interfaces(&["port2"]));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(
        &config,
        "Zone edit block ignored: name conflicts with an interface name",
    );
    assert!(config.zones().is_empty());
}

#[test]
fn test_interface_name_may_not_shadow_a_zone() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    s.end();
    s.config(ConfigSection::SystemZone);
    s.edit("dmz");
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.end();
    s.config(ConfigSection::SystemInterface);
    s.edit("dmz");
    s.set("set type physical", SetField::IfaceType(InterfaceType::Physical));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(
        &config,
        "Interface edit block ignored: name conflicts with a zone name",
    );
    assert!(!config.interfaces().contains_key("dmz"));
}

#[test]
fn test_interface_belongs_to_at_most_one_zone() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    edit_interface(&mut s, "port2");
    s.end();
    s.config(ConfigSection::SystemZone);
    s.edit("z1");
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.edit("z2");
    s.set("set interface port1 port2", zone_interfaces(&["port1", "port2"]));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Interface port1 is already in zone z1");
    // The membership statement was atomic, so z2 never got port2 either and
    // fails its own commit.
    assert_warning(&config, "Zone edit block ignored: interface must be set");
    assert!(config.zones().contains_key("z1"));
    assert!(!config.zones().contains_key("z2"));
}

#[test]
fn test_zone_may_be_reopened_with_its_own_interfaces() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    edit_interface(&mut s, "port2");
    s.end();
    s.config(ConfigSection::SystemZone);
    s.edit("z1");
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.edit("z1");
    s.set("set interface port1 port2", zone_interfaces(&["port1", "port2"]));
    s.next();
    s.end();

    let config = s.extract();

    assert_no_warning(&config, "Interface port1 is already in zone z1");
    let z1 = config.zones().get("z1").expect("committed");
    assert_eq!(z1.interfaces().len(), 2);
}

#[test]
fn test_zone_intrazone_action_is_extracted() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemInterface);
    edit_interface(&mut s, "port1");
    s.end();
    s.config(ConfigSection::SystemZone);
    s.edit("z1");
    s.set("set intrazone allow", SetField::Intrazone(IntrazoneAction::Allow));
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.edit("z2");
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.end();

    let config = s.extract();

    // z2's statement fails (port1 is in z1); only intrazone matters here.
    let z1 = config.zones().get("z1").expect("committed");
    assert_eq!(z1.intrazone(), Some(IntrazoneAction::Allow));
    assert_eq!(z1.intrazone_effective(), IntrazoneAction::Allow);
}

#[test]
fn test_zone_membership_does_not_require_interfaces_up_front() {
    let mut s = Script::new();
    s.config(ConfigSection::SystemZone);
    s.edit("z1");
    s.set("set interface port1", zone_interfaces(&["port1"]));
    s.next();
    s.end();

    let config = s.extract();

    assert_warning(&config, "Interface port1 is undefined");
    assert!(!config.zones().contains_key("z1"));
}
