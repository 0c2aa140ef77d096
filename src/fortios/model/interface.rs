//! System interfaces and zones.
//!
//! Interfaces and zones share a naming namespace; a policy may reference
//! either in its srcintf/dstintf lists, but an interface that belongs to a
//! zone must be referenced through the zone. Both kinds are keyed by name
//! in the model — nothing references them by identity, so they skip
//! identifier allocation.

use std::collections::BTreeSet;

use smol_str::SmolStr;

/// Interface type. Cannot be changed once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterfaceType {
    Physical,
    Vlan,
    Tunnel,
    Loopback,
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InterfaceType::Physical => "physical",
            InterfaceType::Vlan => "vlan",
            InterfaceType::Tunnel => "tunnel",
            InterfaceType::Loopback => "loopback",
        })
    }
}

/// A system interface.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interface {
    name: SmolStr,
    vdom: Option<SmolStr>,
    iface_type: Option<InterfaceType>,
    vlanid: Option<u16>,
    /// Parent interface, required for vlan interfaces.
    parent: Option<SmolStr>,
    status_up: Option<bool>,
}

impl Interface {
    pub const NAME_MAX_LEN: usize = 15;
    pub const DEFAULT_TYPE: InterfaceType = InterfaceType::Vlan;
    pub const VLANID_MIN: u32 = 1;
    pub const VLANID_MAX: u32 = 4094;

    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            vdom: None,
            iface_type: None,
            vlanid: None,
            parent: None,
            status_up: None,
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn vdom(&self) -> Option<&SmolStr> {
        self.vdom.as_ref()
    }

    pub fn set_vdom(&mut self, vdom: impl Into<SmolStr>) {
        self.vdom = Some(vdom.into());
    }

    pub fn iface_type(&self) -> Option<InterfaceType> {
        self.iface_type
    }

    pub fn type_effective(&self) -> InterfaceType {
        self.iface_type.unwrap_or(Self::DEFAULT_TYPE)
    }

    pub fn set_type(&mut self, iface_type: InterfaceType) -> Result<(), String> {
        match self.iface_type {
            Some(existing) if existing != iface_type => {
                Err("The type of an interface cannot be changed".to_string())
            }
            _ => {
                self.iface_type = Some(iface_type);
                Ok(())
            }
        }
    }

    pub fn vlanid(&self) -> Option<u16> {
        self.vlanid
    }

    pub fn set_vlanid(&mut self, vlanid: u16) {
        self.vlanid = Some(vlanid);
    }

    pub fn parent(&self) -> Option<&SmolStr> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: impl Into<SmolStr>) {
        self.parent = Some(parent.into());
    }

    pub fn status_up(&self) -> Option<bool> {
        self.status_up
    }

    pub fn status_up_effective(&self) -> bool {
        self.status_up.unwrap_or(true)
    }

    pub fn set_status_up(&mut self, up: bool) {
        self.status_up = Some(up);
    }
}

/// Commit-time validity predicate for interfaces. `zone_conflict` is the
/// sibling read-only state: whether a committed zone already owns the name.
pub fn validate_interface(
    iface: &Interface,
    name_ok: bool,
    zone_conflict: bool,
) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    if zone_conflict {
        return Err("name conflicts with a zone name".to_string());
    }
    if iface.type_effective() == InterfaceType::Vlan {
        if iface.vlanid().is_none() {
            return Err("vlanid must be set".to_string());
        }
        if iface.parent().is_none() {
            return Err("interface must be set".to_string());
        }
    }
    Ok(())
}

/// Action applied to traffic between interfaces of the same zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntrazoneAction {
    Allow,
    Deny,
}

/// A zone grouping interfaces. Policies reference the zone name instead of
/// the member interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    name: SmolStr,
    intrazone: Option<IntrazoneAction>,
    interfaces: BTreeSet<SmolStr>,
}

impl Zone {
    pub const NAME_MAX_LEN: usize = 35;
    pub const DEFAULT_INTRAZONE_ACTION: IntrazoneAction = IntrazoneAction::Deny;

    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            intrazone: None,
            interfaces: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn intrazone(&self) -> Option<IntrazoneAction> {
        self.intrazone
    }

    pub fn intrazone_effective(&self) -> IntrazoneAction {
        self.intrazone.unwrap_or(Self::DEFAULT_INTRAZONE_ACTION)
    }

    pub fn set_intrazone(&mut self, action: IntrazoneAction) {
        self.intrazone = Some(action);
    }

    pub fn interfaces(&self) -> &BTreeSet<SmolStr> {
        &self.interfaces
    }

    pub fn set_interfaces(&mut self, interfaces: BTreeSet<SmolStr>) {
        self.interfaces = interfaces;
    }

    pub fn contains_interface(&self, name: &str) -> bool {
        self.interfaces.contains(name)
    }
}

/// Commit-time validity predicate for zones. `iface_conflict` mirrors the
/// interface-side namespace check.
pub fn validate_zone(zone: &Zone, name_ok: bool, iface_conflict: bool) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    if iface_conflict {
        return Err("name conflicts with an interface name".to_string());
    }
    if zone.interfaces().is_empty() {
        return Err("interface must be set".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_type_cannot_change() {
        let mut iface = Interface::new("port1");
        iface.set_type(InterfaceType::Physical).unwrap();
        // Re-setting the same type is fine.
        iface.set_type(InterfaceType::Physical).unwrap();
        assert_eq!(
            iface.set_type(InterfaceType::Tunnel).unwrap_err(),
            "The type of an interface cannot be changed"
        );
        assert_eq!(iface.type_effective(), InterfaceType::Physical);
    }

    #[test]
    fn test_vlan_interface_requires_vlanid_and_parent() {
        let mut iface = Interface::new("vlan100");
        assert_eq!(
            validate_interface(&iface, true, false).unwrap_err(),
            "vlanid must be set"
        );
        iface.set_vlanid(100);
        assert_eq!(
            validate_interface(&iface, true, false).unwrap_err(),
            "interface must be set"
        );
        iface.set_parent("port1");
        assert!(validate_interface(&iface, true, false).is_ok());
    }

    #[test]
    fn test_zone_name_conflict_rejected_at_commit() {
        let iface = Interface::new("dmz");
        assert_eq!(
            validate_interface(&iface, true, true).unwrap_err(),
            "name conflicts with a zone name"
        );
    }

    #[test]
    fn test_intrazone_defaults_to_deny() {
        let mut zone = Zone::new("z1");
        assert!(zone.intrazone().is_none());
        assert_eq!(zone.intrazone_effective(), IntrazoneAction::Deny);
        zone.set_intrazone(IntrazoneAction::Allow);
        assert_eq!(zone.intrazone_effective(), IntrazoneAction::Allow);
    }

    #[test]
    fn test_zone_requires_interfaces() {
        let mut zone = Zone::new("z1");
        assert_eq!(
            validate_zone(&zone, true, false).unwrap_err(),
            "interface must be set"
        );
        zone.set_interfaces(["port1".into()].into_iter().collect());
        assert!(validate_zone(&zone, true, false).is_ok());
    }
}
