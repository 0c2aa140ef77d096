//! Firewall address objects.

use std::net::Ipv4Addr;

use smol_str::SmolStr;

use super::valid_subnet_mask;
use crate::registry::ObjId;

/// Sub-type of an address object. Determines which fields may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressType {
    Ipmask,
    Iprange,
    Wildcard,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AddressType::Ipmask => "ipmask",
            AddressType::Iprange => "iprange",
            AddressType::Wildcard => "wildcard",
        })
    }
}

/// A firewall address. Renamable; groups and policies hold its [`ObjId`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    name: SmolStr,
    id: ObjId,
    addr_type: Option<AddressType>,
    subnet: Option<(Ipv4Addr, Ipv4Addr)>,
    start_ip: Option<Ipv4Addr>,
    end_ip: Option<Ipv4Addr>,
    wildcard: Option<(Ipv4Addr, Ipv4Addr)>,
    associated_interface: Option<SmolStr>,
    comment: Option<SmolStr>,
}

impl Address {
    pub const NAME_MAX_LEN: usize = 79;
    pub const DEFAULT_TYPE: AddressType = AddressType::Ipmask;

    pub fn new(name: impl Into<SmolStr>, id: ObjId) -> Self {
        Self {
            name: name.into(),
            id,
            addr_type: None,
            subnet: None,
            start_ip: None,
            end_ip: None,
            wildcard: None,
            associated_interface: None,
            comment: None,
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

    pub fn addr_type(&self) -> Option<AddressType> {
        self.addr_type
    }

    pub fn type_effective(&self) -> AddressType {
        self.addr_type.unwrap_or(Self::DEFAULT_TYPE)
    }

    /// Address type may be changed freely; fields set under the old type
    /// are simply no longer part of the validity check.
    pub fn set_type(&mut self, addr_type: AddressType) {
        self.addr_type = Some(addr_type);
    }

    pub fn subnet(&self) -> Option<(Ipv4Addr, Ipv4Addr)> {
        self.subnet
    }

    pub fn set_subnet(&mut self, ip: Ipv4Addr, mask: Ipv4Addr) -> Result<(), String> {
        self.gate("subnet", AddressType::Ipmask)?;
        self.subnet = Some((ip, mask));
        Ok(())
    }

    pub fn start_ip(&self) -> Option<Ipv4Addr> {
        self.start_ip
    }

    pub fn set_start_ip(&mut self, ip: Ipv4Addr) -> Result<(), String> {
        self.gate("start-ip", AddressType::Iprange)?;
        self.start_ip = Some(ip);
        Ok(())
    }

    pub fn end_ip(&self) -> Option<Ipv4Addr> {
        self.end_ip
    }

    pub fn set_end_ip(&mut self, ip: Ipv4Addr) -> Result<(), String> {
        self.gate("end-ip", AddressType::Iprange)?;
        self.end_ip = Some(ip);
        Ok(())
    }

    pub fn wildcard(&self) -> Option<(Ipv4Addr, Ipv4Addr)> {
        self.wildcard
    }

    pub fn set_wildcard(&mut self, ip: Ipv4Addr, mask: Ipv4Addr) -> Result<(), String> {
        self.gate("wildcard", AddressType::Wildcard)?;
        self.wildcard = Some((ip, mask));
        Ok(())
    }

    pub fn associated_interface(&self) -> Option<&SmolStr> {
        self.associated_interface.as_ref()
    }

    pub fn set_associated_interface(&mut self, iface: impl Into<SmolStr>) {
        self.associated_interface = Some(iface.into());
    }

    pub fn comment(&self) -> Option<&SmolStr> {
        self.comment.as_ref()
    }

    pub fn set_comment(&mut self, comment: impl Into<SmolStr>) {
        self.comment = Some(comment.into());
    }

    fn gate(&self, field: &str, wanted: AddressType) -> Result<(), String> {
        let current = self.type_effective();
        if current == wanted {
            Ok(())
        } else {
            Err(format!("Cannot set {field} for address type {current}"))
        }
    }
}

/// Commit-time validity predicate for addresses. Pure.
pub fn validate_address(address: &Address, name_ok: bool) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    match address.type_effective() {
        AddressType::Ipmask => {
            if let Some((_, mask)) = address.subnet() {
                if !valid_subnet_mask(mask) {
                    return Err(format!("{mask} is not a valid subnet mask"));
                }
            }
        }
        AddressType::Iprange => {
            let end = address
                .end_ip()
                .ok_or_else(|| "end-ip must be set".to_string())?;
            if u32::from(end) == 0 {
                return Err("end-ip cannot be 0".to_string());
            }
            let start = address.start_ip().unwrap_or(Ipv4Addr::UNSPECIFIED);
            if u32::from(end) <= u32::from(start) {
                return Err("end-ip must be greater than start-ip".to_string());
            }
        }
        AddressType::Wildcard => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdAllocator;

    fn addr() -> Address {
        Address::new("a1", IdAllocator::new().allocate())
    }

    #[test]
    fn test_type_gating_rejects_mismatched_fields() {
        let mut a = addr();
        // Default type is ipmask.
        let err = a.set_start_ip(Ipv4Addr::new(1, 1, 1, 1)).unwrap_err();
        assert_eq!(err, "Cannot set start-ip for address type ipmask");

        a.set_type(AddressType::Iprange);
        assert!(a.set_start_ip(Ipv4Addr::new(1, 1, 1, 1)).is_ok());
        let err = a
            .set_subnet(Ipv4Addr::new(1, 1, 1, 0), Ipv4Addr::new(255, 255, 255, 0))
            .unwrap_err();
        assert_eq!(err, "Cannot set subnet for address type iprange");
    }

    #[test]
    fn test_validate_rejects_bad_subnet_mask() {
        let mut a = addr();
        a.set_subnet(Ipv4Addr::new(1, 1, 1, 0), Ipv4Addr::new(2, 2, 2, 2))
            .unwrap();
        let err = validate_address(&a, true).unwrap_err();
        assert_eq!(err, "2.2.2.2 is not a valid subnet mask");
    }

    #[test]
    fn test_validate_iprange_ordering() {
        let mut a = addr();
        a.set_type(AddressType::Iprange);
        a.set_start_ip(Ipv4Addr::new(10, 0, 0, 9)).unwrap();
        a.set_end_ip(Ipv4Addr::new(10, 0, 0, 1)).unwrap();
        assert_eq!(
            validate_address(&a, true).unwrap_err(),
            "end-ip must be greater than start-ip"
        );

        a.set_end_ip(Ipv4Addr::new(0, 0, 0, 0)).unwrap();
        assert_eq!(validate_address(&a, true).unwrap_err(), "end-ip cannot be 0");

        a.set_end_ip(Ipv4Addr::new(10, 0, 0, 20)).unwrap();
        assert!(validate_address(&a, true).is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_name() {
        let a = addr();
        assert_eq!(validate_address(&a, false).unwrap_err(), "name is invalid");
    }
}
