//! Custom service objects.

use smol_str::SmolStr;

use crate::registry::ObjId;

/// Protocol family of a custom service. Gates which fields may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServiceProtocol {
    TcpUdpSctp,
    Icmp,
}

impl std::fmt::Display for ServiceProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ServiceProtocol::TcpUdpSctp => "TCP/UDP/SCTP",
            ServiceProtocol::Icmp => "ICMP",
        })
    }
}

/// An inclusive destination port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortRange {
    pub low: u16,
    pub high: u16,
}

impl PortRange {
    pub fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    pub fn single(port: u16) -> Self {
        Self {
            low: port,
            high: port,
        }
    }
}

/// A custom service definition. Renamable; service groups and policies hold
/// its [`ObjId`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Service {
    name: SmolStr,
    id: ObjId,
    protocol: Option<ServiceProtocol>,
    tcp_port_ranges: Vec<PortRange>,
    udp_port_ranges: Vec<PortRange>,
    icmp_type: Option<u8>,
    icmp_code: Option<u8>,
    comment: Option<SmolStr>,
}

impl Service {
    pub const NAME_MAX_LEN: usize = 79;
    pub const DEFAULT_PROTOCOL: ServiceProtocol = ServiceProtocol::TcpUdpSctp;

    pub fn new(name: impl Into<SmolStr>, id: ObjId) -> Self {
        Self {
            name: name.into(),
            id,
            protocol: None,
            tcp_port_ranges: Vec::new(),
            udp_port_ranges: Vec::new(),
            icmp_type: None,
            icmp_code: None,
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

    pub fn protocol(&self) -> Option<ServiceProtocol> {
        self.protocol
    }

    pub fn protocol_effective(&self) -> ServiceProtocol {
        self.protocol.unwrap_or(Self::DEFAULT_PROTOCOL)
    }

    pub fn set_protocol(&mut self, protocol: ServiceProtocol) {
        self.protocol = Some(protocol);
    }

    pub fn tcp_port_ranges(&self) -> &[PortRange] {
        &self.tcp_port_ranges
    }

    pub fn set_tcp_port_ranges(&mut self, ranges: Vec<PortRange>) -> Result<(), String> {
        self.gate("tcp-portrange", ServiceProtocol::TcpUdpSctp)?;
        self.tcp_port_ranges = ranges;
        Ok(())
    }

    pub fn udp_port_ranges(&self) -> &[PortRange] {
        &self.udp_port_ranges
    }

    pub fn set_udp_port_ranges(&mut self, ranges: Vec<PortRange>) -> Result<(), String> {
        self.gate("udp-portrange", ServiceProtocol::TcpUdpSctp)?;
        self.udp_port_ranges = ranges;
        Ok(())
    }

    pub fn icmp_type(&self) -> Option<u8> {
        self.icmp_type
    }

    pub fn set_icmp_type(&mut self, icmp_type: u8) -> Result<(), String> {
        self.gate("icmptype", ServiceProtocol::Icmp)?;
        self.icmp_type = Some(icmp_type);
        Ok(())
    }

    pub fn icmp_code(&self) -> Option<u8> {
        self.icmp_code
    }

    pub fn set_icmp_code(&mut self, icmp_code: u8) -> Result<(), String> {
        self.gate("icmpcode", ServiceProtocol::Icmp)?;
        if self.icmp_type.is_none() {
            return Err("Cannot set ICMP code when ICMP type is not set".to_string());
        }
        self.icmp_code = Some(icmp_code);
        Ok(())
    }

    pub fn comment(&self) -> Option<&SmolStr> {
        self.comment.as_ref()
    }

    pub fn set_comment(&mut self, comment: impl Into<SmolStr>) {
        self.comment = Some(comment.into());
    }

    fn gate(&self, field: &str, wanted: ServiceProtocol) -> Result<(), String> {
        let current = self.protocol_effective();
        if current == wanted {
            Ok(())
        } else {
            Err(format!("Cannot set {field} for service protocol {current}"))
        }
    }
}

/// Commit-time validity predicate for custom services. Pure.
pub fn validate_service(service: &Service, name_ok: bool) -> Result<(), String> {
    if !name_ok {
        return Err("name is invalid".to_string());
    }
    if service.protocol_effective() == ServiceProtocol::TcpUdpSctp
        && service.tcp_port_ranges().is_empty()
        && service.udp_port_ranges().is_empty()
    {
        return Err("tcp-portrange or udp-portrange must be set".to_string());
    }
    Ok(())
}
