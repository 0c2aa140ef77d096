//! Object model for the FortiOS-style dialect.
//!
//! Each kind carries the fields the device CLI accepts for it, the setter
//! gating that depends on the object's current sub-type, and a pure validity
//! predicate the edit-transaction controller runs at commit time. Predicates
//! never mutate anything; failure reasons bubble up to the driver, which
//! turns them into "edit block ignored" warnings.

mod address;
mod group;
mod interface;
mod policy;
mod service;

pub use address::{Address, AddressType, validate_address};
pub use group::{Addrgrp, ServiceGroup, validate_addrgrp, validate_service_group};
pub use interface::{
    Interface, InterfaceType, IntrazoneAction, Zone, validate_interface, validate_zone,
};
pub use policy::{
    ALL_ADDRESSES, ANY_INTERFACE, Policy, PolicyAction, policy_number_ok, validate_policy,
};
pub use service::{PortRange, Service, ServiceProtocol, validate_service};

/// Shared name rule: non-empty, bounded length, no control characters.
/// Per-kind length limits mirror the device's own.
pub fn valid_name(name: &str, max_len: usize) -> bool {
    !name.is_empty() && name.len() <= max_len && !name.chars().any(char::is_control)
}

/// True when `mask` is a run of ones followed by a run of zeros.
pub fn valid_subnet_mask(mask: std::net::Ipv4Addr) -> bool {
    let inverted = !u32::from(mask);
    inverted & inverted.wrapping_add(1) == 0
}
