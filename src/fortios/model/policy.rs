//! Firewall policies.
//!
//! Policies are keyed by number (rendered as a string) and live in an
//! ordered rule collection: iteration order is first-match evaluation
//! order. Address and service references are stored as identifier sets and
//! resolved to names at finalization; interface references are plain names
//! because interfaces and zones are not referenced by identity.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::registry::ObjId;

/// Reserved address member matching everything. Removed with a warning
/// when combined with concrete addresses.
pub const ALL_ADDRESSES: &str = "all";

/// Reserved interface member matching every interface.
pub const ANY_INTERFACE: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PolicyAction {
    Accept,
    Deny,
}

/// One firewall policy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Policy {
    number: SmolStr,
    name: Option<SmolStr>,
    comments: Option<SmolStr>,
    action: Option<PolicyAction>,
    status_up: Option<bool>,
    src_intf: BTreeSet<SmolStr>,
    dst_intf: BTreeSet<SmolStr>,
    src_addr_ids: FxHashSet<ObjId>,
    dst_addr_ids: FxHashSet<ObjId>,
    service_ids: FxHashSet<ObjId>,
    /// Finalized name views; empty until the finalization pass runs.
    src_addr: BTreeSet<SmolStr>,
    dst_addr: BTreeSet<SmolStr>,
    service: BTreeSet<SmolStr>,
}

/// Policy numbers are unsigned and bounded; 4294967295 is reserved.
pub const POLICY_NUMBER_MAX: u64 = 4_294_967_294;

/// Whether `number` is a syntactically valid policy number.
pub fn policy_number_ok(number: &str) -> bool {
    number
        .parse::<u64>()
        .map(|n| n <= POLICY_NUMBER_MAX)
        .unwrap_or(false)
}

impl Policy {
    pub const DEFAULT_ACTION: PolicyAction = PolicyAction::Deny;

    pub fn new(number: impl Into<SmolStr>) -> Self {
        Self {
            number: number.into(),
            name: None,
            comments: None,
            action: None,
            status_up: None,
            src_intf: BTreeSet::new(),
            dst_intf: BTreeSet::new(),
            src_addr_ids: FxHashSet::default(),
            dst_addr_ids: FxHashSet::default(),
            service_ids: FxHashSet::default(),
            src_addr: BTreeSet::new(),
            dst_addr: BTreeSet::new(),
            service: BTreeSet::new(),
        }
    }

    pub fn number(&self) -> &SmolStr {
        &self.number
    }

    pub fn name(&self) -> Option<&SmolStr> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: impl Into<SmolStr>) {
        self.name = Some(name.into());
    }

    pub fn comments(&self) -> Option<&SmolStr> {
        self.comments.as_ref()
    }

    pub fn set_comments(&mut self, comments: impl Into<SmolStr>) {
        self.comments = Some(comments.into());
    }

    pub fn action(&self) -> Option<PolicyAction> {
        self.action
    }

    pub fn action_effective(&self) -> PolicyAction {
        self.action.unwrap_or(Self::DEFAULT_ACTION)
    }

    pub fn set_action(&mut self, action: PolicyAction) {
        self.action = Some(action);
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

    pub fn src_intf(&self) -> &BTreeSet<SmolStr> {
        &self.src_intf
    }

    pub fn set_src_intf(&mut self, names: BTreeSet<SmolStr>) {
        self.src_intf = names;
    }

    pub fn dst_intf(&self) -> &BTreeSet<SmolStr> {
        &self.dst_intf
    }

    pub fn set_dst_intf(&mut self, names: BTreeSet<SmolStr>) {
        self.dst_intf = names;
    }

    pub fn src_addr_ids(&self) -> &FxHashSet<ObjId> {
        &self.src_addr_ids
    }

    pub fn set_src_addr_ids(&mut self, ids: FxHashSet<ObjId>) {
        self.src_addr_ids = ids;
    }

    pub fn dst_addr_ids(&self) -> &FxHashSet<ObjId> {
        &self.dst_addr_ids
    }

    pub fn set_dst_addr_ids(&mut self, ids: FxHashSet<ObjId>) {
        self.dst_addr_ids = ids;
    }

    pub fn service_ids(&self) -> &FxHashSet<ObjId> {
        &self.service_ids
    }

    pub fn set_service_ids(&mut self, ids: FxHashSet<ObjId>) {
        self.service_ids = ids;
    }

    /// Finalized source-address names.
    pub fn src_addr(&self) -> &BTreeSet<SmolStr> {
        &self.src_addr
    }

    pub fn dst_addr(&self) -> &BTreeSet<SmolStr> {
        &self.dst_addr
    }

    pub fn service(&self) -> &BTreeSet<SmolStr> {
        &self.service
    }

    pub(crate) fn set_resolved_refs(
        &mut self,
        src_addr: BTreeSet<SmolStr>,
        dst_addr: BTreeSet<SmolStr>,
        service: BTreeSet<SmolStr>,
    ) {
        self.src_addr = src_addr;
        self.dst_addr = dst_addr;
        self.service = service;
    }

    pub(crate) fn purge_member(&mut self, id: ObjId) {
        self.src_addr_ids.remove(&id);
        self.dst_addr_ids.remove(&id);
        self.service_ids.remove(&id);
    }

    /// Clone for `clone <src> to <dst>`: every field identical to the
    /// parent except the number. Identifier sets are copied as-is — the
    /// clone references the same objects.
    pub fn clone_with_number(&self, number: impl Into<SmolStr>) -> Self {
        let mut clone = self.clone();
        clone.number = number.into();
        clone
    }
}

/// Commit-time validity predicate for policies. `number_ok` plays the role
/// the name-validity flag plays for named kinds.
pub fn validate_policy(policy: &Policy, number_ok: bool) -> Result<(), String> {
    if !number_ok {
        return Err("name is invalid".to_string());
    }
    if policy.src_intf().is_empty() {
        return Err("srcintf must be set".to_string());
    }
    if policy.dst_intf().is_empty() {
        return Err("dstintf must be set".to_string());
    }
    if policy.src_addr_ids().is_empty() {
        return Err("srcaddr must be set".to_string());
    }
    if policy.dst_addr_ids().is_empty() {
        return Err("dstaddr must be set".to_string());
    }
    if policy.service_ids().is_empty() {
        return Err("service must be set".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdAllocator;
    use rstest::rstest;

    #[rstest]
    #[case("0", true)]
    #[case("1", true)]
    #[case("4294967294", true)]
    #[case("4294967295", false)]
    #[case("-1", false)]
    #[case("foobar", false)]
    #[case("", false)]
    fn test_policy_number_validity(#[case] number: &str, #[case] ok: bool) {
        assert_eq!(policy_number_ok(number), ok);
    }

    #[test]
    fn test_validate_requires_every_match_set() {
        let mut ids = IdAllocator::new();
        let mut p = Policy::new("1");
        assert_eq!(validate_policy(&p, true).unwrap_err(), "srcintf must be set");

        p.set_src_intf(["port1".into()].into_iter().collect());
        p.set_dst_intf(["port2".into()].into_iter().collect());
        p.set_src_addr_ids([ids.allocate()].into_iter().collect());
        p.set_dst_addr_ids([ids.allocate()].into_iter().collect());
        assert_eq!(validate_policy(&p, true).unwrap_err(), "service must be set");

        p.set_service_ids([ids.allocate()].into_iter().collect());
        assert!(validate_policy(&p, true).is_ok());
    }

    #[test]
    fn test_clone_with_number_copies_everything_else() {
        let mut ids = IdAllocator::new();
        let svc = ids.allocate();
        let mut p = Policy::new("1");
        p.set_action(PolicyAction::Accept);
        p.set_src_intf(["any".into()].into_iter().collect());
        p.set_service_ids([svc].into_iter().collect());

        let clone = p.clone_with_number("3");
        assert_eq!(clone.number(), "3");
        assert_eq!(clone.action(), Some(PolicyAction::Accept));
        assert_eq!(clone.src_intf(), p.src_intf());
        assert_eq!(clone.service_ids(), p.service_ids());
    }
}
