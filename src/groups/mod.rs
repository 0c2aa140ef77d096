//! Cycle detection for self-referential group membership.
//!
//! A group may contain another group, so every mutation of a member set has
//! to be checked against the transitive membership graph before it is
//! applied. The check runs on the *proposed* post-edit membership; a failed
//! check means the caller must leave the existing membership untouched and
//! warn, naming the offending member.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::registry::ObjId;

/// Would committing `proposed` as the member set of `group` close a
/// membership cycle?
///
/// `groups` maps each committed group's identifier to its current member
/// set; leaf objects (plain addresses, services) simply do not appear as
/// keys. Returns the first offending member identifier so the caller can
/// name it in the warning, or `None` when the mutation is safe.
///
/// Self-membership is the one-hop case of the same search: `proposed`
/// containing `group` itself is reported without any traversal.
pub fn would_create_cycle(
    group: ObjId,
    proposed: &FxHashSet<ObjId>,
    groups: &FxHashMap<ObjId, &FxHashSet<ObjId>>,
) -> Option<ObjId> {
    if proposed.contains(&group) {
        return Some(group);
    }
    for &member in proposed {
        if groups.contains_key(&member) && reaches(member, group, groups) {
            return Some(member);
        }
    }
    None
}

/// Depth-first reachability from `start` to `target` through committed
/// membership edges.
fn reaches(start: ObjId, target: ObjId, groups: &FxHashMap<ObjId, &FxHashSet<ObjId>>) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(members) = groups.get(&current) {
            stack.extend(members.iter().copied());
        }
    }
    false
}
