//! Bidirectional traceability links between requirements, viewpoints and
//! test cases.
//!
//! Each pairing of two different kinds has exactly one field on either side:
//!
//! | owner       | requirement           | viewpoint             | test case             |
//! |-------------|-----------------------|-----------------------|-----------------------|
//! | requirement |                       | `linked_viewpoints`   | `linked_test_cases`   |
//! | viewpoint   | `linked_requirements` |                       | `linked_test_cases`   |
//! | test case   | `req_ids`             | `viewpoint_ids`       |                       |
//!
//! Link operations validate everything before touching either side, so a
//! failed call leaves the set unchanged and a successful one updates both.

use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::TraceError;
use crate::models::{join_ids, ArtifactKind, ArtifactRef, ArtifactSet};

fn link_set<'a>(
    set: &'a ArtifactSet,
    owner: &ArtifactRef,
    other: ArtifactKind,
) -> Option<&'a BTreeSet<String>> {
    use ArtifactKind::*;
    match (owner.kind, other) {
        (Requirement, Viewpoint) => set.requirement(&owner.id).map(|r| &r.linked_viewpoints),
        (Requirement, TestCase) => set.requirement(&owner.id).map(|r| &r.linked_test_cases),
        (Viewpoint, Requirement) => set.viewpoint(&owner.id).map(|v| &v.linked_requirements),
        (Viewpoint, TestCase) => set.viewpoint(&owner.id).map(|v| &v.linked_test_cases),
        (TestCase, Requirement) => set.test_case(&owner.id).map(|t| &t.req_ids),
        (TestCase, Viewpoint) => set.test_case(&owner.id).map(|t| &t.viewpoint_ids),
        _ => None,
    }
}

fn link_set_mut<'a>(
    set: &'a mut ArtifactSet,
    owner: &ArtifactRef,
    other: ArtifactKind,
) -> Option<&'a mut BTreeSet<String>> {
    use ArtifactKind::*;
    match (owner.kind, other) {
        (Requirement, Viewpoint) => set.requirement_mut(&owner.id).map(|r| &mut r.linked_viewpoints),
        (Requirement, TestCase) => set.requirement_mut(&owner.id).map(|r| &mut r.linked_test_cases),
        (Viewpoint, Requirement) => set.viewpoint_mut(&owner.id).map(|v| &mut v.linked_requirements),
        (Viewpoint, TestCase) => set.viewpoint_mut(&owner.id).map(|v| &mut v.linked_test_cases),
        (TestCase, Requirement) => set.test_case_mut(&owner.id).map(|t| &mut t.req_ids),
        (TestCase, Viewpoint) => set.test_case_mut(&owner.id).map(|t| &mut t.viewpoint_ids),
        _ => None,
    }
}

/// Checks the pairing and existence of both ends
fn validate(set: &ArtifactSet, source: &ArtifactRef, target: &ArtifactRef) -> Result<(), TraceError> {
    if source == target {
        return Err(TraceError::InvalidLink(format!(
            "cannot link {} to itself",
            source
        )));
    }
    if source.kind == target.kind {
        return Err(TraceError::InvalidLink(format!(
            "{} cannot be linked to another {}",
            source, target.kind
        )));
    }
    for end in [source, target] {
        if !set.contains(end) {
            return Err(TraceError::not_found(end.kind, &end.id));
        }
    }
    Ok(())
}

fn link_field(owner: ArtifactKind, other: ArtifactKind) -> &'static str {
    use ArtifactKind::*;
    match (owner, other) {
        (Requirement, Viewpoint) => "linked_viewpoints",
        (Requirement, _) => "linked_test_cases",
        (Viewpoint, Requirement) => "linked_requirements",
        (Viewpoint, _) => "linked_test_cases",
        (TestCase, Requirement) => "req_ids",
        (TestCase, _) => "viewpoint_ids",
    }
}

/// Inserts or removes each end's id on the other end, recording the change
/// in each modified side's history
fn write_both_sides(
    set: &mut ArtifactSet,
    source: &ArtifactRef,
    target: &ArtifactRef,
    insert: bool,
) -> Result<bool, TraceError> {
    let mut changed = false;
    for (owner, other) in [(source, target), (target, source)] {
        let slot = link_set_mut(set, owner, other.kind)
            .ok_or_else(|| TraceError::not_found(owner.kind, &owner.id))?;
        let old_value = join_ids(slot);
        let side_changed = if insert {
            slot.insert(other.id.clone())
        } else {
            slot.remove(&other.id)
        };
        if !side_changed {
            continue;
        }
        let new_value = join_ids(slot);
        if let Some(meta) = set.meta_mut(owner) {
            meta.record(link_field(owner.kind, other.kind), old_value, new_value);
        }
        changed = true;
    }
    Ok(changed)
}

/// Links two artifacts of different kinds, updating both sides
///
/// Returns `Ok(false)` when the pair was already fully linked. A half-linked
/// pair (as found in some seed data) gets its missing side filled in.
pub fn link_artifacts(
    set: &mut ArtifactSet,
    source: &ArtifactRef,
    target: &ArtifactRef,
) -> Result<bool, TraceError> {
    if let Err(e) = validate(set, source, target) {
        warn!("Rejected link {} -> {}: {}", source, target, e);
        return Err(e);
    }
    let changed = write_both_sides(set, source, target, true)?;
    debug!("Linked {} <-> {} (changed: {})", source, target, changed);
    Ok(changed)
}

/// Removes the link between two artifacts on both sides
///
/// Removing a link that does not exist is a no-op returning `Ok(false)`.
pub fn unlink_artifacts(
    set: &mut ArtifactSet,
    source: &ArtifactRef,
    target: &ArtifactRef,
) -> Result<bool, TraceError> {
    if let Err(e) = validate(set, source, target) {
        warn!("Rejected unlink {} -> {}: {}", source, target, e);
        return Err(e);
    }
    let changed = write_both_sides(set, source, target, false)?;
    debug!("Unlinked {} <-> {} (changed: {})", source, target, changed);
    Ok(changed)
}

/// Directly linked neighbours of an artifact (one hop, no closure)
pub fn neighbors(set: &ArtifactSet, artifact: &ArtifactRef) -> Result<Vec<ArtifactRef>, TraceError> {
    set.links_of(artifact)
        .ok_or_else(|| TraceError::not_found(artifact.kind, &artifact.id))
}

/// Advisory notice raised after an artifact changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactNotice {
    /// The artifact that was edited
    pub artifact: ArtifactRef,
    /// The field that changed, if the notice came from a field edit
    pub field: Option<String>,
    /// Directly linked artifacts that may need review
    pub impacted: Vec<ArtifactRef>,
}

impl ImpactNotice {
    pub fn count(&self) -> usize {
        self.impacted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacted.is_empty()
    }
}

impl fmt::Display for ImpactNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changed: {} linked artifact(s) may be impacted",
            self.artifact,
            self.count()
        )
    }
}

/// Builds the impact notice for an artifact
pub fn impact_of(
    set: &ArtifactSet,
    artifact: &ArtifactRef,
    field: Option<&str>,
) -> Result<ImpactNotice, TraceError> {
    Ok(ImpactNotice {
        artifact: artifact.clone(),
        field: field.map(str::to_string),
        impacted: neighbors(set, artifact)?,
    })
}

/// What is wrong with a link found in the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkIssueKind {
    /// The referenced artifact does not exist
    MissingTarget,
    /// The referenced artifact does not link back
    MissingReciprocal,
}

/// A link that breaks the bidirectional invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkIssue {
    pub from: ArtifactRef,
    pub to: ArtifactRef,
    pub kind: LinkIssueKind,
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LinkIssueKind::MissingTarget => {
                write!(f, "{} links to missing {}", self.from, self.to)
            }
            LinkIssueKind::MissingReciprocal => {
                write!(f, "{} links to {} but not back", self.from, self.to)
            }
        }
    }
}

/// Reports every one-directional or dangling link in the set
///
/// This never repairs anything; fixing seed data is a caller decision
/// (linking the pair again writes the missing side).
pub fn find_one_way_links(set: &ArtifactSet) -> Vec<LinkIssue> {
    let owners = set
        .requirements
        .iter()
        .map(|r| ArtifactRef::requirement(r.id.clone()))
        .chain(set.viewpoints.iter().map(|v| ArtifactRef::viewpoint(v.id.clone())))
        .chain(set.test_cases.iter().map(|t| ArtifactRef::test_case(t.id.clone())));

    let mut issues = Vec::new();
    for from in owners {
        for to in set.links_of(&from).unwrap_or_default() {
            let kind = match link_set(set, &to, from.kind) {
                None if !set.contains(&to) => Some(LinkIssueKind::MissingTarget),
                Some(back) if back.contains(&from.id) => None,
                _ => Some(LinkIssueKind::MissingReciprocal),
            };
            if let Some(kind) = kind {
                issues.push(LinkIssue {
                    from: from.clone(),
                    to,
                    kind,
                });
            }
        }
    }
    issues
}
