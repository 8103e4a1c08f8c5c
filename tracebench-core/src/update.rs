//! Tagged field updates
//!
//! An edit names its artifact kind and the concrete field it changes, so the
//! set of editable fields is closed and checked when the update is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::TraceError;
use crate::models::{
    join_ids, Artifact, ArtifactKind, ArtifactSet, ChangeRecord, Priority, Requirement,
    RequirementStatus, Severity, TestCase, Viewpoint,
};

/// Editable requirement fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RequirementField {
    Description(String),
    Priority(Priority),
    Status(RequirementStatus),
}

/// Editable viewpoint fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ViewpointField {
    Area(String),
    Intent(String),
    DataVariants(String),
    Notes(String),
}

/// Editable test case fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TestCaseField {
    Title(String),
    Steps(String),
    ExpectedResult(String),
    Severity(Severity),
    Tags(BTreeSet<String>),
    Locked(bool),
}

/// A single field edit against one artifact
///
/// Written as `{kind, change: {field, value}}` wherever it appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "change", rename_all = "snake_case")]
pub enum FieldUpdate {
    Requirement(RequirementField),
    Viewpoint(ViewpointField),
    TestCase(TestCaseField),
}

impl FieldUpdate {
    /// The artifact kind this update applies to
    pub fn kind(&self) -> ArtifactKind {
        match self {
            FieldUpdate::Requirement(_) => ArtifactKind::Requirement,
            FieldUpdate::Viewpoint(_) => ArtifactKind::Viewpoint,
            FieldUpdate::TestCase(_) => ArtifactKind::TestCase,
        }
    }

    /// Name of the changed field, as used in change records and summaries
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Requirement(field) => match field {
                RequirementField::Description(_) => "description",
                RequirementField::Priority(_) => "priority",
                RequirementField::Status(_) => "status",
            },
            FieldUpdate::Viewpoint(field) => match field {
                ViewpointField::Area(_) => "area",
                ViewpointField::Intent(_) => "intent",
                ViewpointField::DataVariants(_) => "data_variants",
                ViewpointField::Notes(_) => "notes",
            },
            FieldUpdate::TestCase(field) => match field {
                TestCaseField::Title(_) => "title",
                TestCaseField::Steps(_) => "steps",
                TestCaseField::ExpectedResult(_) => "expected_result",
                TestCaseField::Severity(_) => "severity",
                TestCaseField::Tags(_) => "tags",
                TestCaseField::Locked(_) => "locked",
            },
        }
    }
}

/// Replaces `slot` with `value`, returning rendered (old, new) if they differ
fn replace<T: PartialEq>(
    slot: &mut T,
    value: T,
    render: impl Fn(&T) -> String,
) -> Option<(String, String)> {
    if *slot == value {
        return None;
    }
    let old = std::mem::replace(slot, value);
    Some((render(&old), render(slot)))
}

fn apply_requirement(req: &mut Requirement, field: RequirementField) -> Option<(String, String)> {
    match field {
        RequirementField::Description(v) => replace(&mut req.description, v, Clone::clone),
        RequirementField::Priority(v) => replace(&mut req.priority, v, ToString::to_string),
        RequirementField::Status(v) => replace(&mut req.status, v, ToString::to_string),
    }
}

fn apply_viewpoint(vp: &mut Viewpoint, field: ViewpointField) -> Option<(String, String)> {
    match field {
        ViewpointField::Area(v) => replace(&mut vp.area, v, Clone::clone),
        ViewpointField::Intent(v) => replace(&mut vp.intent, v, Clone::clone),
        ViewpointField::DataVariants(v) => replace(&mut vp.data_variants, v, Clone::clone),
        ViewpointField::Notes(v) => replace(&mut vp.notes, v, Clone::clone),
    }
}

fn apply_test_case(tc: &mut TestCase, field: TestCaseField) -> Option<(String, String)> {
    match field {
        TestCaseField::Title(v) => replace(&mut tc.title, v, Clone::clone),
        TestCaseField::Steps(v) => replace(&mut tc.steps, v, Clone::clone),
        TestCaseField::ExpectedResult(v) => replace(&mut tc.expected_result, v, Clone::clone),
        TestCaseField::Severity(v) => replace(&mut tc.severity, v, ToString::to_string),
        TestCaseField::Tags(v) => replace(&mut tc.tags, v, join_ids),
        TestCaseField::Locked(v) => replace(&mut tc.locked, v, ToString::to_string),
    }
}

fn record<A: Artifact>(artifact: &mut A, field: &str, change: Option<(String, String)>) -> Option<ChangeRecord> {
    let (old, new) = change?;
    Some(artifact.meta_mut().record(field, old, new).clone())
}

/// Applies a field update to the artifact with the given id
///
/// Returns the appended change record, or `None` when the new value equals
/// the current one (nothing is recorded in that case). A locked test case
/// rejects every update except a change to its `locked` flag.
pub fn apply_update(
    set: &mut ArtifactSet,
    id: &str,
    update: FieldUpdate,
) -> Result<Option<ChangeRecord>, TraceError> {
    let field = update.field_name();
    let kind = update.kind();

    let change = match update {
        FieldUpdate::Requirement(f) => {
            let req = set
                .requirement_mut(id)
                .ok_or_else(|| TraceError::not_found(kind, id))?;
            let change = apply_requirement(req, f);
            record(req, field, change)
        }
        FieldUpdate::Viewpoint(f) => {
            let vp = set
                .viewpoint_mut(id)
                .ok_or_else(|| TraceError::not_found(kind, id))?;
            let change = apply_viewpoint(vp, f);
            record(vp, field, change)
        }
        FieldUpdate::TestCase(f) => {
            let tc = set
                .test_case_mut(id)
                .ok_or_else(|| TraceError::not_found(kind, id))?;
            if tc.locked && !matches!(f, TestCaseField::Locked(_)) {
                return Err(TraceError::ArtifactLocked(id.to_string()));
            }
            let change = apply_test_case(tc, f);
            record(tc, field, change)
        }
    };

    Ok(change)
}
