use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The three kinds of tracked artifacts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Requirement,
    Viewpoint,
    TestCase,
}

impl ArtifactKind {
    /// All kinds, in the order change detection walks them
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::Requirement,
            ArtifactKind::Viewpoint,
            ArtifactKind::TestCase,
        ]
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Requirement => write!(f, "requirement"),
            ArtifactKind::Viewpoint => write!(f, "viewpoint"),
            ArtifactKind::TestCase => write!(f, "test case"),
        }
    }
}

/// Represents the priority of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents the severity of a test case
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review status of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RequirementStatus {
    /// Extracted from an uploaded document, not yet looked at
    #[default]
    Parsed,
    Reviewed,
    Approved,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Parsed => "Parsed",
            RequirementStatus::Reviewed => "Reviewed",
            RequirementStatus::Approved => "Approved",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audited field change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Bookkeeping shared by every artifact kind
///
/// These fields always differ between edits and are ignored by change
/// detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactMeta {
    /// When any field was last mutated
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,

    /// Append-only audit log of field changes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_history: Vec<ChangeRecord>,
}

impl ArtifactMeta {
    pub fn new() -> Self {
        Self {
            last_modified: Utc::now(),
            change_history: Vec::new(),
        }
    }

    /// Appends a change record and bumps `last_modified`
    pub fn record(&mut self, field: &str, old_value: String, new_value: String) -> &ChangeRecord {
        let now = Utc::now();
        self.last_modified = now;
        self.change_history.push(ChangeRecord {
            timestamp: now,
            field: field.to_string(),
            old_value,
            new_value,
        });
        // just pushed
        &self.change_history[self.change_history.len() - 1]
    }
}

impl Default for ArtifactMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind-qualified artifact identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub id: String,
}

impl ArtifactRef {
    pub fn new(kind: ArtifactKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn requirement(id: impl Into<String>) -> Self {
        Self::new(ArtifactKind::Requirement, id)
    }

    pub fn viewpoint(id: impl Into<String>) -> Self {
        Self::new(ArtifactKind::Viewpoint, id)
    }

    pub fn test_case(id: impl Into<String>) -> Self {
        Self::new(ArtifactKind::TestCase, id)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Borrowed view of one semantic field, compared structurally when diffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Ids(&'a BTreeSet<String>),
    Flag(bool),
}

/// Capability shared by requirements, viewpoints and test cases
pub trait Artifact {
    const KIND: ArtifactKind;

    fn id(&self) -> &str;

    fn meta(&self) -> &ArtifactMeta;

    fn meta_mut(&mut self) -> &mut ArtifactMeta;

    /// Declared semantic fields, excluding `last_modified` and `change_history`
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)>;

    /// Every artifact this one links to, one hop
    fn links(&self) -> Vec<ArtifactRef>;

    fn artifact_ref(&self) -> ArtifactRef {
        ArtifactRef::new(Self::KIND, self.id())
    }
}

/// Renders an id or tag set the way change records store it
pub(crate) fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn refs(kind: ArtifactKind, ids: &BTreeSet<String>) -> impl Iterator<Item = ArtifactRef> + '_ {
    ids.iter().map(move |id| ArtifactRef::new(kind, id.clone()))
}

/// A requirement extracted from a specification document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    /// Stable identifier, e.g. "R-001"
    pub id: String,

    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: RequirementStatus,

    #[serde(default)]
    pub linked_viewpoints: BTreeSet<String>,

    #[serde(default)]
    pub linked_test_cases: BTreeSet<String>,

    #[serde(flatten)]
    pub meta: ArtifactMeta,
}

impl Requirement {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: Priority::default(),
            status: RequirementStatus::default(),
            linked_viewpoints: BTreeSet::new(),
            linked_test_cases: BTreeSet::new(),
            meta: ArtifactMeta::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: RequirementStatus) -> Self {
        self.status = status;
        self
    }
}

impl Artifact for Requirement {
    const KIND: ArtifactKind = ArtifactKind::Requirement;

    fn id(&self) -> &str {
        &self.id
    }

    fn meta(&self) -> &ArtifactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ArtifactMeta {
        &mut self.meta
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("description", FieldValue::Text(&self.description)),
            ("priority", FieldValue::Text(self.priority.as_str())),
            ("status", FieldValue::Text(self.status.as_str())),
            ("linked_viewpoints", FieldValue::Ids(&self.linked_viewpoints)),
            ("linked_test_cases", FieldValue::Ids(&self.linked_test_cases)),
        ]
    }

    fn links(&self) -> Vec<ArtifactRef> {
        refs(ArtifactKind::Viewpoint, &self.linked_viewpoints)
            .chain(refs(ArtifactKind::TestCase, &self.linked_test_cases))
            .collect()
    }
}

/// A test viewpoint: an angle from which requirements are exercised
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewpoint {
    /// Stable identifier, e.g. "VP-01"
    pub id: String,

    pub area: String,

    #[serde(default)]
    pub intent: String,

    #[serde(default)]
    pub data_variants: String,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub linked_requirements: BTreeSet<String>,

    #[serde(default)]
    pub linked_test_cases: BTreeSet<String>,

    #[serde(flatten)]
    pub meta: ArtifactMeta,
}

impl Viewpoint {
    pub fn new(id: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            area: area.into(),
            intent: String::new(),
            data_variants: String::new(),
            notes: String::new(),
            linked_requirements: BTreeSet::new(),
            linked_test_cases: BTreeSet::new(),
            meta: ArtifactMeta::new(),
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }
}

impl Artifact for Viewpoint {
    const KIND: ArtifactKind = ArtifactKind::Viewpoint;

    fn id(&self) -> &str {
        &self.id
    }

    fn meta(&self) -> &ArtifactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ArtifactMeta {
        &mut self.meta
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("area", FieldValue::Text(&self.area)),
            ("intent", FieldValue::Text(&self.intent)),
            ("data_variants", FieldValue::Text(&self.data_variants)),
            ("notes", FieldValue::Text(&self.notes)),
            ("linked_requirements", FieldValue::Ids(&self.linked_requirements)),
            ("linked_test_cases", FieldValue::Ids(&self.linked_test_cases)),
        ]
    }

    fn links(&self) -> Vec<ArtifactRef> {
        refs(ArtifactKind::Requirement, &self.linked_requirements)
            .chain(refs(ArtifactKind::TestCase, &self.linked_test_cases))
            .collect()
    }
}

/// An executable test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    /// Stable identifier, e.g. "TC-01"
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub steps: String,

    #[serde(default)]
    pub expected_result: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub req_ids: BTreeSet<String>,

    #[serde(default)]
    pub viewpoint_ids: BTreeSet<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Locked test cases only accept an unlock edit
    #[serde(default)]
    pub locked: bool,

    #[serde(flatten)]
    pub meta: ArtifactMeta,
}

impl TestCase {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            steps: String::new(),
            expected_result: String::new(),
            severity: Severity::default(),
            req_ids: BTreeSet::new(),
            viewpoint_ids: BTreeSet::new(),
            tags: BTreeSet::new(),
            locked: false,
            meta: ArtifactMeta::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl Artifact for TestCase {
    const KIND: ArtifactKind = ArtifactKind::TestCase;

    fn id(&self) -> &str {
        &self.id
    }

    fn meta(&self) -> &ArtifactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ArtifactMeta {
        &mut self.meta
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("title", FieldValue::Text(&self.title)),
            ("steps", FieldValue::Text(&self.steps)),
            ("expected_result", FieldValue::Text(&self.expected_result)),
            ("severity", FieldValue::Text(self.severity.as_str())),
            ("req_ids", FieldValue::Ids(&self.req_ids)),
            ("viewpoint_ids", FieldValue::Ids(&self.viewpoint_ids)),
            ("tags", FieldValue::Ids(&self.tags)),
            ("locked", FieldValue::Flag(self.locked)),
        ]
    }

    fn links(&self) -> Vec<ArtifactRef> {
        refs(ArtifactKind::Requirement, &self.req_ids)
            .chain(refs(ArtifactKind::Viewpoint, &self.viewpoint_ids))
            .collect()
    }
}

/// The full live artifact set of a workspace
///
/// `Clone` is a deep copy: every collection and string is duplicated, so a
/// clone never observes later mutation of the original. Snapshots rely on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSet {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub viewpoints: Vec<Viewpoint>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent deep copy of the whole set
    pub fn snapshot(&self) -> ArtifactSet {
        self.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.viewpoints.is_empty() && self.test_cases.is_empty()
    }

    /// Total number of artifacts across all kinds
    pub fn len(&self) -> usize {
        self.requirements.len() + self.viewpoints.len() + self.test_cases.len()
    }

    pub fn requirement(&self, id: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    pub fn requirement_mut(&mut self, id: &str) -> Option<&mut Requirement> {
        self.requirements.iter_mut().find(|r| r.id == id)
    }

    pub fn viewpoint(&self, id: &str) -> Option<&Viewpoint> {
        self.viewpoints.iter().find(|v| v.id == id)
    }

    pub fn viewpoint_mut(&mut self, id: &str) -> Option<&mut Viewpoint> {
        self.viewpoints.iter_mut().find(|v| v.id == id)
    }

    pub fn test_case(&self, id: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|t| t.id == id)
    }

    pub fn test_case_mut(&mut self, id: &str) -> Option<&mut TestCase> {
        self.test_cases.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, artifact: &ArtifactRef) -> bool {
        match artifact.kind {
            ArtifactKind::Requirement => self.requirement(&artifact.id).is_some(),
            ArtifactKind::Viewpoint => self.viewpoint(&artifact.id).is_some(),
            ArtifactKind::TestCase => self.test_case(&artifact.id).is_some(),
        }
    }

    /// One-hop links of the referenced artifact, if it exists
    pub fn links_of(&self, artifact: &ArtifactRef) -> Option<Vec<ArtifactRef>> {
        match artifact.kind {
            ArtifactKind::Requirement => self.requirement(&artifact.id).map(Artifact::links),
            ArtifactKind::Viewpoint => self.viewpoint(&artifact.id).map(Artifact::links),
            ArtifactKind::TestCase => self.test_case(&artifact.id).map(Artifact::links),
        }
    }

    pub fn meta_mut(&mut self, artifact: &ArtifactRef) -> Option<&mut ArtifactMeta> {
        match artifact.kind {
            ArtifactKind::Requirement => self.requirement_mut(&artifact.id).map(|r| &mut r.meta),
            ArtifactKind::Viewpoint => self.viewpoint_mut(&artifact.id).map(|v| &mut v.meta),
            ArtifactKind::TestCase => self.test_case_mut(&artifact.id).map(|t| &mut t.meta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_independent() {
        let mut set = ArtifactSet::new();
        set.test_cases.push(TestCase::new("TC-01", "A"));

        let snapshot = set.snapshot();
        set.test_cases[0].title = "B".into();
        set.test_cases[0].tags.insert("smoke".into());

        assert_eq!(snapshot.test_cases[0].title, "A");
        assert!(snapshot.test_cases[0].tags.is_empty());
    }

    #[test]
    fn test_fields_exclude_meta() {
        let req = Requirement::new("R-1", "x");
        let names: Vec<&str> = req.fields().iter().map(|(name, _)| *name).collect();
        assert!(!names.contains(&"last_modified"));
        assert!(!names.contains(&"change_history"));
        assert!(names.contains(&"description"));
    }

    #[test]
    fn test_links_cover_both_kinds() {
        let mut tc = TestCase::new("TC-01", "Login");
        tc.req_ids.insert("R-1".into());
        tc.viewpoint_ids.insert("VP-1".into());

        let links = tc.links();
        assert_eq!(
            links,
            vec![ArtifactRef::requirement("R-1"), ArtifactRef::viewpoint("VP-1")]
        );
    }

    #[test]
    fn test_meta_record_appends() {
        let mut meta = ArtifactMeta::new();
        meta.record("title", "A".into(), "B".into());
        meta.record("title", "B".into(), "C".into());

        assert_eq!(meta.change_history.len(), 2);
        assert_eq!(meta.change_history[0].new_value, "B");
        assert_eq!(meta.change_history[1].old_value, "B");
        assert_eq!(meta.last_modified, meta.change_history[1].timestamp);
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = "id: R-9\ndescription: Exports must be signed\n";
        let req: Requirement = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(req.priority, Priority::Medium);
        assert_eq!(req.status, RequirementStatus::Parsed);
        assert!(req.meta.change_history.is_empty());
    }

    #[test]
    fn test_artifact_ref_display() {
        assert_eq!(ArtifactRef::test_case("TC-3").to_string(), "test case TC-3");
        assert_eq!(ArtifactRef::requirement("R-1").to_string(), "requirement R-1");
    }
}
