//! Snapshot-based version history
//!
//! The [`VersionManager`] keeps an append-only list of named snapshots of the
//! whole artifact set and a private copy of the last saved (or restored) set
//! that the next save is diffed against. It never holds a reference to the
//! caller's live data: everything it keeps is a deep copy taken at the call.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::TraceError;
use crate::models::{Artifact, ArtifactKind, ArtifactRef, ArtifactSet};

/// Author recorded when no identity is configured
pub const DEFAULT_AUTHOR: &str = "Current User";

/// Description used for versions created by [`VersionManager::auto_save`]
pub const AUTO_SAVE_DESCRIPTION: &str = "Auto-save";

/// What triggered a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum VersionTarget {
    /// The whole artifact set
    Workspace,
    /// A save requested from a single artifact's editor
    Artifact {
        artifact_type: ArtifactKind,
        artifact_id: String,
    },
}

impl From<ArtifactRef> for VersionTarget {
    fn from(artifact: ArtifactRef) -> Self {
        VersionTarget::Artifact {
            artifact_type: artifact.kind,
            artifact_id: artifact.id,
        }
    }
}

/// A named, numbered snapshot of the artifact set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    /// Starts at 1 and grows by one for every created version
    pub version_number: u32,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub author: String,
    pub target: VersionTarget,
    pub snapshot: ArtifactSet,
    /// Human-readable differences against the previous baseline
    pub changes_summary: Vec<String>,
    pub is_auto_save: bool,
}

impl Version {
    pub fn artifact_type(&self) -> Option<ArtifactKind> {
        match &self.target {
            VersionTarget::Workspace => None,
            VersionTarget::Artifact { artifact_type, .. } => Some(*artifact_type),
        }
    }

    pub fn artifact_id(&self) -> Option<&str> {
        match &self.target {
            VersionTarget::Workspace => None,
            VersionTarget::Artifact { artifact_id, .. } => Some(artifact_id),
        }
    }
}

/// The state triple rendered by history and unsaved-indicator widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionState {
    pub versions: usize,
    pub current_version: u32,
    pub has_unsaved_changes: bool,
}

fn diff_kind<A: Artifact>(old: &[A], new: &[A], changes: &mut Vec<String>) {
    let kind = A::KIND;
    let old_by_id: HashMap<&str, &A> = old.iter().map(|a| (a.id(), a)).collect();
    let new_by_id: HashMap<&str, &A> = new.iter().map(|a| (a.id(), a)).collect();

    for artifact in new {
        if !old_by_id.contains_key(artifact.id()) {
            changes.push(format!("Added {} {}", kind, artifact.id()));
        }
    }
    for artifact in old {
        if !new_by_id.contains_key(artifact.id()) {
            changes.push(format!("Removed {} {}", kind, artifact.id()));
        }
    }

    for artifact in new {
        let Some(previous) = old_by_id.get(artifact.id()) else {
            continue;
        };
        let before: HashMap<&str, _> = previous.fields().into_iter().collect();
        let after = artifact.fields();

        let mut names: Vec<&str> = after.iter().map(|(name, _)| *name).collect();
        for name in before.keys().copied() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in names {
            let now = after.iter().find(|(n, _)| *n == name).map(|(_, v)| v);
            if before.get(name) != now {
                changes.push(format!("{} {}: {} changed", kind, artifact.id(), name));
            }
        }
    }
}

/// Lists the differences between two artifact sets
///
/// Kinds are walked requirements, viewpoints, test cases. Within a kind,
/// additions come first, then removals, then field changes, each in the
/// order of the collection it was found in. `last_modified` and
/// `change_history` are never compared.
pub fn detect_changes(old: &ArtifactSet, new: &ArtifactSet) -> Vec<String> {
    let mut changes = Vec::new();
    diff_kind(&old.requirements, &new.requirements, &mut changes);
    diff_kind(&old.viewpoints, &new.viewpoints, &mut changes);
    diff_kind(&old.test_cases, &new.test_cases, &mut changes);
    changes
}

/// Owns the version history of one workspace session
#[derive(Debug, Clone)]
pub struct VersionManager {
    versions: Vec<Version>,
    current_version: u32,
    has_unsaved_changes: bool,
    last_saved_snapshot: ArtifactSet,
    version_counter: u32,
    author: String,
}

impl VersionManager {
    /// Starts a session whose first diff baseline is `initial`
    pub fn new(initial: &ArtifactSet) -> Self {
        Self::with_author(initial, DEFAULT_AUTHOR)
    }

    pub fn with_author(initial: &ArtifactSet, author: impl Into<String>) -> Self {
        Self {
            versions: Vec::new(),
            current_version: 0,
            has_unsaved_changes: false,
            last_saved_snapshot: initial.snapshot(),
            version_counter: 1,
            author: author.into(),
        }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Number of the last saved or restored version, 0 before the first save
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn state(&self) -> VersionState {
        VersionState {
            versions: self.versions.len(),
            current_version: self.current_version,
            has_unsaved_changes: self.has_unsaved_changes,
        }
    }

    pub fn version(&self, version_id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    pub fn version_by_number(&self, version_number: u32) -> Option<&Version> {
        self.versions
            .iter()
            .find(|v| v.version_number == version_number)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// The baseline the next save is diffed against
    pub fn last_saved_snapshot(&self) -> &ArtifactSet {
        &self.last_saved_snapshot
    }

    /// Differences between the baseline and `current` that a save would record
    pub fn pending_changes(&self, current: &ArtifactSet) -> Vec<String> {
        detect_changes(&self.last_saved_snapshot, current)
    }

    /// Builds a version from `current` without adding it to the history
    ///
    /// A version number is allocated here, so every created version consumes
    /// one number whether or not it ends up appended.
    pub fn create_version(
        &mut self,
        description: &str,
        current: &ArtifactSet,
        is_auto_save: bool,
        target: VersionTarget,
    ) -> Version {
        let changes_summary = detect_changes(&self.last_saved_snapshot, current);
        let version_number = self.version_counter;
        self.version_counter += 1;

        debug!(
            "Created version {} with {} change(s)",
            version_number,
            changes_summary.len()
        );

        Version {
            id: Uuid::new_v4().to_string(),
            version_number,
            timestamp: Utc::now(),
            description: description.to_string(),
            author: self.author.clone(),
            target,
            snapshot: current.snapshot(),
            changes_summary,
            is_auto_save,
        }
    }

    fn commit(&mut self, version: Version, current: &ArtifactSet) -> &Version {
        info!(
            "Saved version {} \"{}\"{}",
            version.version_number,
            version.description,
            if version.is_auto_save { " (auto)" } else { "" }
        );
        self.current_version = version.version_number;
        self.has_unsaved_changes = false;
        self.last_saved_snapshot = current.snapshot();
        self.versions.push(version);
        &self.versions[self.versions.len() - 1]
    }

    /// Saves `current` as a new version of the whole set
    ///
    /// `is_checkpoint` only labels caller intent: checkpoints share the
    /// numbering sequence and diff baseline of every other save.
    pub fn save_version(&mut self, description: &str, current: &ArtifactSet, is_checkpoint: bool) -> &Version {
        if is_checkpoint {
            debug!("Checkpoint requested: {}", description);
        }
        let version = self.create_version(description, current, false, VersionTarget::Workspace);
        self.commit(version, current)
    }

    /// Saves `current`, recording the artifact whose editor requested it
    pub fn save_version_for(
        &mut self,
        description: &str,
        current: &ArtifactSet,
        artifact: ArtifactRef,
    ) -> &Version {
        let version = self.create_version(description, current, false, artifact.into());
        self.commit(version, current)
    }

    pub fn mark_unsaved_changes(&mut self) {
        self.has_unsaved_changes = true;
    }

    /// Saves an auto-save version if anything changed since the last save
    ///
    /// Returns `None` without touching state when there is nothing unsaved.
    pub fn auto_save(&mut self, current: &ArtifactSet) -> Option<&Version> {
        if !self.has_unsaved_changes {
            return None;
        }
        let version = self.create_version(AUTO_SAVE_DESCRIPTION, current, true, VersionTarget::Workspace);
        Some(self.commit(version, current))
    }

    /// Makes a stored version current again and returns a copy of its data
    ///
    /// Later versions stay in the history. The caller replaces its live set
    /// with the returned copy. An unknown id changes nothing.
    pub fn restore_version(&mut self, version_id: &str) -> Result<ArtifactSet, TraceError> {
        let Some(version) = self.versions.iter().find(|v| v.id == version_id) else {
            warn!("Cannot restore unknown version {}", version_id);
            return Err(TraceError::VersionNotFound(version_id.to_string()));
        };

        let restored = version.snapshot.snapshot();
        let version_number = version.version_number;

        self.current_version = version_number;
        self.has_unsaved_changes = false;
        self.last_saved_snapshot = restored.snapshot();

        info!("Restored version {}", version_number);
        Ok(restored)
    }

    /// Differences between two stored versions
    pub fn compare_versions(&self, from_id: &str, to_id: &str) -> Result<Vec<String>, TraceError> {
        let from = self
            .version(from_id)
            .ok_or_else(|| TraceError::VersionNotFound(from_id.to_string()))?;
        let to = self
            .version(to_id)
            .ok_or_else(|| TraceError::VersionNotFound(to_id.to_string()))?;
        Ok(detect_changes(&from.snapshot, &to.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Requirement, TestCase, Viewpoint};

    fn set_with_requirement(description: &str) -> ArtifactSet {
        let mut set = ArtifactSet::new();
        set.requirements.push(Requirement::new("R-1", description));
        set
    }

    #[test]
    fn test_detect_field_change() {
        let old = set_with_requirement("x");
        let new = set_with_requirement("y");
        assert_eq!(
            detect_changes(&old, &new),
            vec!["requirement R-1: description changed".to_string()]
        );
    }

    #[test]
    fn test_detect_removal() {
        let old = set_with_requirement("x");
        let new = ArtifactSet::new();
        assert_eq!(
            detect_changes(&old, &new),
            vec!["Removed requirement R-1".to_string()]
        );
    }

    #[test]
    fn test_detect_ignores_meta_fields() {
        let old = set_with_requirement("x");
        let mut new = old.clone();
        new.requirements[0]
            .meta
            .record("description", "x".into(), "x".into());

        assert!(detect_changes(&old, &new).is_empty());
    }

    #[test]
    fn test_detect_ordering() {
        let mut old = ArtifactSet::new();
        old.requirements.push(Requirement::new("R-1", "a"));
        old.requirements.push(Requirement::new("R-2", "b"));
        old.test_cases.push(TestCase::new("TC-1", "A"));

        let mut new = ArtifactSet::new();
        new.requirements.push(Requirement::new("R-2", "changed"));
        new.requirements.push(Requirement::new("R-3", "c"));
        new.viewpoints.push(Viewpoint::new("VP-1", "Auth"));
        let mut tc = TestCase::new("TC-1", "A");
        tc.locked = true;
        tc.tags.insert("smoke".into());
        new.test_cases.push(tc);

        assert_eq!(
            detect_changes(&old, &new),
            vec![
                "Added requirement R-3",
                "Removed requirement R-1",
                "requirement R-2: description changed",
                "Added viewpoint VP-1",
                "test case TC-1: tags changed",
                "test case TC-1: locked changed",
            ]
        );
    }

    #[test]
    fn test_detect_link_changes() {
        let old = set_with_requirement("x");
        let mut new = old.clone();
        new.requirements[0].linked_test_cases.insert("TC-1".into());

        assert_eq!(
            detect_changes(&old, &new),
            vec!["requirement R-1: linked_test_cases changed".to_string()]
        );
    }

    #[test]
    fn test_version_numbers_monotonic() {
        let mut data = set_with_requirement("x");
        let mut manager = VersionManager::new(&data);

        assert_eq!(manager.save_version("first", &data, false).version_number, 1);

        data.requirements[0].description = "y".into();
        manager.mark_unsaved_changes();
        assert_eq!(manager.auto_save(&data).unwrap().version_number, 2);

        assert_eq!(manager.save_version("checkpoint", &data, true).version_number, 3);
        manager.mark_unsaved_changes();
        assert_eq!(manager.auto_save(&data).unwrap().version_number, 4);

        let numbers: Vec<u32> = manager.versions().iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(manager.current_version(), 4);
    }

    #[test]
    fn test_snapshot_immutable_after_save() {
        let mut data = ArtifactSet::new();
        data.test_cases.push(TestCase::new("TC-01", "A"));
        let mut manager = VersionManager::new(&ArtifactSet::new());

        let id = manager.save_version("v1", &data, false).id.clone();
        data.test_cases[0].title = "B".into();

        let stored = manager.version(&id).unwrap();
        assert_eq!(stored.snapshot.test_cases[0].title, "A");
        assert_eq!(manager.last_saved_snapshot().test_cases[0].title, "A");
    }

    #[test]
    fn test_save_records_summary() {
        let data = set_with_requirement("x");
        let mut manager = VersionManager::new(&ArtifactSet::new());

        let version = manager.save_version("initial import", &data, false);
        assert_eq!(version.changes_summary, vec!["Added requirement R-1".to_string()]);
        assert_eq!(version.author, DEFAULT_AUTHOR);
        assert_eq!(version.target, VersionTarget::Workspace);
        assert!(!version.is_auto_save);
        assert!(!manager.has_unsaved_changes());
    }

    #[test]
    fn test_restore_round_trip() {
        let a = set_with_requirement("x");
        let b = set_with_requirement("y");
        let mut manager = VersionManager::new(&ArtifactSet::new());

        let v1 = manager.save_version("v1", &a, false).id.clone();
        manager.mark_unsaved_changes();
        manager.save_version("v2", &b, false);

        let restored = manager.restore_version(&v1).unwrap();
        assert_eq!(restored, a);
        assert_eq!(manager.last_saved_snapshot(), &a);
        assert_eq!(manager.current_version(), 1);
        assert!(!manager.has_unsaved_changes());

        // history is not truncated
        assert_eq!(manager.versions().len(), 2);

        // the next save diffs against A
        assert_eq!(
            manager.pending_changes(&b),
            vec!["requirement R-1: description changed".to_string()]
        );
        let v3 = manager.save_version("v3", &b, false);
        assert_eq!(v3.version_number, 3);
        assert_eq!(v3.changes_summary.len(), 1);
    }

    #[test]
    fn test_restored_copy_is_independent() {
        let a = set_with_requirement("x");
        let mut manager = VersionManager::new(&ArtifactSet::new());
        let id = manager.save_version("v1", &a, false).id.clone();

        let mut restored = manager.restore_version(&id).unwrap();
        restored.requirements[0].description = "mutated".into();

        assert_eq!(manager.version(&id).unwrap().snapshot, a);
        assert_eq!(manager.last_saved_snapshot(), &a);
    }

    #[test]
    fn test_restore_unknown_changes_nothing() {
        let data = set_with_requirement("x");
        let mut manager = VersionManager::new(&data);
        manager.save_version("v1", &data, false);
        manager.mark_unsaved_changes();
        let before = manager.state();

        let result = manager.restore_version("nonexistent");
        assert_eq!(result, Err(TraceError::VersionNotFound("nonexistent".into())));
        assert_eq!(manager.state(), before);
        assert!(manager.has_unsaved_changes());
    }

    #[test]
    fn test_auto_save_without_changes_is_noop() {
        let data = set_with_requirement("x");
        let mut manager = VersionManager::new(&data);
        manager.save_version("v1", &data, false);

        assert!(manager.auto_save(&data).is_none());
        assert_eq!(manager.versions().len(), 1);
        assert_eq!(manager.current_version(), 1);
    }

    #[test]
    fn test_auto_save_marks_version() {
        let data = set_with_requirement("x");
        let mut manager = VersionManager::new(&ArtifactSet::new());
        manager.mark_unsaved_changes();

        let version = manager.auto_save(&data).unwrap();
        assert!(version.is_auto_save);
        assert_eq!(version.description, AUTO_SAVE_DESCRIPTION);
        assert!(!manager.has_unsaved_changes());
        assert_eq!(manager.last_saved_snapshot(), &data);
    }

    #[test]
    fn test_mark_unsaved_is_idempotent() {
        let data = ArtifactSet::new();
        let mut manager = VersionManager::new(&data);
        manager.mark_unsaved_changes();
        manager.mark_unsaved_changes();

        assert!(manager.has_unsaved_changes());
        assert!(manager.versions().is_empty());
        assert_eq!(manager.current_version(), 0);
    }

    #[test]
    fn test_save_version_for_artifact() {
        let data = set_with_requirement("x");
        let mut manager = VersionManager::with_author(&data, "qa-lead");

        let version = manager.save_version_for("edit R-1", &data, ArtifactRef::requirement("R-1"));
        assert_eq!(version.artifact_type(), Some(ArtifactKind::Requirement));
        assert_eq!(version.artifact_id(), Some("R-1"));
        assert_eq!(version.author, "qa-lead");
    }

    #[test]
    fn test_compare_versions() {
        let a = set_with_requirement("x");
        let mut b = set_with_requirement("y");
        b.viewpoints.push(Viewpoint::new("VP-1", "Auth"));
        let mut manager = VersionManager::new(&ArtifactSet::new());

        let v1 = manager.save_version("v1", &a, false).id.clone();
        let v2 = manager.save_version("v2", &b, false).id.clone();

        assert_eq!(
            manager.compare_versions(&v1, &v2).unwrap(),
            vec![
                "requirement R-1: description changed".to_string(),
                "Added viewpoint VP-1".to_string(),
            ]
        );
        assert!(manager.compare_versions(&v1, "missing").is_err());
    }
}
