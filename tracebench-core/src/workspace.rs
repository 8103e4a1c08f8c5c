//! A workspace session: the live artifact set plus its version history.
//!
//! This is the single owner of both halves, so a caller holding `&mut
//! Workspace` sees every edit, link change, save and restore as one
//! uninterrupted step. Sharing a workspace across threads means wrapping it
//! in a `Mutex` as a whole.

use log::debug;

use crate::config::TraceConfig;
use crate::coverage::{self, CoverageClass, CoverageSummary, MatrixRow};
use crate::error::TraceError;
use crate::models::{ArtifactRef, ArtifactSet};
use crate::trace::{self, ImpactNotice, LinkIssue};
use crate::update::{self, FieldUpdate};
use crate::version::{Version, VersionManager, VersionState};

#[derive(Debug, Clone)]
pub struct Workspace {
    artifacts: ArtifactSet,
    versions: VersionManager,
}

impl Workspace {
    /// Opens a session over `artifacts`, which also become the first baseline
    pub fn new(artifacts: ArtifactSet) -> Self {
        let versions = VersionManager::new(&artifacts);
        Self {
            artifacts,
            versions,
        }
    }

    pub fn with_config(artifacts: ArtifactSet, config: &TraceConfig) -> Self {
        let versions = VersionManager::with_author(&artifacts, config.author.clone());
        Self {
            artifacts,
            versions,
        }
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    pub fn state(&self) -> VersionState {
        self.versions.state()
    }

    /// Ends the session, handing back the live set
    pub fn into_artifacts(self) -> ArtifactSet {
        self.artifacts
    }

    /// Applies a field edit and reports the directly linked artifacts
    ///
    /// Returns `Ok(None)` when the value did not actually change.
    pub fn update_field(
        &mut self,
        id: &str,
        update: FieldUpdate,
    ) -> Result<Option<ImpactNotice>, TraceError> {
        let artifact = ArtifactRef::new(update.kind(), id);
        let Some(change) = update::apply_update(&mut self.artifacts, id, update)? else {
            return Ok(None);
        };
        self.versions.mark_unsaved_changes();

        let notice = trace::impact_of(&self.artifacts, &artifact, Some(&change.field))?;
        debug!("{}", notice);
        Ok(Some(notice))
    }

    pub fn link(&mut self, source: &ArtifactRef, target: &ArtifactRef) -> Result<bool, TraceError> {
        let changed = trace::link_artifacts(&mut self.artifacts, source, target)?;
        if changed {
            self.versions.mark_unsaved_changes();
        }
        Ok(changed)
    }

    pub fn unlink(&mut self, source: &ArtifactRef, target: &ArtifactRef) -> Result<bool, TraceError> {
        let changed = trace::unlink_artifacts(&mut self.artifacts, source, target)?;
        if changed {
            self.versions.mark_unsaved_changes();
        }
        Ok(changed)
    }

    pub fn impact_of(&self, artifact: &ArtifactRef) -> Result<ImpactNotice, TraceError> {
        trace::impact_of(&self.artifacts, artifact, None)
    }

    pub fn one_way_links(&self) -> Vec<LinkIssue> {
        trace::find_one_way_links(&self.artifacts)
    }

    pub fn mark_unsaved_changes(&mut self) {
        self.versions.mark_unsaved_changes();
    }

    pub fn save(&mut self, description: &str, is_checkpoint: bool) -> &Version {
        self.versions
            .save_version(description, &self.artifacts, is_checkpoint)
    }

    /// Saves on behalf of one artifact's editor
    pub fn save_artifact(&mut self, description: &str, artifact: ArtifactRef) -> Result<&Version, TraceError> {
        if !self.artifacts.contains(&artifact) {
            return Err(TraceError::ArtifactNotFound {
                kind: artifact.kind,
                id: artifact.id,
            });
        }
        Ok(self
            .versions
            .save_version_for(description, &self.artifacts, artifact))
    }

    /// Entry point for an external timer
    pub fn auto_save(&mut self) -> Option<&Version> {
        self.versions.auto_save(&self.artifacts)
    }

    /// Replaces the live set with a stored version's snapshot
    pub fn restore(&mut self, version_id: &str) -> Result<(), TraceError> {
        self.artifacts = self.versions.restore_version(version_id)?;
        Ok(())
    }

    pub fn restore_number(&mut self, version_number: u32) -> Result<(), TraceError> {
        let id = self
            .versions
            .version_by_number(version_number)
            .map(|v| v.id.clone())
            .ok_or_else(|| TraceError::VersionNotFound(format!("#{}", version_number)))?;
        self.restore(&id)
    }

    pub fn pending_changes(&self) -> Vec<String> {
        self.versions.pending_changes(&self.artifacts)
    }

    pub fn coverage(&self) -> u32 {
        coverage::compute_coverage(
            &self.artifacts.requirements,
            &self.artifacts.viewpoints,
            &self.artifacts.test_cases,
        )
    }

    pub fn classify(&self, requirement_id: &str) -> Result<CoverageClass, TraceError> {
        coverage::classify_coverage(&self.artifacts, requirement_id)
    }

    pub fn coverage_summary(&self) -> CoverageSummary {
        coverage::coverage_summary(&self.artifacts)
    }

    pub fn matrix(&self) -> Vec<MatrixRow> {
        coverage::traceability_matrix(&self.artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Requirement, TestCase, Viewpoint};
    use crate::update::{RequirementField, TestCaseField};

    fn workspace() -> Workspace {
        let mut set = ArtifactSet::new();
        set.requirements.push(Requirement::new("R-1", "Login works"));
        set.viewpoints.push(Viewpoint::new("VP-1", "Authentication"));
        set.test_cases.push(TestCase::new("TC-1", "Valid login"));
        Workspace::new(set)
    }

    #[test]
    fn test_edit_marks_unsaved_and_reports_impact() {
        let mut ws = workspace();
        ws.link(&ArtifactRef::requirement("R-1"), &ArtifactRef::test_case("TC-1"))
            .unwrap();
        ws.save("linked", false);
        assert!(!ws.state().has_unsaved_changes);

        let notice = ws
            .update_field(
                "R-1",
                FieldUpdate::Requirement(RequirementField::Description("Login must work".into())),
            )
            .unwrap()
            .unwrap();

        assert!(ws.state().has_unsaved_changes);
        assert_eq!(notice.artifact, ArtifactRef::requirement("R-1"));
        assert_eq!(notice.impacted, vec![ArtifactRef::test_case("TC-1")]);
        assert_eq!(
            ws.pending_changes(),
            vec!["requirement R-1: description changed".to_string()]
        );
    }

    #[test]
    fn test_unchanged_edit_keeps_saved_state() {
        let mut ws = workspace();
        let notice = ws
            .update_field("TC-1", FieldUpdate::TestCase(TestCaseField::Title("Valid login".into())))
            .unwrap();

        assert!(notice.is_none());
        assert!(!ws.state().has_unsaved_changes);
    }

    #[test]
    fn test_failed_link_keeps_saved_state() {
        let mut ws = workspace();
        let result = ws.link(&ArtifactRef::requirement("R-1"), &ArtifactRef::viewpoint("VP-404"));
        assert!(result.is_err());
        assert!(!ws.state().has_unsaved_changes);
    }

    #[test]
    fn test_restore_replaces_live_set() {
        let mut ws = workspace();
        let v1 = ws.save("v1", false).id.clone();
        let original = ws.artifacts().clone();

        ws.link(&ArtifactRef::viewpoint("VP-1"), &ArtifactRef::test_case("TC-1"))
            .unwrap();
        let auto = ws.auto_save().unwrap();
        assert_eq!(auto.version_number, 2);
        assert_eq!(
            auto.changes_summary,
            vec![
                "viewpoint VP-1: linked_test_cases changed".to_string(),
                "test case TC-1: viewpoint_ids changed".to_string(),
            ]
        );

        ws.restore(&v1).unwrap();
        assert_eq!(ws.artifacts(), &original);
        assert_eq!(ws.state().current_version, 1);
        assert_eq!(ws.state().versions, 2);
    }

    #[test]
    fn test_restore_number() {
        let mut ws = workspace();
        ws.save("v1", false);
        ws.link(&ArtifactRef::requirement("R-1"), &ArtifactRef::viewpoint("VP-1"))
            .unwrap();
        ws.save("v2", true);

        ws.restore_number(1).unwrap();
        assert!(ws.artifacts().requirements[0].linked_viewpoints.is_empty());
        assert_eq!(
            ws.restore_number(9),
            Err(TraceError::VersionNotFound("#9".into()))
        );
        assert_eq!(ws.state().current_version, 1);
    }

    #[test]
    fn test_locked_flag_survives_restore() {
        let mut ws = workspace();
        ws.update_field("TC-1", FieldUpdate::TestCase(TestCaseField::Locked(true)))
            .unwrap();
        let v1 = ws.save("locked", false).id.clone();
        ws.update_field("TC-1", FieldUpdate::TestCase(TestCaseField::Locked(false)))
            .unwrap();
        ws.save("unlocked", false);

        ws.restore(&v1).unwrap();
        assert!(ws.artifacts().test_case("TC-1").unwrap().locked);
    }

    #[test]
    fn test_save_artifact_unknown() {
        let mut ws = workspace();
        assert!(ws
            .save_artifact("edit", ArtifactRef::requirement("R-404"))
            .is_err());
        assert!(ws.versions().versions().is_empty());

        let version = ws
            .save_artifact("edit", ArtifactRef::requirement("R-1"))
            .unwrap();
        assert_eq!(version.artifact_id(), Some("R-1"));
    }

    #[test]
    fn test_with_config_author() {
        let config = TraceConfig {
            author: "qa-lead".into(),
            ..TraceConfig::default()
        };
        let mut ws = Workspace::with_config(ArtifactSet::new(), &config);
        assert_eq!(ws.save("empty", false).author, "qa-lead");
    }

    #[test]
    fn test_coverage_views() {
        let mut ws = workspace();
        assert_eq!(ws.coverage(), 0);

        ws.link(&ArtifactRef::requirement("R-1"), &ArtifactRef::viewpoint("VP-1"))
            .unwrap();
        ws.link(&ArtifactRef::viewpoint("VP-1"), &ArtifactRef::test_case("TC-1"))
            .unwrap();

        assert_eq!(ws.coverage(), 100);
        assert_eq!(ws.classify("R-1").unwrap().count, 1);
        assert_eq!(ws.coverage_summary().minimal, 1);
        assert_eq!(ws.matrix()[0].test_cases, vec!["TC-1".to_string()]);
        assert!(ws.one_way_links().is_empty());
    }
}
