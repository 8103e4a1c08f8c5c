//! Loading and saving artifact sets, plus the built-in demo workspace.
//!
//! The format is chosen from the file extension the same way storage
//! backends are picked: `.json` is JSON, anything else is YAML.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use crate::models::{
    Artifact, ArtifactSet, Priority, Requirement, RequirementStatus, Severity, TestCase, Viewpoint,
};

/// Serialization formats for artifact files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Infers the format from a path's extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileFormat::Json,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            _ => FileFormat::Yaml,
        }
    }
}

fn check_unique<A: Artifact>(artifacts: &[A]) -> Result<()> {
    let mut seen = HashSet::new();
    for artifact in artifacts {
        if !seen.insert(artifact.id()) {
            bail!("Duplicate {} id: {}", A::KIND, artifact.id());
        }
    }
    Ok(())
}

/// Fails if two artifacts of the same kind share an id
pub fn check_unique_ids(set: &ArtifactSet) -> Result<()> {
    check_unique(&set.requirements)?;
    check_unique(&set.viewpoints)?;
    check_unique(&set.test_cases)?;
    Ok(())
}

/// Loads an artifact set from a YAML or JSON file
///
/// Ids must be unique within each kind.
pub fn load_artifact_set<P: AsRef<Path>>(path: P) -> Result<ArtifactSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact file: {:?}", path))?;

    let set: ArtifactSet = match FileFormat::from_path(path) {
        FileFormat::Json => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?,
        FileFormat::Yaml => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {:?}", path))?,
    };

    check_unique_ids(&set).with_context(|| format!("Invalid artifact file: {:?}", path))?;

    log::debug!("Loaded {} artifacts from {:?}", set.len(), path);
    Ok(set)
}

/// Writes an artifact set, creating parent directories as needed
pub fn save_artifact_set<P: AsRef<Path>>(path: P, set: &ArtifactSet) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = match FileFormat::from_path(path) {
        FileFormat::Json => serde_json::to_string_pretty(set)?,
        FileFormat::Yaml => serde_yaml::to_string(set)?,
    };
    fs::write(path, content).with_context(|| format!("Failed to write artifact file: {:?}", path))?;

    Ok(())
}

fn ids<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A small login/checkout workspace used by the CLI when no file is given
///
/// `VP-03` lists `TC-05` but `TC-05` does not list it back, so the link
/// checker has something to report.
pub fn sample_artifact_set() -> ArtifactSet {
    let mut r1 = Requirement::new(
        "R-001",
        "Users can sign in with email and password",
    )
    .with_priority(Priority::High)
    .with_status(RequirementStatus::Approved);
    r1.linked_viewpoints = ids(["VP-01"]);
    r1.linked_test_cases = ids(["TC-01"]);

    let mut r2 = Requirement::new("R-002", "Accounts lock after five failed sign-in attempts")
        .with_priority(Priority::High)
        .with_status(RequirementStatus::Reviewed);
    r2.linked_viewpoints = ids(["VP-01"]);

    let mut r3 = Requirement::new("R-003", "Cart totals include tax for the shipping region")
        .with_priority(Priority::Medium);
    r3.linked_viewpoints = ids(["VP-02"]);
    r3.linked_test_cases = ids(["TC-03", "TC-04"]);

    let r4 = Requirement::new("R-004", "Order history is exportable as CSV")
        .with_priority(Priority::Low);

    let mut vp1 = Viewpoint::new("VP-01", "Authentication")
        .with_intent("Verify credential handling and lockout rules");
    vp1.data_variants = "valid, wrong password, unknown email".into();
    vp1.linked_requirements = ids(["R-001", "R-002"]);
    vp1.linked_test_cases = ids(["TC-02"]);

    let mut vp2 = Viewpoint::new("VP-02", "Checkout pricing")
        .with_intent("Verify totals across shipping regions");
    vp2.data_variants = "domestic, EU, tax-exempt".into();
    vp2.linked_requirements = ids(["R-003"]);
    vp2.linked_test_cases = ids(["TC-04"]);

    let mut vp3 = Viewpoint::new("VP-03", "Session handling")
        .with_intent("Verify sessions expire and survive reloads");
    vp3.notes = "Needs a requirement from the security review".into();
    vp3.linked_test_cases = ids(["TC-05"]);

    let mut tc1 = TestCase::new("TC-01", "Sign in with valid credentials")
        .with_severity(Severity::High)
        .with_tags(["smoke", "auth"]);
    tc1.steps = "1. Open sign-in page\n2. Enter valid email and password\n3. Submit".into();
    tc1.expected_result = "Dashboard is shown".into();
    tc1.req_ids = ids(["R-001"]);

    let mut tc2 = TestCase::new("TC-02", "Lock account after repeated failures")
        .with_severity(Severity::High)
        .with_tags(["auth", "negative"]);
    tc2.steps = "1. Submit a wrong password five times\n2. Submit the right password".into();
    tc2.expected_result = "Account locked message is shown".into();
    tc2.viewpoint_ids = ids(["VP-01"]);

    let mut tc3 = TestCase::new("TC-03", "Domestic cart total").with_tags(["pricing"]);
    tc3.expected_result = "Total includes domestic tax".into();
    tc3.req_ids = ids(["R-003"]);
    tc3.locked = true;

    let mut tc4 = TestCase::new("TC-04", "EU cart total").with_tags(["pricing"]);
    tc4.expected_result = "Total includes VAT".into();
    tc4.req_ids = ids(["R-003"]);
    tc4.viewpoint_ids = ids(["VP-02"]);

    let tc5 = TestCase::new("TC-05", "Session expires after inactivity")
        .with_severity(Severity::Low)
        .with_tags(["session"]);

    ArtifactSet {
        requirements: vec![r1, r2, r3, r4],
        viewpoints: vec![vp1, vp2, vp3],
        test_cases: vec![tc1, tc2, tc3, tc4, tc5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{classify_coverage, compute_coverage, CoverageStatus};
    use crate::models::ArtifactKind;
    use crate::trace::find_one_way_links;
    use tempfile::tempdir;

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workspace.yaml");
        let set = sample_artifact_set();

        save_artifact_set(&path, &set).unwrap();
        assert_eq!(load_artifact_set(&path).unwrap(), set);
    }

    #[test]
    fn test_json_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("workspace.json");
        let set = sample_artifact_set();

        save_artifact_set(&path, &set).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('{'));
        assert_eq!(load_artifact_set(&path).unwrap(), set);
    }

    #[test]
    fn test_load_minimal_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("min.yml");
        fs::write(
            &path,
            "requirements:\n  - id: R-1\n    description: x\ntest_cases:\n  - id: TC-1\n    title: A\n    req_ids: [R-1]\n",
        )
        .unwrap();

        let set = load_artifact_set(&path).unwrap();
        assert_eq!(set.requirements.len(), 1);
        assert!(set.viewpoints.is_empty());
        assert!(set.test_case("TC-1").unwrap().req_ids.contains("R-1"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.yaml");
        fs::write(
            &path,
            "requirements:\n  - id: R-1\n    description: x\n  - id: R-1\n    description: y\n",
        )
        .unwrap();

        let err = load_artifact_set(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Invalid artifact file"));
        assert!(message.contains("Duplicate requirement id: R-1"));
    }

    #[test]
    fn test_same_id_across_kinds_allowed() {
        let mut set = ArtifactSet::new();
        set.requirements.push(Requirement::new("X-1", "x"));
        set.test_cases.push(TestCase::new("X-1", "x"));
        assert!(check_unique_ids(&set).is_ok());

        set.test_cases.push(TestCase::new("X-1", "again"));
        let err = check_unique_ids(&set).unwrap_err();
        assert_eq!(err.to_string(), format!("Duplicate {} id: X-1", ArtifactKind::TestCase));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_artifact_set("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read artifact file"));
    }

    #[test]
    fn test_sample_has_known_one_way_link() {
        let set = sample_artifact_set();
        let issues = find_one_way_links(&set);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].from.id, "VP-03");
        assert_eq!(issues[0].to.id, "TC-05");
    }

    #[test]
    fn test_sample_coverage() {
        let set = sample_artifact_set();
        // R-001, R-002 (via VP-01) and R-003 are covered; R-004 is not
        assert_eq!(
            compute_coverage(&set.requirements, &set.viewpoints, &set.test_cases),
            75
        );
        assert_eq!(
            classify_coverage(&set, "R-003").unwrap().status,
            CoverageStatus::Covered
        );
        assert_eq!(
            classify_coverage(&set, "R-004").unwrap().status,
            CoverageStatus::Uncovered
        );
    }
}
