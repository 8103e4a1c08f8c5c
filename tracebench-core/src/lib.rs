pub mod config;
pub mod coverage;
pub mod error;
pub mod export;
pub mod fixtures;
pub mod models;
pub mod trace;
pub mod update;
pub mod version;
pub mod workspace;

// Re-export commonly used types
pub use config::{get_config_path, TraceConfig};
pub use coverage::{
    classify_coverage, compute_coverage, coverage_summary, traceability_matrix, CoverageClass,
    CoverageStatus, CoverageSummary, MatrixRow,
};
pub use error::TraceError;
pub use fixtures::{load_artifact_set, sample_artifact_set, save_artifact_set};
pub use models::{
    Artifact, ArtifactKind, ArtifactMeta, ArtifactRef, ArtifactSet, ChangeRecord, FieldValue,
    Priority, Requirement, RequirementStatus, Severity, TestCase, Viewpoint,
};
pub use trace::{
    find_one_way_links, link_artifacts, neighbors, unlink_artifacts, ImpactNotice, LinkIssue,
    LinkIssueKind,
};
pub use update::{apply_update, FieldUpdate, RequirementField, TestCaseField, ViewpointField};
pub use version::{
    detect_changes, Version, VersionManager, VersionState, VersionTarget, AUTO_SAVE_DESCRIPTION,
    DEFAULT_AUTHOR,
};
pub use workspace::Workspace;
