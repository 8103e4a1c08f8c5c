//! Scripted editing sessions
//!
//! A script is a YAML list of steps standing in for the clicks and keystrokes
//! of an interactive session, including the ticks of an auto-save timer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use tracebench_core::{ArtifactRef, FieldUpdate, ImpactNotice, TraceError, Workspace};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse script from {:?}", path))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Update { id: String, update: FieldUpdate },
    Link { source: ArtifactRef, target: ArtifactRef },
    Unlink { source: ArtifactRef, target: ArtifactRef },
    Save { description: String },
    Checkpoint { description: String },
    /// Flag unsaved changes without editing anything
    Mark,
    /// One tick of the auto-save timer
    AutoSave,
    Restore { version: u32 },
}

/// What a step did, for display
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Edited(ImpactNotice),
    Unchanged,
    Linked { changed: bool },
    Saved { version_number: u32, changes: usize },
    AutoSaveSkipped,
    Marked,
    Restored { version_number: u32 },
    /// The step failed and left the workspace as it was
    Rejected(TraceError),
}

fn run_step(workspace: &mut Workspace, step: Step) -> Result<StepOutcome, TraceError> {
    let outcome = match step {
        Step::Update { id, update } => match workspace.update_field(&id, update)? {
            Some(notice) => StepOutcome::Edited(notice),
            None => StepOutcome::Unchanged,
        },
        Step::Link { source, target } => StepOutcome::Linked {
            changed: workspace.link(&source, &target)?,
        },
        Step::Unlink { source, target } => StepOutcome::Linked {
            changed: workspace.unlink(&source, &target)?,
        },
        Step::Save { description } => {
            let version = workspace.save(&description, false);
            StepOutcome::Saved {
                version_number: version.version_number,
                changes: version.changes_summary.len(),
            }
        }
        Step::Checkpoint { description } => {
            let version = workspace.save(&description, true);
            StepOutcome::Saved {
                version_number: version.version_number,
                changes: version.changes_summary.len(),
            }
        }
        Step::Mark => {
            workspace.mark_unsaved_changes();
            StepOutcome::Marked
        }
        Step::AutoSave => match workspace.auto_save() {
            Some(version) => StepOutcome::Saved {
                version_number: version.version_number,
                changes: version.changes_summary.len(),
            },
            None => StepOutcome::AutoSaveSkipped,
        },
        Step::Restore { version } => {
            workspace.restore_number(version)?;
            StepOutcome::Restored {
                version_number: version,
            }
        }
    };
    Ok(outcome)
}

/// Runs every step in order; a failing step is reported and the run goes on
pub fn run_script(workspace: &mut Workspace, script: Script) -> Vec<StepOutcome> {
    script
        .steps
        .into_iter()
        .map(|step| run_step(workspace, step).unwrap_or_else(StepOutcome::Rejected))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracebench_core::{sample_artifact_set, RequirementStatus};

    const SCRIPT: &str = r#"
steps:
  - action: save
    description: Imported requirements
  - action: update
    id: R-004
    update:
      kind: requirement
      change:
        field: status
        value: Reviewed
  - action: link
    source: { kind: requirement, id: R-004 }
    target: { kind: test_case, id: TC-05 }
  - action: auto_save
  - action: auto_save
  - action: update
    id: TC-03
    update:
      kind: test_case
      change:
        field: title
        value: Renamed
  - action: restore
    version: 1
  - action: restore
    version: 42
"#;

    #[test]
    fn test_run_script() {
        let script: Script = serde_yaml::from_str(SCRIPT).unwrap();
        let mut workspace = Workspace::new(sample_artifact_set());

        let outcomes = run_script(&mut workspace, script);

        assert_eq!(
            outcomes[0],
            StepOutcome::Saved {
                version_number: 1,
                changes: 0
            }
        );
        match &outcomes[1] {
            StepOutcome::Edited(notice) => assert!(notice.is_empty()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcomes[2], StepOutcome::Linked { changed: true });
        // status change plus both sides of the new link
        assert_eq!(
            outcomes[3],
            StepOutcome::Saved {
                version_number: 2,
                changes: 3
            }
        );
        assert_eq!(outcomes[4], StepOutcome::AutoSaveSkipped);
        assert_eq!(
            outcomes[5],
            StepOutcome::Rejected(TraceError::ArtifactLocked("TC-03".into()))
        );
        assert_eq!(outcomes[6], StepOutcome::Restored { version_number: 1 });
        assert!(matches!(
            outcomes[7],
            StepOutcome::Rejected(TraceError::VersionNotFound(_))
        ));

        let first = &workspace.versions().versions()[0];
        assert_eq!(workspace.artifacts(), &first.snapshot);
        assert_eq!(
            workspace.artifacts().requirement("R-004").unwrap().status,
            RequirementStatus::Parsed
        );
        assert_eq!(workspace.state().current_version, 1);
        assert_eq!(workspace.state().versions, 2);
    }

    #[test]
    fn test_step_update_matches_standalone_form() {
        let update_yaml = "kind: viewpoint\nchange:\n  field: notes\n  value: Check reloads\n";
        let standalone: FieldUpdate = serde_yaml::from_str(update_yaml).unwrap();

        let step_yaml = "action: update\nid: VP-03\nupdate:\n  kind: viewpoint\n  change:\n    field: notes\n    value: Check reloads\n";
        match serde_yaml::from_str::<Step>(step_yaml).unwrap() {
            Step::Update { id, update } => {
                assert_eq!(id, "VP-03");
                assert_eq!(update, standalone);
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_fails_to_parse() {
        let result: Result<Script, _> = serde_yaml::from_str("steps:\n  - action: explode\n");
        assert!(result.is_err());
    }
}
