mod cli;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use tracebench_core::{
    detect_changes, export, get_config_path, load_artifact_set, sample_artifact_set,
    save_artifact_set, ArtifactKind, ArtifactRef, ArtifactSet, ChangeRecord, CoverageStatus,
    Priority, TraceConfig, Workspace,
};

use crate::cli::{Cli, Command, ExportFormat};
use crate::replay::{run_script, Script, StepOutcome};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = TraceConfig::load_or_default(get_config_path()?)?;
    let file = cli
        .file
        .clone()
        .or_else(|| config.default_workspace.as_ref().map(PathBuf::from));
    let artifacts = match &file {
        Some(path) => load_artifact_set(path)?,
        None => {
            log::info!("No artifact file given, using the built-in sample");
            sample_artifact_set()
        }
    };

    match cli.command {
        Command::Coverage => show_coverage(&artifacts),
        Command::Matrix => show_matrix(&artifacts),
        Command::Check => show_link_issues(&artifacts),
        Command::Show { kind, id } => show_artifact(&artifacts, &kind.artifact(&id))?,
        Command::Impact { kind, id } => show_impact(&artifacts, &kind.artifact(&id))?,
        Command::Link {
            source_kind,
            source_id,
            target_kind,
            target_id,
            output,
        } => {
            let output = output_path(output, file.as_deref())?;
            change_link(
                artifacts,
                &source_kind.artifact(&source_id),
                &target_kind.artifact(&target_id),
                true,
                &output,
            )?;
        }
        Command::Unlink {
            source_kind,
            source_id,
            target_kind,
            target_id,
            output,
        } => {
            let output = output_path(output, file.as_deref())?;
            change_link(
                artifacts,
                &source_kind.artifact(&source_id),
                &target_kind.artifact(&target_id),
                false,
                &output,
            )?;
        }
        Command::Diff { old, new } => show_diff(&old, &new)?,
        Command::Export { format, output } => handle_export(&artifacts, format, &output)?,
        Command::Replay { script, history } => {
            replay_script(artifacts, &config, &script, history.as_deref())?;
        }
    }

    Ok(())
}

fn output_path(output: Option<PathBuf>, file: Option<&Path>) -> Result<PathBuf> {
    output
        .or_else(|| file.map(Path::to_path_buf))
        .context("No --output given and no --file to write back to")
}

fn status_label(status: CoverageStatus) -> colored::ColoredString {
    match status {
        CoverageStatus::Uncovered => "uncovered".red(),
        CoverageStatus::Minimal => "minimal".yellow(),
        CoverageStatus::Covered => "covered".green(),
    }
}

fn priority_label(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::High => "High".red(),
        Priority::Medium => "Medium".yellow(),
        Priority::Low => "Low".green(),
    }
}

fn show_coverage(artifacts: &ArtifactSet) {
    let workspace = Workspace::new(artifacts.clone());
    let summary = workspace.coverage_summary();

    println!("{}", "Requirement coverage".green());
    for row in workspace.matrix() {
        println!(
            "  {:<10} {:<10} {} test case(s)",
            row.requirement_id.yellow(),
            status_label(row.coverage.status),
            row.coverage.count
        );
    }

    println!(
        "\n{} {}% ({} of {} requirements)",
        "Coverage:".blue(),
        workspace.coverage(),
        summary.covered + summary.minimal,
        summary.requirements
    );
}

fn show_matrix(artifacts: &ArtifactSet) {
    let workspace = Workspace::new(artifacts.clone());
    let rows = workspace.matrix();
    if rows.is_empty() {
        println!("No requirements found.");
        return;
    }

    for row in rows {
        println!(
            "{} [{}] {}",
            row.requirement_id.yellow(),
            priority_label(row.priority),
            row.description
        );
        println!(
            "  {} {}",
            "Viewpoints:".dimmed(),
            join_or_dash(&row.viewpoints)
        );
        println!(
            "  {} {}",
            "Test cases:".dimmed(),
            join_or_dash(&row.test_cases)
        );
        println!("  {} {}", "Coverage:".dimmed(), status_label(row.coverage.status));
    }
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

fn show_link_issues(artifacts: &ArtifactSet) {
    let issues = Workspace::new(artifacts.clone()).one_way_links();
    if issues.is_empty() {
        println!("{}", "All links are bidirectional.".green());
        return;
    }

    println!("{} one-way link(s) found:", issues.len().to_string().red());
    for issue in issues {
        println!("  {}", issue);
    }
}

fn print_history(history: &[ChangeRecord]) {
    if history.is_empty() {
        return;
    }
    println!("\n{}:", "History".green());
    for change in history {
        println!(
            "  {} {} {} → {}",
            change
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .yellow(),
            change.field.magenta(),
            change.old_value.red(),
            change.new_value.green()
        );
    }
}

fn show_artifact(artifacts: &ArtifactSet, artifact: &ArtifactRef) -> Result<()> {
    let not_found = || anyhow::anyhow!("{} not found", artifact);

    match artifact.kind {
        ArtifactKind::Requirement => {
            let req = artifacts.requirement(&artifact.id).ok_or_else(not_found)?;
            println!("{}: {}", "ID".blue(), req.id);
            println!("{}: {}", "Description".blue(), req.description);
            println!("{}: {}", "Priority".blue(), priority_label(req.priority));
            println!("{}: {}", "Status".blue(), req.status);
            println!("{}: {}", "Viewpoints".blue(), join_set(&req.linked_viewpoints));
            println!("{}: {}", "Test cases".blue(), join_set(&req.linked_test_cases));
            println!("{}: {}", "Modified".blue(), req.meta.last_modified);
            print_history(&req.meta.change_history);
        }
        ArtifactKind::Viewpoint => {
            let vp = artifacts.viewpoint(&artifact.id).ok_or_else(not_found)?;
            println!("{}: {}", "ID".blue(), vp.id);
            println!("{}: {}", "Area".blue(), vp.area);
            println!("{}: {}", "Intent".blue(), vp.intent);
            println!("{}: {}", "Data variants".blue(), vp.data_variants);
            if !vp.notes.is_empty() {
                println!("{}: {}", "Notes".blue(), vp.notes);
            }
            println!("{}: {}", "Requirements".blue(), join_set(&vp.linked_requirements));
            println!("{}: {}", "Test cases".blue(), join_set(&vp.linked_test_cases));
            println!("{}: {}", "Modified".blue(), vp.meta.last_modified);
            print_history(&vp.meta.change_history);
        }
        ArtifactKind::TestCase => {
            let tc = artifacts.test_case(&artifact.id).ok_or_else(not_found)?;
            let title = if tc.locked {
                format!("{} {}", tc.title, "(locked)".red())
            } else {
                tc.title.clone()
            };
            println!("{}: {}", "ID".blue(), tc.id);
            println!("{}: {}", "Title".blue(), title);
            println!("{}: {}", "Severity".blue(), tc.severity);
            println!("{}: {}", "Tags".blue(), join_set(&tc.tags));
            println!("{}: {}", "Requirements".blue(), join_set(&tc.req_ids));
            println!("{}: {}", "Viewpoints".blue(), join_set(&tc.viewpoint_ids));
            if !tc.steps.is_empty() {
                println!("{}:\n{}", "Steps".blue(), tc.steps);
            }
            println!("{}: {}", "Expected".blue(), tc.expected_result);
            println!("{}: {}", "Modified".blue(), tc.meta.last_modified);
            print_history(&tc.meta.change_history);
        }
    }

    Ok(())
}

fn join_set(values: &std::collections::BTreeSet<String>) -> String {
    join_or_dash(&values.iter().cloned().collect::<Vec<_>>())
}

fn show_impact(artifacts: &ArtifactSet, artifact: &ArtifactRef) -> Result<()> {
    let notice = Workspace::new(artifacts.clone()).impact_of(artifact)?;
    if notice.is_empty() {
        println!("{} has no linked artifacts.", artifact);
        return Ok(());
    }

    println!(
        "Changing {} may impact {} artifact(s):",
        artifact.to_string().yellow(),
        notice.count()
    );
    for neighbor in &notice.impacted {
        println!("  {}", neighbor);
    }
    Ok(())
}

fn change_link(
    artifacts: ArtifactSet,
    source: &ArtifactRef,
    target: &ArtifactRef,
    link: bool,
    output: &Path,
) -> Result<()> {
    let mut workspace = Workspace::new(artifacts);
    let changed = if link {
        workspace.link(source, target)?
    } else {
        workspace.unlink(source, target)?
    };

    if !changed {
        println!("Nothing to change between {} and {}.", source, target);
        return Ok(());
    }

    save_artifact_set(output, workspace.artifacts())?;
    let verb = if link { "Linked" } else { "Unlinked" };
    println!(
        "{} {} and {} ({})",
        verb.green(),
        source,
        target,
        output.display()
    );
    Ok(())
}

fn show_diff(old: &Path, new: &Path) -> Result<()> {
    let old_set = load_artifact_set(old)?;
    let new_set = load_artifact_set(new)?;

    let changes = detect_changes(&old_set, &new_set);
    if changes.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for change in changes {
        println!("  {}", change);
    }
    Ok(())
}

fn handle_export(artifacts: &ArtifactSet, format: ExportFormat, output: &Path) -> Result<()> {
    match format {
        ExportFormat::Json | ExportFormat::Yaml => {
            // the extension picks the serializer
            let target = match format {
                ExportFormat::Json => output.with_extension("json"),
                _ => output.with_extension("yaml"),
            };
            save_artifact_set(&target, artifacts)?;
            println!("Exported {} artifacts: {}", artifacts.len(), target.display());
        }
        ExportFormat::Markdown => {
            export::export_matrix_markdown(artifacts, output)?;
            println!("Exported traceability matrix: {}", output.display());
        }
    }
    Ok(())
}

fn print_outcome(index: usize, outcome: &StepOutcome) {
    let step = format!("{:>3}.", index + 1).dimmed();
    match outcome {
        StepOutcome::Edited(notice) if notice.is_empty() => {
            println!("{} edited {}", step, notice.artifact);
        }
        StepOutcome::Edited(notice) => {
            println!("{} {}", step, notice.to_string().yellow());
        }
        StepOutcome::Unchanged => println!("{} no change", step),
        StepOutcome::Linked { changed } => {
            println!("{} links {}", step, if *changed { "updated" } else { "unchanged" });
        }
        StepOutcome::Saved {
            version_number,
            changes,
        } => println!(
            "{} saved version {} ({} change(s))",
            step,
            version_number.to_string().green(),
            changes
        ),
        StepOutcome::AutoSaveSkipped => println!("{} auto-save skipped", step),
        StepOutcome::Marked => println!("{} marked unsaved", step),
        StepOutcome::Restored { version_number } => {
            println!("{} restored version {}", step, version_number.to_string().cyan());
        }
        StepOutcome::Rejected(e) => println!("{} {}", step, e.to_string().red()),
    }
}

fn replay_script(
    artifacts: ArtifactSet,
    config: &TraceConfig,
    script_path: &Path,
    history_path: Option<&Path>,
) -> Result<()> {
    let script = Script::load(script_path)?;
    let mut workspace = Workspace::with_config(artifacts, config);

    println!(
        "{} (auto-save every {}s)",
        "Replaying session".green(),
        config.autosave_interval_secs
    );
    for (index, outcome) in run_script(&mut workspace, script).iter().enumerate() {
        print_outcome(index, outcome);
    }

    let state = workspace.state();
    println!("\n{}:", "Versions".green());
    for version in workspace.versions().versions() {
        let marker = if version.version_number == state.current_version {
            "*"
        } else {
            " "
        };
        println!(
            "{} v{} {} {} {}{}",
            marker.cyan(),
            version.version_number,
            version
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .yellow(),
            version.author.cyan(),
            version.description,
            if version.is_auto_save { " (auto)" } else { "" }
        );
        for change in &version.changes_summary {
            println!("      {}", change.dimmed());
        }
    }
    if state.has_unsaved_changes {
        println!("{}", "Unsaved changes pending".red());
    }

    if let Some(path) = history_path {
        export::export_history_json(workspace.versions().versions(), path)?;
        println!("History written to {}", path.display());
    }

    Ok(())
}
