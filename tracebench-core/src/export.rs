use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::coverage::{coverage_summary, traceability_matrix};
use crate::models::ArtifactSet;
use crate::version::Version;

/// Export version history (snapshots included) to JSON
pub fn export_history_json(versions: &[Version], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(versions)?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write history to {:?}", output_path))?;

    log::info!(
        "Exported {} version(s) to {}",
        versions.len(),
        output_path.display()
    );
    Ok(())
}

fn cell(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

/// Render the traceability matrix as a Markdown document
pub fn render_matrix_markdown(set: &ArtifactSet) -> String {
    let summary = coverage_summary(set);
    let mut output = String::new();

    output.push_str("# Traceability Matrix\n\n");
    output.push_str(&format!(
        "**Coverage:** {}% | **Requirements:** {} | **Covered:** {} | **Minimal:** {} | **Uncovered:** {}\n\n",
        summary.percentage, summary.requirements, summary.covered, summary.minimal, summary.uncovered
    ));

    output.push_str("| Requirement | Priority | Description | Viewpoints | Test Cases | Coverage |\n");
    output.push_str("|---|---|---|---|---|---|\n");

    for row in traceability_matrix(set) {
        // pipes would break the table
        let description = row.description.replace('|', "\\|");
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} ({}) |\n",
            row.requirement_id,
            row.priority,
            description,
            cell(&row.viewpoints),
            cell(&row.test_cases),
            row.coverage.status,
            row.coverage.count
        ));
    }

    output
}

/// Export the traceability matrix to a Markdown file
pub fn export_matrix_markdown(set: &ArtifactSet, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_matrix_markdown(set))
        .with_context(|| format!("Failed to write matrix to {:?}", output_path))?;

    log::info!(
        "Exported traceability matrix for {} requirement(s) to {}",
        set.requirements.len(),
        output_path.display()
    );
    Ok(())
}
