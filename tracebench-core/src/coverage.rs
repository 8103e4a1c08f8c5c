//! Requirement coverage
//!
//! A requirement is covered by a test case that lists it in `req_ids`, or by a
//! test case linked (through `viewpoint_ids`) to a viewpoint whose
//! `linked_requirements` contains it. Everything here is derived on demand
//! from the current links and never stored.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::TraceError;
use crate::models::{ArtifactKind, ArtifactSet, Priority, Requirement, TestCase, Viewpoint};

/// Coverage classification of a single requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    /// No test case covers it
    Uncovered,
    /// Exactly one test case covers it
    Minimal,
    /// Two or more test cases cover it
    Covered,
}

impl CoverageStatus {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => CoverageStatus::Uncovered,
            1 => CoverageStatus::Minimal,
            _ => CoverageStatus::Covered,
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageStatus::Uncovered => write!(f, "uncovered"),
            CoverageStatus::Minimal => write!(f, "minimal"),
            CoverageStatus::Covered => write!(f, "covered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageClass {
    pub status: CoverageStatus,
    /// Distinct covering test cases, direct and via viewpoint
    pub count: usize,
}

/// Test cases covering a requirement, in test case order, each at most once
pub fn covering_test_cases<'a>(
    requirement_id: &str,
    viewpoints: &[Viewpoint],
    test_cases: &'a [TestCase],
) -> Vec<&'a TestCase> {
    let via: HashSet<&str> = viewpoints
        .iter()
        .filter(|vp| vp.linked_requirements.contains(requirement_id))
        .map(|vp| vp.id.as_str())
        .collect();

    test_cases
        .iter()
        .filter(|tc| {
            tc.req_ids.contains(requirement_id)
                || tc.viewpoint_ids.iter().any(|vp| via.contains(vp.as_str()))
        })
        .collect()
}

fn is_covered(requirement_id: &str, viewpoints: &[Viewpoint], test_cases: &[TestCase]) -> bool {
    !covering_test_cases(requirement_id, viewpoints, test_cases).is_empty()
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0
fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Percentage of requirements covered by at least one test case
///
/// An empty requirement list yields 0.
pub fn compute_coverage(
    requirements: &[Requirement],
    viewpoints: &[Viewpoint],
    test_cases: &[TestCase],
) -> u32 {
    let covered = requirements
        .iter()
        .filter(|r| is_covered(&r.id, viewpoints, test_cases))
        .count();
    percentage(covered, requirements.len())
}

/// Classifies one requirement by how many distinct test cases cover it
pub fn classify_coverage(set: &ArtifactSet, requirement_id: &str) -> Result<CoverageClass, TraceError> {
    if set.requirement(requirement_id).is_none() {
        return Err(TraceError::not_found(ArtifactKind::Requirement, requirement_id));
    }
    let count = covering_test_cases(requirement_id, &set.viewpoints, &set.test_cases).len();
    Ok(CoverageClass {
        status: CoverageStatus::from_count(count),
        count,
    })
}

/// Aggregate coverage figures for a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub requirements: usize,
    pub covered: usize,
    pub minimal: usize,
    pub uncovered: usize,
    pub percentage: u32,
}

pub fn coverage_summary(set: &ArtifactSet) -> CoverageSummary {
    let mut summary = CoverageSummary {
        requirements: set.requirements.len(),
        covered: 0,
        minimal: 0,
        uncovered: 0,
        percentage: 0,
    };
    for req in &set.requirements {
        let count = covering_test_cases(&req.id, &set.viewpoints, &set.test_cases).len();
        match CoverageStatus::from_count(count) {
            CoverageStatus::Uncovered => summary.uncovered += 1,
            CoverageStatus::Minimal => summary.minimal += 1,
            CoverageStatus::Covered => summary.covered += 1,
        }
    }
    summary.percentage = percentage(summary.covered + summary.minimal, summary.requirements);
    summary
}

/// One row of the traceability matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub requirement_id: String,
    pub description: String,
    pub priority: Priority,
    /// Viewpoints linked from either side
    pub viewpoints: Vec<String>,
    /// Covering test cases, in test case order
    pub test_cases: Vec<String>,
    pub coverage: CoverageClass,
}

/// Requirement -> viewpoint -> test case matrix, one row per requirement
pub fn traceability_matrix(set: &ArtifactSet) -> Vec<MatrixRow> {
    set.requirements
        .iter()
        .map(|req| {
            let viewpoints: BTreeSet<String> = req
                .linked_viewpoints
                .iter()
                .cloned()
                .chain(
                    set.viewpoints
                        .iter()
                        .filter(|vp| vp.linked_requirements.contains(&req.id))
                        .map(|vp| vp.id.clone()),
                )
                .collect();
            let test_cases: Vec<String> =
                covering_test_cases(&req.id, &set.viewpoints, &set.test_cases)
                    .into_iter()
                    .map(|tc| tc.id.clone())
                    .collect();
            let count = test_cases.len();

            MatrixRow {
                requirement_id: req.id.clone(),
                description: req.description.clone(),
                priority: req.priority,
                viewpoints: viewpoints.into_iter().collect(),
                test_cases,
                coverage: CoverageClass {
                    status: CoverageStatus::from_count(count),
                    count,
                },
            }
        })
        .collect()
}
