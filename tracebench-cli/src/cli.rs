use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tracebench_core::{ArtifactKind, ArtifactRef};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Traceability and version history for test-management artifacts")]
pub struct Cli {
    /// Artifact file (YAML or JSON); the built-in sample is used when omitted
    #[clap(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long, short = 'v')]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

/// Artifact kind as typed on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    #[value(alias = "req")]
    Requirement,
    #[value(alias = "vp")]
    Viewpoint,
    #[value(alias = "tc")]
    TestCase,
}

impl KindArg {
    pub fn artifact(self, id: &str) -> ArtifactRef {
        let kind = match self {
            KindArg::Requirement => ArtifactKind::Requirement,
            KindArg::Viewpoint => ArtifactKind::Viewpoint,
            KindArg::TestCase => ArtifactKind::TestCase,
        };
        ArtifactRef::new(kind, id)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Yaml,
    Markdown,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show coverage per requirement and overall
    Coverage,

    /// Print the requirement -> viewpoint -> test case matrix
    Matrix,

    /// Report links that are missing their reciprocal side
    Check,

    /// Show one artifact with its links and change history
    Show {
        #[clap(value_enum)]
        kind: KindArg,
        id: String,
    },

    /// List artifacts directly linked to an artifact
    Impact {
        #[clap(value_enum)]
        kind: KindArg,
        id: String,
    },

    /// Link two artifacts on both sides
    Link {
        #[clap(value_enum)]
        source_kind: KindArg,
        source_id: String,
        #[clap(value_enum)]
        target_kind: KindArg,
        target_id: String,

        /// Write the updated artifact set here (defaults to --file)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Remove a link on both sides
    Unlink {
        #[clap(value_enum)]
        source_kind: KindArg,
        source_id: String,
        #[clap(value_enum)]
        target_kind: KindArg,
        target_id: String,

        /// Write the updated artifact set here (defaults to --file)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the changes between two artifact files
    Diff { old: PathBuf, new: PathBuf },

    /// Export the artifact set or the traceability matrix
    Export {
        #[clap(long, value_enum, default_value = "markdown")]
        format: ExportFormat,

        #[clap(long, short = 'o')]
        output: PathBuf,
    },

    /// Run a scripted editing session and print its version history
    Replay {
        /// YAML file with a `steps` list
        script: PathBuf,

        /// Also write the version history as JSON
        #[clap(long)]
        history: Option<PathBuf>,
    },
}
