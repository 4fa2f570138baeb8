//! Command line entry point invoked by the host editor.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::app::pipeline::{self, CloneOptions};
use crate::app::selection::Selection;
use crate::domain::model::{ClonePlacement, Outcome, TransformMode};
use crate::infra::config::Config;
use crate::infra::fs::{self, OutputTarget};
use crate::infra::logging;

/// Replace duplicated images with linked clones of the original.
#[derive(Debug, Parser)]
#[command(name = "clonify", author, version, about, long_about = None)]
pub struct Cli {
    /// SVG document to rewrite
    pub input: PathBuf,

    /// Id of a selected element (repeatable, supplied by the host)
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Write the result here instead of INPUT; `-` writes to stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Extra configuration file layered over the defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub transform_mode: Option<TransformMode>,

    #[arg(long, value_enum)]
    pub placement: Option<ClonePlacement>,

    /// Append diagnostics to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    pub no_log: bool,

    /// Compute and report without writing the document
    #[arg(long)]
    pub dry_run: bool,

    /// Report format for a completed conversion
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

/// How the run outcome is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// One human readable line on stderr.
    Text,
    /// The outcome as JSON on stdout (stderr when the document goes to stdout).
    Json,
}

impl Cli {
    /// Load layered configuration and apply command line overrides on top.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(mode) = self.transform_mode {
            config.cloning.set_transform_mode(mode);
        }
        if let Some(placement) = self.placement {
            config.cloning.set_placement(placement);
        }
        if let Some(file) = &self.log_file {
            config.logging.set_file(file.clone());
        }
        if self.no_log {
            config.logging.set_enabled(false);
        }
        Ok(config)
    }

    fn output_target(&self) -> OutputTarget {
        match &self.output {
            Some(path) => OutputTarget::from_arg(path),
            None => OutputTarget::File(self.input.clone()),
        }
    }
}

/// Parse arguments from the process and run.
pub fn main() -> Result<()> {
    run(Cli::parse()).map(|_| ())
}

/// Run one conversion: load, convert, write, report.
///
/// The document is only written when copies were converted and this is not a dry run.
pub fn run(cli: Cli) -> Result<Outcome> {
    let config = cli.resolve_config()?;
    logging::init(&config.logging)?;

    let mut doc = fs::read_document(&cli.input)?;
    let selection = Selection::from_ids(cli.ids.iter().cloned());
    let options = CloneOptions::from_config(&config);
    tracing::info!(input = %cli.input.display(), selection = ?selection.ids(), "loaded document");

    let outcome = match pipeline::convert_copies_to_clones(&mut doc, &selection, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "conversion aborted");
            return Err(err).context("conversion aborted; document left unchanged");
        }
    };

    let target = cli.output_target();
    if outcome.is_mutation() && !cli.dry_run {
        fs::write_document(&doc, &target)?;
        tracing::info!(output = ?target, "document written");
    }

    report(&outcome, cli.report, &target)?;
    Ok(outcome)
}

fn report(outcome: &Outcome, format: ReportFormat, target: &OutputTarget) -> Result<()> {
    match format {
        ReportFormat::Text => {
            writeln!(io::stderr(), "{}", outcome.message()).context("failed to write report")
        }
        ReportFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(outcome).context("failed to serialize report")?;
            let written = if *target == OutputTarget::Stdout {
                writeln!(io::stderr(), "{rendered}")
            } else {
                writeln!(io::stdout(), "{rendered}")
            };
            written.context("failed to write report")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_style_arguments() {
        let cli = Cli::try_parse_from([
            "clonify",
            "--id=img2",
            "--id",
            "rect1",
            "--transform-mode=legacy",
            "--placement",
            "in-place",
            "--output=-",
            "drawing.svg",
        ])
        .unwrap();

        assert_eq!(cli.ids, ["img2", "rect1"]);
        assert_eq!(cli.transform_mode, Some(TransformMode::Legacy));
        assert_eq!(cli.placement, Some(ClonePlacement::InPlace));
        assert_eq!(cli.output_target(), OutputTarget::Stdout);
        assert_eq!(cli.report, ReportFormat::Text);
    }

    #[test]
    fn defaults_to_rewriting_input_in_place() {
        let cli = Cli::try_parse_from(["clonify", "drawing.svg"]).unwrap();
        assert_eq!(
            cli.output_target(),
            OutputTarget::File(PathBuf::from("drawing.svg"))
        );
        assert!(cli.ids.is_empty());
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "clonify",
            "--no-log",
            "--log-file",
            "elsewhere.log",
            "--transform-mode",
            "legacy",
            "drawing.svg",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert!(!config.logging.enabled());
        assert_eq!(config.logging.file(), PathBuf::from("elsewhere.log"));
        assert_eq!(config.cloning.transform_mode(), TransformMode::Legacy);
    }
}
