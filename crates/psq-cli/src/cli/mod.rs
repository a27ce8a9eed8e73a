use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod global;

pub use global::{GlobalFlags, OutputFormat};

/// Top-level CLI parser for the `psq` binary.
#[derive(Debug, Parser)]
#[command(
    name = "psq",
    version,
    about = "Pesticide quant reports from QBench metadata and instrument results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Max rows to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub const fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List QBench sample metadata for one or more batches
    Fetch(FetchArgs),
    /// Reconcile a raw-results workbook against QBench and produce reports
    Process(ProcessArgs),
    /// Show recently saved reports
    History,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Batch ids
    #[arg(required = true)]
    pub batches: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Instrument export holding the raw results sheet
    #[arg(short, long)]
    pub workbook: PathBuf,

    /// Report directory (defaults to report.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not save results to the report store
    #[arg(long)]
    pub no_save: bool,

    /// Do not write xlsx reports
    #[arg(long)]
    pub no_export: bool,

    /// Analyst name recorded with saved reports
    #[arg(long)]
    pub processed_by: Option<String>,

    /// Batch ids
    #[arg(required = true)]
    pub batches: Vec<String>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "psq", "--format", "json", "--limit", "10", "--verbose", "history",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.limit, Some(10));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::History));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["psq", "history", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["psq", "--format", "xml", "history"]).is_err());
    }

    #[test]
    fn fetch_takes_several_batches() {
        let cli = Cli::try_parse_from(["psq", "fetch", "B-1001", "B-1002"]).expect("cli should parse");
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.batches, vec!["B-1001", "B-1002"]);
    }

    #[test]
    fn fetch_requires_a_batch() {
        assert!(Cli::try_parse_from(["psq", "fetch"]).is_err());
    }

    #[test]
    fn process_parses_switches() {
        let cli = Cli::try_parse_from([
            "psq",
            "process",
            "--workbook",
            "results.xlsx",
            "--no-save",
            "--processed-by",
            "jdoe",
            "B-1001",
        ])
        .expect("cli should parse");

        let Commands::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.workbook.to_str(), Some("results.xlsx"));
        assert!(args.no_save);
        assert!(!args.no_export);
        assert_eq!(args.processed_by.as_deref(), Some("jdoe"));
        assert_eq!(args.output, None);
        assert_eq!(args.batches, vec!["B-1001"]);
    }

    #[test]
    fn process_requires_workbook() {
        assert!(Cli::try_parse_from(["psq", "process", "B-1001"]).is_err());
    }
}
