// guardstream/src/cli.rs
//! This file defines the command-line interface (CLI) for the guardstream application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use guardstream_core::{DetectionPolicy, DetectorBackend};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "guardstream",
    author = "Obscura Team (Relay)",
    version = env!("CARGO_PKG_VERSION"),
    about = "Sanitize a live text stream before anyone reads it",
    long_about = "Guardstream reads text as it is produced (a model answer, a log tail, a pipe), checks it in small segments for sensitive data, and writes the redacted stream to stdout while an audit trail of every check goes to stderr. If the detector is unavailable, text passes through unredacted and the audit trail says so.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all log messages.")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `guardstream` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs one sanitization session over stdin or a file.
    #[command(about = "Sanitize a stream: redacted content to stdout, audit lines to stderr.")]
    Stream(StreamCommand),

    /// Runs the configured detector once over the whole input and reports what it finds.
    #[command(about = "Report sensitive items in the input without redacting it.")]
    Detect(DetectCommand),
}

/// Settings shared by every command that builds a detector.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DetectorArgs {
    /// Path to a custom configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", help = "Path to a custom configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Override the detector backend.
    #[arg(long = "backend", value_name = "BACKEND", help = "Detector backend to use.")]
    pub backend: Option<BackendChoice>,

    /// Override the detection policy.
    #[arg(long = "policy", value_name = "POLICY", help = "Detection policy: personal data or confidential business data.")]
    pub policy: Option<PolicyChoice>,
}

/// Arguments for the `stream` command.
#[derive(Parser, Debug)]
pub struct StreamCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input: Option<PathBuf>,

    /// Write sanitized output to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Write audit lines to this file instead of stderr.
    #[arg(long = "audit-file", value_name = "FILE", help = "Write audit lines to a file instead of stderr.")]
    pub audit_file: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,

    #[arg(long = "threshold", value_name = "CHARS", help = "Buffered characters that trigger a check.")]
    pub threshold: Option<usize>,

    #[arg(long = "overlap", value_name = "CHARS", help = "Characters of already-checked text re-checked with the next segment.")]
    pub overlap: Option<usize>,

    /// Also flush at sentence boundaries.
    #[arg(long = "sentence-flush", help = "Also check as soon as a sentence ends.")]
    pub sentence_flush: bool,

    #[arg(long = "min-sentence-chars", value_name = "CHARS", requires = "sentence_flush", help = "Minimum buffered characters before a sentence end triggers a check.")]
    pub min_sentence_chars: Option<usize>,

    /// Process input line by line (useful for streaming data from pipes).
    #[arg(long = "line-buffered", help = "Read input line by line instead of in fixed-size chunks.")]
    pub line_buffered: bool,

    #[arg(long = "chunk-size", value_name = "BYTES", default_value_t = 4096, conflicts_with = "line_buffered", help = "Bytes read per chunk when not line-buffered.")]
    pub chunk_size: usize,

    #[arg(long = "strip-ansi", help = "Remove terminal escape sequences from the input.")]
    pub strip_ansi: bool,
}

/// Arguments for the `detect` command.
#[derive(Parser, Debug)]
pub struct DetectCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,

    /// Print the report as JSON.
    #[arg(long = "json", help = "Print the detection report to stdout as JSON.")]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Regular expressions with checksum validation
    Pattern,
    /// Lexicon of confidential terms
    Keyword,
    /// HTTP detection model
    Remote,
    /// Every configured member, results unioned
    Composite,
}

impl From<BackendChoice> for DetectorBackend {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Pattern => DetectorBackend::Pattern,
            BackendChoice::Keyword => DetectorBackend::Keyword,
            BackendChoice::Remote => DetectorBackend::Remote,
            BackendChoice::Composite => DetectorBackend::Composite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyChoice {
    Pii,
    Confidential,
}

impl From<PolicyChoice> for DetectionPolicy {
    fn from(choice: PolicyChoice) -> Self {
        match choice {
            PolicyChoice::Pii => DetectionPolicy::Pii,
            PolicyChoice::Confidential => DetectionPolicy::Confidential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_stream_overrides() {
        let cli = Cli::try_parse_from([
            "guardstream", "stream", "--backend", "keyword", "--policy", "confidential",
            "--threshold", "80", "--sentence-flush", "--min-sentence-chars", "20",
        ])
        .unwrap();
        let Commands::Stream(cmd) = cli.command else { panic!("expected stream") };
        assert_eq!(cmd.detector.backend, Some(BackendChoice::Keyword));
        assert_eq!(cmd.detector.policy, Some(PolicyChoice::Confidential));
        assert_eq!(cmd.threshold, Some(80));
        assert_eq!(cmd.min_sentence_chars, Some(20));
        assert_eq!(cmd.chunk_size, 4096);
    }

    #[test]
    fn min_sentence_chars_requires_sentence_flush() {
        assert!(Cli::try_parse_from(["guardstream", "stream", "--min-sentence-chars", "20"]).is_err());
    }
}
