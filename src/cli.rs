//! Command-line interface for memsculpt
//!
//! Provides argument parsing using clap derive macros.

use crate::error::SculptError;
use crate::sculpture::ExportFormat;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Turn a spoken recording into a printable emotion sculpture
#[derive(Parser, Debug)]
#[command(
    name = "memsculpt",
    version,
    about = "Turn a spoken recording into a printable emotion sculpture"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress the run summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`), and compound (`1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: SculptError| e.to_string())
}

/// Lines telling the user where a failed run stopped and whether re-running may help.
///
/// Returns `None` when no [`SculptError`] is found in the error chain.
pub fn failure_details(err: &anyhow::Error) -> Option<Vec<String>> {
    let sculpt = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SculptError>())?;

    let mut lines = vec![format!("Failed stage: {}", sculpt.stage())];
    if let Some(time) = sculpt.time_secs() {
        lines.push(format!("Recording time: {time:.2}s"));
    }
    if let SculptError::PartialAnalysis { completed, total } = sculpt {
        lines.push(format!("Segments analyzed: {completed} of {total}"));
    }
    lines.push(if sculpt.is_transient() {
        "Retrying may help: the failure depends on the environment".to_string()
    } else {
        "Deterministic: the same input and configuration will fail again".to_string()
    });
    Some(lines)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a sculpture from a WAV recording
    Generate {
        /// Input recording (WAV)
        input: PathBuf,

        /// Output file (default: input name with the format's extension)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Export format: stl, stl-ascii or json (default: from output extension, else stl)
        #[arg(short, long, value_name = "FORMAT", value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Analysis deadline, overriding the config. Examples: 90, 30s, 5m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        timeout: Option<Duration>,
    },

    /// Print the emotion timeline of a recording as JSON
    Timeline {
        /// Input recording (WAV)
        input: PathBuf,

        /// Include per-segment transcript records
        #[arg(long)]
        records: bool,
    },

    /// Summarize an exported sculpture (STL or JSON)
    Inspect {
        /// Exported sculpture file
        file: PathBuf,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (API keys redacted)
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["memsculpt", "generate", "talk.wav"]).unwrap();
        match cli.command {
            Commands::Generate {
                input,
                output,
                format,
                timeout,
            } => {
                assert_eq!(input, PathBuf::from("talk.wav"));
                assert!(output.is_none());
                assert!(format.is_none());
                assert!(timeout.is_none());
            }
            other => panic!("Expected Generate command, got {other:?}"),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_generate_with_options() {
        let cli = Cli::try_parse_from([
            "memsculpt",
            "generate",
            "talk.wav",
            "-o",
            "out.json",
            "--format",
            "stl-ascii",
            "--timeout",
            "1m30s",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                output,
                format,
                timeout,
                ..
            } => {
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(format, Some(ExportFormat::StlAscii));
                assert_eq!(timeout, Some(Duration::from_secs(90)));
            }
            other => panic!("Expected Generate command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_format_fails() {
        let result = Cli::try_parse_from(["memsculpt", "generate", "a.wav", "--format", "obj"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_verbose_repeated_flags() {
        let cli = Cli::try_parse_from(["memsculpt", "-v", "-v", "inspect", "a.stl"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "memsculpt",
            "timeline",
            "a.wav",
            "--config",
            "/path/to/config.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
        assert!(matches!(cli.command, Commands::Timeline { records: false, .. }));
    }

    #[test]
    fn test_parse_config_init_force() {
        let cli = Cli::try_parse_from(["memsculpt", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["memsculpt", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["memsculpt"]).is_err());
    }

    #[test]
    fn test_failure_details_for_deadline() {
        let err = anyhow::Error::new(SculptError::PartialAnalysis {
            completed: 1,
            total: 4,
        })
        .context("Failed to generate sculpture");

        let lines = failure_details(&err).unwrap();
        assert_eq!(
            lines,
            vec![
                "Failed stage: analysis",
                "Segments analyzed: 1 of 4",
                "Retrying may help: the failure depends on the environment",
            ]
        );
    }

    #[test]
    fn test_failure_details_for_geometry() {
        let err = anyhow::Error::new(SculptError::GeometryConstruction {
            sample_index: 2,
            time_secs: 7.25,
            reason: "profile height does not increase".to_string(),
        });

        let lines = failure_details(&err).unwrap();
        assert_eq!(lines[0], "Failed stage: generation");
        assert_eq!(lines[1], "Recording time: 7.25s");
        assert!(lines[2].starts_with("Deterministic"));
    }

    #[test]
    fn test_failure_details_for_missing_recording() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.wav");
        let err = anyhow::Error::new(crate::audio::wav::read_wav_file(&path).unwrap_err())
            .context("Failed to read recording");

        let lines = failure_details(&err).unwrap();
        assert_eq!(lines[0], "Failed stage: preprocess");
        assert!(lines[1].starts_with("Deterministic"));
    }

    #[test]
    fn test_failure_details_ignores_foreign_errors() {
        let err = anyhow::anyhow!("No speech-to-text service configured");
        assert!(failure_details(&err).is_none());
    }

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert!(parse_duration("soon").is_err());
    }
}
