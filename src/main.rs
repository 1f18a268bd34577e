use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use memsculpt::analysis::service::{EmotionScorer, SpeechToText};
use memsculpt::audio::wav::read_wav_file;
use memsculpt::cli::{Cli, Commands, ConfigAction, failure_details};
use memsculpt::config::Config;
use memsculpt::pipeline::SculpturePipeline;
use memsculpt::sculpture::ExportFormat;
use memsculpt::sculpture::export::{export_to_path, read_solid};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{}", format!("Error: {err:#}").red());
        for line in failure_details(&err).unwrap_or_default() {
            eprintln!("  {line}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            input,
            output,
            format,
            timeout,
        } => {
            let config = load_config(cli.config.as_deref())?;
            handle_generate(config, &input, output, format, timeout, cli.quiet).await?;
        }
        Commands::Timeline { input, records } => {
            let config = load_config(cli.config.as_deref())?;
            handle_timeline(config, &input, records).await?;
        }
        Commands::Inspect { file } => {
            handle_inspect(&file)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "memsculpt",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("memsculpt={level}").into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/memsculpt/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied last.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()?)?,
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "remote")]
fn collaborators(config: &Config) -> Result<(Arc<dyn SpeechToText>, Arc<dyn EmotionScorer>)> {
    use memsculpt::analysis::http::{HttpEmotionScorer, HttpSpeechToText};

    if !config.services.stt.is_configured() {
        bail!(
            "No speech-to-text service configured. Set services.stt.url in the config file or MEMSCULPT_STT_URL."
        );
    }
    if !config.services.nlu.is_configured() {
        bail!(
            "No emotion analysis service configured. Set services.nlu.url in the config file or MEMSCULPT_NLU_URL."
        );
    }
    let stt = HttpSpeechToText::new(&config.services.stt)
        .context("Failed to set up the speech-to-text client")?;
    let nlu = HttpEmotionScorer::new(&config.services.nlu)
        .context("Failed to set up the emotion analysis client")?;
    Ok((Arc::new(stt), Arc::new(nlu)))
}

#[cfg(not(feature = "remote"))]
fn collaborators(_config: &Config) -> Result<(Arc<dyn SpeechToText>, Arc<dyn EmotionScorer>)> {
    bail!("memsculpt was built without the `remote` feature; no analysis services are available")
}

fn build_pipeline(config: Config) -> Result<SculpturePipeline> {
    let (stt, nlu) = collaborators(&config)?;
    Ok(SculpturePipeline::new(config, stt, nlu)?)
}

/// Resolve output path and format from whichever of the two was given.
fn resolve_output(
    input: &Path,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
) -> (PathBuf, ExportFormat) {
    let format = format
        .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or_default();
    let path = output.unwrap_or_else(|| input.with_extension(format.extension()));
    (path, format)
}

async fn handle_generate(
    config: Config,
    input: &Path,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    timeout: Option<Duration>,
    quiet: bool,
) -> Result<()> {
    let raw = read_wav_file(input)?;
    let mut pipeline = build_pipeline(config)?;
    if let Some(timeout) = timeout {
        pipeline = pipeline.with_timeout(Some(timeout));
    }

    let result = pipeline.run(&raw).await?;
    let (path, format) = resolve_output(input, output, format);
    export_to_path(&result.model, format, &path)?;

    if quiet {
        return Ok(());
    }
    println!("{} {}", "Sculpture written to".green(), path.display());
    println!("  {}  {:.1}s", "Recording:".dimmed(), raw.duration_secs());
    println!("  {}   {}", "Segments:".dimmed(), result.segments);
    println!("  {}   {}", "Measured:".dimmed(), result.measured());
    if result.failed() > 0 {
        println!(
            "  {}     {}",
            "Failed:".dimmed(),
            result.failed().to_string().yellow()
        );
    }
    println!("  {}    {}", "Samples:".dimmed(), result.timeline.len());
    println!("  {}     {:.1} mm", "Height:".dimmed(), result.model.height());
    println!(
        "  {}  {} ({format})",
        "Triangles:".dimmed(),
        result.model.mesh().triangle_count()
    );
    Ok(())
}

async fn handle_timeline(config: Config, input: &Path, include_records: bool) -> Result<()> {
    let raw = read_wav_file(input)?;
    let run = build_pipeline(config)?.run_timeline(&raw).await?;

    let json = if include_records {
        serde_json::to_string_pretty(&serde_json::json!({
            "timeline": run.timeline,
            "records": run.records,
        }))?
    } else {
        serde_json::to_string_pretty(&run.timeline)?
    };
    println!("{json}");
    Ok(())
}

fn handle_inspect(file: &Path) -> Result<()> {
    let solid =
        read_solid(file).with_context(|| format!("Failed to read sculpture {}", file.display()))?;
    let [width, depth, height] = solid.bounds.size();

    println!("{}", file.display().bold());
    println!("  {}   {}", "Profiles:".dimmed(), solid.profile_count);
    println!("  {}  {}", "Triangles:".dimmed(), solid.triangles);
    println!(
        "  {}       {width:.1} x {depth:.1} x {height:.1} mm",
        "Size:".dimmed()
    );
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let path = config_path(custom_path)?;

    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.redacted().to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                eprintln!(
                    "{}",
                    format!("Config file already exists: {}", path.display()).red()
                );
                eprintln!("Use --force to overwrite it.");
                std::process::exit(1);
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, Config::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Wrote".green(), path.display());
        }
    }
    Ok(())
}
