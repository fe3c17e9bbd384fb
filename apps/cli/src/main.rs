mod compose;
mod library;
mod options;
mod stroke;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use app_settings::AppSettings;
use clap::{Args, Parser, Subcommand};
use core_types::ImageSource;
use engine::codec;

/// Room photo staging: composite furniture sprites, derive edit masks and
/// annotate stroke regions.
#[derive(Parser, Debug)]
#[command(name = "roomstage", version)]
struct Cli {
    /// Settings file to use instead of the per-user one.
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Override the configured data root.
    #[arg(long, global = true, value_name = "DIR")]
    data_root: Option<PathBuf>,

    /// Print engine events to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite placed sprites over a room photo and derive the matching mask.
    Compose(compose::ComposeArgs),
    /// Paint a freehand stroke layer over a room photo.
    Blend(stroke::BlendArgs),
    /// Apply the minimum-height policy to a single photo.
    Normalize(NormalizeArgs),
    /// List the sprites available in the furniture library.
    Library(library::LibraryArgs),
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Output file; `.png` or `.jpg`/`.jpeg`.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = options::load_settings(cli.settings.as_deref(), cli.data_root)?;

    match &cli.command {
        Command::Compose(args) => {
            let saved = compose::run(args, &settings, cli.verbose)?;
            println!("composite: {}", saved.composite.display());
            println!("mask:      {}", saved.mask.display());
            println!("record:    {}", saved.record.display());
        }
        Command::Blend(args) => {
            let saved = stroke::run(args, &settings, cli.verbose)?;
            println!("pure mask: {}", saved.pure_mask.display());
            println!("annotated: {}", saved.annotated.display());
            println!("record:    {}", saved.record.display());
        }
        Command::Normalize(args) => normalize(args, &settings, cli.verbose)?,
        Command::Library(args) => library::run(args, &settings.furniture_path())?,
    }
    Ok(())
}

fn normalize(args: &NormalizeArgs, settings: &AppSettings, verbose: bool) -> Result<()> {
    let engine = options::build_engine(options::engine_options(settings)?, verbose);
    let normalized = engine
        .load_background(&ImageSource::path(&args.input))
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let ext = args
        .output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let bytes = match ext.as_str() {
        "png" => codec::encode_png(&normalized.image)?,
        "jpg" | "jpeg" => codec::encode_jpeg(&normalized.image, engine.options().jpeg_quality)?,
        other => bail!("unsupported output extension '{other}' (use png, jpg or jpeg)"),
    };
    fs::write(&args.output, bytes)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let decision = normalized.decision;
    println!(
        "{}: {} -> {}",
        args.output.display(),
        decision.original,
        decision.normalized
    );
    Ok(())
}
