use std::path::PathBuf;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser};

/// Render review dailies movies from image sequences.
#[derive(Parser, Debug)]
#[command(name = "dailies", version)]
struct Cli {
    /// Image sequence directory, a single frame, or a pattern like `shot.%04d.exr` / `shot.####.exr`.
    input: Option<PathBuf>,

    /// Output codec profile from `output_codecs`.
    #[arg(short, long)]
    codec: Option<String>,

    /// Dailies profile from `dailies_profiles`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Output directory, overriding the configured movie location.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Text element values: "artist: jo | comment: first pass".
    #[arg(short, long)]
    text: Option<String>,

    /// Color transform profile from `ocio_profiles`.
    #[arg(long, visible_alias = "ocio")]
    color_transform: Option<String>,

    /// Write numbered JPEG stills instead of a movie and log at debug level.
    #[arg(short, long)]
    debug: bool,

    /// Configuration file (default: $DAILIES_CONFIG, then dailies-config.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(input) = cli.input else {
        Cli::command()
            .print_help()
            .context("failed to print usage")?;
        println!();
        return Ok(());
    };
    dailies::logging::init_console();

    let request = dailies::InvocationRequest {
        input,
        codec: cli.codec,
        profile: cli.profile,
        output: cli.output,
        text: cli.text,
        color_transform: cli.color_transform,
        debug: cli.debug,
        config: cli.config,
    };

    let reports = dailies::run_invocation(&request)?;
    for report in &reports {
        match &report.outcome {
            Ok(stats) => tracing::info!(
                sequence = %report.sequence,
                delivered = stats.frames_delivered,
                skipped = stats.frames_skipped,
                degraded = stats.degraded,
                "done"
            ),
            Err(e) => tracing::error!(sequence = %report.sequence, error = %e, "failed"),
        }
    }

    let code = dailies::session::exit_code(&reports);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
