use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use ffmpeg_pass::{AvBackend, TranscodeConfig, Transcoder};
use tokio_util::sync::CancellationToken;

mod output_path;

/// Two-pass H.264 transcoder: collects rate-control statistics, then encodes
/// the input into an MP4 file at the target bit rate.
#[derive(Parser, Debug)]
#[command(name = "lite-transcode", version)]
struct Cli {
    /// Input media file
    input: PathBuf,

    /// Output file; defaults to the input with its extension replaced by .mp4
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file overriding encoder and muxer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep a partially written output when the encoding pass fails
    #[arg(long)]
    keep_partial: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ffmpeg_pass", level)
        .filter_module("lite_transcode", level)
        .parse_default_env()
        .init();
    ffmpeg_pass::set_av_log_level(verbose > 0);
}

fn load_config(cli: &Cli) -> anyhow::Result<TranscodeConfig> {
    let mut config = match &cli.config {
        Some(path) => TranscodeConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TranscodeConfig::default(),
    };
    if cli.keep_partial {
        config.keep_partial_output = true;
    }
    Ok(config)
}

fn output_for(cli: &Cli) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| output_path::derive(&cli.input))
}

async fn run(cli: Cli) -> anyhow::Result<PathBuf> {
    if !cli.input.is_file() {
        anyhow::bail!("input file not found: {}", cli.input.display());
    }
    let config = load_config(&cli)?;
    let output = output_for(&cli);
    ffmpeg_pass::init()?;

    if let Ok(info) = ffmpeg_pass::probe(&cli.input) {
        log::debug!("input {}:\n{}", cli.input.display(), info);
    }

    let cancel = CancellationToken::new();
    let transcoder = Transcoder::new(AvBackend, config)?.with_cancel(cancel.clone());
    let input = cli.input.clone();
    let mut job = tokio::task::spawn_blocking(move || transcoder.run(&input, &output));

    let report = loop {
        tokio::select! {
            result = &mut job => break result.context("transcode task panicked")?,
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                log::warn!("interrupt received, stopping after the current frame");
                cancel.cancel();
            },
        }
    }?;

    log::info!("{}", report.first);
    log::info!("{}", report.second);
    std::path::absolute(&report.output)
        .with_context(|| format!("resolving {}", report.output.display()))
}

/// Runs the CLI and returns the process exit code.
async fn execute(cli: Cli) -> i32 {
    match run(cli).await {
        Ok(output) => {
            println!("Encoding completed successfully.");
            println!("Output file saved to: {}", output.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Usage errors exit with 1; `--help` and `--version` exit with 0.
fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() { 1 } else { 0 }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    };
    init_logging(cli.verbose);

    std::process::exit(execute(cli).await);
}
