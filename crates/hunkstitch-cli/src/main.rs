//! Thin filesystem-facing driver around [`hunkstitch_core`].
//!
//! Reads an original file and a diff file from disk, builds an
//! [`ApplyOptions`](hunkstitch_core::ApplyOptions) from an optional TOML
//! config overlaid with flags, calls the core, and writes the patched bytes
//! and a JSON report. The core itself never touches a filesystem or an
//! environment variable; this binary is the only place in the workspace that
//! does either.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

use hunkstitch_core::{apply_with_config, ApplyOptions, PipelineResult};

mod error;
mod options;
mod report;

use error::CliError;

#[derive(Parser)]
#[command(name = "hunkstitch", about = "Apply a unified diff even when a strict patch tool would reject it")]
struct Opts {
    /// Path to the original file.
    #[arg(long)]
    original: PathBuf,

    /// Path to the unified-diff patch.
    #[arg(long)]
    diff: PathBuf,

    /// Optional TOML file of `ApplyOptions`, overlaid by the flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the patched file. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Where to write the JSON report. Defaults to stderr.
    #[arg(long = "json-report")]
    json_report: Option<PathBuf>,

    /// Abandon the call after this many seconds instead of waiting forever on
    /// an invariant-violation panic. Runs `apply` on a blocking worker thread.
    #[arg(long)]
    timeout: Option<u64>,

    /// Reject corrected hunk counts instead of silently recovering them.
    #[arg(long)]
    validate_diff: bool,

    /// Disable the already-applied pre-check and false-positive-hunk rule.
    #[arg(long)]
    no_detect_already_applied: bool,

    /// Always emit LF for hunk-produced lines, ignoring the CRLF-majority rule.
    #[arg(long)]
    no_preserve_crlf: bool,

    /// Cap the search window used by the tolerant placement strategies.
    #[arg(long)]
    max_search_window: Option<usize>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.verbose);

    match run(opts) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            tracing::error!(%err, "hunkstitch failed");
            eprintln!("hunkstitch: {err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Returns the process exit code: 0 if every hunk applied or was already
/// applied, 1 if any hunk failed, 2 on a parse error (mirrors §6 of the
/// engine's own documentation of its CLI surface).
fn run(opts: Opts) -> Result<i32, CliError> {
    let original = fs_err::read(&opts.original)?;
    let diff = fs_err::read_to_string(&opts.diff)?;

    let base = match &opts.config {
        Some(path) => {
            let text = fs_err::read_to_string(path)?;
            toml::from_str(&text)?
        }
        None => ApplyOptions::default(),
    };
    let options = options::overlay(base, &opts);

    let result = if let Some(secs) = opts.timeout {
        run_with_timeout(original, diff, options, secs)?
    } else {
        apply_with_config(&original, &diff, &options)
    };

    write_patched(&opts, &result)?;
    write_report(&opts, &result)?;

    Ok(exit_code(&result))
}

/// Runs `apply` on a blocking worker thread and abandons it after `secs`
/// seconds, demonstrating the pattern the engine's own docs describe for
/// callers that cannot tolerate an unbounded wait on an invariant panic.
fn run_with_timeout(
    original: Vec<u8>,
    diff: String,
    options: ApplyOptions,
    secs: u64,
) -> Result<PipelineResult, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(async move {
        let handle = tokio::task::spawn_blocking(move || apply_with_config(&original, &diff, &options));
        match tokio::time::timeout(Duration::from_secs(secs), handle).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(join_err)) => Err(CliError::Worker(join_err)),
            Err(_elapsed) => Err(CliError::Timeout(secs)),
        }
    })
}

fn write_patched(opts: &Opts, result: &PipelineResult) -> Result<(), CliError> {
    let Some(patched) = &result.patched else {
        return Ok(());
    };
    match &opts.out {
        Some(path) => fs_err::write(path, patched)?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(patched)?;
        }
    }
    Ok(())
}

fn write_report(opts: &Opts, result: &PipelineResult) -> Result<(), CliError> {
    let report = report::Report::from(result);
    let json = serde_json::to_string_pretty(&report)?;
    match &opts.json_report {
        Some(path) => fs_err::write(path, json)?,
        None => eprintln!("{json}"),
    }
    Ok(())
}

fn exit_code(result: &PipelineResult) -> i32 {
    if result.parse_error.is_some() {
        return 2;
    }
    if result.summary.failed > 0 {
        return 1;
    }
    0
}
