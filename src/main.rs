use anyhow::{Context, Result};
use clap::Parser;
use cpakey::{
    attack::recover_key,
    config::Config,
    io::load_trace_set,
    report::{save_summary, write_reports},
};
use log::{info, warn};
use std::{fs, path::PathBuf};

/// Recover an AES-128 key from power traces of its last round with CPA
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Power traces, one trace per row (CSV or .npy)
    traces: PathBuf,

    /// Ciphertexts, 16 bytes per row in the trace order (CSV or .npy)
    ciphertexts: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the per byte correlation reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// The leakage is searched in the last 1/N samples of each trace
    #[arg(short, long)]
    window_divisor: Option<usize>,

    /// Number of threads computing the correlations
    #[arg(short, long)]
    threads: Option<usize>,

    /// CSV field delimiter
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Do not write the per byte correlation reports
    #[arg(long)]
    no_reports: bool,

    /// Save a JSON summary of the recovery
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Save the correlation matrix as JSON
    #[arg(long)]
    save_correlations: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(window_divisor) = self.window_divisor {
            config.window_divisor = window_divisor;
        }
        if let Some(threads) = self.threads {
            config.num_threads = Some(threads);
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if self.no_reports {
            config.write_reports = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.config()?;
    info!("Reading data from: {}", cli.traces.display());
    info!("Reading ciphertext from: {}", cli.ciphertexts.display());
    let set = load_trace_set(&cli.traces, &cli.ciphertexts, config.delimiter_byte()?)
        .context("Failed to load the trace set")?;

    #[cfg(feature = "progress_bar")]
    let progress = cpakey::util::progress_bar(0);
    #[cfg(not(feature = "progress_bar"))]
    let progress = cpakey::util::NoProgress;

    let recovery = recover_key(&set, &config, &progress)?;

    if config.write_reports {
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
        let failures = write_reports(&config.output_dir, &recovery);
        if !failures.is_empty() {
            warn!("{} of 16 reports could not be written", failures.len());
        }
    }
    if let Some(path) = &cli.summary {
        save_summary(path, &recovery)
            .with_context(|| format!("Failed to save summary {}", path.display()))?;
    }
    if let Some(path) = &cli.save_correlations {
        recovery
            .cpa()
            .save(path)
            .with_context(|| format!("Failed to save correlations {}", path.display()))?;
    }

    println!(
        "Key is {}",
        recovery
            .master_key()
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("{}", hex::encode(recovery.master_key()));

    Ok(())
}
